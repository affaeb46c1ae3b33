use load_forecast::error::ForecastError;
use load_forecast::models::ModelVariant;
use load_forecast::params::{ArParameters, ArimaOrder, ModelParameters, SarimaParameters, SeasonalOrder};
use load_forecast::service::{PredictionService, ServiceConfig};
use load_forecast::store::ParameterStore;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

// Ten rows, one of which has a non-numeric consumption
fn upload_with_one_bad_row() -> String {
    let values = [
        "61200", "60850", "60310", "abc", "59920", "59400", "59650", "60100", "60780", "61350",
    ];
    let mut text = String::from("DateTime;Consommation\n");
    for (i, value) in values.iter().enumerate() {
        text.push_str(&format!(
            "2023-01-01 {:02}:{:02}:00;{}\n",
            i / 4,
            (i % 4) * 15,
            value
        ));
    }
    text
}

fn service_with(params: ModelParameters) -> PredictionService {
    let store = ParameterStore::empty();
    store.set(params);
    PredictionService::new(Arc::new(store), ServiceConfig::default())
}

#[test]
fn test_bad_row_is_dropped_and_the_rest_predicted() {
    let service = service_with(ModelParameters::Autoregressive(ArParameters { lags: 1 }));
    let result = service
        .predict(upload_with_one_bad_row().as_bytes(), ModelVariant::Autoregressive)
        .unwrap();

    assert_eq!(result.warnings.dropped_rows, 1);
    assert_eq!(result.warnings.invalid_consumption_rows, 1);
    assert_eq!(result.warnings.invalid_timestamp_rows, 0);
    assert_eq!(result.metadata.observation_count, 9);
    assert_eq!(result.last_value, 61350.0);
    assert!(result.statistics.mse.is_finite());
}

#[test]
fn test_seasonal_variant_without_season() {
    let params = ModelParameters::Sarima(SarimaParameters {
        order: ArimaOrder { p: 1, d: 0, q: 0 },
        seasonal_order: SeasonalOrder::none(),
    });
    let service = service_with(params);
    let result = service
        .predict(upload_with_one_bad_row().as_bytes(), ModelVariant::Sarimax)
        .unwrap();

    assert_eq!(result.model, "SARIMA(1,0,0)(0,0,0,0)");
    assert_eq!(result.metadata.observation_count, 9);
    assert!(result.next_prediction.is_finite());
}

#[test]
fn test_missing_consumption_column() {
    let service = service_with(ModelParameters::Autoregressive(ArParameters { lags: 1 }));
    let upload = "DateTime,Load\n2023-01-01 00:00:00,1\n2023-01-01 00:15:00,2\n";

    match service
        .predict(upload.as_bytes(), ModelVariant::Autoregressive)
        .unwrap_err()
    {
        ForecastError::Schema { column, .. } => assert_eq!(column, "consumption"),
        other => panic!("Expected Schema error, got {:?}", other),
    }
}

#[test]
fn test_absent_parameter_files_make_every_variant_unavailable() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::from_files(
        dir.path().join("sarimax_model_params.json"),
        dir.path().join("ar_model_params.json"),
    );
    let service = PredictionService::new(Arc::new(store), ServiceConfig::default());

    for variant in ModelVariant::ALL {
        let err = service
            .predict(upload_with_one_bad_row().as_bytes(), variant)
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelUnavailable(_)));
        assert_eq!(err.status_code(), 500);
    }
}

#[test]
fn test_reload_makes_a_variant_available() {
    let dir = tempdir().unwrap();
    let ar_path = dir.path().join("ar_model_params.json");
    let store = Arc::new(ParameterStore::from_files(
        dir.path().join("sarimax_model_params.json"),
        &ar_path,
    ));
    let service = PredictionService::new(Arc::clone(&store), ServiceConfig::default());
    assert!(service
        .predict(upload_with_one_bad_row().as_bytes(), ModelVariant::Autoregressive)
        .is_err());

    ModelParameters::Autoregressive(ArParameters { lags: 2 })
        .save(&ar_path)
        .unwrap();
    store.reload(ModelVariant::Autoregressive).unwrap();

    let result = service
        .predict(upload_with_one_bad_row().as_bytes(), ModelVariant::Autoregressive)
        .unwrap();
    assert_eq!(result.model, "AR(2)");
}
