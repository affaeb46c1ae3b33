use chrono::{Duration, NaiveDate};
use load_forecast::data::DataLoader;
use load_forecast::models::ModelVariant;
use load_forecast::params::{ModelParameters, SarimaParameters};
use load_forecast::service::{PredictionService, ServiceConfig};
use load_forecast::store::ParameterStore;
use load_forecast::train::{train, TrainConfig};
use load_series::persist::save_clean_series;
use load_series::{enrich_all, SeriesPoint};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const DAYS: i64 = 3;

fn quarter_hour_load(step: i64) -> f64 {
    let hour = (step % 96) as f64 / 4.0;
    54_000.0
        + 9_000.0 * (hour / 24.0 * std::f64::consts::TAU - 1.2).sin()
        + ((step * 37) % 11) as f64 * 60.0
}

// Write a clean series the way the cleaning binary does
fn write_clean_series(path: &Path) {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let points: Vec<SeriesPoint> = (0..DAYS * 96)
        .map(|step| {
            let load = quarter_hour_load(step);
            SeriesPoint {
                timestamp: start + Duration::minutes(15 * step),
                forecast_day_minus1: Some(load + 300.0),
                forecast_day: Some(load - 150.0),
                consumption: Some(load),
            }
        })
        .collect();
    save_clean_series(path, &enrich_all(&points), true).unwrap();
}

fn upload_of_last_day() -> String {
    let mut text = String::from("timestamp,consumption\n");
    let start = NaiveDate::from_ymd_opt(2023, 1, 5)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    for step in 0..96 {
        text.push_str(&format!(
            "{},{}\n",
            (start + Duration::minutes(15 * step)).format("%Y-%m-%d %H:%M:%S"),
            quarter_hour_load(step)
        ));
    }
    text
}

#[test]
fn test_full_training_and_prediction_workflow() {
    let dir = tempdir().unwrap();
    let clean = dir.path().join("consommation_rte_clean.csv");
    write_clean_series(&clean);

    // 1. Load the clean series
    let series = DataLoader::from_csv(&clean).unwrap();
    assert_eq!(series.len(), (DAYS * 96) as usize);
    assert_eq!(series.points_per_day(), Some(96));

    // 2. Train both variants into their parameter files
    let sarimax_path = dir.path().join("sarimax_model_params.json");
    let ar_path = dir.path().join("ar_model_params.json");

    let mut sarimax = TrainConfig::new(ModelVariant::Sarimax);
    sarimax.output = Some(sarimax_path.clone());
    let outcome = train(&sarimax, &series).unwrap();
    assert_eq!(
        outcome.parameters,
        ModelParameters::Sarima(SarimaParameters::daily(96))
    );
    assert!(outcome.summary.sigma2 > 0.0);

    let mut ar = TrainConfig::new(ModelVariant::Autoregressive);
    ar.output = Some(ar_path.clone());
    train(&ar, &series).unwrap();

    // 3. Serve predictions from the written files
    let store = ParameterStore::from_files(&sarimax_path, &ar_path);
    assert!(store.status().iter().all(|s| s.loaded));
    let service = PredictionService::new(Arc::new(store), ServiceConfig::default());

    let upload = upload_of_last_day();
    let result = service
        .predict(upload.as_bytes(), ModelVariant::Autoregressive)
        .unwrap();
    assert_eq!(result.model, "AR(5)");
    assert_eq!(result.metadata.observation_count, 96);
    assert_eq!(result.warnings.dropped_rows, 0);
    assert!(result.statistics.min < result.statistics.mean);
    assert!(result.statistics.mean < result.statistics.max);
}

#[test]
fn test_daily_season_predicts_a_single_day_upload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sarimax_model_params.json");
    ModelParameters::Sarima(SarimaParameters::daily(96))
        .save(&path)
        .unwrap();
    let store = ParameterStore::from_files(&path, dir.path().join("missing.json"));
    let service = PredictionService::new(Arc::new(store), ServiceConfig::default());

    let result = service
        .predict(upload_of_last_day().as_bytes(), ModelVariant::Sarimax)
        .unwrap();
    assert_eq!(result.model, "SARIMA(1,0,0)(1,0,0,96)");
    assert_eq!(result.metadata.observation_count, 96);
    assert!(result.next_prediction.is_finite());
    assert!(result.next_prediction_interval.lower < result.next_prediction);
    assert!(result.next_prediction < result.next_prediction_interval.upper);
}

#[test]
fn test_data_loader_rejects_missing_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "when,load\n2023-01-01 00:00:00,1.0\n").unwrap();

    assert!(DataLoader::from_csv(&path).is_err());
    assert!(DataLoader::from_csv(dir.path().join("nonexistent_file.csv")).is_err());
}
