use load_forecast::error::ForecastError;
use load_math::MathError;
use rstest::rstest;
use std::io;

#[rstest]
#[case(
    ForecastError::Schema { column: "consumption".to_string(), found: "date, load".to_string() },
    400,
    "schema"
)]
#[case(ForecastError::EmptyAfterCleaning { dropped: 3 }, 400, "empty_after_cleaning")]
#[case(ForecastError::InsufficientData("2 rows".to_string()), 400, "insufficient_data")]
#[case(ForecastError::InvalidParameter("unknown model".to_string()), 400, "invalid_parameter")]
#[case(ForecastError::Upload("no file part".to_string()), 400, "upload")]
#[case(ForecastError::Training("singular".to_string()), 500, "training")]
#[case(ForecastError::ModelUnavailable("sarimax".to_string()), 500, "model_unavailable")]
#[case(ForecastError::Persistence("bad json".to_string()), 500, "persistence")]
fn test_status_and_kind(
    #[case] error: ForecastError,
    #[case] status: u16,
    #[case] kind: &str,
) {
    assert_eq!(error.status_code(), status);
    assert_eq!(error.kind(), kind);
}

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    match ForecastError::from(io_error) {
        ForecastError::Io(_) => {}
        other => panic!("Expected Io variant, got {:?}", other),
    }

    let math_error = MathError::Singular("pivot 0".to_string());
    let error = ForecastError::from(math_error);
    assert_eq!(error.kind(), "math");
    assert_eq!(error.status_code(), 500);
}

#[test]
fn test_error_display() {
    let error = ForecastError::Schema {
        column: "consumption".to_string(),
        found: "DateTime, Load".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("'consumption'"));
    assert!(message.contains("DateTime, Load"));

    let error = ForecastError::EmptyAfterCleaning { dropped: 7 };
    assert!(format!("{}", error).contains("7 dropped"));
}
