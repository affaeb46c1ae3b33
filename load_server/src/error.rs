//! JSON error bodies

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use load_forecast::ForecastError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub detail: String,
}

/// `{"error": {"kind", "detail"}, "status"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    pub status: u16,
}

impl From<&ForecastError> for ErrorBody {
    fn from(err: &ForecastError) -> Self {
        Self {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                detail: err.to_string(),
            },
            status: err.status_code(),
        }
    }
}

/// Error returned by a handler
#[derive(Debug)]
pub struct ApiError(pub ErrorBody);

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self(ErrorBody {
            error: ErrorDetail {
                kind: "internal".to_string(),
                detail: detail.into(),
            },
            status: 500,
        })
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        Self(ErrorBody::from(&err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}
