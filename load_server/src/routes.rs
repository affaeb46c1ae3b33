//! API route handlers

use crate::error::{ApiError, ErrorBody};
use crate::AppState;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use load_forecast::{ForecastError, ModelVariant, PredictionResult, SlotStatus};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome for one uploaded file
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Prediction(Box<PredictionResult>),
    Failure(ErrorBody),
}

/// Predictions keyed by uploaded file name, kept in upload order
///
/// Serializes as a JSON object whose keys follow the order of the `file`
/// parts. A repeated file name gets a ` (n)` suffix.
#[derive(Debug, Default)]
pub struct PredictionResponse {
    entries: Vec<(String, FileOutcome)>,
}

impl PredictionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FileOutcome> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }

    /// File names in upload order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Append an outcome, suffixing the name if it is already taken
    pub fn push(&mut self, name: String, outcome: FileOutcome) {
        let name = self.unique_name(name);
        self.entries.push((name, outcome));
    }

    fn unique_name(&self, name: String) -> String {
        if self.get(&name).is_none() {
            return name;
        }
        (2..)
            .map(|n| format!("{} ({})", name, n))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or(name)
    }
}

impl Serialize for PredictionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(name, outcome)| (name, outcome)))
    }
}

/// `POST /predict/:model`
///
/// Every `file` part is predicted on the blocking pool. When all of them
/// fail, the request fails with the first error.
pub async fn predict(
    State(state): State<AppState>,
    Path(model): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let variant: ModelVariant = model.parse()?;
    // one parameter set for every file, resolved before any upload is read
    let params = state.service.store().get(variant)?;

    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ForecastError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", files.len() + 1));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ForecastError::Upload(format!("cannot read {}: {}", name, e)))?;
        files.push((name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(ForecastError::Upload("the request has no 'file' part".to_string()).into());
    }
    info!(%variant, files = files.len(), "prediction request");

    let mut tasks = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let service = Arc::clone(&state.service);
        let params = Arc::clone(&params);
        let task =
            tokio::task::spawn_blocking(move || service.predict_with_parameters(&bytes, &params));
        tasks.push((name, task));
    }

    let mut response = PredictionResponse::new();
    let mut first_failure: Option<ErrorBody> = None;
    let mut succeeded = 0;
    for (name, task) in tasks {
        let outcome = match task.await {
            Ok(Ok(result)) => {
                succeeded += 1;
                FileOutcome::Prediction(Box::new(result))
            }
            Ok(Err(e)) => {
                warn!(file = %name, %variant, error = %e, "prediction failed");
                FileOutcome::Failure(ErrorBody::from(&e))
            }
            Err(e) => {
                warn!(file = %name, error = %e, "prediction task aborted");
                FileOutcome::Failure(ApiError::internal(e.to_string()).0)
            }
        };
        if let FileOutcome::Failure(body) = &outcome {
            first_failure.get_or_insert_with(|| body.clone());
        }
        response.push(name, outcome);
    }

    match first_failure {
        Some(body) if succeeded == 0 => Err(ApiError(body)),
        _ => Ok(Json(response)),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub models: Vec<SlotStatus>,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        version: env!("CARGO_PKG_VERSION"),
        models: state.service.store().status(),
    })
}

#[derive(Debug, Serialize)]
pub struct ReloadOutcome {
    pub variant: ModelVariant,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /admin/reload`
///
/// A variant whose file fails to load keeps its current parameters.
pub async fn reload(State(state): State<AppState>) -> Result<Json<Vec<ReloadOutcome>>, ApiError> {
    let service = Arc::clone(&state.service);
    let results = tokio::task::spawn_blocking(move || service.store().reload_all())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let outcomes = results
        .into_iter()
        .map(|(variant, result)| match result {
            Ok(_) => ReloadOutcome {
                variant,
                loaded: true,
                error: None,
            },
            Err(e) => {
                warn!(%variant, error = %e, "reload failed, keeping current parameters");
                ReloadOutcome {
                    variant,
                    loaded: false,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();
    Ok(Json(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn failure(detail: &str) -> FileOutcome {
        FileOutcome::Failure(ApiError::internal(detail.to_string()).0)
    }

    #[test]
    fn repeated_names_are_suffixed_in_arrival_order() {
        let mut response = PredictionResponse::new();
        response.push("day.csv".to_string(), failure("first"));
        response.push("day.csv".to_string(), failure("second"));
        response.push("day.csv".to_string(), failure("third"));

        let names: Vec<&str> = response.names().collect();
        assert_eq!(names, vec!["day.csv", "day.csv (2)", "day.csv (3)"]);
        assert_eq!(response.len(), 3);
    }

    #[test]
    fn serializes_keys_in_upload_order() {
        let mut response = PredictionResponse::new();
        response.push("zeta.csv".to_string(), failure("z"));
        response.push("alpha.csv".to_string(), failure("a"));

        let json = serde_json::to_string(&response).unwrap();
        let zeta = json.find("zeta.csv").unwrap();
        let alpha = json.find("alpha.csv").unwrap();
        assert!(zeta < alpha, "{}", json);
    }
}
