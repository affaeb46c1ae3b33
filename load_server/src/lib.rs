//! # load_server
//!
//! HTTP prediction API over [`load_forecast::PredictionService`].
//!
//! | Route | |
//! |---|---|
//! | `POST /predict/sarimax`, `POST /predict/ar` | multipart upload, one or more `file` parts |
//! | `GET /health` | liveness and loaded model variants |
//! | `POST /admin/reload` | re-read both parameter files |

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use load_forecast::{ParameterStore, PredictionService, ServiceConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes;

/// Server settings, from flags or the environment
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    #[arg(long, env = "VOLTCAST_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "VOLTCAST_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seasonal model parameter file
    #[arg(long, env = "VOLTCAST_SARIMAX_PARAMS", default_value = "sarimax_model_params.json")]
    pub sarimax_params: PathBuf,

    /// Autoregression parameter file
    #[arg(long, env = "VOLTCAST_AR_PARAMS", default_value = "ar_model_params.json")]
    pub ar_params: PathBuf,

    /// Largest accepted request body
    #[arg(long, env = "VOLTCAST_MAX_UPLOAD_BYTES", default_value_t = 32 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Rows returned in each result sample
    #[arg(long, default_value_t = 5)]
    pub sample_size: usize,

    /// Coverage of the next-value prediction interval
    #[arg(long, default_value_t = 0.95)]
    pub confidence_level: f64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            sample_size: self.sample_size,
            confidence_level: self.confidence_level,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }

    /// Load both parameter files; a file that fails leaves its variant unavailable
    pub fn from_config(config: &ServerConfig) -> Self {
        let store = ParameterStore::from_files(&config.sarimax_params, &config.ar_params);
        let service = PredictionService::new(Arc::new(store), config.service_config());
        Self {
            max_upload_bytes: config.max_upload_bytes,
            ..Self::new(service)
        }
    }
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(routes::health))
        .route("/predict/:model", post(routes::predict))
        .route("/admin/reload", post(routes::reload))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
