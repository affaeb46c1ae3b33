use anyhow::{Context, Result};
use clap::Parser;
use load_server::{router, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "load_server=info,load_forecast=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config
        .socket_addr()
        .context("Invalid host/port configuration")?;

    let state = AppState::from_config(&config);
    for status in state.service.store().status() {
        tracing::info!(variant = %status.variant, loaded = status.loaded, "model status");
    }

    tracing::info!("load_server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
