//! FormPulse Server - Main Entry Point

use formpulse_core::InMemoryStore;
use formpulse_server::config::load_forms;
use formpulse_server::{build_router, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("FormPulse v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();

    let store = match &config.forms_path {
        Some(path) => {
            let forms = load_forms(path)?;
            tracing::info!("Loaded {} forms from {}", forms.len(), path);
            InMemoryStore::with_forms(forms)
        }
        None => InMemoryStore::new(),
    };

    let addr = config.bind_addr.clone();
    let app = build_router(AppState::new(store, config));

    // Live updates are fanned out in-process only; run a single instance
    // per form audience.
    tracing::info!("FormPulse API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
