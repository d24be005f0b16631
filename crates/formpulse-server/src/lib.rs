//! FormPulse HTTP API
//!
//! Axum surface over the core: form lookup, creation and update, response
//! submission, analytics snapshots and the per-form live stream.

pub mod config;
pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use formpulse_core::{Hub, InMemoryStore, SubmissionService};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub service: SubmissionService<InMemoryStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: InMemoryStore, config: ServerConfig) -> Self {
        let hub = Arc::new(Hub::with_capacity(config.subscriber_buffer));
        Self {
            service: SubmissionService::new(Arc::new(store), hub),
            config: Arc::new(config),
        }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        self.service.hub()
    }
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/forms", post(handlers::create_form))
        .route(
            "/api/forms/:id",
            get(handlers::get_form).put(handlers::update_form),
        )
        .route("/api/forms/:id/analytics", get(handlers::get_analytics))
        .route("/api/forms/:id/response", post(handlers::submit_response))
        .route("/api/sse/:form_id", get(sse::live_stream))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
