//! idrec-identify library - identity reconciliation service
//!
//! Resolves an email and/or phone number to the single logical person it
//! belongs to, merging contact clusters the input proves are the same
//! person.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod services;
pub mod utils;
pub mod validation;

use services::ClusterResolver;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: ClusterResolver,
    /// Upper bound on time spent re-running an identify call after lock contention
    pub max_lock_wait_ms: u64,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            resolver: ClusterResolver::new(db),
            max_lock_wait_ms,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    Router::new()
        .route("/identify", post(api::identify))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
