//! REST API wrapping the planner.
//!
//! Provides two endpoints:
//! - `POST /plan` takes a plan request and returns the plan outcome
//! - `GET /health` liveness probe

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::error::PlannerError;

pub use types::ErrorResponse;

/// Largest request history accepted by default: ten years of hours.
pub const DEFAULT_MAX_SAMPLES: usize = 10 * 366 * 24;

/// Immutable settings shared across all request handlers.
///
/// Each request is planned independently; nothing here changes after
/// startup.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Requests with more samples than this are rejected.
    pub max_samples: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/plan", post(handlers::post_plan))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process ends.
///
/// # Errors
///
/// Returns [`PlannerError::Io`] if the listener cannot bind or the server
/// fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), PlannerError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
