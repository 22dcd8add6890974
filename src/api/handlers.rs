//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, error};

use super::AppState;
use super::types::ErrorResponse;
use crate::planner::{PlanOutcome, PlanRequest, plan};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

/// Liveness probe.
///
/// `GET /health` → 200 + `ok`
pub async fn health() -> &'static str {
    "ok"
}

/// Plans an upgrade for the posted history.
///
/// `POST /plan` + `PlanRequest` JSON → 200 + `PlanOutcome` JSON
/// Malformed JSON or invalid parameters → 400 + `ErrorResponse`
pub async fn post_plan(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PlanOutcome>, ApiError> {
    let request: PlanRequest = serde_json::from_slice(&body)
        .map_err(|e| bad_request(format!("invalid request body: {e}")))?;

    if request.samples.len() > state.max_samples {
        return Err(bad_request(format!(
            "too many samples: {} (limit {})",
            request.samples.len(),
            state.max_samples
        )));
    }
    let errors = request.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(bad_request(joined));
    }

    debug!(samples = request.samples.len(), "planning request");
    let outcome = tokio::task::spawn_blocking(move || plan(&request))
        .await
        .map_err(|e| {
            error!(error = %e, "planning task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("planning failed")),
            )
        })?;
    Ok(Json(outcome))
}
