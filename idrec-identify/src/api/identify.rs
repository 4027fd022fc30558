//! POST /identify
//!
//! Validates the payload, resolves it against the contact store inside one
//! unit of work (re-run on lock contention), and returns the cluster view.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::IdentifyResponse;
use crate::utils::retry_on_lock;
use crate::validation::IdentifyRequest;
use crate::AppState;

/// POST /identify
pub async fn identify(
    State(state): State<AppState>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> ApiResult<Json<IdentifyResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Unreadable /identify payload");
        ApiError::from(rejection)
    })?;

    let input = request.validate().map_err(|err| {
        warn!(error = %err, "Validation failed for /identify");
        ApiError::from(err)
    })?;
    info!(
        email = input.email.as_deref(),
        phone_number = input.phone_number.as_deref(),
        "POST /identify payload validated"
    );

    let resolver = &state.resolver;
    let input = &input;
    let view = retry_on_lock("identify", state.max_lock_wait_ms, move || {
        resolver.resolve(input)
    })
    .await
    .map_err(|err| {
        error!(error = %err, "POST /identify failed");
        ApiError::from(err)
    })?;

    Ok(Json(IdentifyResponse { contact: view }))
}
