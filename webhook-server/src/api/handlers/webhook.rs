use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, request::Parts};

use crate::error::AppError;
use crate::state::AppState;

pub async fn receive_webhook(
    State(state): State<AppState>,
    parts: Parts,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    if let Err(err) = state.verifier.verify(&parts, &body) {
        tracing::warn!(error = %err, path = %parts.uri.path(), "webhook rejected");
        return Err(err.into());
    }

    tracing::info!(bytes = body.len(), "webhook accepted");
    Ok(StatusCode::ACCEPTED)
}
