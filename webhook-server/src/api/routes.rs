use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{health::health, webhook::receive_webhook};
use crate::state::AppState;

pub fn routes(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(receive_webhook))
        .with_state(state)
}
