use std::sync::Arc;

use crate::services::webhook::WebhookVerifier;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<WebhookVerifier>,
}

impl AppState {
    pub fn new(verifier: Arc<WebhookVerifier>) -> Self {
        Self { verifier }
    }
}
