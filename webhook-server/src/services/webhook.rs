/*
 * Responsibility
 * - Verify `Tl-Signature` on incoming webhooks
 * - Only accept signatures whose `jku` is allow-listed
 */
use axum::http::request::Parts;
use request_signing::Headers;

const TL_SIGNATURE: &str = "tl-signature";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing Tl-Signature header")]
    MissingSignature,
    #[error("Tl-Signature is not valid ascii")]
    InvalidSignatureEncoding,
    #[error("missing jku in signature header")]
    MissingJku,
    #[error("jku not permitted: {0}")]
    UnpermittedJku(String),
    #[error(transparent)]
    Signature(#[from] request_signing::Error),
}

pub struct WebhookVerifier {
    jwks: Vec<u8>,
    allowed_jkus: Vec<String>,
}

impl WebhookVerifier {
    pub fn new(jwks: Vec<u8>, allowed_jkus: Vec<String>) -> Self {
        Self { jwks, allowed_jkus }
    }

    /// Verify a received webhook. Every received header is offered to the
    /// verifier, only those named in the signature's `tl_headers` are used.
    pub fn verify(&self, parts: &Parts, body: &[u8]) -> Result<(), WebhookError> {
        let tl_signature = parts
            .headers
            .get(TL_SIGNATURE)
            .ok_or(WebhookError::MissingSignature)?
            .to_str()
            .map_err(|_| WebhookError::InvalidSignatureEncoding)?;

        let jws_header = request_signing::extract_jws_header(tl_signature)?;
        let jku = jws_header.jku.as_deref().ok_or(WebhookError::MissingJku)?;
        if !self.allowed_jkus.iter().any(|allowed| allowed == jku) {
            return Err(WebhookError::UnpermittedJku(jku.to_string()));
        }

        // The JWKS is loaded once at startup rather than fetched from `jku`.
        request_signing::Verifier {
            method: parts.method.as_str(),
            path: parts.uri.path(),
            headers: parts
                .headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes()))
                .collect::<Headers<'_>>(),
            body,
            ..request_signing::verify_with_jwks(&self.jwks)
        }
        .verify(tl_signature)?;

        tracing::debug!(kid = %jws_header.kid, "webhook signature verified");
        Ok(())
    }
}
