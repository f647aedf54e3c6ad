use axum::Router;
use std::{fs, panic, process, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::webhook::WebhookVerifier;
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG wins, e.g. RUST_LOG=info,request_signing=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting webhook server in {:?} mode on {}, receiving on {}",
        config.app_env,
        config.addr,
        config.webhook_path
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, addr = %config.addr, "bind failed");
            AppError::Internal
        })?;
    axum::serve(listener, app)
        .await
        .map_err(|_| AppError::Internal)?;

    Ok(())
}

fn build_state(config: &Config) -> Result<AppState, AppError> {
    let jwks = fs::read(&config.jwks_path).map_err(|err| {
        tracing::error!(error = %err, path = %config.jwks_path.display(), "failed to read jwks");
        AppError::Internal
    })?;
    check_jwks(&jwks)?;

    let verifier = WebhookVerifier::new(jwks, config.allowed_jkus.clone());
    Ok(AppState::new(Arc::new(verifier)))
}

/// Fail at startup rather than on the first webhook when the JWKS is unusable.
fn check_jwks(jwks: &[u8]) -> Result<(), AppError> {
    let doc: serde_json::Value = serde_json::from_slice(jwks).map_err(|err| {
        tracing::error!(error = %err, "jwks is not valid json");
        AppError::Internal
    })?;
    if !doc.get("keys").is_some_and(serde_json::Value::is_array) {
        tracing::error!("jwks has no `keys` array");
        return Err(AppError::Internal);
    }
    Ok(())
}

fn build_router(state: AppState, config: &Config) -> Router {
    middleware::http::apply(api::routes::routes(state, &config.webhook_path))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppEnv;

    const JWKS: &[u8] = include_bytes!("../../test-resources/jwks.json");
    const WEBHOOK_SIGNATURE: &str = include_str!("../../test-resources/webhook-signature.txt");
    const BODY: &str = r#"{"event_type":"example","event_id":"18b2842b-a57b-4887-a0a6-d3c7c36f1020"}"#;

    fn test_config() -> Config {
        Config {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            app_env: AppEnv::Development,
            jwks_path: "unused".into(),
            allowed_jkus: vec!["https://webhooks.truelayer.com/.well-known/jwks".to_string()],
            webhook_path: "/tl-webhook".to_string(),
        }
    }

    fn test_router() -> Router {
        let config = test_config();
        let verifier = WebhookVerifier::new(JWKS.to_vec(), config.allowed_jkus.clone());
        build_router(AppState::new(Arc::new(verifier)), &config)
    }

    fn webhook_request(tl_signature: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::post("/tl-webhook")
            .header("X-Tl-Webhook-Timestamp", "2021-11-29T11:42:55Z")
            .header("Content-Type", "application/json");
        if let Some(sig) = tl_signature {
            builder = builder.header("Tl-Signature", sig);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let res = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn signed_webhook_is_accepted() {
        let res = test_router()
            .oneshot(webhook_request(Some(WEBHOOK_SIGNATURE.trim()), BODY))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn unsigned_webhook_is_unauthorized() {
        let res = test_router()
            .oneshot(webhook_request(None, BODY))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn tampered_webhook_is_unauthorized() {
        let res = test_router()
            .oneshot(webhook_request(
                Some(WEBHOOK_SIGNATURE.trim()),
                r#"{"event_type":"example","event_id":"00000000-0000-0000-0000-000000000000"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn jwks_without_keys_is_rejected() {
        check_jwks(JWKS).unwrap();
        check_jwks(br#"{"not_keys":[]}"#).unwrap_err();
        check_jwks(b"not json").unwrap_err();
    }
}
