/*
 * Responsibility
 * - Load settings from the environment (.env supported)
 * - Fail startup on missing/invalid values
 */
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, fmt};

use crate::error::AppError;

/// JWKS URLs a webhook `jku` may point at unless overridden.
const DEFAULT_ALLOWED_JKUS: [&str; 2] = [
    "https://webhooks.truelayer.com/.well-known/jwks",
    "https://webhooks.truelayer-sandbox.com/.well-known/jwks",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    // JWKS document used to verify webhook signatures, read at startup
    pub jwks_path: PathBuf,
    // A webhook's jku must be one of these
    pub allowed_jkus: Vec<String>,
    // Route receiving webhooks
    pub webhook_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = env::var("WEBHOOK_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("WEBHOOK_PORT"))?;

        let app_env = AppEnv::from_env();

        let jwks_path = env::var("WEBHOOK_JWKS_PATH")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::Missing("WEBHOOK_JWKS_PATH"))?;

        let allowed_jkus = parse_list(env::var("WEBHOOK_ALLOWED_JKUS").ok().as_deref());
        let allowed_jkus = if allowed_jkus.is_empty() {
            DEFAULT_ALLOWED_JKUS.iter().map(|s| s.to_string()).collect()
        } else {
            allowed_jkus
        };

        let webhook_path = env::var("WEBHOOK_PATH").unwrap_or_else(|_| "/hook".to_string());
        if !webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid("WEBHOOK_PATH"));
        }

        Ok(Config {
            addr,
            app_env,
            jwks_path,
            allowed_jkus,
            webhook_path,
        })
    }
}

fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        tracing::error!(error = %e, "configuration error");
        AppError::Internal
    }
}
