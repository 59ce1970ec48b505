use std::env;
use std::time::Duration;

use fiat_ramp::{DEFAULT_STORE_TIMEOUT, MIN_SECRET_LEN};

const DEFAULT_PORT: u16 = 9999;
const DEFAULT_DB_PATH: &str = "./fiat-ramp.db";
const DEFAULT_RATE_LIMIT_RPM: u64 = 600;

#[derive(Clone)]
pub struct WebhookConfig {
    /// Shared secret the provider signs webhook bodies with
    pub webhook_secret: Vec<u8>,
    /// SQLite ledger path
    pub db_path: String,
    /// Server port
    pub port: u16,
    /// Upper bound for a single ledger store call
    pub store_timeout: Duration,
    /// Rate limit requests per minute, per client IP
    pub rate_limit_rpm: u64,
    /// CORS allowed origins (empty = localhost only)
    pub allowed_origins: Vec<String>,
    /// Bearer token required for /metrics
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token when none is configured
    pub public_metrics: bool,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("webhook_secret", &"[REDACTED]")
            .field("db_path", &self.db_path)
            .field("port", &self.port)
            .field("store_timeout", &self.store_timeout)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("allowed_origins", &self.allowed_origins)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl WebhookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        // Required: webhook secret
        let webhook_secret = var("ONRAMPER_WEBHOOK_SECRET")
            .map(|s| s.into_bytes())
            .ok_or(ConfigError::MissingRequired("ONRAMPER_WEBHOOK_SECRET"))?;
        if webhook_secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                "ONRAMPER_WEBHOOK_SECRET is only {} bytes (minimum {MIN_SECRET_LEN} recommended)",
                webhook_secret.len()
            );
        }

        let db_path = var("LEDGER_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let port = match var("API_PORT").or_else(|| var("PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("API_PORT", raw))?,
            None => DEFAULT_PORT,
        };

        let store_timeout = match var("STORE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidValue("STORE_TIMEOUT_MS", raw)),
            },
            None => DEFAULT_STORE_TIMEOUT,
        };

        let rate_limit_rpm = match var("RATE_LIMIT_RPM") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(rpm) if rpm > 0 => rpm,
                _ => return Err(ConfigError::InvalidValue("RATE_LIMIT_RPM", raw)),
            },
            None => DEFAULT_RATE_LIMIT_RPM,
        };

        let allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = var("METRICS_TOKEN");
        let public_metrics = var("RAMP_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if metrics_token.is_none() && !public_metrics {
            tracing::info!("METRICS_TOKEN not set, /metrics is disabled");
        }

        Ok(Self {
            webhook_secret,
            db_path,
            port,
            store_timeout,
            rate_limit_rpm,
            allowed_origins,
            metrics_token,
            public_metrics,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}
