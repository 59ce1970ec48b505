use std::time::Duration;

use fiat_ramp::{SharedStore, WebhookPipeline};

use crate::config::WebhookConfig;

/// Shared application state for the webhook server.
pub struct AppState {
    pub pipeline: WebhookPipeline,
    /// Same store the pipeline writes to, for health checks.
    pub store: SharedStore,
    pub store_timeout: Duration,
    /// Bearer token for /metrics (not the webhook secret).
    pub metrics_token: Option<Vec<u8>>,
    pub public_metrics: bool,
}

impl AppState {
    pub fn new(config: &WebhookConfig, store: SharedStore) -> Self {
        Self {
            pipeline: WebhookPipeline::new(
                config.webhook_secret.clone(),
                store.clone(),
                config.store_timeout,
            ),
            store,
            store_timeout: config.store_timeout,
            metrics_token: config.metrics_token.as_ref().map(|t| t.as_bytes().to_vec()),
            public_metrics: config.public_metrics,
        }
    }
}
