use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware, web, App, HttpServer};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fiat_ramp::{SharedStore, SqliteLedgerStore, SIGNATURE_HEADER};
use fiat_ramp_webhook::config::WebhookConfig;
use fiat_ramp_webhook::cors::build_cors;
use fiat_ramp_webhook::routes;
use fiat_ramp_webhook::state::AppState;

/// Webhook bodies are small JSON objects.
const MAX_BODY_BYTES: usize = 65_536;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match WebhookConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "configuration loaded");

    // The ledger must survive restarts; there is no in-memory fallback.
    let store: SharedStore = match SqliteLedgerStore::open(&config.db_path) {
        Ok(store) => {
            tracing::info!("Ledger store: SQLite at {}", config.db_path);
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Failed to open SQLite ledger at {}: {e}", config.db_path);
            std::process::exit(1);
        }
    };

    let state = web::Data::new(AppState::new(&config, store));

    let port = config.port;
    let cors_origins = config.allowed_origins.clone();

    tracing::info!("Fiat ramp webhook listening on port {port}");
    tracing::info!("Rate limit: {} req/min per IP", config.rate_limit_rpm);
    tracing::info!("Signature header: {SIGNATURE_HEADER}");
    tracing::info!("  POST http://localhost:{port}/webhook");
    tracing::info!("  POST http://localhost:{port}/webhook/onramper");
    tracing::info!("  GET  http://localhost:{port}/health");

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(config.rate_limit_rpm)
        .finish()
        .ok_or_else(|| std::io::Error::other("failed to build rate limiter config"))?;

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
