use actix_web::{web, HttpRequest, HttpResponse};

use fiat_ramp::ledger_store::call_store;
use fiat_ramp::security::constant_time_eq;
use fiat_ramp::{AuthFailure, RampError, WebhookOutcome, ACK_MESSAGE, SIGNATURE_HEADER};

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Read the signature header. A header that is present but not printable
/// ASCII can never match a hex digest, so it counts as a bad signature.
fn signature_header(req: &HttpRequest) -> Result<Option<&str>, RampError> {
    match req.headers().get(SIGNATURE_HEADER) {
        None => Ok(None),
        Some(v) => v
            .to_str()
            .map(Some)
            .map_err(|_| RampError::Authentication(AuthFailure::InvalidSignature)),
    }
}

/// POST /webhook - Signed transaction status notification from the provider
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(
        path = %req.path(),
        transaction_id = tracing::field::Empty,
        stage = tracing::field::Empty,
    )
)]
pub async fn webhook(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let start = std::time::Instant::now();
    let result = match signature_header(&req) {
        Ok(signature) => state.pipeline.process(&body, signature).await,
        Err(e) => Err(e),
    };
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(outcome) => {
            let label = match outcome {
                WebhookOutcome::Synced { .. } => "ok",
                WebhookOutcome::Degraded { .. } => "degraded",
            };
            metrics::WEBHOOK_REQUESTS.with_label_values(&[label]).inc();
            metrics::KYC_SYNC
                .with_label_values(&[outcome.kyc_label()])
                .inc();
            metrics::RECONCILE_LATENCY
                .with_label_values(&[label])
                .observe(elapsed);
            tracing::info!(
                transaction_id = outcome.transaction_id(),
                user_id = %outcome.user_id(),
                outcome = label,
                "webhook processed"
            );
            Ok(HttpResponse::Ok().json(serde_json::json!({ "message": ACK_MESSAGE })))
        }
        Err(e) => {
            metrics::WEBHOOK_REQUESTS.with_label_values(&[e.kind()]).inc();
            match &e {
                RampError::Authentication(reason) => {
                    metrics::SIGNATURE_FAILURES
                        .with_label_values(&[reason.as_str()])
                        .inc();
                }
                RampError::Validation(_) => {}
                _ => {
                    metrics::RECONCILE_LATENCY
                        .with_label_values(&["error"])
                        .observe(elapsed);
                }
            }
            Err(ApiError::from(e))
        }
    }
}

/// GET /health - Liveness plus a ledger store ping
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match call_store(&state.store, state.store_timeout, |store| store.ping()).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "fiat-ramp-webhook",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => {
            tracing::warn!(error = %e, "ledger store health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "degraded",
                "service": "fiat-ramp-webhook",
                "error": "ledger store unreachable",
            }))
        }
    }
}

/// GET /metrics - Prometheus metrics endpoint (token-gated)
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            if !state.public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or RAMP_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/webhook", web::post().to(webhook))
        .route("/webhook/onramper", web::post().to(webhook))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_endpoint));
}
