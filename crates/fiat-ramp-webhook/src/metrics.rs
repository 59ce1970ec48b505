use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::LazyLock;

pub static WEBHOOK_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "fiat_ramp_webhook_requests_total",
        "Webhook deliveries by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static SIGNATURE_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "fiat_ramp_signature_failures_total",
        "Webhook signature failures",
        &["reason"]
    )
    .unwrap()
});

pub static RECONCILE_LATENCY: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "fiat_ramp_reconcile_duration_seconds",
        "Time from signature check to response for authenticated deliveries",
        &["result"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap()
});

pub static KYC_SYNC: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "fiat_ramp_kyc_sync_total",
        "Verification state sync results",
        &["result"]
    )
    .unwrap()
});

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
