use actix_web::{test, web, App};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fiat_ramp::hmac::compute_signature;
use fiat_ramp::{
    normalize, InMemoryLedgerStore, LedgerRecord, LedgerStore, SharedStore, StoreError,
    TransactionEvent, TransactionStatus, UserId, VerificationRecord, VerificationState,
    SIGNATURE_HEADER,
};
use fiat_ramp_webhook::config::WebhookConfig;
use fiat_ramp_webhook::routes;
use fiat_ramp_webhook::state::AppState;

const SECRET: &str = "test-webhook-secret-0123456789abcdef";

fn config(metrics_token: Option<&str>, public_metrics: bool) -> WebhookConfig {
    WebhookConfig {
        webhook_secret: SECRET.as_bytes().to_vec(),
        db_path: String::new(),
        port: 0,
        store_timeout: Duration::from_secs(2),
        rate_limit_rpm: 600,
        allowed_origins: vec![],
        metrics_token: metrics_token.map(str::to_string),
        public_metrics,
    }
}

/// Build an AppState over the given store.
fn make_state(store: SharedStore) -> web::Data<AppState> {
    web::Data::new(AppState::new(&config(None, false), store))
}

fn sign(body: &str) -> String {
    compute_signature(SECRET.as_bytes(), body.as_bytes())
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

/// Record a transaction the way the interactive initiation flow does.
async fn initiate(state: &web::Data<AppState>, body: &str, user: &UserId) {
    let event = normalize(body.as_bytes()).unwrap();
    state
        .pipeline
        .reconciler()
        .record_initiated(&event, user)
        .await
        .unwrap();
}

fn post(uri: &str, body: &str, signature: Option<String>) -> test::TestRequest {
    let req = test::TestRequest::post()
        .uri(uri)
        .set_payload(body.to_string())
        .insert_header(("Content-Type", "application/json"));
    match signature {
        Some(sig) => req.insert_header((SIGNATURE_HEADER, sig)),
        None => req,
    }
}

#[actix_rt::test]
async fn test_completed_webhook_updates_ledger_and_kyc() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = make_state(store.clone());
    initiate(
        &state,
        r#"{"transactionId":"TX42","status":"new","walletAddress":"0xabc"}"#,
        &alice(),
    )
    .await;
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let body = r#"{"transactionId":"TX42","onrampTransactionId":"mp-42","status":"completed",
                   "inAmount":100,"sourceCurrency":"eur","targetCurrency":"usdc",
                   "walletAddress":"0xabc","transactionType":"buy"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["message"], "Webhook received");

    let record = store.transaction("TX42").unwrap().unwrap();
    assert_eq!(record.status, TransactionStatus::Completed);
    assert_eq!(record.onramp_transaction_id, "mp-42");
    assert_eq!(record.user_id, Some(alice()));
    assert_eq!(
        store.verification(&alice()).unwrap().unwrap().state,
        VerificationState::Approved
    );
}

#[actix_rt::test]
async fn test_legacy_path_is_served() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = make_state(store.clone());
    initiate(&state, r#"{"transactionId":"TX1","status":"new"}"#, &alice()).await;
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let body = r#"{"transactionId":"TX1","status":"pending"}"#;
    let req = post("/webhook/onramper", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        store.transaction("TX1").unwrap().unwrap().status,
        TransactionStatus::Pending
    );
}

#[actix_rt::test]
async fn test_bad_signature_rejected_without_mutation() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let app = test::init_service(
        App::new()
            .app_data(make_state(store.clone()))
            .configure(routes::configure),
    )
    .await;

    let body = r#"{"transactionId":"TX1","status":"completed"}"#;
    let forged = compute_signature(b"wrong-secret", body.as_bytes());
    let req = post("/webhook", body, Some(forged)).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["error"], "authentication failed");
    assert!(store.is_empty());
}

#[actix_rt::test]
async fn test_missing_signature_rejected() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let app = test::init_service(
        App::new()
            .app_data(make_state(store.clone()))
            .configure(routes::configure),
    )
    .await;

    let body = r#"{"transactionId":"TX1","status":"completed"}"#;
    let req = post("/webhook", body, None).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["error"], "authentication required");
    assert!(store.is_empty());
}

#[actix_rt::test]
async fn test_invalid_payloads_rejected() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let app = test::init_service(
        App::new()
            .app_data(make_state(store.clone()))
            .configure(routes::configure),
    )
    .await;

    for body in [
        "not json at all",
        r#"{"transactionId":"","onrampTransactionId":"","status":"completed"}"#,
        r#"{"transactionId":"TX1"}"#,
        r#"{"transactionId":"TX1","status":"pending","statusDate":"last tuesday"}"#,
    ] {
        let req = post("/webhook", body, Some(sign(body))).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{body}");
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["error"], "invalid_payload");
    }
    assert!(store.is_empty());
}

#[actix_rt::test]
async fn test_unsupported_status_still_acknowledged() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = make_state(store.clone());
    initiate(&state, r#"{"transactionId":"TX5","status":"new"}"#, &alice()).await;
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let body = r#"{"transactionId":"TX5","status":"paid"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        store.transaction("TX5").unwrap().unwrap().status,
        TransactionStatus::Paid
    );
    assert!(store.verification(&alice()).unwrap().is_none());
}

#[actix_rt::test]
async fn test_approved_not_downgraded_end_to_end() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = make_state(store.clone());
    initiate(&state, r#"{"transactionId":"TX1","status":"new"}"#, &alice()).await;
    initiate(&state, r#"{"transactionId":"TX2","status":"new"}"#, &alice()).await;
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    for body in [
        r#"{"transactionId":"TX1","status":"completed"}"#,
        r#"{"transactionId":"TX2","status":"failed"}"#,
        r#"{"transactionId":"TX2","status":"pending"}"#,
    ] {
        let req = post("/webhook", body, Some(sign(body))).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    assert_eq!(
        store.verification(&alice()).unwrap().unwrap().state,
        VerificationState::Approved
    );
}

#[actix_rt::test]
async fn test_unknown_transaction_is_a_server_error() {
    // No initiation and no partner context: nothing says who owns it.
    let store = Arc::new(InMemoryLedgerStore::new());
    let app = test::init_service(
        App::new()
            .app_data(make_state(store.clone()))
            .configure(routes::configure),
    )
    .await;

    let body = r#"{"transactionId":"TX-ORPHAN","status":"completed"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    // A later delivery carrying the user's partner context adopts the record.
    let body = r#"{"transactionId":"TX-ORPHAN","status":"completed",
                   "partnerContext":"3f2b1c9e-8d4a-4b6f-9e1d-2a7c5b8e0f11"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let owner = store.transaction("TX-ORPHAN").unwrap().unwrap().user_id;
    assert_eq!(
        owner.as_ref().map(UserId::as_str),
        Some("3f2b1c9e-8d4a-4b6f-9e1d-2a7c5b8e0f11")
    );
}

#[actix_rt::test]
async fn test_unseen_transaction_adopted_through_wallet() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = make_state(store.clone());
    initiate(
        &state,
        r#"{"transactionId":"TX1","walletAddress":"0xabc","status":"new"}"#,
        &alice(),
    )
    .await;
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let body = r#"{"transactionId":"TX42","walletAddress":"0xabc","status":"completed"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        store.transaction("TX42").unwrap().unwrap().user_id,
        Some(alice())
    );
    assert_eq!(
        store.verification(&alice()).unwrap().unwrap().state,
        VerificationState::Approved
    );
}

#[actix_rt::test]
async fn test_processor_id_delivery_then_internal_id_share_a_record() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = make_state(store.clone());
    initiate(
        &state,
        r#"{"onrampTransactionId":"mp-9","status":"pending"}"#,
        &alice(),
    )
    .await;
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let body = r#"{"transactionId":"TX9","onrampTransactionId":"mp-9","status":"completed"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(store.len(), 1);
    let record = store.transaction("TX9").unwrap().unwrap();
    assert_eq!(record.status, TransactionStatus::Completed);
    assert_eq!(record.user_id, Some(alice()));
}

/// Stores transactions for alice but cannot write verification state.
struct KycOutage;

impl LedgerStore for KycOutage {
    fn upsert_transaction(
        &self,
        _event: &TransactionEvent,
        _owner: Option<&UserId>,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(UserId::new("alice"))
    }

    fn resolve_user_id(&self, _: &str, _: &str, _: &str) -> Result<Option<UserId>, StoreError> {
        Ok(UserId::new("alice"))
    }

    fn upsert_verification_state(
        &self,
        _user: &UserId,
        _state: VerificationState,
    ) -> Result<VerificationState, StoreError> {
        Err(StoreError::Unavailable("kyc table locked".into()))
    }

    fn transaction(&self, _key: &str) -> Result<Option<LedgerRecord>, StoreError> {
        Ok(None)
    }

    fn verification(&self, _user: &UserId) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(None)
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[actix_rt::test]
async fn test_kyc_store_failure_still_acknowledged() {
    let app = test::init_service(
        App::new()
            .app_data(make_state(Arc::new(KycOutage)))
            .configure(routes::configure),
    )
    .await;

    let body = r#"{"transactionId":"TX42","status":"completed"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["message"], "Webhook received");
}

/// A ledger whose transaction writes always fail.
#[derive(Default)]
struct FailingLedger {
    verification_calls: AtomicUsize,
}

impl LedgerStore for FailingLedger {
    fn upsert_transaction(
        &self,
        _event: &TransactionEvent,
        _owner: Option<&UserId>,
    ) -> Result<Option<UserId>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn resolve_user_id(&self, _: &str, _: &str, _: &str) -> Result<Option<UserId>, StoreError> {
        Ok(UserId::new("alice"))
    }

    fn upsert_verification_state(
        &self,
        _user: &UserId,
        state: VerificationState,
    ) -> Result<VerificationState, StoreError> {
        self.verification_calls.fetch_add(1, Ordering::SeqCst);
        Ok(state)
    }

    fn transaction(&self, _key: &str) -> Result<Option<LedgerRecord>, StoreError> {
        Ok(None)
    }

    fn verification(&self, _user: &UserId) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(None)
    }

    fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[actix_rt::test]
async fn test_ledger_failure_returns_500_and_skips_kyc() {
    let store = Arc::new(FailingLedger::default());
    let app = test::init_service(
        App::new()
            .app_data(make_state(store.clone()))
            .configure(routes::configure),
    )
    .await;

    let body = r#"{"transactionId":"TX42","status":"completed"}"#;
    let req = post("/webhook", body, Some(sign(body))).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 500);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["error"], "internal_error");
    assert_eq!(store.verification_calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn test_health_reports_store_state() {
    let app = test::init_service(
        App::new()
            .app_data(make_state(Arc::new(InMemoryLedgerStore::new())))
            .configure(routes::configure),
    )
    .await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "fiat-ramp-webhook");

    let app = test::init_service(
        App::new()
            .app_data(make_state(Arc::new(FailingLedger::default())))
            .configure(routes::configure),
    )
    .await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "degraded");
}

#[actix_rt::test]
async fn test_metrics_forbidden_without_token() {
    let app = test::init_service(
        App::new()
            .app_data(make_state(Arc::new(InMemoryLedgerStore::new())))
            .configure(routes::configure),
    )
    .await;
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_rt::test]
async fn test_metrics_requires_bearer_token() {
    let store: SharedStore = Arc::new(InMemoryLedgerStore::new());
    let state = web::Data::new(AppState::new(&config(Some("metrics-secret"), false), store));
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    // Touch the webhook counters so they show up in the output.
    let body = r#"{"transactionId":"TX1","status":"pending"}"#;
    let req = post("/webhook", body, None).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer metrics-secret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("fiat_ramp_webhook_requests_total"));
    assert!(text.contains("fiat_ramp_signature_failures_total"));
}

#[actix_rt::test]
async fn test_public_metrics_opt_in() {
    let store: SharedStore = Arc::new(InMemoryLedgerStore::new());
    let state = web::Data::new(AppState::new(&config(None, true), store));
    let app =
        test::init_service(App::new().app_data(state).configure(routes::configure)).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}
