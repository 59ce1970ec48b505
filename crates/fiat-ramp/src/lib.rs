//! Webhook ingestion and status reconciliation for fiat on/off-ramp
//! transactions.
//!
//! A payment processor reports transaction state changes by webhook. This
//! crate authenticates those deliveries, normalizes them into
//! [`TransactionEvent`]s, upserts them onto an idempotent ledger, and derives
//! the owning user's identity-verification (KYC) state from the outcome.
//!
//! # Flow
//!
//! - **Signature** ([`hmac`]): HMAC-SHA256 over the exact raw body
//! - **Normalize** ([`event`]): lenient JSON in, validated event out
//! - **Reconcile** ([`Reconciler`]): atomic upsert keyed by transaction id
//! - **Identity sync** ([`IdentitySync`]): ratcheted KYC state per user
//!
//! [`WebhookPipeline`] runs the four in order.
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fiat_ramp::{InMemoryLedgerStore, WebhookPipeline, DEFAULT_STORE_TIMEOUT};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(InMemoryLedgerStore::new());
//! let pipeline = WebhookPipeline::new(b"whsec".to_vec(), store, DEFAULT_STORE_TIMEOUT);
//!
//! let body = br#"{"transactionId":"TX42","status":"completed"}"#;
//! let outcome = pipeline.process(body, Some("deadbeef")).await;
//! # let _ = outcome;
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod event;
pub mod hmac;
pub mod security;
pub mod status;

// Persistence and orchestration
pub mod identity_sync;
pub mod ledger_store;
pub mod pipeline;
pub mod reconcile;

// Re-exports
pub use constants::*;
pub use error::{AuthFailure, RampError, StoreError};
pub use event::{normalize, TransactionDirection, TransactionEvent, UserId, WebhookPayload};
pub use identity_sync::IdentitySync;
pub use ledger_store::{
    InMemoryLedgerStore, LedgerRecord, LedgerStore, SharedStore, SqliteLedgerStore,
    VerificationRecord,
};
pub use pipeline::{Stage, WebhookOutcome, WebhookPipeline};
pub use reconcile::Reconciler;
pub use status::{map_transaction_status, verification_state_for, TransactionStatus, VerificationState};
