//! End-to-end processing of one webhook delivery.
//!
//! Stages run strictly in order: signature check, normalization, ledger
//! reconciliation, then identity sync. A failure at any stage before the
//! ledger write aborts with no side effects. Identity sync runs only after
//! the ledger write succeeded, and its failures never undo that write.

use std::time::Duration;

use crate::error::{AuthFailure, RampError};
use crate::event::{normalize, TransactionEvent, UserId};
use crate::hmac::verify_signature;
use crate::identity_sync::IdentitySync;
use crate::ledger_store::SharedStore;
use crate::reconcile::Reconciler;
use crate::status::{map_transaction_status, verification_state_for, TransactionStatus, VerificationState};

/// Processing stage, recorded on the current span as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    SignatureChecked,
    Parsed,
    Reconciled,
    KycSynced,
    Responded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::SignatureChecked => "signature_checked",
            Stage::Parsed => "parsed",
            Stage::Reconciled => "reconciled",
            Stage::KycSynced => "kyc_synced",
            Stage::Responded => "responded",
        }
    }

    /// Mark the current span as having reached this stage.
    pub fn enter(self) {
        tracing::Span::current().record("stage", self.as_str());
        tracing::debug!(stage = self.as_str(), "webhook stage");
    }
}

/// Result of a delivery that made it onto the ledger.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Ledger and verification state are both up to date.
    Synced {
        transaction_id: String,
        user_id: UserId,
        status: TransactionStatus,
        verification: VerificationState,
    },
    /// Ledger is up to date; verification state was not touched.
    Degraded {
        transaction_id: String,
        user_id: UserId,
        status: TransactionStatus,
        reason: RampError,
    },
}

impl WebhookOutcome {
    pub fn transaction_id(&self) -> &str {
        match self {
            WebhookOutcome::Synced { transaction_id, .. }
            | WebhookOutcome::Degraded { transaction_id, .. } => transaction_id,
        }
    }

    pub fn user_id(&self) -> &UserId {
        match self {
            WebhookOutcome::Synced { user_id, .. } | WebhookOutcome::Degraded { user_id, .. } => {
                user_id
            }
        }
    }

    /// Metric label for the KYC leg of the delivery.
    pub fn kyc_label(&self) -> &'static str {
        match self {
            WebhookOutcome::Synced { .. } => "synced",
            WebhookOutcome::Degraded { reason, .. } => reason.kind(),
        }
    }
}

/// Signature check, normalization, reconciliation and identity sync wired
/// together over one store.
#[derive(Clone)]
pub struct WebhookPipeline {
    secret: Vec<u8>,
    reconciler: Reconciler,
    identity: IdentitySync,
}

impl WebhookPipeline {
    pub fn new(secret: Vec<u8>, store: SharedStore, timeout: Duration) -> Self {
        Self {
            secret,
            reconciler: Reconciler::new(store.clone(), timeout),
            identity: IdentitySync::new(store, timeout),
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn identity_sync(&self) -> &IdentitySync {
        &self.identity
    }

    /// Authenticate a raw body against its signature header value.
    pub fn authenticate(&self, body: &[u8], signature: Option<&str>) -> Result<(), RampError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RampError::Authentication(AuthFailure::MissingSignature))?;
        if !verify_signature(&self.secret, body, signature) {
            return Err(RampError::Authentication(AuthFailure::InvalidSignature));
        }
        Ok(())
    }

    /// Process one delivery. `body` must be the exact bytes received.
    ///
    /// Returns an error only when the delivery did not make it onto the
    /// ledger; identity sync problems are reported as
    /// [`WebhookOutcome::Degraded`].
    pub async fn process(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, RampError> {
        Stage::Received.enter();

        if let Err(e) = self.authenticate(body, signature) {
            tracing::warn!(error = %e, "webhook rejected");
            return Err(e);
        }
        Stage::SignatureChecked.enter();

        let event = normalize(body).inspect_err(|e| {
            tracing::warn!(error = %e, "webhook payload rejected");
        })?;
        tracing::Span::current().record("transaction_id", event.ledger_key());
        Stage::Parsed.enter();

        let user = self.reconciler.reconcile(&event, None).await?;
        Stage::Reconciled.enter();

        let status = map_transaction_status(&event.status);
        let transaction_id = event.ledger_key().to_string();
        let outcome = match self.sync_identity(&user, &event).await {
            Ok(verification) => {
                Stage::KycSynced.enter();
                WebhookOutcome::Synced {
                    transaction_id,
                    user_id: user,
                    status,
                    verification,
                }
            }
            Err(reason) => {
                match &reason {
                    RampError::UnsupportedStatus(_) | RampError::UnresolvedIdentity(_) => {
                        tracing::warn!(
                            transaction_id = %transaction_id,
                            user_id = %user,
                            error = %reason,
                            "KYC status not updated"
                        );
                    }
                    _ => {
                        tracing::error!(
                            transaction_id = %transaction_id,
                            user_id = %user,
                            error = %reason,
                            "KYC sync failed"
                        );
                    }
                }
                WebhookOutcome::Degraded {
                    transaction_id,
                    user_id: user,
                    status,
                    reason,
                }
            }
        };
        Stage::Responded.enter();
        Ok(outcome)
    }

    async fn sync_identity(
        &self,
        user: &UserId,
        event: &TransactionEvent,
    ) -> Result<VerificationState, RampError> {
        let state = verification_state_for(&event.status)?;
        self.identity.sync(Some(user), event, state).await
    }
}
