use std::time::Duration;

use crate::error::RampError;
use crate::event::{TransactionEvent, UserId};
use crate::ledger_store::{call_store, SharedStore};

/// Writes transaction events to the ledger and reports who owns them.
#[derive(Clone)]
pub struct Reconciler {
    store: SharedStore,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Upsert `event` and return the owning user as stored.
    ///
    /// `caller` is the identity known to the triggering flow, if any. For a
    /// new record it becomes the owner; for an existing one the stored owner
    /// wins and a disagreement is logged. Without a caller identity the
    /// ownership hint is a UUID partner context, or else the owner of any
    /// record sharing the event's transaction id, processor id or wallet.
    ///
    /// Fails with [`RampError::Storage`] when the store errors or times out,
    /// and with [`RampError::Integrity`] when the write succeeds but no owner
    /// is on record.
    pub async fn reconcile(
        &self,
        event: &TransactionEvent,
        caller: Option<&UserId>,
    ) -> Result<UserId, RampError> {
        let key = event.ledger_key().to_string();
        let hint = caller.cloned().or_else(|| event.partner_user());

        let owned = event.clone();
        let stored = call_store(&self.store, self.timeout, move |store| {
            let hint = match hint {
                Some(user) => Some(user),
                None => store.resolve_user_id(
                    &owned.transaction_id,
                    &owned.onramp_transaction_id,
                    &owned.wallet_address,
                )?,
            };
            store.upsert_transaction(&owned, hint.as_ref())
        })
        .await
        .map_err(|e| {
            tracing::error!(transaction_id = %key, error = %e, "ledger upsert failed");
            RampError::Storage(e)
        })?;

        let owner = stored.ok_or_else(|| {
            tracing::error!(
                transaction_id = %key,
                "ledger accepted the write but holds no owner for it"
            );
            RampError::Integrity(format!("no owner recorded for transaction {key}"))
        })?;

        if let Some(caller) = caller {
            if *caller != owner {
                tracing::warn!(
                    transaction_id = %key,
                    caller = %caller,
                    owner = %owner,
                    "user id mismatch after upsert, keeping stored owner"
                );
            }
        }

        tracing::info!(
            transaction_id = %key,
            user_id = %owner,
            status = %event.status,
            "transaction reconciled"
        );
        Ok(owner)
    }

    /// Record a transaction created by the interactive initiation flow,
    /// where the user is known up front.
    pub async fn record_initiated(
        &self,
        event: &TransactionEvent,
        user: &UserId,
    ) -> Result<UserId, RampError> {
        self.reconcile(event, Some(user)).await
    }
}
