//! Propagates verification (KYC) state derived from payment outcomes.
//!
//! Writes go through the store's ratchet: once a user is `APPROVED`, a
//! later `PENDING` or `REJECTED` is suppressed, and the call reports the
//! state that was kept.

use std::time::Duration;

use crate::error::RampError;
use crate::event::{TransactionEvent, UserId};
use crate::ledger_store::{call_store, SharedStore};
use crate::status::VerificationState;

#[derive(Clone)]
pub struct IdentitySync {
    store: SharedStore,
    timeout: Duration,
}

impl IdentitySync {
    pub fn new(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Write `state` for `user`, resolving the user from the event's
    /// identifiers when it is not known. Returns the state stored afterwards.
    pub async fn sync(
        &self,
        user: Option<&UserId>,
        event: &TransactionEvent,
        state: VerificationState,
    ) -> Result<VerificationState, RampError> {
        let user = match user {
            Some(u) => u.clone(),
            None => self.resolve(event).await?,
        };

        let target = user.clone();
        let stored = call_store(&self.store, self.timeout, move |store| {
            store.upsert_verification_state(&target, state)
        })
        .await?;

        if stored == state {
            tracing::info!(
                user_id = %user,
                original_status = %event.status,
                kyc_status = %stored,
                "verification state updated"
            );
        } else {
            tracing::info!(
                user_id = %user,
                requested = %state,
                retained = %stored,
                "verification update suppressed by ratchet"
            );
        }
        Ok(stored)
    }

    /// Look up the owner of `event` by transaction id, processor id, or
    /// wallet address, first match wins.
    pub async fn resolve(&self, event: &TransactionEvent) -> Result<UserId, RampError> {
        let key = event.ledger_key().to_string();
        if event.transaction_id.is_empty()
            && event.onramp_transaction_id.is_empty()
            && event.wallet_address.is_empty()
        {
            return Err(RampError::UnresolvedIdentity(key));
        }

        let transaction_id = event.transaction_id.clone();
        let onramp_transaction_id = event.onramp_transaction_id.clone();
        let wallet_address = event.wallet_address.clone();
        let found = call_store(&self.store, self.timeout, move |store| {
            store.resolve_user_id(&transaction_id, &onramp_transaction_id, &wallet_address)
        })
        .await?;

        found.ok_or_else(|| {
            tracing::warn!(
                transaction_id = %event.transaction_id,
                onramp_transaction_id = %event.onramp_transaction_id,
                wallet_address = %event.wallet_address,
                "user resolution failed"
            );
            RampError::UnresolvedIdentity(key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::normalize;
    use crate::ledger_store::{InMemoryLedgerStore, LedgerStore};
    use std::sync::Arc;

    fn event(json: &str) -> TransactionEvent {
        normalize(json.as_bytes()).unwrap()
    }

    fn setup() -> (Arc<InMemoryLedgerStore>, IdentitySync) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let shared: SharedStore = store.clone();
        (store, IdentitySync::new(shared, Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn test_sync_known_user() {
        let (store, sync) = setup();
        let alice = UserId::new("alice").unwrap();
        let e = event(r#"{"transactionId":"TX1","status":"pending"}"#);

        let stored = sync.sync(Some(&alice), &e, VerificationState::Pending).await.unwrap();
        assert_eq!(stored, VerificationState::Pending);
        assert_eq!(
            store.verification(&alice).unwrap().unwrap().state,
            VerificationState::Pending
        );
    }

    #[tokio::test]
    async fn test_ratchet_holds_approved() {
        let (_store, sync) = setup();
        let alice = UserId::new("alice").unwrap();
        let done = event(r#"{"transactionId":"TX1","status":"completed"}"#);
        let failed = event(r#"{"transactionId":"TX2","status":"failed"}"#);

        sync.sync(Some(&alice), &done, VerificationState::Approved).await.unwrap();
        let stored = sync
            .sync(Some(&alice), &failed, VerificationState::Rejected)
            .await
            .unwrap();
        assert_eq!(stored, VerificationState::Approved);
    }

    #[tokio::test]
    async fn test_resolves_user_by_wallet() {
        let (store, sync) = setup();
        let alice = UserId::new("alice").unwrap();
        let initiated = event(r#"{"transactionId":"TX1","walletAddress":"0xabc","status":"new"}"#);
        store.upsert_transaction(&initiated, Some(&alice)).unwrap();

        let other = event(r#"{"transactionId":"TX9","walletAddress":"0xabc","status":"completed"}"#);
        let stored = sync.sync(None, &other, VerificationState::Approved).await.unwrap();
        assert_eq!(stored, VerificationState::Approved);
        assert_eq!(
            store.verification(&alice).unwrap().unwrap().state,
            VerificationState::Approved
        );
    }

    #[tokio::test]
    async fn test_unresolved_identity() {
        let (_store, sync) = setup();
        let e = event(r#"{"transactionId":"TX404","status":"completed"}"#);
        let err = sync.sync(None, &e, VerificationState::Approved).await.unwrap_err();
        assert!(matches!(err, RampError::UnresolvedIdentity(k) if k == "TX404"));
    }
}
