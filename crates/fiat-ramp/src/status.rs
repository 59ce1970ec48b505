//! Canonical transaction and verification states.
//!
//! Provider status strings are free text. [`map_transaction_status`] folds
//! them into [`TransactionStatus`] and never fails; [`verification_state_for`]
//! is the separate, partial mapping that decides whether a status says
//! anything about the user's identity verification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RampError;

/// Canonical transaction state stored on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Paid,
    Failed,
    /// Fallback for anything unrecognised.
    New,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Failed => "failed",
            TransactionStatus::New => "new",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    /// Strict parse of a stored canonical value. Use
    /// [`map_transaction_status`] for provider input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "paid" => Ok(TransactionStatus::Paid),
            "failed" => Ok(TransactionStatus::Failed),
            "new" => Ok(TransactionStatus::New),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// Canonical identity-verification (KYC) state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationState {
    Pending,
    Approved,
    Rejected,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Pending => "PENDING",
            VerificationState::Approved => "APPROVED",
            VerificationState::Rejected => "REJECTED",
        }
    }

    /// Ratchet rule: whether `next` may replace `self` in the store.
    /// Nothing but `APPROVED` replaces `APPROVED`.
    pub fn may_transition_to(&self, next: VerificationState) -> bool {
        *self != VerificationState::Approved || next == VerificationState::Approved
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VerificationState::Pending),
            "APPROVED" => Ok(VerificationState::Approved),
            "REJECTED" => Ok(VerificationState::Rejected),
            other => Err(format!("unknown verification state: {other}")),
        }
    }
}

/// Map a provider status to a canonical transaction state.
///
/// Matching is case-insensitive and substring-based, so jargon such as
/// `IN_PROGRESS` or `payment_failed` lands in the right bucket. Order
/// matters: pending-like values are checked before completed-like ones.
pub fn map_transaction_status(input: &str) -> TransactionStatus {
    let input = input.trim().to_lowercase();
    let has = |needle: &str| input.contains(needle);

    if has("pending") || has("in_progress") || has("processing") {
        TransactionStatus::Pending
    } else if has("completed") || has("confirmed") {
        TransactionStatus::Completed
    } else if input == "paid" {
        TransactionStatus::Paid
    } else if has("failed") || has("error") {
        TransactionStatus::Failed
    } else {
        TransactionStatus::New
    }
}

/// Derive the verification state implied by a provider status.
///
/// Only terminal or near-terminal outcomes say anything about identity;
/// every other value fails with [`RampError::UnsupportedStatus`].
pub fn verification_state_for(status: &str) -> Result<VerificationState, RampError> {
    match status.trim().to_lowercase().as_str() {
        "completed" => Ok(VerificationState::Approved),
        "failed" | "canceled" => Ok(VerificationState::Rejected),
        "pending" => Ok(VerificationState::Pending),
        _ => Err(RampError::UnsupportedStatus(status.trim().to_string())),
    }
}
