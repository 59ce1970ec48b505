use std::time::Duration;

use thiserror::Error;

/// Why a webhook failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No signature header on the request.
    MissingSignature,
    /// Signature present but does not match the body.
    InvalidSignature,
}

impl AuthFailure {
    /// Short label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::MissingSignature => "missing",
            AuthFailure::InvalidSignature => "invalid",
        }
    }
}

/// Errors returned by the reconciliation pipeline.
#[derive(Debug, Error)]
pub enum RampError {
    #[error("authentication failed: {} signature", .0.as_str())]
    Authentication(AuthFailure),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("no user identity could be resolved for transaction {0}")]
    UnresolvedIdentity(String),

    #[error("unsupported status for verification: {0:?}")]
    UnsupportedStatus(String),
}

impl RampError {
    /// Label used for the outcome metric.
    pub fn kind(&self) -> &'static str {
        match self {
            RampError::Authentication(_) => "authentication",
            RampError::Validation(_) => "validation",
            RampError::Storage(_) => "storage",
            RampError::Integrity(_) => "integrity",
            RampError::UnresolvedIdentity(_) => "unresolved_identity",
            RampError::UnsupportedStatus(_) => "unsupported_status",
        }
    }
}

/// Errors returned by a [`LedgerStore`](crate::ledger_store::LedgerStore) operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}
