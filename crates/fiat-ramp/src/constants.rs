use std::time::Duration;

/// Header carrying the provider's hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "X-Onramper-Webhook-Signature";

/// Default upper bound for a single ledger store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Body returned to the provider on every accepted delivery.
pub const ACK_MESSAGE: &str = "Webhook received";

/// Secrets shorter than this are accepted but logged as weak.
pub const MIN_SECRET_LEN: usize = 32;
