//! Webhook payload parsing and normalization.
//!
//! [`WebhookPayload`] mirrors the provider's JSON exactly and is lenient:
//! every field is optional and unknown fields are ignored. [`normalize`]
//! turns it into a validated [`TransactionEvent`], the only shape the
//! reconciler accepts.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RampError;

/// Opaque user identity owning ledger and verification records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a non-empty identity. Surrounding whitespace is dropped.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Read a user identity out of a partner context, which the initiation
    /// flow fills with the user's UUID. Anything that is not a UUID is
    /// treated as opaque partner data and yields `None`.
    pub fn from_partner_context(context: &str) -> Option<Self> {
        uuid::Uuid::parse_str(context.trim())
            .ok()
            .map(|u| Self(u.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of a fiat transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionDirection {
    /// Fiat in, crypto out (on-ramp).
    Buy,
    /// Crypto in, fiat out (off-ramp).
    Sell,
}

impl TransactionDirection {
    /// Lenient parse of the provider's `transactionType`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "buy" | "onramp" => Some(TransactionDirection::Buy),
            "sell" | "offramp" => Some(TransactionDirection::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::Buy => "BUY",
            TransactionDirection::Sell => "SELL",
        }
    }
}

/// Raw webhook body as sent by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookPayload {
    pub country: Option<String>,
    pub in_amount: Option<Decimal>,
    pub onramp: Option<String>,
    pub onramp_transaction_id: Option<String>,
    pub out_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub partner_context: Option<String>,
    pub source_currency: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub status_date: Option<DateTime<Utc>>,
    pub target_currency: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_type: Option<String>,
    pub transaction_hash: Option<String>,
    pub wallet_address: Option<String>,
}

/// `null`, a missing key and `""` all mean "no timestamp"; any other
/// string must be RFC 3339.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// One validated report of a fiat transaction's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    pub onramp: String,
    pub onramp_transaction_id: String,
    pub transaction_id: String,
    pub source_currency: String,
    pub target_currency: String,
    pub in_amount: Decimal,
    pub out_amount: Decimal,
    pub payment_method: String,
    pub country: String,
    pub wallet_address: String,
    /// Status exactly as reported (trimmed).
    pub status: String,
    pub status_date: Option<DateTime<Utc>>,
    pub direction: Option<TransactionDirection>,
    pub transaction_hash: Option<String>,
    pub partner_context: Option<String>,
}

impl TransactionEvent {
    /// Natural key of the ledger record this event belongs to: the internal
    /// transaction id, or the processor's id when the internal one is absent.
    pub fn ledger_key(&self) -> &str {
        if self.transaction_id.is_empty() {
            &self.onramp_transaction_id
        } else {
            &self.transaction_id
        }
    }

    /// Identity implied by the partner context, if it carries one.
    pub fn partner_user(&self) -> Option<UserId> {
        self.partner_context
            .as_deref()
            .and_then(UserId::from_partner_context)
    }
}

impl TryFrom<WebhookPayload> for TransactionEvent {
    type Error = RampError;

    fn try_from(p: WebhookPayload) -> Result<Self, Self::Error> {
        let transaction_id = text(p.transaction_id);
        let onramp_transaction_id = text(p.onramp_transaction_id);
        if transaction_id.is_empty() && onramp_transaction_id.is_empty() {
            return Err(RampError::Validation(
                "transactionId and onrampTransactionId are both empty".to_string(),
            ));
        }

        let status = text(p.status);
        if status.is_empty() {
            return Err(RampError::Validation("status is required".to_string()));
        }

        let raw_direction = text(p.transaction_type);
        let direction = TransactionDirection::parse(&raw_direction);
        if direction.is_none() && !raw_direction.is_empty() {
            tracing::debug!(transaction_type = %raw_direction, "unrecognised transaction type");
        }

        Ok(TransactionEvent {
            onramp: text(p.onramp),
            onramp_transaction_id,
            transaction_id,
            source_currency: text(p.source_currency),
            target_currency: text(p.target_currency),
            in_amount: p.in_amount.unwrap_or_default(),
            out_amount: p.out_amount.unwrap_or_default(),
            payment_method: text(p.payment_method),
            country: text(p.country),
            wallet_address: text(p.wallet_address),
            status,
            status_date: p.status_date,
            direction,
            transaction_hash: optional_text(p.transaction_hash),
            partner_context: optional_text(p.partner_context),
        })
    }
}

fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn optional_text(value: Option<String>) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// Parse and validate a raw webhook body.
pub fn normalize(body: &[u8]) -> Result<TransactionEvent, RampError> {
    let payload: WebhookPayload = serde_json::from_slice(body)
        .map_err(|e| RampError::Validation(format!("malformed payload: {e}")))?;
    TransactionEvent::try_from(payload)
}
