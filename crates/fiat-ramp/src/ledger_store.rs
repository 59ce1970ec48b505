use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::StoreError;
use crate::event::{TransactionDirection, TransactionEvent, UserId};
use crate::status::{map_transaction_status, TransactionStatus, VerificationState};

/// Persisted form of a [`TransactionEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRecord {
    pub ledger_key: String,
    pub transaction_id: String,
    pub onramp_transaction_id: String,
    /// `None` only while no write has carried an owner yet.
    pub user_id: Option<UserId>,
    pub onramp: String,
    pub source_currency: String,
    pub target_currency: String,
    pub in_amount: Decimal,
    pub out_amount: Decimal,
    pub payment_method: String,
    pub country: String,
    pub wallet_address: String,
    pub status: TransactionStatus,
    pub raw_status: String,
    pub status_date: Option<DateTime<Utc>>,
    pub direction: Option<TransactionDirection>,
    pub transaction_hash: Option<String>,
    pub partner_context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerRecord {
    fn new(
        ledger_key: String,
        event: &TransactionEvent,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            ledger_key,
            transaction_id: String::new(),
            onramp_transaction_id: String::new(),
            user_id: owner,
            onramp: String::new(),
            source_currency: String::new(),
            target_currency: String::new(),
            in_amount: Decimal::ZERO,
            out_amount: Decimal::ZERO,
            payment_method: String::new(),
            country: String::new(),
            wallet_address: String::new(),
            status: TransactionStatus::New,
            raw_status: String::new(),
            status_date: None,
            direction: None,
            transaction_hash: None,
            partner_context: None,
            created_at: now,
            updated_at: now,
        };
        record.apply(event, now);
        record
    }

    /// Overwrite every mutable field with the event's values.
    /// Owner and creation time are left alone, and an identifier the event
    /// does not carry is never erased.
    fn apply(&mut self, event: &TransactionEvent, now: DateTime<Utc>) {
        if !event.transaction_id.is_empty() {
            self.transaction_id = event.transaction_id.clone();
        }
        if !event.onramp_transaction_id.is_empty() {
            self.onramp_transaction_id = event.onramp_transaction_id.clone();
        }
        self.onramp = event.onramp.clone();
        self.source_currency = event.source_currency.clone();
        self.target_currency = event.target_currency.clone();
        self.in_amount = event.in_amount;
        self.out_amount = event.out_amount;
        self.payment_method = event.payment_method.clone();
        self.country = event.country.clone();
        self.wallet_address = event.wallet_address.clone();
        self.status = map_transaction_status(&event.status);
        self.raw_status = event.status.clone();
        self.status_date = event.status_date;
        self.direction = event.direction;
        self.transaction_hash = event.transaction_hash.clone();
        self.partner_context = event.partner_context.clone();
        self.updated_at = now;
    }
}

/// One verification status per user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationRecord {
    pub user_id: UserId,
    pub state: VerificationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistent ledger of fiat transactions and per-user verification state.
///
/// Implementations must be thread-safe and make each operation atomic:
/// concurrent upserts for one ledger key must never interleave.
pub trait LedgerStore: Send + Sync {
    /// Insert or update the record for the transaction `event` describes.
    ///
    /// An existing record matching either the internal or the processor id
    /// is updated in place, and moved to the internal id once that id is
    /// known, so one transaction never has two records. `owner` is only used
    /// when the record has no owner yet. Returns the owner as stored after
    /// the write, which is `None` if no write so far has carried one.
    fn upsert_transaction(
        &self,
        event: &TransactionEvent,
        owner: Option<&UserId>,
    ) -> Result<Option<UserId>, StoreError>;

    /// Find the owner of a transaction by any non-empty identifier, trying
    /// internal id, then processor id, then wallet address.
    fn resolve_user_id(
        &self,
        transaction_id: &str,
        onramp_transaction_id: &str,
        wallet_address: &str,
    ) -> Result<Option<UserId>, StoreError>;

    /// Write a verification state unless the stored state is `APPROVED` and
    /// the new one is not. Returns the state stored after the call.
    fn upsert_verification_state(
        &self,
        user: &UserId,
        state: VerificationState,
    ) -> Result<VerificationState, StoreError>;

    /// Look up a ledger record by its ledger key, or failing that by
    /// processor transaction id.
    fn transaction(&self, ledger_key: &str) -> Result<Option<LedgerRecord>, StoreError>;

    /// Look up a user's verification record.
    fn verification(&self, user: &UserId) -> Result<Option<VerificationRecord>, StoreError>;

    /// Cheap liveness check.
    fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn LedgerStore>;

/// Key a write for `event` lands on, given the key of the record it
/// already matches, if any. The internal transaction id always wins.
fn target_key(event: &TransactionEvent, existing: Option<&str>) -> String {
    if !event.transaction_id.is_empty() {
        event.transaction_id.clone()
    } else {
        existing
            .map(str::to_string)
            .unwrap_or_else(|| event.onramp_transaction_id.clone())
    }
}

fn same_transaction(record: &LedgerRecord, event: &TransactionEvent) -> bool {
    (!event.transaction_id.is_empty() && record.transaction_id == event.transaction_id)
        || (!event.onramp_transaction_id.is_empty()
            && record.onramp_transaction_id == event.onramp_transaction_id)
}

/// Run a blocking store operation on tokio's blocking pool, bounded by
/// `timeout`. On timeout the blocking call is abandoned, not cancelled; the
/// store's own atomicity keeps that safe.
pub async fn call_store<T, F>(store: &SharedStore, timeout: Duration, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn LedgerStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    let task = tokio::task::spawn_blocking(move || op(store.as_ref()));
    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(StoreError::Timeout(timeout)),
        Ok(Err(join)) => Err(StoreError::Unavailable(format!("store task failed: {join}"))),
        Ok(Ok(result)) => result,
    }
}

/// In-memory ledger backed by DashMap. Fast but lost on restart.
pub struct InMemoryLedgerStore {
    transactions: DashMap<String, LedgerRecord>,
    verifications: DashMap<UserId, VerificationRecord>,
    /// Held across a transaction write, which may move a record between keys.
    writes: Mutex<()>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            verifications: DashMap::new(),
            writes: Mutex::new(()),
        }
    }

    /// Key of the record `event` belongs to, if one exists.
    fn existing_key(&self, event: &TransactionEvent) -> Option<String> {
        let key = event.ledger_key();
        if self.transactions.contains_key(key) {
            return Some(key.to_string());
        }
        self.transactions
            .iter()
            .filter(|r| same_transaction(r.value(), event))
            .min_by_key(|r| r.created_at)
            .map(|r| r.key().clone())
    }

    /// Number of ledger records held.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Owner of the oldest owned record matching `pred`.
    fn first_owner(&self, pred: impl Fn(&LedgerRecord) -> bool) -> Option<UserId> {
        self.transactions
            .iter()
            .filter(|r| r.user_id.is_some() && pred(r.value()))
            .min_by_key(|r| r.created_at)
            .and_then(|r| r.user_id.clone())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn upsert_transaction(
        &self,
        event: &TransactionEvent,
        owner: Option<&UserId>,
    ) -> Result<Option<UserId>, StoreError> {
        use dashmap::mapref::entry::Entry;
        let _writes = self.writes.lock().unwrap_or_else(|poisoned| {
            tracing::error!("in-memory ledger write lock poisoned, recovering");
            poisoned.into_inner()
        });
        let now = Utc::now();

        let existing = self.existing_key(event);
        let key = target_key(event, existing.as_deref());
        if let Some(old) = existing.filter(|old| *old != key) {
            if let Some((_, mut record)) = self.transactions.remove(&old) {
                record.ledger_key = key.clone();
                self.transactions.insert(key.clone(), record);
            }
        }

        match self.transactions.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.apply(event, now);
                if record.user_id.is_none() {
                    record.user_id = owner.cloned();
                }
                Ok(record.user_id.clone())
            }
            Entry::Vacant(vacant) => {
                let record = LedgerRecord::new(key, event, owner.cloned(), now);
                let stored = record.user_id.clone();
                vacant.insert(record);
                Ok(stored)
            }
        }
    }

    fn resolve_user_id(
        &self,
        transaction_id: &str,
        onramp_transaction_id: &str,
        wallet_address: &str,
    ) -> Result<Option<UserId>, StoreError> {
        if !transaction_id.is_empty() {
            if let Some(owner) = self.first_owner(|r| r.transaction_id == transaction_id) {
                return Ok(Some(owner));
            }
        }
        if !onramp_transaction_id.is_empty() {
            if let Some(owner) =
                self.first_owner(|r| r.onramp_transaction_id == onramp_transaction_id)
            {
                return Ok(Some(owner));
            }
        }
        if !wallet_address.is_empty() {
            return Ok(self.first_owner(|r| r.wallet_address == wallet_address));
        }
        Ok(None)
    }

    fn upsert_verification_state(
        &self,
        user: &UserId,
        state: VerificationState,
    ) -> Result<VerificationState, StoreError> {
        use dashmap::mapref::entry::Entry;
        let now = Utc::now();
        match self.verifications.entry(user.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if record.state.may_transition_to(state) {
                    record.state = state;
                    record.updated_at = now;
                }
                Ok(record.state)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(VerificationRecord {
                    user_id: user.clone(),
                    state,
                    created_at: now,
                    updated_at: now,
                });
                Ok(state)
            }
        }
    }

    fn transaction(&self, ledger_key: &str) -> Result<Option<LedgerRecord>, StoreError> {
        if let Some(record) = self.transactions.get(ledger_key) {
            return Ok(Some(record.value().clone()));
        }
        Ok(self
            .transactions
            .iter()
            .find(|r| r.onramp_transaction_id == ledger_key)
            .map(|r| r.value().clone()))
    }

    fn verification(&self, user: &UserId) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.verifications.get(user).map(|r| r.value().clone()))
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Persistent ledger backed by SQLite. Survives restarts.
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS fiat_transactions (
        ledger_key TEXT PRIMARY KEY,
        transaction_id TEXT NOT NULL,
        onramp_transaction_id TEXT NOT NULL,
        user_id TEXT,
        onramp TEXT NOT NULL,
        source_currency TEXT NOT NULL,
        target_currency TEXT NOT NULL,
        in_amount TEXT NOT NULL,
        out_amount TEXT NOT NULL,
        payment_method TEXT NOT NULL,
        country TEXT NOT NULL,
        wallet_address TEXT NOT NULL,
        transaction_status TEXT NOT NULL,
        raw_status TEXT NOT NULL,
        status_date TEXT,
        transaction_type TEXT,
        transaction_hash TEXT,
        partner_context TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_fiat_tx_transaction_id ON fiat_transactions(transaction_id);
    CREATE INDEX IF NOT EXISTS idx_fiat_tx_onramp_id ON fiat_transactions(onramp_transaction_id);
    CREATE INDEX IF NOT EXISTS idx_fiat_tx_wallet ON fiat_transactions(wallet_address);
    CREATE TABLE IF NOT EXISTS verification_sessions (
        user_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    PRAGMA journal_mode=WAL;";

const UPSERT_TRANSACTION: &str = "
    INSERT INTO fiat_transactions (
        ledger_key, transaction_id, onramp_transaction_id, user_id, onramp,
        source_currency, target_currency, in_amount, out_amount, payment_method,
        country, wallet_address, transaction_status, raw_status, status_date,
        transaction_type, transaction_hash, partner_context, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)
    ON CONFLICT(ledger_key) DO UPDATE SET
        transaction_id = CASE WHEN excluded.transaction_id <> ''
            THEN excluded.transaction_id ELSE fiat_transactions.transaction_id END,
        onramp_transaction_id = CASE WHEN excluded.onramp_transaction_id <> ''
            THEN excluded.onramp_transaction_id ELSE fiat_transactions.onramp_transaction_id END,
        user_id = COALESCE(fiat_transactions.user_id, excluded.user_id),
        onramp = excluded.onramp,
        source_currency = excluded.source_currency,
        target_currency = excluded.target_currency,
        in_amount = excluded.in_amount,
        out_amount = excluded.out_amount,
        payment_method = excluded.payment_method,
        country = excluded.country,
        wallet_address = excluded.wallet_address,
        transaction_status = excluded.transaction_status,
        raw_status = excluded.raw_status,
        status_date = excluded.status_date,
        transaction_type = excluded.transaction_type,
        transaction_hash = excluded.transaction_hash,
        partner_context = excluded.partner_context,
        updated_at = excluded.updated_at
    RETURNING user_id";

const FIND_EXISTING: &str = "
    SELECT ledger_key FROM fiat_transactions
    WHERE ledger_key = ?1
       OR (?2 <> '' AND transaction_id = ?2)
       OR (?3 <> '' AND onramp_transaction_id = ?3)
    ORDER BY ledger_key = ?1 DESC, created_at
    LIMIT 1";

const MOVE_RECORD: &str = "UPDATE fiat_transactions SET ledger_key = ?1 WHERE ledger_key = ?2";

// Ratchet: an existing APPROVED row is only touched by another APPROVED.
const UPSERT_VERIFICATION: &str = "
    INSERT INTO verification_sessions (user_id, status, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?3)
    ON CONFLICT(user_id) DO UPDATE SET
        status = excluded.status,
        updated_at = excluded.updated_at
    WHERE verification_sessions.status <> 'APPROVED' OR excluded.status = 'APPROVED'";

const RESOLVE_USER: &str = "
    SELECT user_id FROM fiat_transactions
    WHERE user_id IS NOT NULL
      AND ((?1 <> '' AND transaction_id = ?1)
        OR (?2 <> '' AND onramp_transaction_id = ?2)
        OR (?3 <> '' AND wallet_address = ?3))
    ORDER BY CASE
        WHEN ?1 <> '' AND transaction_id = ?1 THEN 0
        WHEN ?2 <> '' AND onramp_transaction_id = ?2 THEN 1
        ELSE 2
    END, created_at
    LIMIT 1";

const SELECT_TRANSACTION: &str = "
    SELECT ledger_key, transaction_id, onramp_transaction_id, user_id, onramp,
           source_currency, target_currency, in_amount, out_amount, payment_method,
           country, wallet_address, transaction_status, raw_status, status_date,
           transaction_type, transaction_hash, partner_context, created_at, updated_at
    FROM fiat_transactions
    WHERE ledger_key = ?1 OR onramp_transaction_id = ?1
    ORDER BY ledger_key = ?1 DESC, created_at
    LIMIT 1";

impl SqliteLedgerStore {
    /// Open (or create) the ledger database at the given path.
    ///
    /// On Unix the file is restricted to 0600, since it maps wallets and
    /// payment activity to user identities.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "failed to set ledger database file permissions to 0600"
                );
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(c) => c,
            Err(poisoned) => {
                tracing::error!("ledger store mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn parse_decimal(raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Corrupt(format!("amount {raw:?}: {e}")))
}

/// Column values of one `fiat_transactions` row, before decoding.
struct RawRecord {
    ledger_key: String,
    transaction_id: String,
    onramp_transaction_id: String,
    user_id: Option<String>,
    onramp: String,
    source_currency: String,
    target_currency: String,
    in_amount: String,
    out_amount: String,
    payment_method: String,
    country: String,
    wallet_address: String,
    transaction_status: String,
    raw_status: String,
    status_date: Option<String>,
    transaction_type: Option<String>,
    transaction_hash: Option<String>,
    partner_context: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            ledger_key: row.get(0)?,
            transaction_id: row.get(1)?,
            onramp_transaction_id: row.get(2)?,
            user_id: row.get(3)?,
            onramp: row.get(4)?,
            source_currency: row.get(5)?,
            target_currency: row.get(6)?,
            in_amount: row.get(7)?,
            out_amount: row.get(8)?,
            payment_method: row.get(9)?,
            country: row.get(10)?,
            wallet_address: row.get(11)?,
            transaction_status: row.get(12)?,
            raw_status: row.get(13)?,
            status_date: row.get(14)?,
            transaction_type: row.get(15)?,
            transaction_hash: row.get(16)?,
            partner_context: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
        })
    }
}

impl TryFrom<RawRecord> for LedgerRecord {
    type Error = StoreError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let status_date = match raw.status_date {
            Some(s) => Some(
                DateTime::parse_from_rfc3339(&s)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| StoreError::Corrupt(format!("status_date {s:?}: {e}")))?,
            ),
            None => None,
        };

        Ok(LedgerRecord {
            ledger_key: raw.ledger_key,
            transaction_id: raw.transaction_id,
            onramp_transaction_id: raw.onramp_transaction_id,
            user_id: raw.user_id.and_then(UserId::new),
            onramp: raw.onramp,
            source_currency: raw.source_currency,
            target_currency: raw.target_currency,
            in_amount: parse_decimal(&raw.in_amount)?,
            out_amount: parse_decimal(&raw.out_amount)?,
            payment_method: raw.payment_method,
            country: raw.country,
            wallet_address: raw.wallet_address,
            status: raw.transaction_status.parse().map_err(StoreError::Corrupt)?,
            raw_status: raw.raw_status,
            status_date,
            direction: raw
                .transaction_type
                .as_deref()
                .and_then(TransactionDirection::parse),
            transaction_hash: raw.transaction_hash,
            partner_context: raw.partner_context,
            created_at: from_unix(raw.created_at),
            updated_at: from_unix(raw.updated_at),
        })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn upsert_transaction(
        &self,
        event: &TransactionEvent,
        owner: Option<&UserId>,
    ) -> Result<Option<UserId>, StoreError> {
        let mut conn = self.lock();
        let now = Utc::now().timestamp();
        // Lookup, re-key and upsert commit together; the unique key plus
        // ON CONFLICT still guards against other processes sharing the file.
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                FIND_EXISTING,
                params![
                    event.ledger_key(),
                    event.transaction_id,
                    event.onramp_transaction_id
                ],
                |row| row.get(0),
            )
            .optional()?;
        let key = target_key(event, existing.as_deref());
        if let Some(old) = existing.filter(|old| *old != key) {
            tx.execute(MOVE_RECORD, params![key, old])?;
        }

        let stored: Option<String> = tx.query_row(
            UPSERT_TRANSACTION,
            params![
                key,
                event.transaction_id,
                event.onramp_transaction_id,
                owner.map(UserId::as_str),
                event.onramp,
                event.source_currency,
                event.target_currency,
                event.in_amount.to_string(),
                event.out_amount.to_string(),
                event.payment_method,
                event.country,
                event.wallet_address,
                map_transaction_status(&event.status).as_str(),
                event.status,
                event.status_date.map(|d| d.to_rfc3339()),
                event.direction.map(|d| d.as_str()),
                event.transaction_hash,
                event.partner_context,
                now,
            ],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(stored.and_then(UserId::new))
    }

    fn resolve_user_id(
        &self,
        transaction_id: &str,
        onramp_transaction_id: &str,
        wallet_address: &str,
    ) -> Result<Option<UserId>, StoreError> {
        let conn = self.lock();
        let found: Option<String> = conn
            .query_row(
                RESOLVE_USER,
                params![transaction_id, onramp_transaction_id, wallet_address],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.and_then(UserId::new))
    }

    fn upsert_verification_state(
        &self,
        user: &UserId,
        state: VerificationState,
    ) -> Result<VerificationState, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            UPSERT_VERIFICATION,
            params![user.as_str(), state.as_str(), Utc::now().timestamp()],
        )?;
        let stored: String = tx.query_row(
            "SELECT status FROM verification_sessions WHERE user_id = ?1",
            params![user.as_str()],
            |row| row.get(0),
        )?;
        tx.commit()?;
        stored.parse().map_err(StoreError::Corrupt)
    }

    fn transaction(&self, ledger_key: &str) -> Result<Option<LedgerRecord>, StoreError> {
        let conn = self.lock();
        conn.query_row(SELECT_TRANSACTION, params![ledger_key], RawRecord::from_row)
            .optional()?
            .map(LedgerRecord::try_from)
            .transpose()
    }

    fn verification(&self, user: &UserId) -> Result<Option<VerificationRecord>, StoreError> {
        let conn = self.lock();
        let row: Option<(String, i64, i64)> = conn
            .query_row(
                "SELECT status, created_at, updated_at FROM verification_sessions WHERE user_id = ?1",
                params![user.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(|(status, created_at, updated_at)| {
            Ok(VerificationRecord {
                user_id: user.clone(),
                state: status.parse().map_err(StoreError::Corrupt)?,
                created_at: from_unix(created_at),
                updated_at: from_unix(updated_at),
            })
        })
        .transpose()
    }

    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
