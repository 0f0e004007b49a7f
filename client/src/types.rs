//! # Wire & Domain Types
//!
//! Models for everything the four services send back, plus the handful of
//! client-side types built from them ([`Identity`], [`WalletSnapshot`],
//! [`TransactionRecord`]).
//!
//! ## Conventions
//!
//! - The services speak camelCase JSON. Every wire struct carries
//!   `#[serde(rename_all = "camelCase")]`.
//! - Money is [`Decimal`]. It is parsed from JSON numbers or strings and
//!   serialized back as a string, so the precision the user typed is the
//!   precision the server receives.
//! - Timestamps arrive in at least two formats depending on the service
//!   (`2024-01-02T10:00:00` and `2024-01-02 10:00:00`). They are read as UTC.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_CURRENCY;

// ---------------------------------------------------------------------------
// User Identifiers
// ---------------------------------------------------------------------------

/// Opaque user identifier.
///
/// The user service issues UUIDs, but older deployments (and the demo
/// fixtures) use integers. Both deserialize; the value is only ever echoed
/// back into URLs, so it is kept as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
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

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => UserId(s),
            Raw::Signed(n) => UserId(n.to_string()),
            Raw::Unsigned(n) => UserId(n.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The authenticated user, as held by the session store.
///
/// Immutable for the lifetime of a session. Persisted next to the token so
/// a restart restores it without a network round-trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Joins first and last name, tolerating either being blank.
pub fn display_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// Payload of a successful `POST /api/users/login`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds, as reported by the server. Informational;
    /// expiry checks use the token's own `exp` claim.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl LoginData {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user_id.clone(),
            email: self.email.clone(),
            display_name: display_name(&self.first_name, &self.last_name),
            phone: None,
        }
    }
}

impl fmt::Debug for LoginData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginData")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// A user record from the user service (registration and profile calls).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name(),
            phone: self.phone.clone(),
        }
    }
}

/// Account details submitted at registration.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationProfile {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Outcome of [`SessionStore::register`](crate::session::SessionStore::register).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// The account as created server-side.
    pub identity: Identity,
    /// `true` if the follow-up login succeeded and a session is active.
    pub logged_in: bool,
    /// Message for the user. Tells them to log in manually when
    /// `logged_in` is false.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Cached read of the server-side balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub balance: Decimal,
    pub currency: String,
}

impl WalletSnapshot {
    /// The snapshot shown when nobody is logged in.
    pub fn empty() -> Self {
        Self {
            balance: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl Default for WalletSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Body of `GET /api/wallets/user/{id}/balance`.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct BalanceBody {
    pub balance: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

impl From<BalanceBody> for WalletSnapshot {
    fn from(b: BalanceBody) -> Self {
        Self {
            balance: b.balance,
            currency: b.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        }
    }
}

/// A wallet record from the wallet service.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub id: Uuid,
    pub user_id: UserId,
    pub balance: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle status shared by payments, ledger entries, and history rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    /// Anything a newer server version invents.
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transaction Records
// ---------------------------------------------------------------------------

/// Which way money moved, from the current user's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Sent,
    Received,
    TopUp,
}

impl Direction {
    /// Outgoing money renders with a minus sign.
    pub fn is_outgoing(&self) -> bool {
        matches!(self, Direction::Sent)
    }
}

/// One row of the user's transaction history.
///
/// Read-only projection of a wallet or payment record. Lists of these keep
/// the server's order (newest first).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub counterparty_email: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
}

/// A history row as the wallet service sends it.
///
/// Two shapes are in circulation: the wallet service's own
/// (`transactionType: CREDIT|DEBIT`, `createdAt`) and the older front-end
/// shape (`type: SENT|RECEIVED|TOP_UP`, `timestamp`, counterparty emails).
/// Both land here and are folded into a [`TransactionRecord`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTransaction {
    pub id: serde_json::Value,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub counterparty_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

impl From<WireTransaction> for TransactionRecord {
    fn from(w: WireTransaction) -> Self {
        let direction = match (w.kind.as_deref(), w.transaction_type.as_deref()) {
            (Some("SENT"), _) => Direction::Sent,
            (Some("RECEIVED"), _) => Direction::Received,
            (Some("TOP_UP"), _) | (Some("TOPUP"), _) => Direction::TopUp,
            (_, Some("DEBIT")) => Direction::Sent,
            _ => Direction::Received,
        };

        let counterparty_email = w.counterparty_email.or(match direction {
            Direction::Sent => w.recipient_email,
            _ => w.sender_email,
        });

        let id = match w.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        TransactionRecord {
            id,
            direction,
            amount: w.amount,
            counterparty_email,
            description: w.description.filter(|d| !d.is_empty()),
            timestamp: w.timestamp.or(w.created_at),
            status: w.status.unwrap_or(TransactionStatus::Completed),
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Body of `POST /api/payments/transfer`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_email: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A payment as tracked by the payment service.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    #[serde(default)]
    pub from_user_id: Option<UserId>,
    #[serde(default)]
    pub to_user_id: Option<UserId>,
    pub to_email: String,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Direction relative to `me`. Payments the user neither sent nor
    /// received are reported as received; the service never returns those.
    pub fn direction_for(&self, me: &UserId) -> Direction {
        if self.from_user_id.as_ref() == Some(me) {
            Direction::Sent
        } else {
            Direction::Received
        }
    }

    /// The other party's email, as far as the payment says. Only the
    /// recipient's address is recorded, so a received payment has none.
    pub fn counterparty_email(&self, me: &UserId) -> Option<&str> {
        match self.direction_for(me) {
            Direction::Sent => Some(self.to_email.as_str()),
            _ => None,
        }
    }

    /// Projects the payment into a history row for `me`.
    pub fn to_record(&self, me: &UserId) -> TransactionRecord {
        TransactionRecord {
            id: self.id.to_string(),
            direction: self.direction_for(me),
            amount: self.amount,
            counterparty_email: self.counterparty_email(me).map(str::to_string),
            description: self.description.clone(),
            timestamp: self.processed_at.or(self.created_at),
            status: self.status,
        }
    }
}

/// Body of `GET /api/payments/status/{referenceId}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusInfo {
    pub id: Uuid,
    pub reference_id: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub processed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Kind of ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    Transfer,
    Deposit,
    Withdrawal,
    Refund,
    #[serde(other)]
    Unknown,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Transfer => "TRANSFER",
            LedgerEntryType::Deposit => "DEPOSIT",
            LedgerEntryType::Withdrawal => "WITHDRAWAL",
            LedgerEntryType::Refund => "REFUND",
            LedgerEntryType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable ledger entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    #[serde(default)]
    pub payment_id: Option<Uuid>,
    #[serde(default)]
    pub sender_user_id: Option<UserId>,
    #[serde(default)]
    pub receiver_user_id: Option<UserId>,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub transaction_type: LedgerEntryType,
    pub status: TransactionStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of a paged ledger query.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    /// Zero-based page index.
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.number.saturating_add(1) >= self.total_pages
    }
}

/// A single change recorded against a ledger entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub action: String,
    #[serde(default)]
    pub old_values: Option<String>,
    #[serde(default)]
    pub new_values: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Totals for the analytics view.
///
/// The ledger service reports `null` totals for users with no history,
/// hence the options.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    #[serde(default)]
    pub total_sent: Option<Decimal>,
    #[serde(default)]
    pub total_received: Option<Decimal>,
    #[serde(default)]
    pub total_transactions: Option<u64>,
}

impl FinancialSummary {
    pub fn sent(&self) -> Decimal {
        self.total_sent.unwrap_or(Decimal::ZERO)
    }

    pub fn received(&self) -> Decimal {
        self.total_received.unwrap_or(Decimal::ZERO)
    }

    pub fn count(&self) -> u64 {
        self.total_transactions.unwrap_or(0)
    }

    /// Received minus sent.
    pub fn net(&self) -> Decimal {
        self.received() - self.sent()
    }
}

/// Filters for `GET /api/ledger/search`. Unset fields are not sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerSearch {
    pub status: Option<TransactionStatus>,
    pub entry_type: Option<LedgerEntryType>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub page: u32,
    pub size: u32,
}

impl LedgerSearch {
    /// Renders the filter as query parameters in the ledger service's
    /// naming.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        const ISO: &str = "%Y-%m-%dT%H:%M:%S";
        let mut q = Vec::new();
        if let Some(s) = self.status {
            q.push(("status".to_string(), s.as_str().to_string()));
        }
        if let Some(t) = self.entry_type {
            q.push(("transactionType".to_string(), t.as_str().to_string()));
        }
        if let Some(start) = self.start {
            q.push(("startDate".to_string(), start.format(ISO).to_string()));
        }
        if let Some(end) = self.end {
            q.push(("endDate".to_string(), end.format(ISO).to_string()));
        }
        q.push(("page".to_string(), self.page.to_string()));
        q.push(("size".to_string(), self.size.to_string()));
        q
    }
}

// ---------------------------------------------------------------------------
// Timestamp Parsing
// ---------------------------------------------------------------------------

/// Lenient timestamp parsing for the services' mixed date formats.
pub mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    /// Parses RFC 3339, or one of the zone-less formats (read as UTC).
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .map(|naive| naive.and_utc())
    }

    /// `deserialize_with` helper for `Option<DateTime<Utc>>` fields.
    /// Accepts a string, epoch milliseconds, or null.
    pub fn option<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Millis(i64),
        }

        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Text(s)) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {s}"))),
            Some(Raw::Millis(ms)) => Ok(Utc.timestamp_millis_opt(ms).single()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
