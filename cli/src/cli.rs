//! # CLI Interface
//!
//! Command-line structure for the `riyada` binary, via `clap` derive. Every
//! service URL can also come from the environment, so a shell profile can
//! point the client at a staging stack once.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use riyada_client::config::{
    ClientConfig, ServiceEndpoints, DEFAULT_LEDGER_SERVICE_URL, DEFAULT_PAYMENT_SERVICE_URL,
    DEFAULT_USER_SERVICE_URL, DEFAULT_WALLET_SERVICE_URL,
};
use riyada_client::types::{Direction, LedgerEntryType, TransactionStatus};
use riyada_client::wallet::Period;

use crate::logging::LogFormat;

/// Riyada digital wallet, in the terminal.
///
/// Log in once; the session is kept in the data directory until it expires
/// or you log out.
#[derive(Parser, Debug)]
#[command(
    name = "riyada",
    about = "Riyada digital wallet client",
    version,
    propagate_version = true
)]
pub struct RiyadaCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory holding the persisted session.
    #[arg(long, short = 'd', env = "RIYADA_DATA_DIR", default_value = ".riyada", global = true)]
    pub data_dir: PathBuf,

    /// Base URL of the user service.
    #[arg(long, env = "RIYADA_USER_URL", default_value = DEFAULT_USER_SERVICE_URL, global = true)]
    pub user_service_url: String,

    /// Base URL of the wallet service.
    #[arg(long, env = "RIYADA_WALLET_URL", default_value = DEFAULT_WALLET_SERVICE_URL, global = true)]
    pub wallet_service_url: String,

    /// Base URL of the payment service.
    #[arg(long, env = "RIYADA_PAYMENT_URL", default_value = DEFAULT_PAYMENT_SERVICE_URL, global = true)]
    pub payment_service_url: String,

    /// Base URL of the ledger service.
    #[arg(long, env = "RIYADA_LEDGER_URL", default_value = DEFAULT_LEDGER_SERVICE_URL, global = true)]
    pub ledger_service_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "RIYADA_TIMEOUT_SECS", default_value_t = 15, global = true)]
    pub timeout_secs: u64,

    /// Log output format (logs go to stderr).
    #[arg(long, value_enum, env = "RIYADA_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoints: ServiceEndpoints {
                user: self.user_service_url.clone(),
                wallet: self.wallet_service_url.clone(),
                payment: self.payment_service_url.clone(),
                ledger: self.ledger_service_url.clone(),
            },
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            data_dir: Some(self.data_dir.clone()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with email and password.
    Login(LoginArgs),
    /// Create an account, then log in with it.
    Register(RegisterArgs),
    /// End the session and forget the stored token.
    Logout,
    /// Show who is logged in.
    Whoami {
        /// Fetch the full profile from the user service.
        #[arg(long)]
        remote: bool,
    },
    /// Balance and the most recent activity.
    Dashboard,
    /// Send money to another user by email.
    Transfer(TransferArgs),
    /// Add funds to your own wallet.
    Topup(TopUpArgs),
    /// Wallet transaction history, with optional filters.
    History(HistoryArgs),
    /// Payments you sent or received.
    Payments {
        #[command(subcommand)]
        action: Option<PaymentsAction>,
    },
    /// Browse the ledger.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Totals sent and received.
    Analytics,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    pub email: String,

    #[arg(long, short = 'p', env = "RIYADA_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    pub email: String,

    #[arg(long, short = 'p', env = "RIYADA_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Recipient email.
    pub to: String,

    /// Amount, e.g. `50` or `12.75`.
    pub amount: String,

    #[arg(long, short = 'm')]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct TopUpArgs {
    pub amount: String,

    #[arg(long, short = 'm')]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only this kind of transaction.
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    #[arg(long, value_enum, default_value = "all")]
    pub period: PeriodArg,

    /// Case-insensitive match on counterparty or description.
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Build the list from payments instead of wallet transactions.
    #[arg(long)]
    pub payments: bool,
}

#[derive(Subcommand, Debug)]
pub enum PaymentsAction {
    /// List every payment (the default).
    List,
    /// One payment in detail.
    Show { id: Uuid },
    /// Cancel a pending payment.
    Cancel { id: Uuid },
    /// Look up a payment's status by reference id. No login needed.
    Status { reference: String },
}

#[derive(Subcommand, Debug)]
pub enum LedgerAction {
    /// One page of your ledger entries.
    Page {
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = 0, hide_default_value = true)]
        size: u32,
    },
    /// Most recent entries.
    Recent {
        #[arg(long, default_value_t = 0, hide_default_value = true)]
        limit: u32,
    },
    /// One entry in detail.
    Show { id: Uuid },
    /// Every recorded change to one entry.
    Audit { id: Uuid },
    /// Filtered search.
    Search(LedgerSearchArgs),
}

#[derive(Args, Debug)]
pub struct LedgerSearchArgs {
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TransactionStatus>,

    #[arg(long = "type", value_parser = parse_entry_type)]
    pub entry_type: Option<LedgerEntryType>,

    /// `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`.
    #[arg(long, value_parser = parse_datetime)]
    pub from: Option<NaiveDateTime>,

    #[arg(long, value_parser = parse_datetime)]
    pub to: Option<NaiveDateTime>,

    #[arg(long, default_value_t = 0)]
    pub page: u32,

    #[arg(long, default_value_t = 0, hide_default_value = true)]
    pub size: u32,
}

// ---------------------------------------------------------------------------
// Value Types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Sent,
    Received,
    Topup,
}

impl From<KindArg> for Direction {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sent => Direction::Sent,
            KindArg::Received => Direction::Received,
            KindArg::Topup => Direction::TopUp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    All,
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
    #[value(name = "90d")]
    Quarter,
}

impl From<PeriodArg> for Period {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::All => Period::AllTime,
            PeriodArg::Week => Period::Last7Days,
            PeriodArg::Month => Period::Last30Days,
            PeriodArg::Quarter => Period::Last3Months,
        }
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, String> {
    match serde_json::from_value(serde_json::Value::String(s.to_uppercase())) {
        Ok(TransactionStatus::Unknown) | Err(_) => Err(format!("unknown status `{s}`")),
        Ok(status) => Ok(status),
    }
}

fn parse_entry_type(s: &str) -> Result<LedgerEntryType, String> {
    match serde_json::from_value(serde_json::Value::String(s.to_uppercase())) {
        Ok(LedgerEntryType::Unknown) | Err(_) => Err(format!("unknown entry type `{s}`")),
        Ok(kind) => Ok(kind),
    }
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, got `{s}`"))
}
