//! # Wallet
//!
//! The cached wallet and the helpers the views use to show it.
//!
//! - [`WalletStore`]: balance, history, transfers, top-ups, payments.
//! - [`format`]: money and date rendering, history filters.

pub mod format;
pub mod store;

pub use format::{format_amount, format_relative_date, format_signed, HistoryFilter, Period};
pub use store::{WalletPhase, WalletState, WalletStore};
