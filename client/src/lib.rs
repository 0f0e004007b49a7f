// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Riyada Wallet: Client Library
//!
//! Everything a Riyada front-end needs between the user's keystrokes and the
//! four backend services: typed service clients, the session lifecycle, and
//! the cached wallet view. Nothing in here owns money. Balances, transfers,
//! and the ledger live server-side; this crate mirrors them and keeps the
//! mirror honest.
//!
//! ## Architecture
//!
//! - **api**: HTTP clients for the user, wallet, payment, and ledger
//!   services behind a single [`api::HttpTransport`] seam.
//! - **session**: Identity + bearer token, persisted across restarts, with
//!   local JWT expiry checks.
//! - **wallet**: Cached balance and transaction list, reload-on-login,
//!   refresh-after-mutation, stale-response guard.
//! - **ledger**: Token-guarded read access to ledger history and reports.
//! - **validation**: Form checks that run before anything hits the network.
//! - **types**: Wire and domain models shared by all of the above.
//! - **config**: Constants, default endpoints, and client configuration.
//!
//! ## Ground Rules
//!
//! 1. The server is the source of truth. The client replaces cached state
//!    wholesale; it never does arithmetic on a balance.
//! 2. Money is `Decimal`. Never `f64`.
//! 3. Stores return `Result`. They never panic on a bad response.
//! 4. Client-side token expiry is a UI convenience, not a security check.

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod session;
pub mod types;
pub mod validation;
pub mod wallet;

pub use error::{ClientError, Result};
