//! # Wallet Store
//!
//! A cached view of the current user's wallet: balance, history, and the
//! payment operations that change them.
//!
//! ## States
//!
//! ```text
//!   Empty ──load──► Loading ──both halves back──► Populated
//!     ▲                │  ▲                            │
//!     │                │  └──────── load ──────────────┘
//!     └──── reset ─────┴──────────────────────────────┘
//! ```
//!
//! `Loading` keeps whatever was shown before (stale-while-revalidate).
//! Nothing here ever adjusts the balance locally: after a transfer, top-up,
//! or cancel the whole wallet is re-read from the services.
//!
//! ## Overlapping Loads
//!
//! Every load takes a sequence number. Balance and history are applied
//! independently, each only if its number is newer than the last one
//! applied for that half, so a slow response can never overwrite a newer
//! one. [`WalletStore::reset`] moves both marks past every number issued
//! so far, which discards loads still in flight for a previous user.

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, PaymentReceipt, WalletMutation};
use crate::error::{ClientError, Result};
use crate::session::SessionStore;
use crate::types::{
    Identity, Payment, PaymentStatusInfo, TransactionRecord, TransferRequest, UserId,
    WalletSnapshot,
};
use crate::validation::{is_valid_email, ValidationErrors, MAX_DESCRIPTION_LENGTH};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalletPhase {
    /// No identity. Balance 0, no history.
    #[default]
    Empty,
    Loading,
    Populated,
}

/// What the views render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalletState {
    pub phase: WalletPhase,
    pub snapshot: WalletSnapshot,
    /// Newest first, as the service returned them.
    pub transactions: Vec<TransactionRecord>,
    /// Set when the last balance fetch failed; the snapshot is stale.
    pub balance_error: Option<ClientError>,
    /// Set when the last history fetch failed; the list is stale.
    pub transactions_error: Option<ClientError>,
}

impl WalletState {
    pub fn balance(&self) -> Decimal {
        self.snapshot.balance
    }

    pub fn is_loading(&self) -> bool {
        self.phase == WalletPhase::Loading
    }

    /// The first `n` history rows.
    pub fn recent(&self, n: usize) -> &[TransactionRecord] {
        &self.transactions[..n.min(self.transactions.len())]
    }
}

#[derive(Default)]
struct Inner {
    state: WalletState,
    issued: u64,
    balance_applied: u64,
    transactions_applied: u64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct WalletStore {
    api: ApiClient,
    session: Arc<SessionStore>,
    inner: RwLock<Inner>,
}

impl WalletStore {
    pub fn new(api: ApiClient, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn state(&self) -> WalletState {
        self.inner.read().state.clone()
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        self.inner.read().state.snapshot.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.inner.read().state.transactions.clone()
    }

    /// Back to `Empty`, discarding any load still in flight.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.state = WalletState::default();
        inner.balance_applied = inner.issued;
        inner.transactions_applied = inner.issued;
        debug!(issued = inner.issued, "wallet reset");
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Fetches balance and history concurrently and applies each half on
    /// its own. A missing wallet is provisioned and the balance retried
    /// once.
    ///
    /// Returns the first failure, but whatever did succeed is already
    /// applied by then.
    pub async fn load_wallet_data(&self) -> Result<()> {
        let (identity, token) = match self.session.credentials() {
            Ok(c) => c,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        let seq = self.begin_load();
        let wallet = self.api.wallet();

        let ((balance, provisioned), transactions) = futures::join!(
            self.fetch_balance(&token, &identity.id),
            wallet.get_transactions(&token, &identity.id),
        );

        // History of a wallet that did not exist a moment ago is empty, but
        // the first fetch raced the provisioning.
        let transactions = match transactions {
            Err(e) if provisioned && e.is_not_found() => {
                wallet.get_transactions(&token, &identity.id).await
            }
            other => other,
        };

        self.apply(seq, balance, transactions)
    }

    /// Re-reads the wallet if someone is logged in. Otherwise makes sure
    /// the store is empty, without touching the network.
    pub async fn refresh_wallet(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            self.reset();
            return Ok(());
        }
        self.load_wallet_data().await
    }

    /// Provisions a wallet for the current user. `Ok(false)` if one was
    /// already there.
    pub async fn create_wallet_if_needed(&self) -> Result<bool> {
        let (identity, token) = self.session.credentials()?;
        self.provision(&token, &identity.id).await
    }

    /// Loads for a new identity, or empties the store when there is none.
    pub async fn on_identity_change(&self, identity: Option<&Identity>) {
        match identity {
            Some(identity) => {
                debug!(user = %identity.id, "identity changed, loading wallet");
                if let Err(e) = self.load_wallet_data().await {
                    warn!(error = %e, "wallet load failed");
                }
            }
            None => self.reset(),
        }
    }

    /// Follows the session: every time the logged-in user changes, the
    /// wallet is reloaded or reset. Runs until the returned handle is
    /// aborted.
    pub fn spawn_session_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut rx = self.session.subscribe();

        tokio::spawn(async move {
            let initial = rx.borrow_and_update().identity.clone();
            let mut current = initial.as_ref().map(|i| i.id.clone());
            if initial.is_some() {
                store.on_identity_change(initial.as_ref()).await;
            }

            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().identity.clone();
                let id = identity.as_ref().map(|i| i.id.clone());
                if id == current {
                    continue;
                }
                current = id;
                store.on_identity_change(identity.as_ref()).await;
            }
            debug!("session closed, wallet sync stopped");
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Sends money to another user by email, then reloads.
    ///
    /// On failure nothing in the store changes.
    pub async fn transfer(
        &self,
        to_email: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<PaymentReceipt> {
        let token = self.session.bearer()?;

        let to_email = to_email.trim();
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let mut errors = ValidationErrors::new();
        if !is_valid_email(to_email) {
            errors.add("recipient", "Please enter a valid email address");
        }
        check_amount(&mut errors, amount);
        if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
            errors.add(
                "description",
                format!("Description must not exceed {MAX_DESCRIPTION_LENGTH} characters"),
            );
        }
        errors.into_result(())?;

        let request = TransferRequest {
            to_email: to_email.to_string(),
            amount,
            description: description.map(str::to_string),
        };
        let receipt = self.api.payment().transfer(&token, &request).await?;
        info!(
            payment = %receipt.payment.id,
            status = %receipt.payment.status,
            %amount,
            "transfer accepted"
        );

        self.reload_after("transfer").await;
        Ok(receipt)
    }

    /// Credits the user's own wallet, then reloads.
    pub async fn top_up(
        &self,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<WalletMutation> {
        let (identity, token) = self.session.credentials()?;

        let mut errors = ValidationErrors::new();
        check_amount(&mut errors, amount);
        errors.into_result(())?;

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let mutation = self
            .api
            .wallet()
            .credit(&token, &identity.id, amount, description)
            .await?;
        info!(%amount, balance = %mutation.wallet.balance, "wallet topped up");

        self.reload_after("top-up").await;
        Ok(mutation)
    }

    /// Cancels a pending payment, then reloads.
    pub async fn cancel_payment(&self, payment_id: Uuid) -> Result<Payment> {
        let token = self.session.bearer()?;
        let payment = self.api.payment().cancel_payment(&token, payment_id).await?;
        info!(payment = %payment.id, "payment cancelled");

        self.reload_after("cancel").await;
        Ok(payment)
    }

    // -----------------------------------------------------------------------
    // Payment Lookups
    // -----------------------------------------------------------------------

    /// Every payment the user sent or received, as the service orders them.
    pub async fn payments(&self) -> Result<Vec<Payment>> {
        let (identity, token) = self.session.credentials()?;
        self.api
            .payment()
            .get_user_payments(&token, &identity.id)
            .await
    }

    /// [`payments`](Self::payments) projected into history rows.
    pub async fn payment_history(&self) -> Result<Vec<TransactionRecord>> {
        let me = self
            .session
            .identity()
            .ok_or(ClientError::NotAuthenticated)?
            .id;
        let payments = self.payments().await?;
        Ok(payments.iter().map(|p| p.to_record(&me)).collect())
    }

    pub async fn payment(&self, payment_id: Uuid) -> Result<Payment> {
        let token = self.session.bearer()?;
        self.api.payment().get_payment(&token, payment_id).await
    }

    pub async fn payment_status(&self, reference_id: &str) -> Result<PaymentStatusInfo> {
        self.api.payment().get_payment_status(reference_id).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn begin_load(&self) -> u64 {
        let mut inner = self.inner.write();
        inner.issued += 1;
        inner.state.phase = WalletPhase::Loading;
        inner.issued
    }

    /// Balance, plus whether a wallet had to be provisioned to get it.
    async fn fetch_balance(
        &self,
        token: &str,
        user_id: &UserId,
    ) -> (Result<WalletSnapshot>, bool) {
        let wallet = self.api.wallet();
        match wallet.get_balance(token, user_id).await {
            Err(e) if e.is_not_found() => {
                warn!(user = %user_id, "no wallet found, provisioning");
                if let Err(e) = self.provision(token, user_id).await {
                    return (Err(e), false);
                }
                (wallet.get_balance(token, user_id).await, true)
            }
            other => (other, false),
        }
    }

    async fn provision(&self, token: &str, user_id: &UserId) -> Result<bool> {
        match self.api.wallet().create_wallet(token, user_id).await {
            Ok(wallet) => {
                info!(user = %user_id, wallet = %wallet.id, "wallet created");
                Ok(true)
            }
            Err(e) if e.is_already_exists() => {
                debug!(user = %user_id, "wallet already exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn apply(
        &self,
        seq: u64,
        balance: Result<WalletSnapshot>,
        transactions: Result<Vec<TransactionRecord>>,
    ) -> Result<()> {
        let outcome = match (&balance, &transactions) {
            (Err(e), _) | (_, Err(e)) => Err(e.clone()),
            _ => Ok(()),
        };

        let mut inner = self.inner.write();
        let mut applied = false;

        if seq > inner.balance_applied {
            inner.balance_applied = seq;
            applied = true;
            match balance {
                Ok(snapshot) => {
                    inner.state.snapshot = snapshot;
                    inner.state.balance_error = None;
                }
                Err(e) => {
                    warn!(seq, error = %e, "balance refresh failed, keeping last value");
                    inner.state.balance_error = Some(e);
                }
            }
        }

        if seq > inner.transactions_applied {
            inner.transactions_applied = seq;
            applied = true;
            match transactions {
                Ok(rows) => {
                    inner.state.transactions = rows;
                    inner.state.transactions_error = None;
                }
                Err(e) => {
                    warn!(seq, error = %e, "history refresh failed, keeping last list");
                    inner.state.transactions_error = Some(e);
                }
            }
        }

        if !applied {
            debug!(seq, "discarding stale wallet load");
        } else if seq == inner.issued {
            inner.state.phase = WalletPhase::Populated;
        }

        outcome
    }

    async fn reload_after(&self, operation: &str) {
        if let Err(e) = self.load_wallet_data().await {
            warn!(operation, error = %e, "reload after mutation failed");
        }
    }
}

fn check_amount(errors: &mut ValidationErrors, amount: Decimal) {
    if amount <= Decimal::ZERO {
        errors.add("amount", "Amount must be greater than 0");
    }
}
