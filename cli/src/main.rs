// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Riyada CLI
//!
//! Entry point for the `riyada` binary. Parses arguments, initializes
//! logging, restores the persisted session, runs one command against the
//! stores and prints the resulting screen.
//!
//! Screens go to stdout; error banners and logs go to stderr. A failed
//! command exits non-zero.

mod cli;
mod logging;
mod views;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;

use riyada_client::api::ApiClient;
use riyada_client::config::ClientConfig;
use riyada_client::ledger::LedgerBrowser;
use riyada_client::session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
use riyada_client::types::{LedgerSearch, RegistrationProfile};
use riyada_client::validation::{parse_amount, TransferForm, ValidationErrors};
use riyada_client::wallet::{format_amount, HistoryFilter, WalletStore};
use riyada_client::ClientError;

use cli::{Commands, LedgerAction, PaymentsAction, RiyadaCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = RiyadaCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.global.log_format);

    let app = App::open(&cli.global.client_config())?;

    match app.run(cli.command).await {
        Ok(screen) => {
            println!("{screen}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", views::error_banner(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The stores, wired to one shared API client and the persisted session.
struct App {
    session: Arc<SessionStore>,
    wallet: Arc<WalletStore>,
    ledger: LedgerBrowser,
}

impl App {
    fn open(config: &ClientConfig) -> Result<Self> {
        let api = ApiClient::from_config(config).context("failed to build HTTP client")?;
        Self::with_api(config, api)
    }

    fn with_api(config: &ClientConfig, api: ApiClient) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match config.session_file() {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir).with_context(|| {
                        format!("failed to create data directory: {}", dir.display())
                    })?;
                }
                tracing::debug!(path = %path.display(), "using session file");
                Arc::new(FileStorage::open(path))
            }
            None => Arc::new(MemoryStorage::new()),
        };

        let session = Arc::new(SessionStore::new(api.clone(), storage));
        session.restore();

        let wallet = Arc::new(WalletStore::new(api.clone(), Arc::clone(&session)));
        let ledger = LedgerBrowser::new(api, Arc::clone(&session));
        Ok(Self {
            session,
            wallet,
            ledger,
        })
    }

    /// Runs one command. A 401 from a call made with the stored token ends
    /// the session; a rejected login or registration leaves it alone.
    async fn run(&self, command: Commands) -> riyada_client::Result<String> {
        let protected = uses_session(&command);
        let result = self.execute(command).await;
        if let Err(e) = &result {
            if ends_session(protected, e) {
                tracing::info!(error = %e, "token rejected by service, logging out");
                self.session.logout();
                self.wallet.reset();
            }
        }
        result
    }

    async fn execute(&self, command: Commands) -> riyada_client::Result<String> {
        let now = Utc::now();
        match command {
            Commands::Login(args) => {
                let identity = self.session.login(&args.email, &args.password).await?;
                Ok(views::welcome(&identity))
            }

            Commands::Register(args) => {
                let profile = RegistrationProfile {
                    email: args.email,
                    password: args.password,
                    first_name: args.first_name,
                    last_name: args.last_name,
                    phone: args.phone,
                };
                let outcome = self.session.register(&profile).await?;
                Ok(views::registration(&outcome))
            }

            Commands::Logout => {
                self.session.logout();
                self.wallet.reset();
                Ok(views::success_banner("Logged out"))
            }

            Commands::Whoami { remote } => {
                if remote {
                    Ok(views::profile(&self.session.profile().await?))
                } else {
                    Ok(views::whoami(self.session.identity().as_ref()))
                }
            }

            Commands::Dashboard => {
                let identity = self.session.identity().ok_or(ClientError::NotAuthenticated)?;
                self.load_wallet().await?;
                Ok(views::dashboard(&identity, &self.wallet.state(), now))
            }

            Commands::Transfer(args) => {
                // Cached balance for the local check; skipped if it could not
                // be read, the payment service decides either way.
                self.load_wallet().await?;
                let state = self.wallet.state();
                let available = if state.balance_error.is_some() {
                    Decimal::MAX
                } else {
                    state.balance()
                };

                let form = TransferForm {
                    recipient: args.to,
                    amount: args.amount,
                    description: args.description.unwrap_or_default(),
                };
                let request = form.validate(available)?;
                let receipt = self
                    .wallet
                    .transfer(
                        &request.to_email,
                        request.amount,
                        request.description.as_deref(),
                    )
                    .await?;
                Ok(format!(
                    "{}\nreference {}\nbalance   {}",
                    views::success_banner(&receipt.message),
                    receipt.payment.reference_id.as_deref().unwrap_or("-"),
                    format_amount(self.wallet.state().balance())
                ))
            }

            Commands::Topup(args) => {
                let amount = parse_amount(&args.amount).map_err(|msg| {
                    let mut errors = ValidationErrors::new();
                    errors.add("amount", msg);
                    ClientError::Validation(errors)
                })?;
                let mutation = self
                    .wallet
                    .top_up(amount, args.description.as_deref())
                    .await?;
                Ok(format!(
                    "{}\nbalance {}",
                    views::success_banner(&mutation.message),
                    format_amount(self.wallet.state().balance())
                ))
            }

            Commands::History(args) => {
                let filter = HistoryFilter {
                    direction: args.kind.map(Into::into),
                    period: args.period.into(),
                    search: args.search,
                };
                let records = if args.payments {
                    self.wallet.payment_history().await?
                } else {
                    self.load_wallet().await?;
                    let state = self.wallet.state();
                    if let Some(e) = state.transactions_error {
                        return Err(e);
                    }
                    state.transactions
                };
                Ok(views::history(&filter.apply(&records, now), now))
            }

            Commands::Payments { action } => match action.unwrap_or(PaymentsAction::List) {
                PaymentsAction::List => {
                    let me = self.session.identity().ok_or(ClientError::NotAuthenticated)?;
                    let list = self.wallet.payments().await?;
                    Ok(views::payments(&list, &me.id, now))
                }
                PaymentsAction::Show { id } => {
                    Ok(views::payment_detail(&self.wallet.payment(id).await?))
                }
                PaymentsAction::Cancel { id } => {
                    let payment = self.wallet.cancel_payment(id).await?;
                    Ok(format!(
                        "{}\n{}",
                        views::success_banner("Payment cancelled"),
                        views::payment_detail(&payment)
                    ))
                }
                PaymentsAction::Status { reference } => Ok(views::payment_status(
                    &self.wallet.payment_status(&reference).await?,
                )),
            },

            Commands::Ledger { action } => match action {
                LedgerAction::Page { page, size } => {
                    let page = self.ledger.transactions(page, size).await?;
                    Ok(views::ledger_page(&page, now))
                }
                LedgerAction::Recent { limit } => {
                    let entries = self.ledger.recent(limit).await?;
                    Ok(views::ledger_entries(&entries, now))
                }
                LedgerAction::Show { id } => {
                    Ok(views::ledger_detail(&self.ledger.transaction(id).await?))
                }
                LedgerAction::Audit { id } => {
                    Ok(views::audit_trail(&self.ledger.audit_trail(id).await?))
                }
                LedgerAction::Search(args) => {
                    let filter = LedgerSearch {
                        status: args.status,
                        entry_type: args.entry_type,
                        start: args.from,
                        end: args.to,
                        page: args.page,
                        size: args.size,
                    };
                    let page = self.ledger.search(&filter).await?;
                    Ok(views::ledger_page(&page, now))
                }
            },

            Commands::Analytics => Ok(views::analytics(&self.ledger.summary().await?)),
        }
    }

    /// Loads the wallet, tolerating a half that failed. Errors only if
    /// nothing could be read.
    async fn load_wallet(&self) -> riyada_client::Result<()> {
        match self.wallet.load_wallet_data().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_auth_failure() => Err(e),
            Err(e) => {
                let state = self.wallet.state();
                if state.balance_error.is_some() && state.transactions_error.is_some() {
                    Err(e)
                } else {
                    tracing::warn!(error = %e, "wallet partially refreshed");
                    Ok(())
                }
            }
        }
    }
}

/// `false` for commands that never send the stored token.
fn uses_session(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Login(_)
            | Commands::Register(_)
            | Commands::Logout
            | Commands::Payments {
                action: Some(PaymentsAction::Status { .. })
            }
    )
}

/// Expired tokens are already torn down by `SessionStore::bearer`; this
/// covers a token the service refuses before its `exp`.
fn ends_session(protected: bool, err: &ClientError) -> bool {
    protected && matches!(err, ClientError::Service { status: Some(401), .. })
}
