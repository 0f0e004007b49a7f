//! # Session Store
//!
//! Holds who is logged in and the bearer token that proves it, mirrors
//! both into [`SessionStorage`], and broadcasts every change on a
//! `watch` channel so the wallet store can follow along.
//!
//! ## Lifecycle
//!
//! ```text
//!            restore() ──────────────┐
//!                                    ▼
//!   (start) ──► loading ──► Unauthenticated ◄──── logout() / expiry
//!                                    │                   ▲
//!                           login() / register()         │
//!                                    ▼                   │
//!                              Authenticated ────────────┘
//! ```
//!
//! Expiry is only ever noticed locally, by reading the token's `exp` claim
//! in [`SessionStore::validate_token`] and [`SessionStore::bearer`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::storage::SessionStorage;
use super::token;
use crate::api::ApiClient;
use crate::config::{TOKEN_STORAGE_KEY, USER_STORAGE_KEY};
use crate::error::{ClientError, Result};
use crate::types::{Identity, LoginData, Registration, RegistrationProfile, UserProfile};
use crate::validation;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Snapshot of the session, as published to subscribers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub token: Option<String>,
    /// `true` until [`SessionStore::restore`] has run.
    pub loading: bool,
}

impl SessionState {
    /// A session is authenticated while an identity is present.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("identity", &self.identity)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("loading", &self.loading)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Creates a store in the `loading` state. Call [`restore`](Self::restore)
    /// before relying on [`is_authenticated`](Self::is_authenticated).
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionState {
            loading: true,
            ..Default::default()
        });
        Self { api, storage, state }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receives every state change from here on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Rebuilds the session from storage. No network.
    ///
    /// Both keys must be present, the identity must parse, and the token
    /// must not be expired; otherwise both keys are cleared.
    pub fn restore(&self) -> Option<Identity> {
        let saved_token = self.read_key(TOKEN_STORAGE_KEY);
        let saved_user = self.read_key(USER_STORAGE_KEY);

        let restored = match (saved_token, saved_user) {
            (Some(t), Some(user)) if !token::is_expired(&t) => {
                match serde_json::from_str::<Identity>(&user) {
                    Ok(identity) => Some((identity, t)),
                    Err(e) => {
                        warn!(error = %e, "stored identity is unreadable");
                        None
                    }
                }
            }
            (Some(_), Some(_)) => {
                info!("stored session has expired");
                None
            }
            (None, None) => None,
            _ => {
                debug!("discarding half-written session");
                None
            }
        };

        match restored {
            Some((identity, t)) => {
                info!(user = %identity.id, "session restored");
                self.state.send_replace(SessionState {
                    identity: Some(identity.clone()),
                    token: Some(t),
                    loading: false,
                });
                Some(identity)
            }
            None => {
                self.clear_storage();
                self.state.send_replace(SessionState::default());
                None
            }
        }
    }

    /// Authenticates and starts a session.
    ///
    /// On failure the current state is left exactly as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        validation::validate_login(email, password)?;

        let data = self.api.identity().login(email, password).await?;
        let identity = self.start_session(data);
        Ok(identity)
    }

    /// Creates an account, then logs in with the same credentials.
    ///
    /// A failed follow-up login is not an error: the account exists, so the
    /// result is `Ok` with `logged_in == false` and no session.
    pub async fn register(&self, profile: &RegistrationProfile) -> Result<Registration> {
        validation::validate_registration(profile)?;

        let created = self.api.identity().register(profile).await?;
        info!(user = %created.user.id, "account registered");

        match self.login(&profile.email, &profile.password).await {
            Ok(identity) => Ok(Registration {
                identity,
                logged_in: true,
                message: created.message,
            }),
            Err(e) => {
                warn!(error = %e, "auto-login after registration failed");
                Ok(Registration {
                    identity: created.user.identity(),
                    logged_in: false,
                    message: format!("{}. Please login to continue.", created.message),
                })
            }
        }
    }

    /// Ends the session. Safe to call at any time, any number of times.
    pub fn logout(&self) {
        let was_authenticated = self.is_authenticated();
        self.clear_storage();
        self.state.send_replace(SessionState::default());
        if was_authenticated {
            info!("logged out");
        }
    }

    /// `false` (and logs out) if the token has expired, `false` if there is
    /// no token, `true` otherwise.
    pub fn validate_token(&self) -> bool {
        let current = self.state.borrow().token.clone();
        match current {
            None => false,
            Some(t) if token::is_expired(&t) => {
                info!("session token expired");
                self.logout();
                false
            }
            Some(_) => true,
        }
    }

    /// The token to send with a protected call, after an expiry check.
    pub fn bearer(&self) -> Result<String> {
        let current = self.state.borrow().token.clone();
        match current {
            None => Err(ClientError::NotAuthenticated),
            Some(t) if token::is_expired(&t) => {
                info!("session token expired");
                self.logout();
                Err(ClientError::SessionExpired)
            }
            Some(t) => Ok(t),
        }
    }

    /// Identity and token together, for calls that address the user by id.
    pub fn credentials(&self) -> Result<(Identity, String)> {
        let token = self.bearer()?;
        let identity = self.identity().ok_or(ClientError::NotAuthenticated)?;
        Ok((identity, token))
    }

    /// The server-side profile of the current user.
    pub async fn profile(&self) -> Result<UserProfile> {
        let (identity, token) = self.credentials()?;
        self.api.identity().get_profile(&token, &identity.id).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn start_session(&self, data: LoginData) -> Identity {
        let identity = data.identity();

        // A failed write costs persistence across restarts, not the login.
        if let Err(e) = self.persist(&identity, &data.token) {
            warn!(error = %e, "could not persist session");
        }

        self.state.send_replace(SessionState {
            identity: Some(identity.clone()),
            token: Some(data.token),
            loading: false,
        });
        info!(user = %identity.id, email = %identity.email, "logged in");
        identity
    }

    fn persist(&self, identity: &Identity, token: &str) -> Result<()> {
        let user = serde_json::to_string(identity)?;
        self.storage.set(TOKEN_STORAGE_KEY, token)?;
        self.storage.set(USER_STORAGE_KEY, &user)
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(v) => v.filter(|s| !s.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "session storage read failed");
                None
            }
        }
    }

    fn clear_storage(&self) {
        for key in [TOKEN_STORAGE_KEY, USER_STORAGE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "session storage clear failed");
            }
        }
    }
}
