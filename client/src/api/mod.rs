//! # Service API Clients
//!
//! Typed clients for the four Riyada backends, all sharing one
//! [`HttpTransport`].
//!
//! ```text
//! transport.rs: HttpTransport seam, request/reply types, reqwest impl
//! identity.rs : user service: login, register, profile
//! wallet.rs   : wallet service: balance, history, create, credit/debit
//! payment.rs  : payment service: transfer, lookup, history, cancel
//! ledger.rs   : ledger service: paged history, audit trail, reports
//! ```
//!
//! ## Response Normalization
//!
//! The services wrap everything in `{success, message, ...}` envelopes and
//! are not consistent about status codes. [`normalize`] folds every reply
//! into one rule: a 2xx whose body does not say `success: false` is a
//! success; anything else is a [`ClientError::Service`] carrying the
//! server's message. Transport failures never get this far.
//!
//! The clients don't check tokens. Callers get a bearer from
//! [`SessionStore::bearer`](crate::session::SessionStore::bearer), which
//! handles expiry.

pub mod identity;
pub mod ledger;
pub mod payment;
pub mod transport;
pub mod wallet;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{normalize_base_url, ClientConfig, ServiceEndpoints};
use crate::error::{ClientError, Result};

pub use identity::{IdentityClient, RegisterResponse};
pub use ledger::LedgerClient;
pub use payment::{PaymentClient, PaymentReceipt};
pub use transport::{ApiReply, ApiRequest, HttpMethod, HttpTransport, ReqwestTransport};
pub use wallet::{WalletClient, WalletMutation};

// ---------------------------------------------------------------------------
// Aggregate Client
// ---------------------------------------------------------------------------

/// All four service clients, sharing one transport.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    identity: IdentityClient,
    wallet: WalletClient,
    payment: PaymentClient,
    ledger: LedgerClient,
}

impl ApiClient {
    pub fn new(endpoints: &ServiceEndpoints, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            identity: IdentityClient::new(ServiceHandle::new(&endpoints.user, transport.clone())),
            wallet: WalletClient::new(ServiceHandle::new(&endpoints.wallet, transport.clone())),
            payment: PaymentClient::new(ServiceHandle::new(&endpoints.payment, transport.clone())),
            ledger: LedgerClient::new(ServiceHandle::new(&endpoints.ledger, transport)),
        }
    }

    /// Builds a client backed by [`ReqwestTransport`].
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(&config.endpoints, Arc::new(transport)))
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    pub fn wallet(&self) -> &WalletClient {
        &self.wallet
    }

    pub fn payment(&self) -> &PaymentClient {
        &self.payment
    }

    pub fn ledger(&self) -> &LedgerClient {
        &self.ledger
    }
}

// ---------------------------------------------------------------------------
// Per-Service Handle
// ---------------------------------------------------------------------------

/// Base URL + transport for one service.
#[derive(Clone)]
pub(crate) struct ServiceHandle {
    base: String,
    transport: Arc<dyn HttpTransport>,
}

impl ServiceHandle {
    pub(crate) fn new(base: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base: normalize_base_url(base),
            transport,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Sends the request and normalizes the reply into the body's JSON.
    pub(crate) async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(%method, %url, "service request");

        let reply = match self.transport.send(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "service unreachable");
                return Err(e);
            }
        };

        let status = reply.status;
        let outcome = normalize(reply);
        match &outcome {
            Ok(_) => tracing::debug!(%method, %url, status, "service ok"),
            Err(e) => tracing::debug!(%method, %url, status, error = %e, "service refused"),
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Folds a raw reply into `Ok(body)` or a [`ClientError`].
///
/// - Non-2xx → `Service` with the body's `message`, else its `error`,
///   else the HTTP reason phrase.
/// - 2xx with `success: false` → `Service` the same way.
/// - 2xx with an unparseable body → `Decode`.
/// - 2xx with an empty body → `Ok(Value::Null)`.
pub fn normalize(reply: ApiReply) -> Result<Value> {
    let parsed: Option<Value> = if reply.body.iter().all(u8::is_ascii_whitespace) {
        Some(Value::Null)
    } else {
        serde_json::from_slice(&reply.body).ok()
    };

    if !reply.is_success() {
        return Err(service_error(reply.status, parsed.as_ref()));
    }

    let body = parsed.ok_or_else(|| {
        ClientError::Decode(format!(
            "expected JSON body, got {} bytes",
            reply.body.len()
        ))
    })?;

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(service_error(reply.status, Some(&body)));
    }

    Ok(body)
}

fn service_error(status: u16, body: Option<&Value>) -> ClientError {
    let text = |key: &str| {
        body.and_then(|b| b.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let code = text("error");
    let message = text("message")
        .or_else(|| code.clone())
        .unwrap_or_else(|| reason_phrase(status));

    ClientError::Service {
        status: Some(status),
        code,
        message,
    }
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|r| format!("Request failed: {r}"))
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

/// Pulls `key` out of a success body and decodes it.
pub(crate) fn field<T: DeserializeOwned>(body: &Value, key: &str) -> Result<T> {
    let value = body
        .get(key)
        .ok_or_else(|| ClientError::Decode(format!("missing field `{key}`")))?;
    serde_json::from_value(value.clone()).map_err(|e| ClientError::Decode(format!("`{key}`: {e}")))
}

/// Reads the optional top-level `message` of a success body.
pub(crate) fn message(body: &Value) -> Option<String> {
    body.get("message").and_then(Value::as_str).map(str::to_string)
}
