//! Integration tests for the session and wallet stores.
//!
//! The stores run against a scripted in-process backend: each route gets a
//! queue of canned replies, and every request is recorded so tests can
//! assert on what was (and wasn't) sent. No sockets, no sleeps beyond the
//! few polls that wait for the background session sync.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::Notify;

use riyada_client::api::{ApiClient, ApiReply, ApiRequest, HttpMethod, HttpTransport};
use riyada_client::config::{ServiceEndpoints, TOKEN_STORAGE_KEY, USER_STORAGE_KEY};
use riyada_client::ledger::LedgerBrowser;
use riyada_client::session::{MemoryStorage, SessionStorage, SessionStore};
use riyada_client::types::{Direction, Identity, RegistrationProfile, UserId};
use riyada_client::wallet::{WalletPhase, WalletStore};
use riyada_client::ClientError;

// ---------------------------------------------------------------------------
// Scripted Backend
// ---------------------------------------------------------------------------

const USER_ID: &str = "a3b1c2d4-0000-4000-8000-000000000001";

#[derive(Clone)]
enum Scripted {
    Reply(ApiReply),
    /// Signals `reached`, then holds the reply until `release` fires.
    Gated {
        reply: ApiReply,
        reached: Arc<Notify>,
        release: Arc<Notify>,
    },
}

/// Fake for all four services. The last reply queued for a route repeats.
#[derive(Default)]
struct FakeBackend {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    fn script(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.push(method, path, Scripted::Reply(ApiReply::json(status, &body)));
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Scripted) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    fn calls_to(&self, method: HttpMethod, path: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .cloned()
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> riyada_client::Result<ApiReply> {
        let key = (request.method, request.path().to_string());
        self.calls.lock().push(request);

        let next = {
            let mut routes = self.routes.lock();
            let queue = routes.get_mut(&key);
            match queue {
                Some(q) if q.len() > 1 => q.pop_front(),
                Some(q) => q.front().cloned(),
                None => None,
            }
        };

        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Gated {
                reply,
                reached,
                release,
            }) => {
                reached.notify_one();
                release.notified().await;
                Ok(reply)
            }
            None => Err(ClientError::Transport(format!(
                "no script for {} {}",
                key.0, key.1
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    backend: Arc<FakeBackend>,
    storage: Arc<MemoryStorage>,
    session: Arc<SessionStore>,
    wallet: Arc<WalletStore>,
    ledger: LedgerBrowser,
}

fn harness() -> Harness {
    let backend = Arc::new(FakeBackend::default());
    let storage = Arc::new(MemoryStorage::new());
    let api = ApiClient::new(
        &ServiceEndpoints::uniform("http://riyada.test"),
        backend.clone(),
    );
    let session = Arc::new(SessionStore::new(api.clone(), storage.clone()));
    let wallet = Arc::new(WalletStore::new(api.clone(), session.clone()));
    let ledger = LedgerBrowser::new(api, session.clone());
    Harness {
        backend,
        storage,
        session,
        wallet,
        ledger,
    }
}

fn jwt_expiring_in(secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + secs;
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{USER_ID}","exp":{exp}}}"#))
    )
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn demo_identity() -> Identity {
    Identity {
        id: UserId::new(USER_ID),
        email: "demo@riyada.com".into(),
        display_name: "Demo User".into(),
        phone: None,
    }
}

/// Puts a valid session in storage and restores it.
fn logged_in(h: &Harness) -> String {
    let token = jwt_expiring_in(3600);
    h.storage.set(TOKEN_STORAGE_KEY, &token).unwrap();
    h.storage
        .set(
            USER_STORAGE_KEY,
            &serde_json::to_string(&demo_identity()).unwrap(),
        )
        .unwrap();
    assert!(h.session.restore().is_some());
    token
}

fn balance_path() -> String {
    format!("/api/wallets/user/{USER_ID}/balance")
}

fn transactions_path() -> String {
    format!("/api/wallets/user/{USER_ID}/transactions")
}

fn balance_body(amount: &str) -> Value {
    json!({
        "success": true,
        "message": "Balance retrieved successfully",
        "balance": amount,
        "currency": "USD"
    })
}

fn transactions_body(rows: Value) -> Value {
    json!({ "success": true, "transactions": rows })
}

fn wallet_row(id: &str, kind: &str, amount: f64, description: &str) -> Value {
    json!({
        "id": id,
        "walletId": "0a0e0c56-5a43-4d1e-9b59-5b0f1e6f1a11",
        "transactionType": kind,
        "amount": amount,
        "description": description,
        "createdAt": "2024-03-01T12:30:00"
    })
}

fn payment_json(status: &str) -> Value {
    json!({
        "id": "5f4f1d1e-1111-4444-8888-000000000001",
        "fromUserId": USER_ID,
        "toUserId": "b3b1c2d4-0000-4000-8000-000000000002",
        "toEmail": "a@b.com",
        "amount": "50.00",
        "currency": "USD",
        "status": status,
        "description": "lunch",
        "referenceId": "PAY-20240301-0001",
        "createdAt": "2024-03-01T12:30:00"
    })
}

async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn demo_login_populates_and_persists_session() {
    let h = harness();
    h.session.restore();
    let token = jwt_expiring_in(3600);
    h.backend.script(
        HttpMethod::Post,
        "/api/users/login",
        200,
        json!({
            "success": true,
            "message": "Login successful",
            "data": {
                "userId": 1,
                "email": "demo@riyada.com",
                "firstName": "Demo",
                "lastName": "User",
                "token": token,
                "tokenType": "Bearer",
                "expiresIn": 3600
            }
        }),
    );

    let identity = h
        .session
        .login("demo@riyada.com", "password123")
        .await
        .expect("login");

    assert_eq!(identity.display_name, "Demo User");
    assert_eq!(identity.id, UserId::new("1"));
    assert!(h.session.is_authenticated());
    assert_eq!(h.session.bearer().unwrap(), token);
    assert_eq!(h.storage.get(TOKEN_STORAGE_KEY).unwrap(), Some(token));

    let sent = h.backend.calls_to(HttpMethod::Post, "/api/users/login");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body.as_ref().unwrap()["email"], "demo@riyada.com");
    assert!(sent[0].bearer.is_none());
}

#[tokio::test]
async fn rejected_login_returns_server_message() {
    let h = harness();
    h.session.restore();
    h.backend.script(
        HttpMethod::Post,
        "/api/users/login",
        401,
        json!({"success": false, "message": "Invalid email or password", "error": "AUTHENTICATION_FAILED"}),
    );

    let err = h
        .session
        .login("demo@riyada.com", "wrong-password")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(err.is_auth_failure());
    assert!(!h.session.is_authenticated());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn registration_with_failed_auto_login_asks_for_manual_login() {
    let h = harness();
    h.session.restore();
    h.backend.script(
        HttpMethod::Post,
        "/api/users/register",
        201,
        json!({
            "success": true,
            "message": "User registered successfully",
            "user": {
                "id": USER_ID,
                "email": "new@riyada.com",
                "firstName": "New",
                "lastName": "User",
                "isActive": true
            }
        }),
    );
    h.backend.script(
        HttpMethod::Post,
        "/api/users/login",
        500,
        json!({"success": false, "message": "An unexpected error occurred during login"}),
    );

    let outcome = h
        .session
        .register(&RegistrationProfile {
            email: "new@riyada.com".into(),
            password: "password123".into(),
            first_name: "New".into(),
            last_name: "User".into(),
            phone: None,
        })
        .await
        .expect("registration itself succeeded");

    assert!(!outcome.logged_in);
    assert_eq!(
        outcome.message,
        "User registered successfully. Please login to continue."
    );
    assert_eq!(outcome.identity.email, "new@riyada.com");
    assert!(!h.session.is_authenticated());
    assert_eq!(h.session.state().token, None);
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn registration_then_auto_login() {
    let h = harness();
    h.session.restore();
    let token = jwt_expiring_in(3600);
    h.backend.script(
        HttpMethod::Post,
        "/api/users/register",
        201,
        json!({
            "success": true,
            "message": "User registered successfully",
            "user": {"id": USER_ID, "email": "new@riyada.com", "firstName": "New", "lastName": "User"}
        }),
    );
    h.backend.script(
        HttpMethod::Post,
        "/api/users/login",
        200,
        json!({
            "success": true,
            "data": {"userId": USER_ID, "email": "new@riyada.com", "firstName": "New", "lastName": "User", "token": token}
        }),
    );

    let outcome = h
        .session
        .register(&RegistrationProfile {
            email: "new@riyada.com".into(),
            password: "password123".into(),
            first_name: "New".into(),
            last_name: "User".into(),
            phone: Some("+1234567890".into()),
        })
        .await
        .unwrap();

    assert!(outcome.logged_in);
    assert_eq!(outcome.message, "User registered successfully");
    assert_eq!(h.session.bearer().unwrap(), token);
}

#[tokio::test]
async fn duplicate_registration_is_an_error() {
    let h = harness();
    h.session.restore();
    h.backend.script(
        HttpMethod::Post,
        "/api/users/register",
        400,
        json!({"success": false, "message": "Email already exists", "error": "REGISTRATION_FAILED"}),
    );

    let err = h
        .session
        .register(&RegistrationProfile {
            email: "demo@riyada.com".into(),
            password: "password123".into(),
            first_name: "Demo".into(),
            last_name: "User".into(),
            phone: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Email already exists");
    assert!(h.backend.calls_to(HttpMethod::Post, "/api/users/login").is_empty());
}

#[tokio::test]
async fn profile_fetch_uses_bearer() {
    let h = harness();
    let token = logged_in(&h);
    h.backend.script(
        HttpMethod::Get,
        &format!("/api/users/profile/{USER_ID}"),
        200,
        json!({
            "success": true,
            "user": {"id": USER_ID, "email": "demo@riyada.com", "firstName": "Demo", "lastName": "User", "phone": "+966501234567"}
        }),
    );

    let profile = h.session.profile().await.unwrap();
    assert_eq!(profile.phone.as_deref(), Some("+966501234567"));
    let calls = h
        .backend
        .calls_to(HttpMethod::Get, &format!("/api/users/profile/{USER_ID}"));
    assert_eq!(calls[0].bearer.as_deref(), Some(token.as_str()));
}

// ---------------------------------------------------------------------------
// Wallet Loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_populates_balance_and_history() {
    let h = harness();
    let token = logged_in(&h);
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("150.00"));
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([
            wallet_row("t-2", "DEBIT", 50.0, "lunch"),
            wallet_row("t-1", "CREDIT", 200.0, "salary"),
        ])),
    );

    assert_eq!(h.wallet.state().phase, WalletPhase::Empty);
    h.wallet.load_wallet_data().await.unwrap();

    let state = h.wallet.state();
    assert_eq!(state.phase, WalletPhase::Populated);
    assert_eq!(state.balance(), dec("150.00"));
    assert_eq!(state.snapshot.currency, "USD");
    let ids: Vec<_> = state.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t-2", "t-1"]);
    assert_eq!(state.transactions[0].direction, Direction::Sent);
    assert_eq!(state.transactions[1].direction, Direction::Received);

    let calls = h.backend.calls_to(HttpMethod::Get, &balance_path());
    assert_eq!(calls[0].bearer.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn missing_wallet_is_provisioned_and_balance_retried() {
    let h = harness();
    logged_in(&h);
    let not_found = json!({
        "success": false,
        "message": format!("Wallet not found for user: {USER_ID}"),
        "error": "WALLET_NOT_FOUND"
    });
    h.backend
        .script(HttpMethod::Get, &balance_path(), 404, not_found.clone());
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("0.00"));
    h.backend
        .script(HttpMethod::Get, &transactions_path(), 404, not_found);
    h.backend
        .script(HttpMethod::Get, &transactions_path(), 200, transactions_body(json!([])));
    let create_path = format!("/api/wallets/create-for-user/{USER_ID}");
    h.backend.script(
        HttpMethod::Post,
        &create_path,
        201,
        json!({
            "success": true,
            "message": "Wallet created successfully",
            "wallet": {
                "id": "0a0e0c56-5a43-4d1e-9b59-5b0f1e6f1a11",
                "userId": USER_ID,
                "balance": 0,
                "currency": "USD",
                "isActive": true
            }
        }),
    );

    h.wallet.load_wallet_data().await.unwrap();

    assert_eq!(h.backend.calls_to(HttpMethod::Post, &create_path).len(), 1);
    assert_eq!(h.backend.calls_to(HttpMethod::Get, &balance_path()).len(), 2);
    let state = h.wallet.state();
    assert_eq!(state.phase, WalletPhase::Populated);
    assert_eq!(state.balance(), Decimal::ZERO);
    assert!(state.transactions.is_empty());
    assert!(state.transactions_error.is_none());
}

#[tokio::test]
async fn create_wallet_treats_existing_wallet_as_success() {
    let h = harness();
    logged_in(&h);
    h.backend.script(
        HttpMethod::Post,
        &format!("/api/wallets/create-for-user/{USER_ID}"),
        400,
        json!({"success": false, "message": "User already has an active wallet", "error": "WALLET_CREATION_FAILED"}),
    );

    assert!(!h.wallet.create_wallet_if_needed().await.unwrap());
    assert!(!h.wallet.create_wallet_if_needed().await.unwrap());
}

#[tokio::test]
async fn partial_failure_keeps_stale_history() {
    let h = harness();
    logged_in(&h);
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("100"));
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("120"));
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([wallet_row("t-1", "CREDIT", 100.0, "top-up")])),
    );
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        500,
        json!({"success": false, "message": "An unexpected error occurred while retrieving transactions"}),
    );

    h.wallet.load_wallet_data().await.unwrap();
    let err = h.wallet.load_wallet_data().await.unwrap_err();
    assert!(err.is_retryable());

    let state = h.wallet.state();
    assert_eq!(state.balance(), dec("120"));
    assert_eq!(state.transactions.len(), 1);
    assert_eq!(state.transactions[0].id, "t-1");
    assert!(state.balance_error.is_none());
    assert!(state.transactions_error.is_some());
    assert_eq!(state.phase, WalletPhase::Populated);
}

#[tokio::test]
async fn stale_load_does_not_overwrite_newer_state() {
    let h = harness();
    logged_in(&h);
    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    // First load's balance hangs; second load's answers at once.
    h.backend.push(
        HttpMethod::Get,
        &balance_path(),
        Scripted::Gated {
            reply: ApiReply::json(200, &balance_body("100")),
            reached: reached.clone(),
            release: release.clone(),
        },
    );
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("200"));
    h.backend
        .script(HttpMethod::Get, &transactions_path(), 200, transactions_body(json!([])));

    let slow = {
        let wallet = h.wallet.clone();
        tokio::spawn(async move { wallet.load_wallet_data().await })
    };
    reached.notified().await;

    h.wallet.load_wallet_data().await.unwrap();
    assert_eq!(h.wallet.state().balance(), dec("200"));

    release.notify_one();
    slow.await.unwrap().unwrap();

    let state = h.wallet.state();
    assert_eq!(state.balance(), dec("200"));
    assert_eq!(state.phase, WalletPhase::Populated);
}

#[tokio::test]
async fn reset_discards_in_flight_load() {
    let h = harness();
    logged_in(&h);
    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    h.backend.push(
        HttpMethod::Get,
        &balance_path(),
        Scripted::Gated {
            reply: ApiReply::json(200, &balance_body("999")),
            reached: reached.clone(),
            release: release.clone(),
        },
    );
    h.backend
        .script(HttpMethod::Get, &transactions_path(), 200, transactions_body(json!([])));

    let pending = {
        let wallet = h.wallet.clone();
        tokio::spawn(async move { wallet.load_wallet_data().await })
    };
    reached.notified().await;

    h.session.logout();
    h.wallet.reset();
    release.notify_one();
    let _ = pending.await.unwrap();

    let state = h.wallet.state();
    assert_eq!(state.phase, WalletPhase::Empty);
    assert_eq!(state.balance(), Decimal::ZERO);
}

#[tokio::test]
async fn refresh_after_logout_is_empty_and_offline() {
    let h = harness();
    logged_in(&h);
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("75"));
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([wallet_row("t-1", "CREDIT", 75.0, "gift")])),
    );
    h.wallet.load_wallet_data().await.unwrap();
    assert_eq!(h.wallet.state().balance(), dec("75"));

    h.session.logout();
    let before = h.backend.call_count();
    h.wallet.refresh_wallet().await.unwrap();

    let state = h.wallet.state();
    assert_eq!(state.phase, WalletPhase::Empty);
    assert_eq!(state.balance(), Decimal::ZERO);
    assert!(state.transactions.is_empty());
    assert_eq!(h.backend.call_count(), before);
}

#[tokio::test]
async fn session_sync_follows_login_and_logout() {
    let h = harness();
    h.session.restore();
    let sync = h.wallet.spawn_session_sync();

    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("42.10"));
    h.backend
        .script(HttpMethod::Get, &transactions_path(), 200, transactions_body(json!([])));
    h.backend.script(
        HttpMethod::Post,
        "/api/users/login",
        200,
        json!({
            "success": true,
            "data": {"userId": USER_ID, "email": "demo@riyada.com", "firstName": "Demo", "lastName": "User", "token": jwt_expiring_in(3600)}
        }),
    );

    h.session
        .login("demo@riyada.com", "password123")
        .await
        .unwrap();
    eventually("wallet load after login", || {
        h.wallet.state().phase == WalletPhase::Populated
    })
    .await;
    assert_eq!(h.wallet.state().balance(), dec("42.10"));

    h.session.logout();
    eventually("wallet reset after logout", || {
        h.wallet.state().phase == WalletPhase::Empty
    })
    .await;

    sync.abort();
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transfer_reloads_from_server_instead_of_subtracting() {
    let h = harness();
    logged_in(&h);
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("100.00"));
    // The server charges a fee; a local subtraction would show 50.00.
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("49.50"));
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([])),
    );
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([wallet_row("t-9", "DEBIT", 50.5, "lunch")])),
    );
    h.backend.script(
        HttpMethod::Post,
        "/api/payments/transfer",
        201,
        json!({"success": true, "message": "Payment processed successfully", "payment": payment_json("COMPLETED")}),
    );

    h.wallet.load_wallet_data().await.unwrap();
    let receipt = h
        .wallet
        .transfer("a@b.com", dec("50.00"), Some("lunch"))
        .await
        .unwrap();

    assert_eq!(receipt.message, "Payment processed successfully");
    let state = h.wallet.state();
    assert_eq!(state.balance(), dec("49.50"));
    assert_eq!(state.transactions[0].id, "t-9");

    let sent = h.backend.calls_to(HttpMethod::Post, "/api/payments/transfer");
    let body = sent[0].body.as_ref().unwrap();
    assert_eq!(body["toEmail"], "a@b.com");
    assert_eq!(body["amount"], "50.00");
    assert_eq!(body["description"], "lunch");
}

#[tokio::test]
async fn insufficient_balance_transfer_leaves_state_untouched() {
    let h = harness();
    logged_in(&h);
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("20.00"));
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([wallet_row("t-1", "CREDIT", 20.0, "gift")])),
    );
    h.backend.script(
        HttpMethod::Post,
        "/api/payments/transfer",
        200,
        json!({"success": false, "message": "Insufficient balance"}),
    );

    h.wallet.load_wallet_data().await.unwrap();
    let before = h.wallet.state();
    let reads_before = h.backend.calls_to(HttpMethod::Get, &balance_path()).len();

    let err = h
        .wallet
        .transfer("a@b.com", dec("50.00"), Some("lunch"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Insufficient balance");
    assert_eq!(h.wallet.state(), before);
    assert_eq!(
        h.backend.calls_to(HttpMethod::Get, &balance_path()).len(),
        reads_before
    );
}

#[tokio::test]
async fn invalid_transfer_is_rejected_locally() {
    let h = harness();
    logged_in(&h);

    let err = h
        .wallet
        .transfer("not-an-email", dec("-1"), None)
        .await
        .unwrap_err();

    match err {
        ClientError::Validation(errors) => {
            assert!(errors.get("recipient").is_some());
            assert_eq!(errors.get("amount"), Some("Amount must be greater than 0"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn expired_session_blocks_transfer_and_logs_out() {
    let h = harness();
    h.session.restore();
    h.backend.script(
        HttpMethod::Post,
        "/api/users/login",
        200,
        json!({
            "success": true,
            "data": {"userId": USER_ID, "email": "demo@riyada.com", "firstName": "Demo", "lastName": "User", "token": jwt_expiring_in(-5)}
        }),
    );
    // Issued by a server whose clock runs ahead; already past `exp` here.
    h.session
        .login("demo@riyada.com", "password123")
        .await
        .unwrap();
    let before = h.backend.call_count();

    let err = h
        .wallet
        .transfer("a@b.com", dec("1"), None)
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::SessionExpired);
    assert!(!h.session.is_authenticated());
    assert!(h.storage.is_empty());
    assert_eq!(h.backend.call_count(), before);
    assert_eq!(
        h.wallet.transfer("a@b.com", dec("1"), None).await.unwrap_err(),
        ClientError::NotAuthenticated
    );
}

#[tokio::test]
async fn expired_token_in_storage_is_not_restored() {
    let h = harness();
    h.storage
        .set(TOKEN_STORAGE_KEY, &jwt_expiring_in(-60))
        .unwrap();
    h.storage
        .set(
            USER_STORAGE_KEY,
            &serde_json::to_string(&demo_identity()).unwrap(),
        )
        .unwrap();

    assert!(h.session.restore().is_none());
    assert!(!h.session.is_loading());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn top_up_credits_and_reloads() {
    let h = harness();
    logged_in(&h);
    let credit_path = format!("/api/wallets/user/{USER_ID}/credit");
    h.backend.script(
        HttpMethod::Post,
        &credit_path,
        200,
        json!({
            "success": true,
            "message": "Amount credited successfully",
            "wallet": {"id": "0a0e0c56-5a43-4d1e-9b59-5b0f1e6f1a11", "userId": USER_ID, "balance": 125.5, "currency": "USD"}
        }),
    );
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("125.50"));
    h.backend.script(
        HttpMethod::Get,
        &transactions_path(),
        200,
        transactions_body(json!([wallet_row("t-3", "CREDIT", 25.5, "Wallet credit")])),
    );

    let mutation = h.wallet.top_up(dec("25.50"), None).await.unwrap();
    assert_eq!(mutation.message, "Amount credited successfully");

    let sent = h.backend.calls_to(HttpMethod::Post, &credit_path);
    assert!(sent[0]
        .query
        .contains(&("amount".to_string(), "25.50".to_string())));
    assert!(!sent[0].query.iter().any(|(k, _)| k == "description"));
    assert_eq!(h.wallet.state().balance(), dec("125.50"));
}

#[tokio::test]
async fn cancel_payment_reloads_and_history_projects_direction() {
    let h = harness();
    logged_in(&h);
    let payment_id = uuid::Uuid::parse_str("5f4f1d1e-1111-4444-8888-000000000001").unwrap();
    h.backend.script(
        HttpMethod::Post,
        &format!("/api/payments/{payment_id}/cancel"),
        200,
        json!({"success": true, "message": "Payment cancelled successfully", "payment": payment_json("CANCELLED")}),
    );
    h.backend
        .script(HttpMethod::Get, &balance_path(), 200, balance_body("100"));
    h.backend
        .script(HttpMethod::Get, &transactions_path(), 200, transactions_body(json!([])));
    h.backend.script(
        HttpMethod::Get,
        &format!("/api/payments/user/{USER_ID}"),
        200,
        json!({"success": true, "payments": [payment_json("PENDING")], "count": 1}),
    );

    let cancelled = h.wallet.cancel_payment(payment_id).await.unwrap();
    assert_eq!(cancelled.status.as_str(), "CANCELLED");
    assert_eq!(h.wallet.state().phase, WalletPhase::Populated);

    let history = h.wallet.payment_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].direction, Direction::Sent);
    assert_eq!(history[0].counterparty_email.as_deref(), Some("a@b.com"));
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ledger_summary_and_pages() {
    let h = harness();
    let token = logged_in(&h);
    h.backend.script(
        HttpMethod::Get,
        "/api/ledger/reports/summary",
        200,
        json!({
            "success": true,
            "message": "Financial summary retrieved successfully",
            "data": {"totalSent": 150.25, "totalReceived": null, "totalTransactions": 4}
        }),
    );
    h.backend.script(
        HttpMethod::Get,
        "/api/ledger/transactions",
        200,
        json!({
            "success": true,
            "data": {"content": [], "totalElements": 0, "totalPages": 0, "number": 0, "size": 20}
        }),
    );

    let summary = h.ledger.summary().await.unwrap();
    assert_eq!(summary.sent(), dec("150.25"));
    assert_eq!(summary.received(), Decimal::ZERO);
    assert_eq!(summary.count(), 4);

    let page = h.ledger.transactions(0, 0).await.unwrap();
    assert!(page.content.is_empty());
    let call = &h.backend.calls_to(HttpMethod::Get, "/api/ledger/transactions")[0];
    assert_eq!(call.bearer.as_deref(), Some(token.as_str()));
    assert!(call.query.contains(&("size".to_string(), "20".to_string())));
}

#[tokio::test]
async fn ledger_failure_surfaces_service_message() {
    let h = harness();
    logged_in(&h);
    h.backend.script(
        HttpMethod::Get,
        "/api/ledger/transactions/recent",
        500,
        json!({"success": false, "message": "Failed to fetch recent transactions: timeout", "data": null}),
    );

    let err = h.ledger.recent(5).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to fetch recent transactions: timeout"
    );
}

#[tokio::test]
async fn ledger_requires_session() {
    let h = harness();
    h.session.restore();
    assert_eq!(
        h.ledger.summary().await.unwrap_err(),
        ClientError::NotAuthenticated
    );
    assert_eq!(h.backend.call_count(), 0);
}
