//! # Client Configuration & Constants
//!
//! Storage keys, default service locations, and timeouts live here. The
//! storage keys in particular are part of the persisted format: a build that
//! renames them silently logs every user out.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persisted Session Keys
// ---------------------------------------------------------------------------

/// Storage key for the raw bearer token.
pub const TOKEN_STORAGE_KEY: &str = "riyada_token";

/// Storage key for the JSON-serialized [`Identity`](crate::types::Identity).
pub const USER_STORAGE_KEY: &str = "riyada_user";

/// File name used by [`FileStorage`](crate::session::FileStorage) inside the
/// data directory.
pub const SESSION_FILE_NAME: &str = "session.json";

// ---------------------------------------------------------------------------
// Service Endpoints
// ---------------------------------------------------------------------------

/// Default base URL of the user (identity) service.
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8081";

/// Default base URL of the wallet service.
pub const DEFAULT_WALLET_SERVICE_URL: &str = "http://localhost:8082";

/// Default base URL of the payment service.
pub const DEFAULT_PAYMENT_SERVICE_URL: &str = "http://localhost:8083";

/// Default base URL of the ledger service.
pub const DEFAULT_LEDGER_SERVICE_URL: &str = "http://localhost:8084";

// ---------------------------------------------------------------------------
// Timing & Paging
// ---------------------------------------------------------------------------

/// Per-request timeout. Backend calls are simple CRUD; anything slower than
/// this is treated as a transport failure.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default page size for ledger history queries. Matches the ledger
/// service's own default.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default number of entries for "recent transactions" queries.
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

/// Number of transactions shown on the dashboard.
pub const DASHBOARD_RECENT_COUNT: usize = 5;

/// Decimal places used when rendering amounts.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Currency assumed when a balance response omits one.
pub const DEFAULT_CURRENCY: &str = "USD";

// ---------------------------------------------------------------------------
// Configuration Structs
// ---------------------------------------------------------------------------

/// Base URLs for the four backend services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub user: String,
    pub wallet: String,
    pub payment: String,
    pub ledger: String,
}

impl ServiceEndpoints {
    /// Points every service at the same base URL. Handy behind an API
    /// gateway and in tests that run one mock server.
    pub fn uniform(base_url: &str) -> Self {
        let base = normalize_base_url(base_url);
        Self {
            user: base.clone(),
            wallet: base.clone(),
            payment: base.clone(),
            ledger: base,
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER_SERVICE_URL.to_string(),
            wallet: DEFAULT_WALLET_SERVICE_URL.to_string(),
            payment: DEFAULT_PAYMENT_SERVICE_URL.to_string(),
            ledger: DEFAULT_LEDGER_SERVICE_URL.to_string(),
        }
    }
}

/// Everything needed to construct an [`ApiClient`](crate::api::ApiClient)
/// and its persistent session storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where the four services live.
    pub endpoints: ServiceEndpoints,

    /// Per-request timeout applied by the HTTP transport.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Directory holding the persisted session file. `None` keeps the
    /// session in memory only.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: ServiceEndpoints::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Path of the persisted session file, if a data directory is configured.
    pub fn session_file(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(SESSION_FILE_NAME))
    }
}

/// Strips trailing slashes so path joins never produce `//`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
