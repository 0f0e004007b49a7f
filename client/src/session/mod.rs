//! # Session
//!
//! Authentication state for one user at a time.
//!
//! - [`SessionStore`]: identity, token, login/register/logout, expiry.
//! - [`SessionStorage`]: where the session survives restarts.
//! - [`token`]: local `exp` inspection for bearer tokens.

pub mod storage;
pub mod store;
pub mod token;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{SessionState, SessionStore};
