//! Session module: cookie material for the protected API
//!
//! The session is minted by an external browser step that solves the
//! platform's challenge and writes a cookie file. This module reads that
//! file into a `Cookie` header value, caches it, and re-runs the browser
//! step when the caller decides the session has gone stale.

mod cookies;
mod store;

pub use cookies::{cookie_header, parse_cookie_file, CookieRecord};
pub use store::SessionStore;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures to acquire usable session material
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session unavailable: {0}")]
    Unavailable(String),

    #[error("Session refresh timed out after {timeout:?}")]
    RefreshTimeout { timeout: Duration },

    #[error("Session refresh process exited with {status}")]
    RefreshFailed { status: String },

    #[error("Failed to start session refresh process '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Invalid credentials in {}: {reason}", path.display())]
    InvalidCredentials { path: PathBuf, reason: String },
}

/// Authenticated cookie material loaded from the credential file
#[derive(Clone)]
pub struct Session {
    cookie_header: String,
    fetched_at: DateTime<Utc>,
}

impl Session {
    pub fn new(cookie_header: String) -> Self {
        Self {
            cookie_header,
            fetched_at: Utc::now(),
        }
    }

    /// Value for the `Cookie` request header
    pub fn cookie_header(&self) -> &str {
        &self.cookie_header
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

// Cookie values never reach logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cookie_header", &"<redacted>")
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}
