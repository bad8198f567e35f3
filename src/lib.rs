//! Rent-Ripple: a resumable rental-listing crawler
//!
//! This crate keeps an authenticated session alive against an anti-bot
//! protected listing API, paces and retries its requests, and crawls several
//! cities in round-robin turns into an on-disk JSON corpus that can be
//! resumed after an interruption.

pub mod api;
pub mod config;
pub mod crawler;
pub mod http;
pub mod output;
pub mod session;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Rent-Ripple operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Session expired: {url} still returned 403 after {attempts} attempts")]
    SessionExpired { url: String, attempts: u32 },

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition for {city}: {from} -> {to}")]
    InvalidTransition {
        city: String,
        from: state::TargetState,
        to: state::TargetState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true if this error means the shared session is unusable
    ///
    /// These errors doom every target of a run, not just the one that
    /// surfaced them.
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Self::Session(_) | Self::SessionExpired { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Rent-Ripple operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, CrawlScheduler, StopSignal};
pub use state::{CrawlTarget, TargetState};
