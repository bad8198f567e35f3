//! HTTP module for talking to the listing platform
//!
//! This module contains:
//! - Client construction with browser-like default headers
//! - Jittered pacing after every answered request
//! - The session-aware retry loop for 403 responses

mod client;
mod pacing;

pub use client::{build_http_client, ApiResponse, RateLimitedClient};
pub use pacing::Pacing;
