//! Configuration module for Rent-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use rent_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling {} cities", config.cities.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CityEntry, ClientConfig, Config, CrawlConfig, OutputConfig, SessionConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
