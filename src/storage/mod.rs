//! Storage module for the on-disk listing corpus
//!
//! Each city gets its own directory under the data root:
//!
//! ```text
//! <data-dir>/<city-slug>/pages/page_<n>.json
//! <data-dir>/<city-slug>/annonces/<listing-id>.json
//! ```
//!
//! Page files double as the resumption checkpoint and listing files as proof
//! of a prior successful fetch, so every file is placed atomically.

mod corpus;
mod slug;

pub use corpus::{write_json_atomic, CityCorpus, CorpusStore};
pub use slug::city_slug;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the corpus
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error for {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to place {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
