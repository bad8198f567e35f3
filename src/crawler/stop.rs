//! Cooperative cancellation
//!
//! The crawl polls a [`StopSignal`] between rounds and before every listing
//! detail fetch. In-flight requests are never interrupted.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A process-wide "please stop" flag readable by the crawl
pub trait StopSignal: Send + Sync {
    /// Returns true once a stop has been requested
    fn is_set(&self) -> bool;

    /// Requests a stop
    fn set(&self) -> io::Result<()>;

    /// Withdraws any pending stop request
    fn clear(&self) -> io::Result<()>;
}

/// Stop signal backed by the presence of a marker file
///
/// Lets a separate process (an operator, a UI) stop a running crawl by
/// creating the file.
#[derive(Debug, Clone)]
pub struct SentinelFile {
    path: PathBuf,
}

impl SentinelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StopSignal for SentinelFile {
    fn is_set(&self) -> bool {
        self.path.exists()
    }

    fn set(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(|_| ())
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory stop signal, cloned handles share one flag
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StopSignal for StopFlag {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set(&self) -> io::Result<()> {
        self.flag.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.flag.store(false, Ordering::SeqCst);
        Ok(())
    }
}
