use crate::config::SessionConfig;
use crate::session::{cookie_header, parse_cookie_file, Session, SessionError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;

/// Owns the process-wide session cache and the refresh step
///
/// One store is shared by every target of a run. The cached header is only
/// dropped on an explicit refresh or [`SessionStore::invalidate`]; there is
/// no time-based expiry. Refreshes are serialized so at most one browser
/// step runs at a time.
pub struct SessionStore {
    cookie_file: PathBuf,
    refresh_command: Vec<String>,
    refresh_timeout: Duration,
    cache: Mutex<Option<Session>>,
    refresh_lock: Mutex<()>,
    refresh_generation: AtomicU64,
}

impl SessionStore {
    pub fn new(
        cookie_file: impl Into<PathBuf>,
        refresh_command: Vec<String>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            cookie_file: cookie_file.into(),
            refresh_command,
            refresh_timeout,
            cache: Mutex::new(None),
            refresh_lock: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.cookie_file.clone(),
            config.refresh_command.clone(),
            config.refresh_timeout(),
        )
    }

    pub fn cookie_file(&self) -> &Path {
        &self.cookie_file
    }

    /// Number of completed refreshes since this store was created
    pub fn refresh_count(&self) -> u64 {
        self.refresh_generation.load(Ordering::SeqCst)
    }

    /// Returns the `Cookie` header value for the current session
    ///
    /// A cached value is returned as is unless `force_refresh` is set. On a
    /// cache miss the credential file is read, running the refresh step
    /// first when the file does not exist yet.
    pub async fn load_cookie_header(&self, force_refresh: bool) -> Result<String, SessionError> {
        if !force_refresh {
            if let Some(session) = self.cache.lock().await.as_ref() {
                tracing::trace!("Session cache hit (loaded {})", session.fetched_at());
                return Ok(session.cookie_header().to_string());
            }
        }

        if force_refresh || !self.cookie_file.exists() {
            self.refresh().await?;
        }

        let session = self.read_session().await?;
        let header = session.cookie_header().to_string();
        *self.cache.lock().await = Some(session);
        Ok(header)
    }

    /// Drops the cached session so the next load re-reads the credential file
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Runs the external browser step and checks the cookie file it leaves
    ///
    /// Fails with `RefreshTimeout` when the step outlives the timeout, with
    /// `RefreshFailed` on a nonzero exit and with `InvalidCredentials` when
    /// the file is missing or malformed afterwards. Never retried here.
    /// Callers that were waiting on an in-flight refresh reuse its result.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let observed = self.refresh_generation.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;
        if self.refresh_generation.load(Ordering::SeqCst) != observed {
            tracing::debug!("Session was refreshed while waiting, reusing it");
            return Ok(());
        }

        let (program, args) = self
            .refresh_command
            .split_first()
            .ok_or_else(|| SessionError::Unavailable("no refresh command configured".to_string()))?;

        tracing::info!("Refreshing session via '{}'", program);

        let mut child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let status = match tokio::time::timeout(self.refresh_timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(SessionError::Unavailable(format!(
                    "lost track of refresh process: {}",
                    e
                )))
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out refresh process: {}", e);
                }
                return Err(SessionError::RefreshTimeout {
                    timeout: self.refresh_timeout,
                });
            }
        };

        if !status.success() {
            return Err(SessionError::RefreshFailed {
                status: status.to_string(),
            });
        }

        if !self.cookie_file.exists() {
            return Err(SessionError::InvalidCredentials {
                path: self.cookie_file.clone(),
                reason: "file not created by refresh".to_string(),
            });
        }

        let content = tokio::fs::read_to_string(&self.cookie_file)
            .await
            .map_err(|e| SessionError::InvalidCredentials {
                path: self.cookie_file.clone(),
                reason: e.to_string(),
            })?;
        let cookies = parse_cookie_file(&self.cookie_file, &content)?;

        self.invalidate().await;
        self.refresh_generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Session refreshed ({} cookies)", cookies.len());

        Ok(())
    }

    async fn read_session(&self) -> Result<Session, SessionError> {
        let content = tokio::fs::read_to_string(&self.cookie_file)
            .await
            .map_err(|e| {
                SessionError::Unavailable(format!(
                    "cannot read {}: {}",
                    self.cookie_file.display(),
                    e
                ))
            })?;

        let cookies = parse_cookie_file(&self.cookie_file, &content)
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        tracing::debug!(
            "Loaded {} cookies from {}",
            cookies.len(),
            self.cookie_file.display()
        );
        Ok(Session::new(cookie_header(&cookies)))
    }
}
