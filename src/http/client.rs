//! Session-aware HTTP client
//!
//! # Response handling
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 403, attempts left | Refresh session, wait the cooldown, retry |
//! | HTTP 403, last attempt | `SessionExpired` |
//! | HTTP 404 | Returned to the caller, paced |
//! | Other HTTP >= 400 | `HttpStatus`, no retry, no pacing |
//! | HTTP < 400 | Returned to the caller, paced |

use crate::config::ClientConfig;
use crate::http::Pacing;
use crate::session::SessionStore;
use crate::{CrawlError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, ORIGIN, REFERER};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds the underlying HTTP client with browser-like default headers
pub fn build_http_client(config: &ClientConfig) -> Result<Client> {
    let origin = config.base_url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9"));
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{}/", origin)) {
        headers.insert(REFERER, value);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|source| CrawlError::Request {
            url: config.base_url.clone(),
            source,
        })
}

/// A response whose body has been read before pacing
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    url: String,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decodes the body, reporting the URL on failure
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| CrawlError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Issues paced requests with the shared session attached
pub struct RateLimitedClient {
    http: Client,
    session: Arc<SessionStore>,
    pacing: Pacing,
    max_retries: u32,
    retry_cooldown: Duration,
    base_url: Url,
}

impl RateLimitedClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CrawlError::Config(crate::ConfigError::InvalidUrl(format!(
                "Invalid base-url: {}",
                e
            )))
        })?;

        Ok(Self {
            http: build_http_client(config)?,
            session,
            pacing: Pacing::from_config(config),
            max_retries: config.max_retries.max(1),
            retry_cooldown: Duration::from_millis(config.retry_cooldown_ms),
            base_url,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Resolves an API path against the configured base URL
    pub fn endpoint(&self, path: &str) -> String {
        match self.base_url.join(path) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path),
        }
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.request::<()>(Method::GET, url, None).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<ApiResponse> {
        self.request(Method::POST, url, Some(body)).await
    }

    /// Sends a request, refreshing the session on 403 up to the retry budget
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse> {
        for attempt in 1..=self.max_retries {
            let cookie = self.session.load_cookie_header(false).await?;

            let mut request = self.http.request(method.clone(), url).header(COOKIE, cookie);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|source| CrawlError::Request {
                url: url.to_string(),
                source,
            })?;
            let status = response.status();

            if status == StatusCode::FORBIDDEN {
                tracing::warn!(
                    "403 Forbidden (attempt {}/{}) for {}",
                    attempt,
                    self.max_retries,
                    url
                );
                if attempt < self.max_retries {
                    self.session.refresh().await?;
                    tokio::time::sleep(self.retry_cooldown).await;
                    continue;
                }
                return Err(CrawlError::SessionExpired {
                    url: url.to_string(),
                    attempts: self.max_retries,
                });
            }

            if status.as_u16() >= 400 && status != StatusCode::NOT_FOUND {
                return Err(CrawlError::HttpStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await.map_err(|source| CrawlError::Request {
                url: url.to_string(),
                source,
            })?;

            let delay = self.pacing.pause().await;
            tracing::debug!("{} {} -> {} (paced {:?})", method, url, status, delay);

            return Ok(ApiResponse {
                status,
                url: url.to_string(),
                body,
            });
        }

        Err(CrawlError::SessionExpired {
            url: url.to_string(),
            attempts: self.max_retries,
        })
    }
}
