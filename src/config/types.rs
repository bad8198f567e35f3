use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Rent-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "city")]
    pub cities: Vec<CityEntry>,
}

/// Where the session cookies live and how to mint new ones
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// JSON file of `{name, value, ...}` cookie records
    #[serde(rename = "cookie-file")]
    pub cookie_file: PathBuf,

    /// Program and arguments of the browser step that rewrites `cookie_file`
    #[serde(rename = "refresh-command")]
    pub refresh_command: Vec<String>,

    /// Hard limit on the refresh process, in seconds
    #[serde(rename = "refresh-timeout-secs", default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
}

impl SessionConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// HTTP pacing and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the listing platform
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Lower bound of the post-request pause (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the post-request pause (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Total attempts per request when the server answers 403
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Pause between a session refresh and the next attempt (milliseconds)
    #[serde(rename = "retry-cooldown-ms")]
    pub retry_cooldown_ms: u64,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.seloger.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            min_delay_ms: 1200,
            max_delay_ms: 3500,
            max_retries: 3,
            retry_cooldown_ms: 2000,
            request_timeout_secs: 30,
        }
    }
}

/// Crawl shape and cancellation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Listings requested per search page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Include shared-flat offers in search criteria
    #[serde(rename = "include-flatsharing")]
    pub include_flatsharing: bool,

    /// Marker file whose presence asks a running crawl to stop
    #[serde(rename = "stop-sentinel")]
    pub stop_sentinel: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            include_flatsharing: true,
            stop_sentinel: PathBuf::from("stop_scraping.flag"),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the per-city corpus directories
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("jsons"),
        }
    }
}

/// A city to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CityEntry {
    /// Free-text place name, resolved through autocomplete
    pub name: String,

    /// Skips autocomplete when the place identifier is already known
    #[serde(rename = "place-id")]
    pub place_id: Option<String>,
}

fn default_refresh_timeout_secs() -> u64 {
    60
}
