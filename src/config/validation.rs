use crate::config::types::{CityEntry, ClientConfig, Config, CrawlConfig, SessionConfig};
use crate::storage::city_slug;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_session_config(&config.session)?;
    validate_client_config(&config.client)?;
    validate_crawl_config(&config.crawl)?;
    validate_cities(&config.cities)?;
    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.cookie_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cookie-file cannot be empty".to_string(),
        ));
    }

    match config.refresh_command.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(ConfigError::Validation(
                "refresh-command must name a program".to_string(),
            ))
        }
    }

    if config.refresh_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "refresh-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.stop_sentinel.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "stop-sentinel cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the city list
///
/// Slugs are only checked for cities with a known place id; the others get
/// their slug from the autocomplete label at crawl time.
fn validate_cities(cities: &[CityEntry]) -> Result<(), ConfigError> {
    if cities.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[city]] is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for city in cities {
        if city.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "city name cannot be empty".to_string(),
            ));
        }

        if let Some(place_id) = &city.place_id {
            if place_id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "place-id for '{}' cannot be empty",
                    city.name
                )));
            }

            let slug = city_slug(&city.name);
            if slug.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "city name '{}' does not produce a usable directory name",
                    city.name
                )));
            }
            if !seen.insert(slug.clone()) {
                return Err(ConfigError::Validation(format!(
                    "two cities share the directory '{}'",
                    slug
                )));
            }
        }
    }

    Ok(())
}
