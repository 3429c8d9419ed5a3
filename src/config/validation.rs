use crate::config::types::{Config, CrawlerConfig, HintsConfig, HttpConfig, SearchConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_hints_config(&config.hints)?;
    validate_search_config(&config.search)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "crawler.workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.channel_capacity < 1 {
        return Err(ConfigError::Validation(
            "crawler.channel-capacity must be >= 1".to_string(),
        ));
    }

    validate_alphabet(&config.alphabet)
}

/// Validates the child-generation alphabet
///
/// Symbols end up inside tab-separated, newline-terminated records, and a
/// trailing space is generated separately, so none of those may appear here.
fn validate_alphabet(alphabet: &str) -> Result<(), ConfigError> {
    if alphabet.is_empty() {
        return Err(ConfigError::Validation(
            "crawler.alphabet cannot be empty".to_string(),
        ));
    }

    if !alphabet.is_ascii() {
        return Err(ConfigError::Validation(format!(
            "crawler.alphabet must be ASCII, got '{}'",
            alphabet
        )));
    }

    if alphabet.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
        return Err(ConfigError::Validation(
            "crawler.alphabet cannot contain whitespace or control characters".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = alphabet.chars().find(|c| !seen.insert(*c)) {
        return Err(ConfigError::Validation(format!(
            "crawler.alphabet contains '{}' more than once",
            dup
        )));
    }

    Ok(())
}

/// Validates hint endpoint configuration
fn validate_hints_config(config: &HintsConfig) -> Result<(), ConfigError> {
    validate_endpoint("hints.url", &config.url)?;

    if config.media.is_empty() {
        return Err(ConfigError::Validation(
            "hints.media cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates search endpoint configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    validate_endpoint("search.url", &config.url)?;

    if config.limit < 1 || config.limit > 200 {
        return Err(ConfigError::Validation(format!(
            "search.limit must be between 1 and 200, got {}",
            config.limit
        )));
    }

    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "search.workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if let Some(country) = &config.country {
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "search.country must be a two-letter code, got '{}'",
                country
            )));
        }
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "http.user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "http timeouts must be at least one second".to_string(),
        ));
    }

    Ok(())
}

/// Validates an endpoint URL: must parse and use http(s)
fn validate_endpoint(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}
