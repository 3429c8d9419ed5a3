use crate::config::types::{Config, CrawlerConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the configuration at `path`, or the validated defaults when no path is given
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Computes a SHA-256 fingerprint of the settings that shape a crawl
///
/// Only the expansion threshold and the alphabet decide which queries end up in
/// the query log, so those are the only inputs. A resumed crawl compares the
/// fingerprint against the one recorded when the crawl directory was created.
///
/// # Returns
///
/// Hex-encoded SHA-256 digest (64 characters)
pub fn compute_fingerprint(crawler: &CrawlerConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(crawler.min_priority.to_le_bytes());
    hasher.update(b"\t");
    hasher.update(crawler.alphabet.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
workers = 4
min-priority = 100
alphabet = "abc"

[hints]
url = "https://hints.example.com/hints"

[search]
country = "us"
limit = 50
pacing-ms = 500

[http]
user-agent = "TestCrawler/1.0"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.crawler.min_priority, 100);
        assert_eq!(config.crawler.alphabet, "abc");
        assert_eq!(config.crawler.channel_capacity, 64);
        assert_eq!(config.hints.url, "https://hints.example.com/hints");
        assert_eq!(config.hints.media, "software");
        assert_eq!(config.search.country.as_deref(), Some("us"));
        assert_eq!(config.search.limit, 50);
        assert_eq!(config.search.max_retries, 3);
        assert_eq!(config.http.user_agent, "TestCrawler/1.0");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawler.workers, 10);
        assert_eq!(config.crawler.min_priority, 0);
        assert_eq!(config.crawler.alphabet, crate::config::DEFAULT_ALPHABET);
        assert_eq!(config.search.workers, 1);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/hint-ripple.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nworkers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_defaults_without_path() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.crawler.workers, 10);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let crawler = CrawlerConfig::default();
        let first = compute_fingerprint(&crawler);
        let second = compute_fingerprint(&crawler);

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_crawl_shaping_settings() {
        let base = CrawlerConfig::default();
        let mut threshold = base.clone();
        threshold.min_priority = 500;
        let mut alphabet = base.clone();
        alphabet.alphabet = "abc".to_string();
        let mut workers = base.clone();
        workers.workers = 3;

        assert_ne!(compute_fingerprint(&base), compute_fingerprint(&threshold));
        assert_ne!(compute_fingerprint(&base), compute_fingerprint(&alphabet));
        assert_eq!(compute_fingerprint(&base), compute_fingerprint(&workers));
    }
}
