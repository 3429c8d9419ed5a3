//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client from configuration
//! - The hint (autocomplete) endpoint, answering with an XML property list
//! - The app-search endpoint, answering with JSON
//! - Error classification for logging and retry decisions

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::{HintsConfig, HttpConfig, SearchConfig};
use crate::crawler::decode::{decode_hints, decode_search};
use crate::records::Hint;

/// Longest response excerpt carried in an error
const BODY_EXCERPT_LEN: usize = 512;

/// Errors from one remote request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("malformed response from {url}: {reason}; body: {body}")]
    Decode {
        url: String,
        reason: String,
        body: String,
    },

    #[error("duplicate bundle id {bundle_id:?} in results for {term:?}")]
    DuplicateBundle { term: String, bundle_id: String },

    #[error("invalid endpoint URL {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A source of autocomplete hints
pub trait HintSource: Send + Sync + 'static {
    /// Fetches the hints for `query`, in the order the endpoint ranks them
    fn fetch_hints(&self, query: &str) -> impl Future<Output = Result<Vec<Hint>, FetchError>> + Send;
}

/// A source of app-search rankings
pub trait SearchSource: Send + Sync + 'static {
    /// Fetches the ranked bundle ids for `term`, best first
    fn fetch_ranking(&self, term: &str)
        -> impl Future<Output = Result<Vec<String>, FetchError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use hint_ripple::config::HttpConfig;
/// use hint_ripple::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the hint endpoint
#[derive(Debug, Clone)]
pub struct HintsClient {
    client: Client,
    endpoint: Url,
    media: String,
}

impl HintsClient {
    pub fn new(client: Client, config: &HintsConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(&config.url)?,
            media: config.media.clone(),
        })
    }

    /// Request URL for `query`: the endpoint plus `media` and `q`
    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("media", &self.media)
            .append_pair("q", query);
        url
    }
}

impl HintSource for HintsClient {
    async fn fetch_hints(&self, query: &str) -> Result<Vec<Hint>, FetchError> {
        let url = self.request_url(query);
        let body = get_text(&self.client, url.clone()).await?;

        decode_hints(query, &body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
            body: excerpt(&body),
        })
    }
}

/// Client for the app-search endpoint
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: Url,
    country: Option<String>,
    limit: u32,
}

impl SearchClient {
    pub fn new(client: Client, config: &SearchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(&config.url)?,
            country: config.country.clone(),
            limit: config.limit,
        })
    }

    /// Request URL for `term`: the endpoint plus `entity`, `term`, `limit`
    /// and, when configured, `country`
    pub fn request_url(&self, term: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("entity", "software")
                .append_pair("term", term)
                .append_pair("limit", &self.limit.to_string());
            if let Some(country) = &self.country {
                pairs.append_pair("country", country);
            }
        }
        url
    }
}

impl SearchSource for SearchClient {
    async fn fetch_ranking(&self, term: &str) -> Result<Vec<String>, FetchError> {
        let url = self.request_url(term);
        let body = get_text(&self.client, url.clone()).await?;

        let bundle_ids = decode_search(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
            body: excerpt(&body),
        })?;

        {
            let mut seen = HashSet::with_capacity(bundle_ids.len());
            if let Some(duplicate) = bundle_ids.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(FetchError::DuplicateBundle {
                    term: term.to_string(),
                    bundle_id: duplicate.clone(),
                });
            }
        }

        Ok(bundle_ids)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|source| FetchError::InvalidEndpoint {
        url: raw.to_string(),
        source,
    })
}

/// Sends a GET and returns the body of a successful response
async fn get_text(client: &Client, url: Url) -> Result<String, FetchError> {
    let http_err = |source| FetchError::Http {
        url: url.to_string(),
        source,
    };

    let response = client.get(url.clone()).send().await.map_err(http_err)?;
    let status = response.status();
    let body = response.text().await.map_err(http_err)?;

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }

    Ok(body)
}

/// Single-line, bounded excerpt of a response body for log output
fn excerpt(body: &str) -> String {
    let flat = body.replace("\r\n", "\\n").replace('\n', "\\n");
    match flat.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_hints_request_url_escapes_query() {
        let client = build_http_client(&HttpConfig::default()).unwrap();
        let hints = HintsClient::new(client, &HintsConfig::default()).unwrap();

        let url = hints.request_url("cat &dog");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("media".to_string(), "software".to_string()),
                ("q".to_string(), "cat &dog".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_request_url_includes_country_when_set() {
        let client = build_http_client(&HttpConfig::default()).unwrap();
        let config = SearchConfig {
            country: Some("jp".to_string()),
            limit: 10,
            ..SearchConfig::default()
        };
        let search = SearchClient::new(client, &config).unwrap();

        let url = search.request_url("maps");
        let query = url.query().unwrap();
        assert_eq!(query, "entity=software&term=maps&limit=10&country=jp");
    }

    #[test]
    fn test_excerpt_is_single_line_and_bounded() {
        let body = format!("line one\r\nline two\n{}", "x".repeat(2000));
        let short = excerpt(&body);
        assert!(!short.contains('\n'));
        assert!(short.starts_with("line one\\nline two\\n"));
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), BODY_EXCERPT_LEN + 3);
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let client = build_http_client(&HttpConfig::default()).unwrap();
        let config = HintsConfig {
            url: "not a url".to_string(),
            ..HintsConfig::default()
        };
        assert!(matches!(
            HintsClient::new(client, &config),
            Err(FetchError::InvalidEndpoint { .. })
        ));
    }
}
