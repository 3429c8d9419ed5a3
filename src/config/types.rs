use serde::Deserialize;

/// Alphabet appended to a query to form its children: lower-case letters,
/// digits and `.`
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789.";

/// Main configuration structure for Hint-Ripple
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub hints: HintsConfig,
    pub search: SearchConfig,
    pub http: HttpConfig,
}

/// Hint crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers (caps outstanding requests)
    pub workers: u32,

    /// Minimum mark a query needs for its children to be generated
    pub min_priority: i16,

    /// Symbols appended to a query to produce its children, in traversal order
    pub alphabet: String,

    /// Capacity of the queues feeding the single-writer file actors
    pub channel_capacity: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            min_priority: 0,
            alphabet: DEFAULT_ALPHABET.to_string(),
            channel_capacity: 64,
        }
    }
}

/// Hint (autocomplete) endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HintsConfig {
    /// Endpoint URL; `media` and `q` are appended as query parameters
    pub url: String,

    /// Value of the `media` parameter
    pub media: String,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            url: "https://search.itunes.apple.com/WebObjects/MZSearchHints.woa/wa/hints"
                .to_string(),
            media: "software".to_string(),
        }
    }
}

/// App-search endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Endpoint URL; `entity`, `term`, `limit` and `country` are appended
    pub url: String,

    /// Storefront country code, omitted from the request when unset
    pub country: Option<String>,

    /// Maximum number of results requested per term
    pub limit: u32,

    /// Number of concurrent search workers
    pub workers: u32,

    /// Minimum time between two requests of one worker (milliseconds)
    pub pacing_ms: u64,

    /// How many times a term is re-queued after a transient failure
    pub max_retries: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "https://itunes.apple.com/search".to_string(),
            country: None,
            limit: 200,
            workers: 1,
            pacing_ms: 3000,
            max_retries: 3,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Total request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("hint-ripple/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}
