use std::env;
use std::path::PathBuf;

use interfaces::defs::Priority;

use crate::types::{FetchConfig, IntelError, Result};
use crate::utils;

const DEFAULT_SEARCH_QUERIES: &[&str] = &[
    "crypto regulation",
    "cryptocurrency compliance",
    "SEC crypto",
    "crypto AML",
    "stablecoin regulation",
    "DeFi regulation",
    "crypto exchange license",
    "cryptocurrency policy",
    "blockchain regulation",
    "crypto KYC",
];

const DEFAULT_RSS_FEEDS: &[&str] = &[
    "https://cointelegraph.com/rss",
    "https://coindesk.com/arc/outboundfeeds/rss/",
    "https://decrypt.co/feed",
    "https://theblock.co/rss.xml",
];

/// Immutable run configuration, built once and handed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub x_api: XApiConfig,
    pub search_queries: Vec<String>,
    pub rss: RssConfig,
    pub fetch: FetchConfig,
    pub analyzer: AnalyzerConfig,
    pub limits: Limits,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct XApiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub endpoint: String,
    pub query_type: String,
    pub max_pages: usize,
    pub max_queries: usize,
    pub timeout_seconds: u64,
    pub retries: u32,
}

#[derive(Debug, Clone)]
pub struct RssConfig {
    pub feeds: Vec<String>,
    pub entries_per_feed: usize,
    pub summary_max_chars: usize,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TierCaps {
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
}

impl TierCaps {
    pub fn cap(&self, priority: Priority) -> usize {
        match priority {
            Priority::P1 => self.p1,
            Priority::P2 => self.p2,
            Priority::P3 => self.p3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Limits {
    pub max_posts: usize,
    pub max_articles: usize,
    pub tier_caps: TierCaps,
    pub max_recommendations: usize,
    pub min_mentions: usize,
    pub max_history: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub watchlist_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for XApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.twitterapi.io".to_string(),
            endpoint: "/twitter/tweet/advanced_search".to_string(),
            query_type: "Latest".to_string(),
            max_pages: 2,
            max_queries: 3,
            timeout_seconds: 30,
            retries: 1,
        }
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_RSS_FEEDS.iter().map(|s| s.to_string()).collect(),
            entries_per_feed: 10,
            summary_max_chars: 300,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.moonshot.ai/v1/chat/completions".to_string(),
            api_key: None,
            model: "kimi-k2-0711-preview".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_posts: 15,
            max_articles: 15,
            tier_caps: TierCaps { p1: 15, p2: 15, p3: 10 },
            max_recommendations: 5,
            min_mentions: 2,
            max_history: 30,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("docs"),
            watchlist_path: PathBuf::from("config/accounts.json"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            x_api: XApiConfig::default(),
            search_queries: DEFAULT_SEARCH_QUERIES.iter().map(|s| s.to_string()).collect(),
            rss: RssConfig::default(),
            fetch: FetchConfig::default(),
            analyzer: AnalyzerConfig::default(),
            limits: Limits::default(),
            directories: DirectoryConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

pub fn load_config() -> Result<AppConfig> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    /// Build from a key lookup; unset or empty keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_usize = |key: &str, default: usize| {
            get(key).and_then(|v| v.parse::<usize>().ok()).unwrap_or(default)
        };
        let get_u64 = |key: &str, default: u64| {
            get(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(default)
        };

        let mut config = AppConfig::default();

        config.x_api.api_key = get("TWITTER_API_KEY");
        if let Some(base) = get("TWITTER_API_BASE") {
            config.x_api.api_base = base;
        }
        config.x_api.max_pages = get_usize("X_MAX_PAGES", config.x_api.max_pages);
        config.x_api.max_queries = get_usize("X_MAX_QUERIES", config.x_api.max_queries);
        config.x_api.timeout_seconds = get_u64("X_TIMEOUT_SECS", config.x_api.timeout_seconds);

        if let Some(queries) = get("SEARCH_QUERIES") {
            config.search_queries = split_list(&queries);
        }
        if let Some(feeds) = get("RSS_FEEDS") {
            config.rss.feeds = split_list(&feeds);
        }
        if let Some(bad) = config.rss.feeds.iter().find(|f| !utils::url::is_valid_feed_url(f)) {
            return Err(IntelError::Config(format!("invalid RSS feed URL: {bad}")));
        }

        config.analyzer.api_key = get("ANALYZER_API_KEY");
        if let Some(url) = get("ANALYZER_API_URL") {
            config.analyzer.api_url = url;
        }
        if let Some(model) = get("ANALYZER_MODEL") {
            config.analyzer.model = model;
        }
        config.analyzer.timeout_seconds =
            get_u64("ANALYZER_TIMEOUT_SECS", config.analyzer.timeout_seconds);

        let limits = &mut config.limits;
        limits.max_posts = get_usize("MAX_POSTS", limits.max_posts);
        limits.max_articles = get_usize("MAX_ARTICLES", limits.max_articles);
        limits.tier_caps.p1 = get_usize("P1_CAP", limits.tier_caps.p1);
        limits.tier_caps.p2 = get_usize("P2_CAP", limits.tier_caps.p2);
        limits.tier_caps.p3 = get_usize("P3_CAP", limits.tier_caps.p3);
        limits.max_recommendations = get_usize("MAX_RECOMMENDATIONS", limits.max_recommendations);
        limits.min_mentions = get_usize("MIN_MENTIONS", limits.min_mentions).max(2);
        limits.max_history = get_usize("MAX_HISTORY", limits.max_history).max(1);

        if let Some(dir) = get("DATA_DIR") {
            config.directories.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            config.directories.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("WATCHLIST_PATH") {
            config.directories.watchlist_path = PathBuf::from(path);
        }

        if let Some(level) = get("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
