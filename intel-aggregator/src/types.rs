pub use interfaces::defs::{
    ClassifiedItem, HistoryEntry, Priority, RawItem, Recommendation, Renderer, ReportSnapshot,
    SourceKind,
};

/// HTTP behaviour shared by all sources
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_body_bytes: u64,
    pub max_redirects: usize,
    /// Minimum spacing between two requests to the same host
    pub host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("intel-aggregator/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_body_bytes: 10 * 1024 * 1024,
            max_redirects: 5,
            host_interval_ms: 1000,
        }
    }
}

/// Outcome of downloading one feed document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub body: Option<String>,
    pub error: Option<String>,
}

impl FetchedDocument {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed {kind} record: missing {field}")]
    MalformedRecord { kind: SourceKind, field: &'static str },

    #[error("analysis provider failed: {0}")]
    Analysis(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("report date {date} is older than the retained history (oldest {oldest})")]
    OutsideRetention {
        date: chrono::NaiveDate,
        oldest: chrono::NaiveDate,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IntelError>;
