use crate::traits::PullFeed;
use crate::types::{IntelError, RawItem, Result, SourceKind};
use crate::utils::url as url_utils;
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// One RSS/Atom feed producing article items
pub struct RssFeedSource {
    url: String,
    feed_title: Option<String>,
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
    entries_per_feed: usize,
}

impl RssFeedSource {
    pub fn new(url: String, fetcher: Arc<Fetcher>, entries_per_feed: usize, summary_max_chars: usize) -> Self {
        Self {
            url,
            feed_title: None,
            fetcher,
            parser: FeedParser::new(summary_max_chars),
            entries_per_feed,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse an already downloaded document; remembers the feed title.
    pub fn items_from_content(&mut self, content: &str) -> Result<Vec<RawItem>> {
        if !FeedParser::looks_like_feed(content) {
            warn!("{} does not look like RSS or Atom, parsing anyway", self.url);
        }

        let document = self.parser.parse(content)?;
        if let Some(title) = &document.title {
            self.feed_title.get_or_insert_with(|| title.clone());
        }

        Ok(self.parser.to_raw_items(&document, &self.url, self.entries_per_feed))
    }
}

#[async_trait]
impl PullFeed for RssFeedSource {
    fn source_id(&self) -> String {
        format!("rss_{}", self.url)
    }

    fn source_name(&self) -> String {
        if let Some(title) = &self.feed_title {
            return title.clone();
        }
        match url_utils::extract_domain(&self.url) {
            Some(domain) => format!("RSS Feed ({})", domain),
            None => "RSS Feed".to_string(),
        }
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Article
    }

    async fn pull(&mut self) -> Result<Vec<RawItem>> {
        let document = self.fetcher.fetch_document(&self.url).await?;

        let body = match (document.is_ok(), document.body) {
            (true, Some(body)) => body,
            (true, None) => return Ok(Vec::new()),
            (false, _) => {
                return Err(IntelError::Fetch {
                    url: self.url.clone(),
                    reason: document.error.unwrap_or_default(),
                })
            }
        };

        let items = self.items_from_content(&body)?;
        info!("{}: {} articles", self.source_name(), items.len());
        Ok(items)
    }
}
