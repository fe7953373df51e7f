use crate::config::XApiConfig;
use crate::traits::PullFeed;
use crate::types::{IntelError, RawItem, Result, SourceKind};
use crate::Fetcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One page of the advanced-search response
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub tweets: Vec<Tweet>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author: Option<TweetAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct TweetAuthor {
    #[serde(default, rename = "userName")]
    pub user_name: String,
}

impl Tweet {
    pub fn into_raw_item(self) -> Result<RawItem> {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(IntelError::MalformedRecord {
                kind: SourceKind::Post,
                field: "id",
            })?;
        let author = self.author.map(|a| a.user_name).unwrap_or_default();

        Ok(RawItem {
            url: format!("https://x.com/{}/status/{}", author, id),
            identity: id,
            source_kind: SourceKind::Post,
            text: self.text,
            author,
            timestamp: self.created_at.as_deref().and_then(parse_created_at),
            account_category: String::new(),
        })
    }
}

/// Accepts the Twitter wire format (`Tue Dec 10 07:00:30 +0000 2024`) and RFC 3339.
pub fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_str(value, "%a %b %d %H:%M:%S %z %Y")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Convert a page into post items, skipping tweets that have no id.
pub fn page_to_items(page: SearchPage) -> (Vec<RawItem>, Option<String>) {
    let cursor = page
        .next_cursor
        .filter(|c| !c.is_empty())
        .filter(|_| page.has_next_page || !page.tweets.is_empty());

    let items = page
        .tweets
        .into_iter()
        .filter_map(|tweet| match tweet.into_raw_item() {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping tweet: {}", e);
                None
            }
        })
        .collect();

    (items, cursor)
}

/// Cursor-paginated tweet search for one query
pub struct XSearchSource {
    query: String,
    api_key: String,
    config: XApiConfig,
    fetcher: Arc<Fetcher>,
}

impl XSearchSource {
    pub fn new(query: String, api_key: String, config: XApiConfig, fetcher: Arc<Fetcher>) -> Self {
        Self {
            query,
            api_key,
            config,
            fetcher,
        }
    }

    async fn fetch_page(&self, url: &str, cursor: Option<&str>) -> Result<SearchPage> {
        let mut query = vec![
            ("query", self.query.as_str()),
            ("queryType", self.config.query_type.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        self.fetcher
            .get_json(url, &[("X-API-Key", self.api_key.as_str())], &query)
            .await
    }
}

#[async_trait]
impl PullFeed for XSearchSource {
    fn source_id(&self) -> String {
        format!("x_{}", self.query)
    }

    fn source_name(&self) -> String {
        format!("X search: {}", self.query)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Post
    }

    /// A failing page ends pagination; tweets from earlier pages are kept.
    async fn pull(&mut self) -> Result<Vec<RawItem>> {
        let url = format!("{}{}", self.config.api_base, self.config.endpoint);
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page_no in 0..self.config.max_pages {
            let page = match self.fetch_page(&url, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    if page_no == 0 {
                        return Err(e);
                    }
                    warn!("Error fetching page {} for '{}': {}", page_no + 1, self.query, e);
                    break;
                }
            };

            let (page_items, next_cursor) = page_to_items(page);
            debug!("Page {} for '{}': {} tweets", page_no + 1, self.query, page_items.len());
            items.extend(page_items);

            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!("Got {} tweets for '{}'", items.len(), self.query);
        Ok(items)
    }
}
