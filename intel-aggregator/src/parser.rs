use crate::types::{IntelError, RawItem, Result, SourceKind};
use crate::utils::{html, text, url as url_utils};
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use tracing::{debug, warn};

/// A parsed RSS/Atom document reduced to what articles need
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub articles: Vec<FeedArticle>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedArticle {
    pub link: Option<String>,
    pub title: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

pub struct FeedParser {
    summary_max_chars: usize,
}

impl FeedParser {
    pub fn new(summary_max_chars: usize) -> Self {
        Self { summary_max_chars }
    }

    pub fn parse(&self, content: &str) -> Result<FeedDocument> {
        let feed = feed_rs::parser::parse(content.as_bytes())
            .map_err(|e| IntelError::Parse(e.to_string()))?;

        let document = FeedDocument {
            title: feed
                .title
                .map(|t| html::extract_text(&t.content))
                .filter(|t| !t.is_empty()),
            articles: feed.entries.into_iter().map(|e| self.article(e)).collect(),
        };

        debug!(
            "Parsed {} articles from {}",
            document.articles.len(),
            document.title.as_deref().unwrap_or("untitled feed")
        );
        Ok(document)
    }

    fn article(&self, entry: Entry) -> FeedArticle {
        // summary first, then the full body
        let body = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|raw| html::extract_text(&raw))
            .unwrap_or_default();

        FeedArticle {
            link: entry
                .links
                .into_iter()
                .map(|l| l.href.trim().to_string())
                .find(|href| !href.is_empty()),
            title: entry.title.map(|t| html::extract_text(&t.content)).unwrap_or_default(),
            summary: text::clip_chars(&body, self.summary_max_chars).to_string(),
            published_at: entry.published.or(entry.updated),
        }
    }

    /// First `limit` articles as raw items. The permalink is the identity, so
    /// articles without one are dropped.
    pub fn to_raw_items(&self, document: &FeedDocument, feed_url: &str, limit: usize) -> Vec<RawItem> {
        let author = document
            .title
            .clone()
            .or_else(|| url_utils::extract_domain(feed_url))
            .unwrap_or_else(|| "RSS".to_string());

        let mut items = Vec::with_capacity(limit.min(document.articles.len()));
        for article in document.articles.iter().take(limit) {
            let Some(link) = &article.link else {
                warn!("Skipping article without link in {}: {}", feed_url, article.title);
                continue;
            };

            items.push(RawItem {
                identity: link.clone(),
                source_kind: SourceKind::Article,
                text: article_text(&article.title, &article.summary),
                author: author.clone(),
                timestamp: article.published_at,
                url: link.clone(),
                account_category: String::new(),
            });
        }
        items
    }

    /// Cheap sniff before handing a body to the feed parser
    pub fn looks_like_feed(content: &str) -> bool {
        let head: String = content.chars().take(2048).collect::<String>().to_lowercase();
        ["<rss", "<feed", "<rdf:rdf"].iter().any(|marker| head.contains(marker))
    }
}

/// An article's classifiable text is its title followed by its summary.
pub fn article_text(title: &str, summary: &str) -> String {
    format!("{} {}", title.trim(), summary.trim()).trim().to_string()
}
