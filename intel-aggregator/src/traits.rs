use crate::types::{RawItem, Result, SourceKind};
use async_trait::async_trait;

/// Trait for pulling content from a source (RSS feeds, search APIs, etc.)
#[async_trait]
pub trait PullFeed: Send + Sync {
    /// Unique identifier for this source
    fn source_id(&self) -> String;

    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Kind of item this source produces
    fn source_kind(&self) -> SourceKind;

    /// Fetch the current items. An unreachable source is an error here;
    /// callers decide whether to skip it.
    async fn pull(&mut self) -> Result<Vec<RawItem>>;
}
