// src/ingest/types.rs
use anyhow::Result;

/// One normalized feed item. Immutable once produced; discarded after a run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Normalized headline text.
    pub title: String,
    /// Item link; may be empty when the feed omits it.
    pub link: String,
    /// Unix seconds; 0 when the feed date is missing or unparsable.
    pub published_at: u64,
    /// Identity of the feed that produced the item, e.g. its URL or "demo".
    pub source_feed: String,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_articles(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}
