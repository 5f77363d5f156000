// src/relevance.rs
//! Relevance gate: keyword matching over article titles. Pure functions,
//! deterministic, no I/O.

use metrics::counter;
use tracing::info;

use crate::ingest::types::Article;

// Dev logging gate: LEADSCOUT_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("LEADSCOUT_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

// Anonymized short id for log lines; raw titles never hit the logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// An article that passed the gate, together with the keywords that hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantArticle {
    pub article: Article,
    /// Matched keywords in keyword-list order, each at most once.
    pub tags: Vec<String>,
}

/// Keywords present in `title`, case-insensitive substring match.
/// Order follows the keyword list, not positions in the title.
pub fn matching_keywords(title: &str, keywords: &[String]) -> Vec<String> {
    let haystack = title.to_lowercase();
    let mut out = Vec::new();
    for kw in keywords {
        let needle = kw.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if haystack.contains(&needle) && !out.contains(&needle) {
            out.push(needle);
        }
    }
    out
}

/// Keep the articles whose title matches at least one keyword, preserving
/// input order. An empty keyword list keeps nothing.
pub fn filter_articles(articles: Vec<Article>, keywords: &[String]) -> Vec<RelevantArticle> {
    let total = articles.len();
    let mut kept = Vec::new();

    for article in articles {
        let tags = matching_keywords(&article.title, keywords);
        if tags.is_empty() {
            continue;
        }
        if dev_logging_enabled() {
            let id = anon_hash(&article.title);
            info!(target: "relevance", %id, matched = ?tags, "article kept");
        }
        kept.push(RelevantArticle { article, tags });
    }

    counter!("relevance_kept_total").increment(kept.len() as u64);
    counter!("relevance_dropped_total").increment((total - kept.len()) as u64);
    kept
}
