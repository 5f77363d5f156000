// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{Article, FeedSource};
use anyhow::bail;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_total", "Total items parsed from feeds.");
        describe_counter!(
            "ingest_kept_total",
            "Articles kept after normalization + per-call dedup."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Articles dropped as duplicates within one ingest call."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Feed fetch/parse errors (isolated per source)."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when ingestion last completed."
        );
    });
}

/// Normalize a headline: decode entities, strip tags, fold smart quotes,
/// collapse whitespace, trim trailing punctuation, cap length.
pub fn normalize_title(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: 300 chars is plenty for a headline
    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }

    out
}

/// The fixed articles served in demo mode (and when no feed is configured),
/// so runs stay deterministic without network I/O.
pub fn demo_articles() -> Vec<Article> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let canned = [
        (
            "TechCorp raises $10M in Series A funding",
            "https://techcrunch.com/example1",
        ),
        (
            "StartupCo announces European expansion with 50 new hires",
            "https://techcrunch.com/example2",
        ),
        (
            "AI Startup InnovateLabs secures $15M funding round",
            "https://techcrunch.com/example3",
        ),
    ];
    canned
        .iter()
        .map(|(title, link)| Article {
            title: (*title).to_string(),
            link: (*link).to_string(),
            published_at: now,
            source_feed: "demo".to_string(),
        })
        .collect()
}

/// Outcome of one ingest call.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub articles: Vec<Article>,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub deduped: usize,
}

/// Normalize titles, drop empties, and deduplicate within this call.
/// Dedup key is the link, falling back to the normalized title.
pub fn normalize_and_dedup(raw: Vec<Article>) -> (Vec<Article>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(raw.len());
    let mut dedup_out = 0usize;

    for mut article in raw {
        article.title = normalize_title(&article.title);
        if article.title.is_empty() {
            continue;
        }
        let key = if article.link.is_empty() {
            article.title.clone()
        } else {
            article.link.clone()
        };
        if !seen.insert(key) {
            dedup_out += 1;
            continue;
        }
        kept.push(article);
    }

    (kept, dedup_out)
}

/// Run ingestion once over the given sources.
///
/// Demo mode (or an empty source set) yields the canned articles without any
/// network I/O. Otherwise each source is fetched in iteration order; a
/// failing source is logged and skipped, never aborting the rest. The only
/// error surfaced is total failure: every configured source failed and no
/// article was produced.
pub async fn run_ingest(
    sources: &[Box<dyn FeedSource>],
    demo: bool,
) -> anyhow::Result<IngestReport> {
    ensure_metrics_described();

    if demo || sources.is_empty() {
        let articles = demo_articles();
        counter!("ingest_kept_total").increment(articles.len() as u64);
        gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        return Ok(IngestReport {
            articles,
            sources_ok: 0,
            sources_failed: 0,
            deduped: 0,
        });
    }

    let mut raw = Vec::new();
    let mut sources_ok = 0usize;
    let mut sources_failed = 0usize;
    for s in sources {
        match s.fetch_articles().await {
            Ok(mut v) => {
                sources_ok += 1;
                raw.append(&mut v);
            }
            Err(e) => {
                sources_failed += 1;
                tracing::warn!(error = ?e, source = s.name(), "feed source error");
                counter!("ingest_source_errors_total").increment(1);
            }
        }
    }

    let (articles, deduped) = normalize_and_dedup(raw);

    if sources_ok == 0 && articles.is_empty() {
        bail!("all {} feed sources failed", sources_failed);
    }

    counter!("ingest_kept_total").increment(articles.len() as u64);
    counter!("ingest_dedup_total").increment(deduped as u64);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    Ok(IngestReport {
        articles,
        sources_ok,
        sources_failed,
        deduped,
    })
}
