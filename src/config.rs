// src/config.rs
//! Runtime configuration: defaults <- optional TOML file <- environment.
//! The pipeline reads an immutable snapshot per run; updates go through
//! `ConfigStore` with per-field last-known-good recovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_DEMO_MODE: &str = "DEMO_MODE";
pub const ENV_RSS_FEEDS: &str = "RSS_FEEDS";
pub const ENV_KEYWORDS: &str = "KEYWORDS";
pub const ENV_FULLENRICH_API_KEY: &str = "FULLENRICH_API_KEY";
pub const ENV_ENRICH_CONCURRENCY: &str = "ENRICH_CONCURRENCY";
pub const ENV_ENRICH_TIMEOUT_SECS: &str = "ENRICH_TIMEOUT_SECS";
pub const ENV_DEMO_SEED: &str = "DEMO_SEED";
pub const ENV_CONFIG_PATH: &str = "LEADSCOUT_CONFIG_PATH";

pub const DEFAULT_CONFIG_PATH: &str = "config/leadscout.toml";

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "funding",
    "raised",
    "expansion",
    "hiring",
    "growth",
    "investment",
    "series",
];

pub const DEFAULT_ENRICH_CONCURRENCY: usize = 8;
pub const DEFAULT_ENRICH_TIMEOUT_SECS: u64 = 10;

const MAX_ENRICH_CONCURRENCY: usize = 64;
const MAX_ENRICH_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Demo,
    Live,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Demo => "demo",
            RunMode::Live => "live",
        }
    }

    fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Some(RunMode::Demo),
            "live" | "production" => Some(RunMode::Live),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active configuration. One immutable snapshot feeds one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub mode: RunMode,
    pub rss_feeds: Vec<String>,
    pub keywords: Vec<String>,
    /// Credential for the live enrichment provider; env only, never echoed.
    #[serde(skip_serializing)]
    pub enrich_api_key: Option<String>,
    pub enrich_concurrency: usize,
    pub enrich_timeout_secs: u64,
    /// When set, demo/fallback synthesis is deterministic.
    pub demo_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Live,
            rss_feeds: Vec::new(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            enrich_api_key: None,
            enrich_concurrency: DEFAULT_ENRICH_CONCURRENCY,
            enrich_timeout_secs: DEFAULT_ENRICH_TIMEOUT_SECS,
            demo_seed: None,
        }
    }
}

// Optional on-disk overrides. The credential stays out of the file on
// purpose; it only ever comes from the environment.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    mode: Option<String>,
    rss_feeds: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
    enrich_concurrency: Option<usize>,
    enrich_timeout_secs: Option<u64>,
    demo_seed: Option<u64>,
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config at {}", path.display()))
}

/// Trim, drop empties, dedup. Keeps first-occurrence order because keyword
/// order decides tag order downstream.
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim().to_string();
        if t.is_empty() {
            continue;
        }
        if seen.insert(t.to_lowercase()) {
            out.push(t);
        }
    }
    out
}

fn parse_csv_env(name: &str) -> Option<Vec<String>> {
    std::env::var(name)
        .ok()
        .map(|raw| clean_list(raw.split(',').map(|s| s.to_string()).collect()))
}

fn parse_bool_env(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|raw| {
        matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )
    })
}

fn parse_num_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
}

impl AppConfig {
    /// Build the startup configuration. Never fails: a missing file is fine
    /// and a malformed one is logged and skipped.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let file = if path.exists() {
            match load_file(&path) {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = ?e, path = %path.display(), "ignoring malformed config file");
                    FileConfig::default()
                }
            }
        } else {
            FileConfig::default()
        };

        let mut cfg = AppConfig::default();

        if let Some(mode) = file.mode.as_deref().and_then(RunMode::parse_str) {
            cfg.mode = mode;
        }
        if let Some(feeds) = file.rss_feeds {
            cfg.rss_feeds = clean_list(feeds);
        }
        if let Some(kw) = file.keywords {
            cfg.keywords = clean_list(kw);
        }
        if let Some(n) = file.enrich_concurrency.filter(|n| *n > 0) {
            cfg.enrich_concurrency = n.min(MAX_ENRICH_CONCURRENCY);
        }
        if let Some(t) = file.enrich_timeout_secs.filter(|t| *t > 0) {
            cfg.enrich_timeout_secs = t.min(MAX_ENRICH_TIMEOUT_SECS);
        }
        if file.demo_seed.is_some() {
            cfg.demo_seed = file.demo_seed;
        }

        // Environment wins over the file.
        if let Some(demo) = parse_bool_env(ENV_DEMO_MODE) {
            cfg.mode = if demo { RunMode::Demo } else { RunMode::Live };
        }
        if let Some(feeds) = parse_csv_env(ENV_RSS_FEEDS) {
            cfg.rss_feeds = feeds;
        }
        if let Some(kw) = parse_csv_env(ENV_KEYWORDS) {
            cfg.keywords = kw;
        }
        if let Ok(key) = std::env::var(ENV_FULLENRICH_API_KEY) {
            if !key.trim().is_empty() {
                cfg.enrich_api_key = Some(key.trim().to_string());
            }
        }
        if let Some(n) = parse_num_env::<usize>(ENV_ENRICH_CONCURRENCY).filter(|n| *n > 0) {
            cfg.enrich_concurrency = n.min(MAX_ENRICH_CONCURRENCY);
        }
        if let Some(t) = parse_num_env::<u64>(ENV_ENRICH_TIMEOUT_SECS).filter(|t| *t > 0) {
            cfg.enrich_timeout_secs = t.min(MAX_ENRICH_TIMEOUT_SECS);
        }
        if let Some(seed) = parse_num_env::<u64>(ENV_DEMO_SEED) {
            cfg.demo_seed = Some(seed);
        }

        cfg
    }
}

/// Partial update, usually decoded from a JSON body. Absent fields keep
/// their current values; invalid ones are discarded field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub mode: Option<String>,
    pub rss_feeds: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub enrich_concurrency: Option<usize>,
    pub enrich_timeout_secs: Option<u64>,
    pub demo_seed: Option<u64>,
}

/// Shared, hot-updatable configuration handle used by the HTTP layer.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigStore {
    pub fn new(cfg: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cfg)),
        }
    }

    pub fn snapshot(&self) -> AppConfig {
        self.inner.read().expect("config lock poisoned").clone()
    }

    /// Merge an update. Each field falls back to its last known good value
    /// when the incoming one is unusable. Returns the resulting snapshot.
    pub fn apply(&self, update: ConfigUpdate) -> AppConfig {
        let mut cfg = self.inner.write().expect("config lock poisoned");

        if let Some(raw) = update.mode {
            match RunMode::parse_str(&raw) {
                Some(mode) => cfg.mode = mode,
                None => warn!(value = %raw, "ignoring unknown mode"),
            }
        }
        if let Some(feeds) = update.rss_feeds {
            cfg.rss_feeds = clean_list(feeds);
        }
        if let Some(kw) = update.keywords {
            cfg.keywords = clean_list(kw);
        }
        if let Some(n) = update.enrich_concurrency {
            if n > 0 {
                cfg.enrich_concurrency = n.min(MAX_ENRICH_CONCURRENCY);
            } else {
                warn!("ignoring zero enrich concurrency");
            }
        }
        if let Some(t) = update.enrich_timeout_secs {
            if t > 0 {
                cfg.enrich_timeout_secs = t.min(MAX_ENRICH_TIMEOUT_SECS);
            } else {
                warn!("ignoring zero enrich timeout");
            }
        }
        if update.demo_seed.is_some() {
            cfg.demo_seed = update.demo_seed;
        }

        cfg.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn clear_env() {
        for name in [
            ENV_DEMO_MODE,
            ENV_RSS_FEEDS,
            ENV_KEYWORDS,
            ENV_FULLENRICH_API_KEY,
            ENV_ENRICH_CONCURRENCY,
            ENV_ENRICH_TIMEOUT_SECS,
            ENV_DEMO_SEED,
            ENV_CONFIG_PATH,
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn clean_list_trims_dedups_and_keeps_order() {
        let out = clean_list(vec![
            " funding ".to_string(),
            "".to_string(),
            "hiring".to_string(),
            "Funding".to_string(),
        ]);
        assert_eq!(out, vec!["funding".to_string(), "hiring".to_string()]);
    }

    #[serial_test::serial]
    #[test]
    fn defaults_hold_without_env_or_file() {
        clear_env();
        let cfg = AppConfig::load();
        assert_eq!(cfg.mode, RunMode::Live);
        assert_eq!(cfg.keywords.len(), DEFAULT_KEYWORDS.len());
        assert!(cfg.rss_feeds.is_empty());
        assert_eq!(cfg.enrich_concurrency, DEFAULT_ENRICH_CONCURRENCY);
        assert_eq!(cfg.enrich_timeout_secs, DEFAULT_ENRICH_TIMEOUT_SECS);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_file_overrides_defaults() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("leadscout.toml");
        fs::write(
            &path,
            r#"
mode = "demo"
keywords = ["ipo", "merger"]
enrich_concurrency = 4
"#,
        )
        .unwrap();
        env::set_var(ENV_CONFIG_PATH, path.display().to_string());
        env::set_var(ENV_KEYWORDS, "funding, hiring ,funding");

        let cfg = AppConfig::load();
        assert_eq!(cfg.mode, RunMode::Demo);
        assert_eq!(cfg.enrich_concurrency, 4);
        // env keyword list beats the file one
        assert_eq!(
            cfg.keywords,
            vec!["funding".to_string(), "hiring".to_string()]
        );
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn malformed_file_is_ignored() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "mode = [not toml").unwrap();
        env::set_var(ENV_CONFIG_PATH, path.display().to_string());

        let cfg = AppConfig::load();
        assert_eq!(cfg.mode, RunMode::Live);
        assert_eq!(cfg.keywords.len(), DEFAULT_KEYWORDS.len());
        clear_env();
    }

    #[test]
    fn apply_merges_and_discards_bad_fields() {
        let store = ConfigStore::new(AppConfig::default());
        let out = store.apply(ConfigUpdate {
            mode: Some("demo".to_string()),
            keywords: Some(vec![" ipo ".to_string(), "".to_string()]),
            enrich_concurrency: Some(0),
            ..Default::default()
        });
        assert_eq!(out.mode, RunMode::Demo);
        assert_eq!(out.keywords, vec!["ipo".to_string()]);
        // zero was discarded; default survives
        assert_eq!(out.enrich_concurrency, DEFAULT_ENRICH_CONCURRENCY);

        let again = store.apply(ConfigUpdate {
            mode: Some("warp".to_string()),
            ..Default::default()
        });
        // unknown mode keeps last known good
        assert_eq!(again.mode, RunMode::Demo);
    }

    #[test]
    fn concurrency_and_timeout_are_capped() {
        let store = ConfigStore::new(AppConfig::default());
        let out = store.apply(ConfigUpdate {
            enrich_concurrency: Some(10_000),
            enrich_timeout_secs: Some(9_999),
            ..Default::default()
        });
        assert_eq!(out.enrich_concurrency, MAX_ENRICH_CONCURRENCY);
        assert_eq!(out.enrich_timeout_secs, MAX_ENRICH_TIMEOUT_SECS);
    }

    #[test]
    fn api_key_never_serializes() {
        let cfg = AppConfig {
            enrich_api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert!(v.get("enrichApiKey").is_none());
        assert!(v.get("rssFeeds").is_some());
    }
}
