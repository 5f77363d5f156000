// src/pipeline.rs
//! Run orchestration: ingest, filter, extract, enrich with a bounded
//! fan-out, compose, record. One call appends exactly one history record,
//! execution-kind on success and error-kind when ingestion fails outright.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, histogram};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::compose::compose_outreach;
use crate::config::{AppConfig, RunMode};
use crate::enrich::EnrichmentClient;
use crate::extract::extract_company;
use crate::history::{RunHistory, RunKind, RunRecord};
use crate::ingest::providers::RssFeedProvider;
use crate::ingest::types::FeedSource;
use crate::lead::{Lead, LeadStatus, OutreachEmail};
use crate::relevance::filter_articles;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Phases a run walks through, in order. Between runs the pipeline is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Ingesting,
    Filtering,
    Enriching,
    Composing,
    Recorded,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Ingesting => "ingesting",
            RunPhase::Filtering => "filtering",
            RunPhase::Enriching => "enriching",
            RunPhase::Composing => "composing",
            RunPhase::Recorded => "recorded",
        }
    }
}

fn enter_phase(run_id: u64, phase: RunPhase) {
    tracing::debug!(target: "pipeline", run_id, phase = phase.as_str());
}

/// Counters for one finished run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: u64,
    pub mode: String,
    pub articles_scanned: usize,
    pub relevant_articles: usize,
    pub leads_detected: usize,
    pub emails_generated: usize,
    pub duration_ms: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub leads: Vec<Lead>,
    pub emails: Vec<OutreachEmail>,
    pub summary: RunSummary,
}

/// Sources for the current config. Demo mode uses none (the ingestor serves
/// canned articles); live mode builds one HTTP provider per configured feed.
pub fn build_sources(cfg: &AppConfig) -> Vec<Box<dyn FeedSource>> {
    match cfg.mode {
        RunMode::Demo => Vec::new(),
        RunMode::Live => cfg
            .rss_feeds
            .iter()
            .map(|url| Box::new(RssFeedProvider::from_url(url)) as Box<dyn FeedSource>)
            .collect(),
    }
}

/// The entry point callers use: build collaborators from the config
/// snapshot, then run once.
pub async fn run_with_config(cfg: &AppConfig, history: &RunHistory) -> Result<RunOutcome> {
    let sources = build_sources(cfg);
    let enricher = EnrichmentClient::from_config(cfg);
    run_pipeline(cfg, &sources, &enricher, history).await
}

pub async fn run_pipeline(
    cfg: &AppConfig,
    sources: &[Box<dyn FeedSource>],
    enricher: &EnrichmentClient,
    history: &RunHistory,
) -> Result<RunOutcome> {
    let run_id = RUN_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let t0 = Instant::now();
    let demo = cfg.mode == RunMode::Demo;

    enter_phase(run_id, RunPhase::Ingesting);
    let report = match crate::ingest::run_ingest(sources, demo).await {
        Ok(r) => r,
        Err(e) => {
            warn!(run_id, error = ?e, "pipeline aborted during ingestion");
            counter!("pipeline_failures_total").increment(1);
            history.record(RunRecord {
                id: run_id,
                kind: RunKind::Error,
                timestamp: Utc::now(),
                mode: cfg.mode.to_string(),
                articles_scanned: 0,
                leads_detected: 0,
                emails_generated: 0,
                duration_ms: t0.elapsed().as_millis() as u64,
                feed_count: sources.len(),
                keyword_count: cfg.keywords.len(),
                error: Some(format!("{}: {e:#}", RunPhase::Ingesting.as_str())),
            });
            return Err(e).context("ingesting articles");
        }
    };
    let articles_scanned = report.articles.len();

    enter_phase(run_id, RunPhase::Filtering);
    let relevant = filter_articles(report.articles, &cfg.keywords);
    let relevant_count = relevant.len();

    // Fan out enrichment, bounded by a semaphore. Each item already has its
    // own timeout inside the client, so one slow lookup cannot stall a run.
    enter_phase(run_id, RunPhase::Enriching);
    let semaphore = Arc::new(Semaphore::new(cfg.enrich_concurrency.max(1)));
    let mut join_set = JoinSet::new();
    for (idx, ra) in relevant.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let enricher = enricher.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let company = extract_company(&ra.article.title);
            let contact = enricher.resolve_contact(&company).await;
            (idx, ra, company, contact)
        });
    }

    let mut enriched = Vec::with_capacity(relevant_count);
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(item) => enriched.push(item),
            Err(e) => {
                warn!(run_id, error = ?e, "enrichment task failed");
                counter!("pipeline_task_failures_total").increment(1);
            }
        }
    }
    // Tasks settle in any order; leads keep filter order.
    enriched.sort_by_key(|(idx, ..)| *idx);

    enter_phase(run_id, RunPhase::Composing);
    let mut rng = match cfg.demo_seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(run_id)),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let detected_at = Utc::now();
    let mut leads = Vec::with_capacity(enriched.len());
    for (seq, (_, ra, company, contact)) in enriched.into_iter().enumerate() {
        leads.push(Lead {
            id: format!("{run_id}-{seq}"),
            company,
            article_title: ra.article.title,
            article_link: ra.article.link,
            contact,
            detected_at,
            status: LeadStatus::New,
            // Cosmetic, like the stats placeholders.
            confidence_score: rng.random_range(70..=95),
            tags: ra.tags,
        });
    }
    let emails: Vec<OutreachEmail> = leads.iter().map(compose_outreach).collect();

    enter_phase(run_id, RunPhase::Recorded);
    let duration_ms = t0.elapsed().as_millis() as u64;
    history.record(RunRecord {
        id: run_id,
        kind: RunKind::Execution,
        timestamp: Utc::now(),
        mode: cfg.mode.to_string(),
        articles_scanned,
        leads_detected: leads.len(),
        emails_generated: emails.len(),
        duration_ms,
        feed_count: sources.len(),
        keyword_count: cfg.keywords.len(),
        error: None,
    });

    counter!("pipeline_runs_total").increment(1);
    counter!("pipeline_leads_total").increment(leads.len() as u64);
    counter!("pipeline_emails_total").increment(emails.len() as u64);
    histogram!("pipeline_run_ms").record(duration_ms as f64);
    info!(
        run_id,
        mode = %cfg.mode,
        articles = articles_scanned,
        relevant = relevant_count,
        leads = leads.len(),
        "pipeline run finished"
    );

    let summary = RunSummary {
        run_id,
        mode: cfg.mode.to_string(),
        articles_scanned,
        relevant_articles: relevant_count,
        leads_detected: leads.len(),
        emails_generated: emails.len(),
        duration_ms,
    };
    Ok(RunOutcome {
        leads,
        emails,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Article;
    use crate::lead::ContactSource;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl FeedSource for FailingSource {
        async fn fetch_articles(&self) -> Result<Vec<Article>> {
            anyhow::bail!("connection refused")
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct StaticSource {
        items: Vec<Article>,
    }

    #[async_trait]
    impl FeedSource for StaticSource {
        async fn fetch_articles(&self) -> Result<Vec<Article>> {
            Ok(self.items.clone())
        }
        fn name(&self) -> &str {
            "static"
        }
    }

    fn demo_cfg() -> AppConfig {
        AppConfig {
            mode: RunMode::Demo,
            demo_seed: Some(11),
            ..Default::default()
        }
    }

    fn article(title: &str, link: &str) -> Article {
        Article {
            title: title.to_string(),
            link: link.to_string(),
            published_at: 1,
            source_feed: "static".to_string(),
        }
    }

    #[tokio::test]
    async fn demo_run_yields_three_demo_leads() {
        let history = RunHistory::new();
        let out = run_with_config(&demo_cfg(), &history).await.unwrap();

        assert_eq!(out.leads.len(), 3);
        assert_eq!(out.emails.len(), 3);
        assert!(out
            .leads
            .iter()
            .all(|l| l.contact.source == ContactSource::Demo));
        assert_eq!(out.leads[0].company, "TechCorp");
        assert_eq!(out.leads[1].company, "StartupCo");
        assert_eq!(out.leads[2].company, "InnovateLabs");

        let prefix = format!("{}-", out.summary.run_id);
        for (i, lead) in out.leads.iter().enumerate() {
            assert_eq!(lead.id, format!("{prefix}{i}"));
            assert!((70..=95).contains(&lead.confidence_score));
        }

        assert_eq!(history.len(), 1);
        let rec = &history.snapshot(1)[0];
        assert_eq!(rec.kind, RunKind::Execution);
        assert_eq!(rec.leads_detected, 3);
        assert_eq!(rec.articles_scanned, 3);
    }

    #[tokio::test]
    async fn total_ingest_failure_records_error_and_surfaces() {
        let cfg = AppConfig {
            mode: RunMode::Live,
            ..Default::default()
        };
        let history = RunHistory::new();
        let sources: Vec<Box<dyn FeedSource>> = vec![Box::new(FailingSource)];
        let enricher = EnrichmentClient::demo(Some(1));

        let res = run_pipeline(&cfg, &sources, &enricher, &history).await;
        assert!(res.is_err());

        let rec = &history.snapshot(1)[0];
        assert_eq!(rec.kind, RunKind::Error);
        assert!(rec
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("feed sources failed"));
    }

    #[tokio::test]
    async fn failing_source_is_isolated_when_another_works() {
        let cfg = AppConfig {
            mode: RunMode::Live,
            demo_seed: Some(5),
            ..Default::default()
        };
        let history = RunHistory::new();
        let sources: Vec<Box<dyn FeedSource>> = vec![
            Box::new(FailingSource),
            Box::new(StaticSource {
                items: vec![
                    article("Acme raises a new funding round", "https://x.test/a"),
                    article("Weather stays mild this week", "https://x.test/b"),
                ],
            }),
        ];
        let enricher = EnrichmentClient::demo(Some(5));

        let out = run_pipeline(&cfg, &sources, &enricher, &history)
            .await
            .unwrap();
        assert_eq!(out.summary.articles_scanned, 2);
        assert_eq!(out.leads.len(), 1);
        assert_eq!(out.leads[0].company, "Acme");
        assert_eq!(out.leads[0].tags, vec!["funding".to_string()]);
    }

    #[tokio::test]
    async fn zero_qualifying_articles_is_a_success() {
        let mut cfg = demo_cfg();
        cfg.keywords = vec!["blockchain".to_string()];
        let history = RunHistory::new();

        let out = run_with_config(&cfg, &history).await.unwrap();
        assert!(out.leads.is_empty());
        assert!(out.emails.is_empty());
        assert_eq!(out.summary.articles_scanned, 3);
        assert_eq!(history.snapshot(1)[0].kind, RunKind::Execution);
    }

    #[tokio::test]
    async fn lead_order_follows_filter_order() {
        let cfg = AppConfig {
            mode: RunMode::Live,
            demo_seed: Some(2),
            ..Default::default()
        };
        let history = RunHistory::new();
        let items: Vec<Article> = (0..10)
            .map(|i| {
                article(
                    &format!("Firm{i} raises funding"),
                    &format!("https://x.test/{i}"),
                )
            })
            .collect();
        let sources: Vec<Box<dyn FeedSource>> = vec![Box::new(StaticSource { items })];
        let enricher = EnrichmentClient::demo(Some(2));

        let out = run_pipeline(&cfg, &sources, &enricher, &history)
            .await
            .unwrap();
        assert_eq!(out.leads.len(), 10);
        for (i, lead) in out.leads.iter().enumerate() {
            assert_eq!(lead.company, format!("Firm{i}"));
        }
        // emails pair up with leads one to one
        assert_eq!(out.emails.len(), 10);
        for (lead, email) in out.leads.iter().zip(out.emails.iter()) {
            assert_eq!(email.lead_id, lead.id);
            assert_eq!(email.to, lead.contact.email);
        }
    }
}
