// src/history.rs
//! In-memory run history: a bounded ring of run records plus the stats fold
//! derived from it. Shared between the pipeline (writer) and the HTTP layer
//! (readers), so access goes through a single mutex.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Records kept; the oldest past this is evicted.
pub const HISTORY_CAP: usize = 100;

// Cosmetic reporting constants; not derived from anything real.
const PIPELINE_VALUE_PER_LEAD_USD: f64 = 500.0;
const MINUTES_SAVED_PER_LEAD: f64 = 12.0;
const SUCCESS_RATE_PLACEHOLDER: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Execution,
    Error,
}

/// One pipeline run, successful or aborted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: u64,
    pub kind: RunKind,
    pub timestamp: DateTime<Utc>,
    /// "demo" or "live".
    pub mode: String,
    pub articles_scanned: usize,
    pub leads_detected: usize,
    pub emails_generated: usize,
    pub duration_ms: u64,
    pub feed_count: usize,
    pub keyword_count: usize,
    /// Message for error-kind records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregates over execution-kind records. Derived on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub total_executions: usize,
    pub total_leads: usize,
    pub total_emails: usize,
    pub avg_leads_per_execution: f64,
    pub estimated_pipeline_value: f64,
    pub estimated_time_saved_minutes: f64,
    /// Fixed placeholder; nothing measures this yet.
    pub success_rate: f64,
}

#[derive(Debug, Default)]
pub struct RunHistory {
    inner: Mutex<VecDeque<RunRecord>>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(HISTORY_CAP)),
        }
    }

    /// Append a record, evicting the oldest past the cap.
    pub fn record(&self, rec: RunRecord) {
        let mut q = self.inner.lock().expect("history mutex poisoned");
        q.push_front(rec);
        q.truncate(HISTORY_CAP);
    }

    /// Most-recent-first, at most `limit` entries.
    pub fn snapshot(&self, limit: usize) -> Vec<RunRecord> {
        let q = self.inner.lock().expect("history mutex poisoned");
        q.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold execution-kind records into the derived stats.
    pub fn stats(&self) -> PipelineStats {
        let q = self.inner.lock().expect("history mutex poisoned");
        let mut total_executions = 0usize;
        let mut total_leads = 0usize;
        let mut total_emails = 0usize;
        for r in q.iter().filter(|r| r.kind == RunKind::Execution) {
            total_executions += 1;
            total_leads += r.leads_detected;
            total_emails += r.emails_generated;
        }
        let avg_leads_per_execution = if total_executions == 0 {
            0.0
        } else {
            total_leads as f64 / total_executions as f64
        };
        PipelineStats {
            total_executions,
            total_leads,
            total_emails,
            avg_leads_per_execution,
            estimated_pipeline_value: total_leads as f64 * PIPELINE_VALUE_PER_LEAD_USD,
            estimated_time_saved_minutes: total_leads as f64 * MINUTES_SAVED_PER_LEAD,
            success_rate: SUCCESS_RATE_PLACEHOLDER,
        }
    }
}
