// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod compose;
pub mod config;
pub mod enrich;
pub mod extract;
pub mod history;
pub mod ingest;
pub mod lead;
pub mod metrics;
pub mod pipeline;
pub mod relevance;

// ---- Re-exports for stable public API ----
// Convenient access for bins and tests: `leadscout::AppState`, `leadscout::run_with_config`.
pub use crate::api::{create_router, AppState};
pub use crate::config::{AppConfig, ConfigStore, RunMode};
pub use crate::history::RunHistory;
pub use crate::lead::{Contact, ContactSource, Lead, LeadStatus, OutreachEmail};
pub use crate::pipeline::{run_with_config, RunOutcome, RunSummary};
