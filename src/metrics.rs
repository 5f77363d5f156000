use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and describe the pipeline series.
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_series();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_series() {
    describe_counter!(
        "relevance_kept_total",
        "Articles kept by the keyword filter"
    );
    describe_counter!(
        "relevance_dropped_total",
        "Articles dropped by the keyword filter"
    );
    describe_counter!("enrich_live_total", "Contacts resolved by the live provider");
    describe_counter!(
        "enrich_demo_total",
        "Contacts resolved from the demo directory or synthesized"
    );
    describe_counter!(
        "enrich_fallback_total",
        "Contacts synthesized after a live lookup failed"
    );
    describe_counter!("pipeline_runs_total", "Completed pipeline runs");
    describe_counter!(
        "pipeline_failures_total",
        "Pipeline runs aborted during ingestion"
    );
    describe_counter!(
        "pipeline_task_failures_total",
        "Enrichment tasks that panicked or were cancelled"
    );
    describe_counter!("pipeline_leads_total", "Leads detected across all runs");
    describe_counter!(
        "pipeline_emails_total",
        "Outreach drafts composed across all runs"
    );
    describe_histogram!("pipeline_run_ms", "Wall-clock duration of a pipeline run");
}
