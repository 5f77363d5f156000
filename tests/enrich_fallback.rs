// tests/enrich_fallback.rs
//
// Live-mode degradation: lookups that error, return junk, or hang must all
// end in a usable synthesized contact tagged as fallback, never a panic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use leadscout::enrich::{ContactPayload, ContactProvider, EnrichmentClient};
use leadscout::lead::ContactSource;

/// Stands in for an HTTP 500 / transport error from the enrichment API.
struct DownProvider;

#[async_trait]
impl ContactProvider for DownProvider {
    async fn lookup(&self, _company: &str) -> Option<ContactPayload> {
        None
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

/// Responds, but far too late.
struct SlowProvider;

#[async_trait]
impl ContactProvider for SlowProvider {
    async fn lookup(&self, _company: &str) -> Option<ContactPayload> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Some(ContactPayload {
            name: "Too Late".to_string(),
            email: "late@example.com".to_string(),
            ..Default::default()
        })
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Replies with a payload missing the fields that make it actionable.
struct JunkProvider;

#[async_trait]
impl ContactProvider for JunkProvider {
    async fn lookup(&self, _company: &str) -> Option<ContactPayload> {
        Some(ContactPayload {
            title: "VP of Nothing".to_string(),
            ..Default::default()
        })
    }
    fn name(&self) -> &'static str {
        "junk"
    }
}

#[tokio::test]
async fn provider_error_falls_back_to_synthesized_contact() {
    let client = EnrichmentClient::live(Arc::new(DownProvider), Duration::from_secs(1), Some(4));
    let contact = client.resolve_contact("Quantum Metrics").await;

    assert_eq!(contact.source, ContactSource::Fallback);
    assert!(!contact.name.is_empty());
    assert!(contact.email.contains('@'));
    assert_eq!(
        contact.note.as_deref(),
        Some("live enrichment unavailable")
    );
}

#[tokio::test]
async fn slow_provider_hits_the_per_lookup_timeout() {
    let client = EnrichmentClient::live(Arc::new(SlowProvider), Duration::from_millis(20), Some(4));
    let contact = client.resolve_contact("Quantum Metrics").await;

    assert_eq!(contact.source, ContactSource::Fallback);
    assert_ne!(contact.name, "Too Late");
    assert_eq!(contact.note.as_deref(), Some("live enrichment timed out"));
}

#[tokio::test]
async fn unusable_payload_counts_as_a_miss() {
    let client = EnrichmentClient::live(Arc::new(JunkProvider), Duration::from_secs(1), Some(4));
    let contact = client.resolve_contact("Quantum Metrics").await;

    assert_eq!(contact.source, ContactSource::Fallback);
    assert!(contact.email.contains('@'), "fallback must stay actionable");
}

#[tokio::test]
async fn fallback_contacts_repeat_under_one_seed() {
    let client = EnrichmentClient::live(Arc::new(DownProvider), Duration::from_secs(1), Some(77));
    let a = client.resolve_contact("Quantum Metrics").await;
    let b = client.resolve_contact("Quantum Metrics").await;
    assert_eq!(a, b, "same seed and company must synthesize the same person");
}
