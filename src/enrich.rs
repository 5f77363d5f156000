// src/enrich.rs
//! Contact enrichment: provider abstraction + demo directory + synthesized
//! fallback. `resolve_contact` is total; every failure path degrades to a
//! synthesized contact tagged with its provenance.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use strsim::normalized_levenshtein;

use crate::config::{AppConfig, RunMode};
use crate::lead::{Contact, ContactSource};

// Similarity floor for near-miss directory lookups ("Stripee" -> "Stripe").
const DIRECTORY_SIMILARITY: f64 = 0.84;

// ------------------------------------------------------------
// Provider abstraction
// ------------------------------------------------------------

/// Raw person fields from a provider, before provenance is attached.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
}

impl ContactPayload {
    /// Usable means it identifies a person we can actually write to.
    fn is_usable(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Low-level provider doing the real remote lookup. Separated from the
/// client so the fallback policy wraps production and tests the same way.
#[async_trait]
pub trait ContactProvider: Send + Sync + 'static {
    /// `None` on any transport/decode/credential problem; the client decides
    /// what to do about it.
    async fn lookup(&self, company: &str) -> Option<ContactPayload>;
    fn name(&self) -> &'static str;
}

/// FullEnrich company-search provider. Requires an API key; without one,
/// every lookup misses and the client falls back.
pub struct FullEnrichProvider {
    http: reqwest::Client,
    api_key: String,
}

const FULLENRICH_SEARCH_URL: &str = "https://app.fullenrich.com/api/v1/company/search";

impl FullEnrichProvider {
    pub fn new(api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("leadscout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ContactProvider for FullEnrichProvider {
    async fn lookup(&self, company: &str) -> Option<ContactPayload> {
        if self.api_key.is_empty() {
            return None;
        }

        // Response shape varies; accept a flat person object or {contact:{..}}.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SearchResp {
            Wrapped { contact: ContactPayload },
            Flat(ContactPayload),
        }

        let resp = self
            .http
            .get(FULLENRICH_SEARCH_URL)
            .query(&[("name", company)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }
        let body: SearchResp = resp.json().await.ok()?;
        let payload = match body {
            SearchResp::Wrapped { contact } => contact,
            SearchResp::Flat(p) => p,
        };
        Some(payload)
    }

    fn name(&self) -> &'static str {
        "fullenrich"
    }
}

// ------------------------------------------------------------
// Demo directory + synthesis
// ------------------------------------------------------------

struct DirectoryEntry {
    company: &'static str,
    contact: &'static str,
    title: &'static str,
    email: &'static str,
    department: &'static str,
}

static DEMO_DIRECTORY: &[DirectoryEntry] = &[
    DirectoryEntry {
        company: "Microsoft",
        contact: "Elena Vargas",
        title: "Director of Partnerships",
        email: "elena.vargas@microsoft.com",
        department: "Business Development",
    },
    DirectoryEntry {
        company: "Google",
        contact: "David Park",
        title: "Head of Strategic Alliances",
        email: "david.park@google.com",
        department: "Partnerships",
    },
    DirectoryEntry {
        company: "Amazon",
        contact: "Rachel Kim",
        title: "VP of Corporate Development",
        email: "rachel.kim@amazon.com",
        department: "Corporate Development",
    },
    DirectoryEntry {
        company: "Apple",
        contact: "Tom Becker",
        title: "Director of Procurement",
        email: "tom.becker@apple.com",
        department: "Operations",
    },
    DirectoryEntry {
        company: "Stripe",
        contact: "Nina Rossi",
        title: "Head of Partnerships",
        email: "nina.rossi@stripe.com",
        department: "Partnerships",
    },
    DirectoryEntry {
        company: "OpenAI",
        contact: "James Liu",
        title: "Head of Go-to-Market",
        email: "james.liu@openai.com",
        department: "Sales",
    },
    DirectoryEntry {
        company: "Tesla",
        contact: "Maya Singh",
        title: "Director of Business Development",
        email: "maya.singh@tesla.com",
        department: "Business Development",
    },
    DirectoryEntry {
        company: "Salesforce",
        contact: "Owen Clarke",
        title: "VP of Alliances",
        email: "owen.clarke@salesforce.com",
        department: "Sales",
    },
];

fn directory_lookup(company: &str) -> Option<&'static DirectoryEntry> {
    let needle = company.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    DEMO_DIRECTORY.iter().find(|e| {
        let known = e.company.to_lowercase();
        needle.contains(&known)
            || known.contains(&needle)
            || normalized_levenshtein(&needle, &known) >= DIRECTORY_SIMILARITY
    })
}

const FIRST_NAMES: &[&str] = &["Alex", "Sarah", "Marcus", "Priya", "Daniel", "Emma"];
const LAST_NAMES: &[&str] = &["Johnson", "Miller", "Chen", "Patel", "Novak", "Garcia"];

// Coarse vertical guess from the company name. Order matters: the first
// matching bucket wins.
fn role_for(company: &str) -> (&'static str, &'static str) {
    let lower = company.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["tech", "software", "labs", "data", "cloud"]) {
        ("CTO", "Technology")
    } else if has(&["finance", "fintech", "bank", "capital", "pay"]) {
        ("CFO", "Finance")
    } else if has(&["health", "medical", "bio", "care"]) {
        ("Head of Business Development", "Healthcare")
    } else {
        ("VP of Business Development", "Sales")
    }
}

fn email_domain(company: &str) -> String {
    let domain: String = company
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if domain.is_empty() {
        "example".to_string()
    } else {
        domain
    }
}

/// Make up a plausible contact for a company we know nothing about.
fn synthesize_contact(company: &str, rng: &mut StdRng) -> ContactPayload {
    let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
    let (title, department) = role_for(company);
    ContactPayload {
        name: format!("{first} {last}"),
        title: title.to_string(),
        email: format!(
            "{}.{}@{}.com",
            first.to_lowercase(),
            last.to_lowercase(),
            email_domain(company)
        ),
        phone: format!("+1-555-01{:02}", rng.random_range(0..100u32)),
        department: department.to_string(),
    }
}

fn payload_to_contact(p: ContactPayload, source: ContactSource, note: Option<String>) -> Contact {
    let or_default = |s: String, d: &str| {
        if s.trim().is_empty() {
            d.to_string()
        } else {
            s
        }
    };
    Contact {
        name: p.name,
        title: or_default(p.title, "Business Contact"),
        email: p.email,
        phone: or_default(p.phone, "+1-555-0100"),
        department: or_default(p.department, "General"),
        source,
        note,
    }
}

// ------------------------------------------------------------
// Client with fallback policy
// ------------------------------------------------------------

/// Resolves a contact for a company name. Demo mode never leaves the
/// process; live mode calls the provider and degrades to synthesis when
/// anything goes wrong. Cloning is cheap; clones share the provider.
#[derive(Clone)]
pub struct EnrichmentClient {
    provider: Option<Arc<dyn ContactProvider>>,
    timeout: Duration,
    demo_seed: Option<u64>,
}

impl EnrichmentClient {
    pub fn demo(demo_seed: Option<u64>) -> Self {
        Self {
            provider: None,
            timeout: Duration::from_secs(10),
            demo_seed,
        }
    }

    pub fn live(
        provider: Arc<dyn ContactProvider>,
        timeout: Duration,
        demo_seed: Option<u64>,
    ) -> Self {
        Self {
            provider: Some(provider),
            timeout,
            demo_seed,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        match cfg.mode {
            RunMode::Demo => Self::demo(cfg.demo_seed),
            RunMode::Live => {
                let key = cfg.enrich_api_key.clone().unwrap_or_default();
                Self::live(
                    Arc::new(FullEnrichProvider::new(&key)),
                    Duration::from_secs(cfg.enrich_timeout_secs),
                    cfg.demo_seed,
                )
            }
        }
    }

    // Seeded per company so one injected seed fixes the whole run without
    // every company drawing the same person.
    fn rng_for(&self, company: &str) -> StdRng {
        match self.demo_seed {
            Some(seed) => {
                let mut hasher = DefaultHasher::new();
                company.hash(&mut hasher);
                StdRng::seed_from_u64(seed ^ hasher.finish())
            }
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    fn offline_contact(&self, company: &str, source: ContactSource, note: &str) -> Contact {
        if let Some(entry) = directory_lookup(company) {
            return Contact {
                name: entry.contact.to_string(),
                title: entry.title.to_string(),
                email: entry.email.to_string(),
                phone: "+1-555-0123".to_string(),
                department: entry.department.to_string(),
                source,
                note: Some(note.to_string()),
            };
        }
        let mut rng = self.rng_for(company);
        let payload = synthesize_contact(company, &mut rng);
        payload_to_contact(payload, source, Some(note.to_string()))
    }

    /// Total: always yields a fully populated Contact.
    pub async fn resolve_contact(&self, company: &str) -> Contact {
        let provider = match &self.provider {
            None => {
                counter!("enrich_demo_total").increment(1);
                return self.offline_contact(company, ContactSource::Demo, "demo dataset contact");
            }
            Some(p) => p,
        };

        match tokio::time::timeout(self.timeout, provider.lookup(company)).await {
            Ok(Some(payload)) if payload.is_usable() => {
                counter!("enrich_live_total").increment(1);
                payload_to_contact(payload, ContactSource::Live, None)
            }
            Ok(Some(_)) | Ok(None) => {
                tracing::warn!(provider = provider.name(), "enrichment miss, synthesizing");
                counter!("enrich_fallback_total").increment(1);
                self.offline_contact(
                    company,
                    ContactSource::Fallback,
                    "live enrichment unavailable",
                )
            }
            Err(_) => {
                tracing::warn!(provider = provider.name(), "enrichment timed out");
                counter!("enrich_fallback_total").increment(1);
                self.offline_contact(
                    company,
                    ContactSource::Fallback,
                    "live enrichment timed out",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        payload: Option<ContactPayload>,
    }

    #[async_trait]
    impl ContactProvider for FixedProvider {
        async fn lookup(&self, _company: &str) -> Option<ContactPayload> {
            self.payload.clone()
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl ContactProvider for SlowProvider {
        async fn lookup(&self, _company: &str) -> Option<ContactPayload> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Some(ContactPayload {
                name: "Too Late".to_string(),
                email: "late@slow.test".to_string(),
                ..Default::default()
            })
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn usable_payload() -> ContactPayload {
        ContactPayload {
            name: "Jane Roe".to_string(),
            title: "Head of Sales".to_string(),
            email: "jane.roe@acme.test".to_string(),
            phone: "+1-555-9999".to_string(),
            department: "Sales".to_string(),
        }
    }

    #[tokio::test]
    async fn demo_mode_hits_the_directory() {
        let client = EnrichmentClient::demo(Some(7));
        let c = client.resolve_contact("Stripe").await;
        assert_eq!(c.name, "Nina Rossi");
        assert_eq!(c.source, ContactSource::Demo);
        assert!(c.note.is_some());
    }

    #[tokio::test]
    async fn directory_lookup_tolerates_near_misses() {
        assert!(directory_lookup("stripe inc").is_some());
        assert!(directory_lookup("Stripee").is_some());
        assert!(directory_lookup("Quantum Metrics").is_none());
    }

    #[tokio::test]
    async fn synthesis_is_deterministic_under_a_seed() {
        let a = EnrichmentClient::demo(Some(42))
            .resolve_contact("Quantum Metrics")
            .await;
        let b = EnrichmentClient::demo(Some(42))
            .resolve_contact("Quantum Metrics")
            .await;
        assert_eq!(a.name, b.name);
        assert_eq!(a.email, b.email);
        assert!(a.email.ends_with("@quantummetrics.com"));
    }

    #[tokio::test]
    async fn synthesis_roles_follow_the_company_name() {
        let client = EnrichmentClient::demo(Some(1));
        let tech = client.resolve_contact("CloudData Systems").await;
        assert_eq!(tech.title, "CTO");
        assert_eq!(tech.department, "Technology");

        let fin = client.resolve_contact("Summit Capital").await;
        assert_eq!(fin.title, "CFO");
        assert_eq!(fin.department, "Finance");
    }

    #[tokio::test]
    async fn live_payload_is_tagged_live() {
        let client = EnrichmentClient::live(
            Arc::new(FixedProvider {
                payload: Some(usable_payload()),
            }),
            Duration::from_secs(1),
            None,
        );
        let c = client.resolve_contact("Acme").await;
        assert_eq!(c.source, ContactSource::Live);
        assert_eq!(c.name, "Jane Roe");
        assert!(c.note.is_none());
    }

    #[tokio::test]
    async fn unusable_payload_falls_back() {
        let client = EnrichmentClient::live(
            Arc::new(FixedProvider {
                payload: Some(ContactPayload {
                    name: "No Email".to_string(),
                    ..Default::default()
                }),
            }),
            Duration::from_secs(1),
            Some(3),
        );
        let c = client.resolve_contact("Acme").await;
        assert_eq!(c.source, ContactSource::Fallback);
        assert!(!c.name.is_empty());
        assert!(!c.email.is_empty());
    }

    #[tokio::test]
    async fn provider_miss_falls_back_not_errors() {
        let client = EnrichmentClient::live(
            Arc::new(FixedProvider { payload: None }),
            Duration::from_secs(1),
            Some(3),
        );
        let c = client.resolve_contact("Acme").await;
        assert_eq!(c.source, ContactSource::Fallback);
        assert!(!c.email.is_empty());
        assert!(!c.phone.is_empty());
        assert!(!c.department.is_empty());
    }

    #[tokio::test]
    async fn slow_provider_times_out_into_fallback() {
        let client =
            EnrichmentClient::live(Arc::new(SlowProvider), Duration::from_millis(20), Some(3));
        let c = client.resolve_contact("Acme").await;
        assert_eq!(c.source, ContactSource::Fallback);
    }

    #[tokio::test]
    async fn live_blanks_get_neutral_defaults() {
        let client = EnrichmentClient::live(
            Arc::new(FixedProvider {
                payload: Some(ContactPayload {
                    name: "Min Imal".to_string(),
                    email: "min@imal.test".to_string(),
                    ..Default::default()
                }),
            }),
            Duration::from_secs(1),
            None,
        );
        let c = client.resolve_contact("Acme").await;
        assert_eq!(c.title, "Business Contact");
        assert_eq!(c.department, "General");
        assert!(!c.phone.is_empty());
    }
}
