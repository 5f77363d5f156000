//! Domain records produced by the pipeline: qualified leads, their resolved
//! contacts, and the rendered outreach emails.
//!
//! These are plain data types; all behavior lives in the pipeline stages.
//! Serialization uses camelCase to match the dashboard wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a resolved contact.
///
/// `Live` means the external enrichment provider answered with a usable
/// payload. `Demo` means the offline policy produced the contact (demo mode).
/// `Fallback` means live enrichment was attempted and failed, and the offline
/// policy filled in. The three are never merged silently: every Contact
/// carries the tag of the policy that actually produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactSource {
    Live,
    Demo,
    Fallback,
}

impl ContactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSource::Live => "live",
            ContactSource::Demo => "demo",
            ContactSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ContactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person reachable at a detected company.
///
/// Every field is always populated; enrichment is total and never hands back
/// a partial contact. `note` carries optional human-readable provenance
/// detail (e.g. that the contact was synthesized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub source: ContactSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Lifecycle status of a lead. Runs always create leads as `New`; later
/// transitions belong to the dashboard, not to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Dismissed,
}

/// A qualified company + contact + the article that surfaced it.
/// The pipeline's primary output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// `"<run id>-<sequence>"`; unique within a run, stable for re-keying.
    pub id: String,
    pub company: String,
    pub article_title: String,
    pub article_link: String,
    pub contact: Contact,
    pub detected_at: DateTime<Utc>,
    pub status: LeadStatus,
    /// Cosmetic display value in 70..=95. There is no defined derivation;
    /// consumers must not treat it as a real probability (see DESIGN.md).
    pub confidence_score: u8,
    /// Exactly the keywords that matched the article title.
    pub tags: Vec<String>,
}

/// A rendered, ready-to-send outreach email. This crate only drafts; it
/// never transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachEmail {
    pub lead_id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}
