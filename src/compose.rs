// src/compose.rs
//! Outreach email rendering. Pure: the same Lead always renders the same
//! email. No I/O here; sending (if ever) belongs to a separate layer.

use crate::lead::{Lead, OutreachEmail};

/// Render a plain-text outreach email for a detected lead.
pub fn compose_outreach(lead: &Lead) -> OutreachEmail {
    let first = lead
        .contact
        .name
        .split_whitespace()
        .next()
        .unwrap_or("there");
    let topic = lead.tags.first().map(String::as_str).unwrap_or("news");

    let subject = format!(
        "Quick intro after {}'s {} announcement",
        lead.company, topic
    );

    let mut body = format!(
        "Hi {},\n\n\
         I saw the news: \"{}\". Congratulations!\n\n\
         When a company like {} makes a move on the {} front, timing matters. \
         As {}, you are likely the right person to talk to about what comes next.\n\n\
         Would you be open to a short call this week?\n\n\
         Best regards,\n\
         The LeadScout Team\n",
        first, lead.article_title, lead.company, topic, lead.contact.title
    );
    if !lead.article_link.is_empty() {
        body.push_str(&format!("\nReferenced article: {}\n", lead.article_link));
    }

    OutreachEmail {
        lead_id: lead.id.clone(),
        to: lead.contact.email.clone(),
        subject,
        body,
    }
}
