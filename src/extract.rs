// src/extract.rs
//! Heuristic company-name extraction from headlines. Total: every input maps
//! to a non-empty name, bottoming out at a sentinel. This is deliberately
//! lossy pattern matching, not NER; callers must tolerate wrong guesses.

use once_cell::sync::Lazy;
use regex::Regex;

/// Returned when no heuristic produces a usable name.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

// Headline idioms in priority order; the first capture wins.
static IDIOMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "TechCorp raises $10M", "StartupCo announces expansion"
        r"(?P<name>[A-Z][\w.&-]*(?:\s+[A-Z][\w.&-]*)*)\s+(?:raises|announces|launches|acquires|partners)\b",
        // "Acme and Globex sign a deal"
        r"(?P<name>[A-Z][\w.&-]*(?:\s+[A-Z][\w.&-]*)*)\s+and\s+[A-Z]",
        // "AI startup InnovateLabs secures funding"
        r"\b(?i:startup)\s+(?P<name>[A-Z][\w.&-]*)",
        // "Tesla stock surges", "Acme valuation doubles"
        r"(?P<name>[A-Z][\w.&-]*(?:\s+[A-Z][\w.&-]*)*)\s+(?:stock|valuation|shares)\b",
        // "Apple CEO steps down"
        r"(?P<name>[A-Z][\w.&-]*(?:\s+[A-Z][\w.&-]*)*)\s+CEO\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("company idiom regex"))
    .collect()
});

fn is_stop_word(tok: &str) -> bool {
    let lower = tok.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "the"
            | "a"
            | "an"
            | "and"
            | "or"
            | "but"
            | "if"
            | "this"
            | "that"
            | "these"
            | "those"
            | "it"
            | "its"
            | "in"
            | "on"
            | "at"
            | "to"
            | "for"
            | "of"
            | "with"
            | "by"
            | "from"
            | "as"
            | "is"
            | "are"
            | "was"
            | "were"
            | "be"
            | "been"
            | "has"
            | "have"
            | "had"
            | "will"
            | "after"
            | "before"
            | "over"
            | "under"
            | "amid"
            | "why"
            | "how"
            | "what"
            | "when"
            | "where"
            | "who"
    )
}

fn is_entity_word(tok: &str) -> bool {
    let lower = tok.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "startup" | "company" | "corp" | "inc" | "ltd" | "co" | "llc" | "group"
    )
}

fn is_numeric(tok: &str) -> bool {
    !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit())
}

/// Strip trailing punctuation and possessives off a captured name.
fn clean_name(raw: &str) -> String {
    let mut name = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, ',' | '.' | ':' | ';' | '!' | '?' | '"' | '\''))
        .to_string();
    if let Some(stripped) = name
        .strip_suffix("'s")
        .or_else(|| name.strip_suffix("\u{2019}s"))
    {
        name = stripped.to_string();
    }
    name.trim().to_string()
}

fn try_idioms(title: &str) -> Option<String> {
    for re in IDIOMS.iter() {
        if let Some(caps) = re.captures(title) {
            if let Some(m) = caps.name("name") {
                let name = clean_name(m.as_str());
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
    }
    None
}

// Tokens that look like a proper name: uppercase start, len >= 2, not a stop
// word, not bare digits, not a generic entity word. Longest wins, first
// occurrence breaks ties.
fn try_candidates(title: &str) -> Option<String> {
    let mut best: Option<String> = None;
    for tok in title.split_whitespace() {
        let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
        if tok.chars().count() < 2 {
            continue;
        }
        if !tok.chars().next().is_some_and(|c| c.is_uppercase()) {
            continue;
        }
        if is_stop_word(tok) || is_numeric(tok) || is_entity_word(tok) {
            continue;
        }
        let cleaned = clean_name(tok);
        if cleaned.is_empty() {
            continue;
        }
        let longer = best
            .as_ref()
            .map(|b| cleaned.chars().count() > b.chars().count())
            .unwrap_or(true);
        if longer {
            best = Some(cleaned);
        }
    }
    best
}

fn try_title_case_fallback(title: &str) -> Option<String> {
    for tok in title.split_whitespace() {
        let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
        if tok.is_empty() || is_stop_word(tok) {
            continue;
        }
        let mut chars = tok.chars();
        let first = chars.next()?;
        let rest: String = chars.flat_map(|c| c.to_lowercase()).collect();
        let name: String = first.to_uppercase().chain(rest.chars()).collect();
        if !name.is_empty() {
            return Some(name);
        }
    }
    None
}

/// Best-effort company name for a headline. Never returns an empty string.
pub fn extract_company(title: &str) -> String {
    try_idioms(title)
        .or_else(|| try_candidates(title))
        .or_else(|| try_title_case_fallback(title))
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}
