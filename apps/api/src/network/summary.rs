//! Network digest. Reduces a user's connections into a bounded text blob
//! that is safe to embed in an LLM system prompt.
//!
//! Pure and deterministic: the same input list always yields the same string.
//! Company and location names are grouped exactly as stored, so `"Acme"` and
//! `"acme"` count as two different companies.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::connection::Connection;

/// Returned verbatim when there is nothing to summarize.
pub const NO_CONNECTIONS: &str = "No connection data available.";

/// How many companies / locations are listed in the digest.
pub const TOP_N: usize = 5;

/// How many connections are rendered in the detail excerpt.
pub const DETAIL_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrequencyEntry {
    pub name: String,
    pub count: usize,
}

/// Structured form of the digest. `render()` produces the prompt text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionSummary {
    pub total: usize,
    /// Distinct non-empty company names, compared exactly.
    pub distinct_companies: usize,
    pub distinct_locations: usize,
    pub top_companies: Vec<FrequencyEntry>,
    pub top_locations: Vec<FrequencyEntry>,
    pub details: Vec<String>,
}

impl ConnectionSummary {
    pub fn from_connections(connections: &[Connection]) -> Self {
        let mut companies = frequencies(connections.iter().map(|c| c.company.as_deref()));
        let mut locations = frequencies(connections.iter().map(|c| c.location.as_deref()));
        let distinct_companies = companies.len();
        let distinct_locations = locations.len();
        companies.truncate(TOP_N);
        locations.truncate(TOP_N);

        ConnectionSummary {
            total: connections.len(),
            distinct_companies,
            distinct_locations,
            top_companies: companies,
            top_locations: locations,
            details: connections
                .iter()
                .take(DETAIL_LIMIT)
                .map(render_detail_line)
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        if self.total == 0 {
            return NO_CONNECTIONS.to_string();
        }

        let mut out = format!(
            "Total connections: {}\nTop companies: {}\nTop locations: {}\n\n\
             Detailed connection data (limited to {} most recent):",
            self.total,
            format_frequencies(&self.top_companies),
            format_frequencies(&self.top_locations),
            DETAIL_LIMIT
        );
        for line in &self.details {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

/// Produces the digest text for a user's connections.
/// `None` and an empty list both yield [`NO_CONNECTIONS`].
pub fn summarize_connections(connections: Option<&[Connection]>) -> String {
    match connections {
        Some(list) if !list.is_empty() => ConnectionSummary::from_connections(list).render(),
        _ => NO_CONNECTIONS.to_string(),
    }
}

/// Counts non-empty values, most frequent first.
/// Equal counts keep first-seen order (stable sort).
fn frequencies<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<FrequencyEntry> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<FrequencyEntry> = Vec::new();

    for value in values.flatten().filter(|v| !v.is_empty()) {
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(FrequencyEntry {
                    name: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn format_frequencies(entries: &[FrequencyEntry]) -> String {
    if entries.is_empty() {
        return "None".to_string();
    }
    entries
        .iter()
        .map(|e| format!("{} ({})", e.name, e.count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_detail_line(c: &Connection) -> String {
    format!(
        "- {} {}, {} at {}, Location: {}",
        c.first_name,
        c.last_name,
        or_placeholder(c.position.as_deref(), "No position"),
        or_placeholder(c.company.as_deref(), "No company"),
        or_placeholder(c.location.as_deref(), "Unknown"),
    )
}

fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => placeholder,
    }
}
