use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::source_for_label;
use crate::models::{normalize_url, Citation, EvidenceSource};

static CHAT_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]]+)\]\]\((https?://[^\s)]+)\)").expect("chat citation regex")
});

/// Extract `[[LABEL]](URL)` citations from a chat reply.
///
/// The label becomes the citation title. Unknown labels are attributed to
/// PubMed. A URL cited twice (after normalization) yields one citation,
/// the first.
pub fn parse_chat_citations(text: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for cap in CHAT_CITATION.captures_iter(text) {
        let label = cap[1].trim();
        let url = &cap[2];
        if !seen.insert(normalize_url(url)) {
            continue;
        }
        let source = source_for_label(label).unwrap_or(EvidenceSource::Pubmed);
        citations.push(Citation::new(source, label, url));
    }

    citations
}
