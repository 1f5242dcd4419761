//! Clinical-report citation grammar.
//!
//! At each scan position the tiers are tried in order and the first match
//! wins:
//! 1. bracket links, `[[LABEL]](URL)` or `[Title](URL)`
//! 2. bare URLs, optionally wrapped in parentheses
//! 3. parenthesized classification codes such as `(BA00.0)`
//!
//! Text no tier claims is kept verbatim, so joining every segment's
//! original span reproduces the input exactly.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{source_for_label, source_for_url};
use crate::connectors::icd::browse_url;
use crate::models::{Citation, EvidenceSource};

static BRACKET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\[)?([^\[\]\n]+)\](\])?\((https?://[^\s)]+)\)").expect("bracket link regex")
});
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\()?(https?://[^\s()<>\[\]]*[^\s()<>\[\].,;:!?'"])(\))?"#).expect("bare url regex")
});
static PAREN_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(([A-Z0-9]{2,5})((?:[./][A-Z0-9]{1,5})*)\)").expect("paren code regex")
});

/// A piece of parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Citation {
        citation: Citation,
        /// The exact span the citation was parsed from.
        raw: String,
    },
}

impl Segment {
    /// Original text of this segment.
    pub fn raw(&self) -> &str {
        match self {
            Segment::Text(text) => text,
            Segment::Citation { raw, .. } => raw,
        }
    }
}

/// A tier claimed `len` bytes from the scan position.
#[derive(Debug, Clone)]
pub struct TierMatch {
    pub len: usize,
    pub citation: Citation,
}

/// One rule of the grammar, tried at the start of `rest`.
pub trait CitationTier: Send + Sync {
    fn name(&self) -> &'static str;
    fn match_at(&self, rest: &str) -> Option<TierMatch>;
}

/// `[[LABEL]](URL)` with a known label, or `[Title](URL)`.
pub struct BracketTier;

impl CitationTier for BracketTier {
    fn name(&self) -> &'static str {
        "bracket"
    }

    fn match_at(&self, rest: &str) -> Option<TierMatch> {
        let cap = BRACKET_LINK.captures(rest)?;
        // Brackets must balance: `[[x](u)` and `[x]](u)` are not links.
        if cap.get(1).is_some() != cap.get(3).is_some() {
            return None;
        }
        let label = cap[2].trim();
        let url = &cap[4];

        let source = source_for_label(label)
            .or_else(|| source_for_url(url))
            .unwrap_or(EvidenceSource::Pubmed);
        Some(TierMatch {
            len: cap[0].len(),
            citation: Citation::new(source, label, url),
        })
    }
}

/// `https://...` or `(https://...)`. Trailing sentence punctuation is left
/// in the text.
pub struct BareUrlTier;

impl CitationTier for BareUrlTier {
    fn name(&self) -> &'static str {
        "bare_url"
    }

    fn match_at(&self, rest: &str) -> Option<TierMatch> {
        let cap = BARE_URL.captures(rest)?;
        let url = cap.get(2)?;
        let len = match (cap.get(1), cap.get(3)) {
            (Some(_), Some(close)) => close.end(),
            // A lone "(" stays text; the URL matches at the next position.
            (Some(_), None) => return None,
            (None, _) => url.end(),
        };

        let source = source_for_url(url.as_str()).unwrap_or(EvidenceSource::Pubmed);
        Some(TierMatch {
            len,
            citation: Citation::new(source, source.display_name(), url.as_str()),
        })
    }
}

/// `(BA00.0)`: a parenthesized code with at least one letter and one digit
/// in its leading segment. Links to the browser entry of that segment.
pub struct ClassificationCodeTier;

impl CitationTier for ClassificationCodeTier {
    fn name(&self) -> &'static str {
        "classification_code"
    }

    fn match_at(&self, rest: &str) -> Option<TierMatch> {
        let cap = PAREN_CODE.captures(rest)?;
        let stem = &cap[1];
        let has_letter = stem.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = stem.chars().any(|c| c.is_ascii_digit());
        if !has_letter || !has_digit {
            return None;
        }

        let code = format!("{stem}{}", &cap[2]);
        Some(TierMatch {
            len: cap[0].len(),
            citation: Citation::new(EvidenceSource::Icd11, code, browse_url(stem)),
        })
    }
}

/// Ordered tier chain.
pub struct ClinicalCitationParser {
    tiers: Vec<Box<dyn CitationTier>>,
}

impl Default for ClinicalCitationParser {
    fn default() -> Self {
        Self::new(vec![
            Box::new(BracketTier),
            Box::new(BareUrlTier),
            Box::new(ClassificationCodeTier),
        ])
    }
}

impl ClinicalCitationParser {
    pub fn new(tiers: Vec<Box<dyn CitationTier>>) -> Self {
        Self { tiers }
    }

    pub fn parse(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut text_start = 0;
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let matched = self
                .tiers
                .iter()
                .find_map(|tier| tier.match_at(rest).map(|m| (tier.name(), m)));

            if let Some((tier, m)) = matched {
                if text_start < pos {
                    segments.push(Segment::Text(text[text_start..pos].to_string()));
                }
                tracing::trace!(tier, url = %m.citation.url, "Citation matched");
                segments.push(Segment::Citation {
                    raw: rest[..m.len].to_string(),
                    citation: m.citation,
                });
                pos += m.len;
                text_start = pos;
                continue;
            }

            pos += rest.chars().next().map_or(1, char::len_utf8);
        }

        if text_start < text.len() {
            segments.push(Segment::Text(text[text_start..].to_string()));
        }
        segments
    }
}

/// Distinct citations of a clinical report, in order of first appearance.
pub fn extract_clinical_citations(text: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    ClinicalCitationParser::default()
        .parse(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Citation { citation, .. } => Some(citation),
            Segment::Text(_) => None,
        })
        .filter(|citation| seen.insert(citation.lookup_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn citations(segments: &[Segment]) -> Vec<&Citation> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Citation { citation, .. } => Some(citation),
                Segment::Text(_) => None,
            })
            .collect()
    }

    fn rejoin(segments: &[Segment]) -> String {
        segments.iter().map(Segment::raw).collect()
    }

    #[test]
    fn parenthesized_code_links_to_leading_segment() {
        let text = "Consistent with essential hypertension (BA00.0).";
        let segments = ClinicalCitationParser::default().parse(text);

        let found = citations(&segments);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, EvidenceSource::Icd11);
        assert_eq!(found[0].title, "BA00.0");
        assert_eq!(found[0].url, "https://icd.who.int/browse/2024-01/mms/en#BA00");
        assert_eq!(rejoin(&segments), text);
    }

    #[test]
    fn codes_need_a_letter_and_a_digit() {
        let parser = ClinicalCitationParser::default();
        for text in ["(2019)", "(NSAID)", "(A)", "(ba00)"] {
            let segments = parser.parse(text);
            assert_eq!(segments, vec![Segment::Text(text.to_string())], "{text}");
        }
    }

    #[test]
    fn bracket_tier_wins_over_bare_url() {
        let text = "See [[PUBMED]](https://pubmed.ncbi.nlm.nih.gov/123/) for details";
        let segments = ClinicalCitationParser::default().parse(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(citations(&segments)[0].source, EvidenceSource::Pubmed);
        assert_eq!(citations(&segments)[0].title, "PUBMED");
        assert_eq!(
            segments[1].raw(),
            "[[PUBMED]](https://pubmed.ncbi.nlm.nih.gov/123/)"
        );
        assert_eq!(rejoin(&segments), text);
    }

    #[test]
    fn markdown_link_keeps_its_title_and_infers_source() {
        let text = "[Metformin trial](https://clinicaltrials.gov/study/NCT01234567)";
        let segments = ClinicalCitationParser::default().parse(text);
        let found = citations(&segments);
        assert_eq!(found[0].title, "Metformin trial");
        assert_eq!(found[0].source, EvidenceSource::ClinicalTrials);
    }

    #[test]
    fn bare_urls_leave_sentence_punctuation() {
        let text = "Label: https://dailymed.nlm.nih.gov/dailymed/lookup.cfm?setid=abc. Also \
                    (https://europepmc.org/article/MED/42) here.";
        let segments = ClinicalCitationParser::default().parse(text);
        let found = citations(&segments);
        assert_eq!(found.len(), 2);
        assert_eq!(
            found[0].url,
            "https://dailymed.nlm.nih.gov/dailymed/lookup.cfm?setid=abc"
        );
        assert_eq!(found[0].source, EvidenceSource::DrugLabels);
        assert_eq!(found[1].url, "https://europepmc.org/article/MED/42");
        assert_eq!(found[1].source, EvidenceSource::EuropePmc);
        assert_eq!(rejoin(&segments), text);
    }

    #[test]
    fn text_without_citations_is_one_segment() {
        let text = "No sources cited here, only prose (and a parenthetical).";
        assert_eq!(
            ClinicalCitationParser::default().parse(text),
            vec![Segment::Text(text.to_string())]
        );
        assert!(ClinicalCitationParser::default().parse("").is_empty());
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let text = "Hypertension artérielle (BA00), voir https://pubmed.ncbi.nlm.nih.gov/9/ ✓";
        let segments = ClinicalCitationParser::default().parse(text);
        assert_eq!(citations(&segments).len(), 2);
        assert_eq!(rejoin(&segments), text);
    }

    #[test]
    fn extraction_dedupes_by_normalized_url() {
        let text = "(BA00) and again (BA00.1) plus https://pubmed.ncbi.nlm.nih.gov/5 \
                    and [[PUBMED]](http://pubmed.ncbi.nlm.nih.gov/5/)";
        let found = extract_clinical_citations(text);
        let urls: Vec<_> = found.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://icd.who.int/browse/2024-01/mms/en#BA00",
                "https://pubmed.ncbi.nlm.nih.gov/5"
            ]
        );
    }

    #[test]
    fn extraction_keeps_distinct_codes_and_drops_tracking_variants() {
        let text = "(BA00) versus (5A11), see https://pubmed.ncbi.nlm.nih.gov/5/ \
                    and https://pubmed.ncbi.nlm.nih.gov/5/?utm_source=x";
        let titles: Vec<_> = extract_clinical_citations(text)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, ["BA00", "5A11", "PubMed"]);
    }
}
