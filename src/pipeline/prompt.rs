//! Renders aggregated evidence as a prompt block.
//!
//! Literature comes first and the classification registry last: models
//! otherwise over-cite the classification entry.

use crate::connectors::ConnectorResultItem;
use crate::models::EvidenceSource;
use crate::pipeline::aggregate::AggregatedEvidence;
use crate::pipeline::citation::citation_label;

/// Section order in the rendered block.
pub const PROMPT_SECTION_ORDER: [EvidenceSource; 6] = [
    EvidenceSource::Pubmed,
    EvidenceSource::EuropePmc,
    EvidenceSource::ClinicalTrials,
    EvidenceSource::Faers,
    EvidenceSource::DrugLabels,
    EvidenceSource::Icd11,
];

/// Deterministic prompt block for `evidence`. Empty when there is nothing
/// to cite.
pub fn format_evidence(evidence: &AggregatedEvidence) -> String {
    let sections: Vec<(EvidenceSource, &[ConnectorResultItem])> = PROMPT_SECTION_ORDER
        .iter()
        .map(|s| (*s, evidence.items(*s)))
        .filter(|(_, items)| !items.is_empty())
        .collect();

    if sections.is_empty() {
        return String::new();
    }

    let mut out = String::from("<evidence_sources>\n");
    out.push_str(&format_manifest(&sections));
    for (source, items) in &sections {
        out.push('\n');
        out.push_str(&format_section(*source, items));
    }
    out.push_str("</evidence_sources>\n");
    out
}

fn format_manifest(sections: &[(EvidenceSource, &[ConnectorResultItem])]) -> String {
    let mut text = String::from("AVAILABLE SOURCES:\n");
    for (source, items) in sections {
        text.push_str(&format!(
            "- {} [{}]: {} result(s)\n",
            source.display_name(),
            citation_label(*source),
            items.len()
        ));
    }
    text.push_str(
        "Cite every source listed above at least once. \
         Use the form [[LABEL]](URL) with the URL of the entry you rely on.\n",
    );
    text
}

fn format_section(source: EvidenceSource, items: &[ConnectorResultItem]) -> String {
    let mut text = format!("## {} [{}]\n", source.display_name(), citation_label(source));
    for (i, item) in items.iter().enumerate() {
        text.push_str(&format!("{}. {}", i + 1, item.title));
        let provenance = item.provenance.summary();
        if !provenance.is_empty() {
            text.push_str(&format!(" ({provenance})"));
        }
        text.push_str(&format!("\n   URL: {}\n", item.url));
    }
    text
}
