//! Citation grammars for model output.
//!
//! `chat` handles the strict `[[LABEL]](URL)` form used by the chat
//! surface. `clinical` handles the looser clinical-report grammar, a chain
//! of tiers that also recognizes bare URLs and parenthesized codes.

pub mod chat;
pub mod clinical;

pub use chat::parse_chat_citations;
pub use clinical::{extract_clinical_citations, CitationTier, ClinicalCitationParser, Segment};

use crate::models::EvidenceSource;

/// Label the prompt asks the model to use for `source`.
pub fn citation_label(source: EvidenceSource) -> &'static str {
    match source {
        EvidenceSource::Pubmed => "PUBMED",
        EvidenceSource::Icd11 => "ICD11",
        EvidenceSource::EuropePmc => "EUROPEPMC",
        EvidenceSource::Faers => "FAERS",
        EvidenceSource::ClinicalTrials => "CLINICALTRIALS",
        EvidenceSource::DrugLabels => "DAILYMED",
    }
}

/// Known citation labels, including the spellings models drift into.
pub fn source_for_label(label: &str) -> Option<EvidenceSource> {
    let label = label.trim().to_ascii_uppercase().replace([' ', '_', '-', '.'], "");
    let source = match label.as_str() {
        "PUBMED" | "PMID" | "MEDLINE" => EvidenceSource::Pubmed,
        "ICD11" | "ICD" | "WHOICD" => EvidenceSource::Icd11,
        "EUROPEPMC" | "EPMC" | "PMC" => EvidenceSource::EuropePmc,
        "FAERS" | "OPENFDA" | "FDA" | "ADVERSEEVENTS" => EvidenceSource::Faers,
        "CLINICALTRIALS" | "CLINICALTRIALSGOV" | "CTGOV" | "TRIALS" => EvidenceSource::ClinicalTrials,
        "DAILYMED" | "DRUGLABEL" | "DRUGLABELS" | "LABEL" => EvidenceSource::DrugLabels,
        _ => return None,
    };
    Some(source)
}

/// Source inferred from a URL's host (and, for openFDA, its endpoint).
pub fn source_for_url(url: &str) -> Option<EvidenceSource> {
    let lower = url.to_ascii_lowercase();
    let host = reqwest::Url::parse(&lower)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    let source = if host.ends_with("pubmed.ncbi.nlm.nih.gov") || host.ends_with("ncbi.nlm.nih.gov") {
        EvidenceSource::Pubmed
    } else if host.ends_with("europepmc.org") || host.ends_with("ebi.ac.uk") {
        EvidenceSource::EuropePmc
    } else if host.ends_with("who.int") {
        EvidenceSource::Icd11
    } else if host.ends_with("clinicaltrials.gov") {
        EvidenceSource::ClinicalTrials
    } else if host.ends_with("dailymed.nlm.nih.gov") || lower.contains("/drug/label") {
        EvidenceSource::DrugLabels
    } else if host.ends_with("fda.gov") {
        EvidenceSource::Faers
    } else {
        return None;
    };
    Some(source)
}
