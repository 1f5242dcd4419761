//! Per-lookup outcomes of an enrichment fetch.

use serde::{Deserialize, Serialize};

use crate::models::{ArticleFetchStatus, ClassificationFetchStatus, EvidenceSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStatus {
    pub term: String,
    pub status: ClassificationFetchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStatus {
    pub url: String,
    pub source: EvidenceSource,
    pub status: ArticleFetchStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStatus {
    #[serde(default)]
    pub classification: Vec<ClassificationStatus>,
    #[serde(default)]
    pub articles: Vec<ArticleStatus>,
}

impl FetchStatus {
    pub fn has_failures(&self) -> bool {
        self.classification
            .iter()
            .any(|c| c.status != ClassificationFetchStatus::Success)
            || self
                .articles
                .iter()
                .any(|a| a.status != ArticleFetchStatus::Success)
    }

    /// True when lookups were attempted and every one of them failed.
    pub fn all_failed(&self) -> bool {
        let attempted = self.classification.len() + self.articles.len();
        attempted > 0
            && self
                .classification
                .iter()
                .all(|c| c.status != ClassificationFetchStatus::Success)
            && self
                .articles
                .iter()
                .all(|a| a.status != ArticleFetchStatus::Success)
    }
}

/// One readable line per failed lookup: classification first, then
/// article lookups grouped by source.
pub fn summarize_failures(status: &FetchStatus) -> Vec<String> {
    let mut lines: Vec<String> = status
        .classification
        .iter()
        .filter_map(|entry| {
            let reason = match entry.status {
                ClassificationFetchStatus::Success => return None,
                ClassificationFetchStatus::Failed => "failed",
                ClassificationFetchStatus::Timeout => "timed out",
                ClassificationFetchStatus::NoCredentials => "skipped: credentials not configured",
            };
            Some(format!(
                "{} lookup for \"{}\" {reason}",
                EvidenceSource::Icd11.display_name(),
                entry.term
            ))
        })
        .collect();

    for source in EvidenceSource::ALL {
        for entry in status.articles.iter().filter(|a| a.source == source) {
            let reason = match entry.status {
                ArticleFetchStatus::Success => continue,
                ArticleFetchStatus::Failed => "could not be fetched",
                ArticleFetchStatus::Timeout => "timed out",
                ArticleFetchStatus::IdExtractionFailed => "has no recognizable article id",
            };
            lines.push(format!("{} article {} {reason}", source.display_name(), entry.url));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article(url: &str, source: EvidenceSource, status: ArticleFetchStatus) -> ArticleStatus {
        ArticleStatus {
            url: url.into(),
            source,
            status,
        }
    }

    #[test]
    fn successes_are_dropped() {
        let status = FetchStatus {
            classification: vec![ClassificationStatus {
                term: "BA00".into(),
                status: ClassificationFetchStatus::Success,
            }],
            articles: vec![article("u", EvidenceSource::Pubmed, ArticleFetchStatus::Success)],
        };
        assert!(summarize_failures(&status).is_empty());
        assert!(!status.has_failures());
        assert!(!status.all_failed());
    }

    #[test]
    fn failures_grouped_classification_then_by_source() {
        let status = FetchStatus {
            classification: vec![ClassificationStatus {
                term: "BA00".into(),
                status: ClassificationFetchStatus::NoCredentials,
            }],
            articles: vec![
                article("https://europepmc.org/article/PPR/1", EvidenceSource::EuropePmc, ArticleFetchStatus::Timeout),
                article("https://pubmed.ncbi.nlm.nih.gov/2/", EvidenceSource::Pubmed, ArticleFetchStatus::Failed),
                article("https://pubmed.ncbi.nlm.nih.gov/", EvidenceSource::Pubmed, ArticleFetchStatus::IdExtractionFailed),
            ],
        };
        assert_eq!(
            summarize_failures(&status),
            vec![
                "ICD-11 lookup for \"BA00\" skipped: credentials not configured".to_string(),
                "PubMed article https://pubmed.ncbi.nlm.nih.gov/2/ could not be fetched".to_string(),
                "PubMed article https://pubmed.ncbi.nlm.nih.gov/ has no recognizable article id".to_string(),
                "Europe PMC article https://europepmc.org/article/PPR/1 timed out".to_string(),
            ]
        );
        assert!(status.all_failed());
    }

    #[test]
    fn empty_status_is_not_a_failure() {
        let status = FetchStatus::default();
        assert!(!status.has_failures());
        assert!(!status.all_failed());
    }
}
