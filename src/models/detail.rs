use serde::{Deserialize, Serialize};

use super::enums::EvidenceSource;

/// One step up the classification hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentCategory {
    pub code: String,
    pub title: String,
}

/// Classification-registry record reached from a code or search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationDetail {
    pub code: String,
    pub title: String,
    pub description: String,
    /// Nearest parent only; the lookup never walks the full ancestor chain.
    #[serde(default)]
    pub parents: Vec<ParentCategory>,
    pub browse_url: String,
    /// URL of the citation this detail was requested for. Empty when the
    /// producer did not echo it, in which case pairing is positional.
    #[serde(default)]
    pub citation_url: String,
}

/// Article-level enrichment from a literature index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub source: EvidenceSource,
    pub title: String,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentDetail {
    Classification(ClassificationDetail),
    Article(ArticleDetail),
}
