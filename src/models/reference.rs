use serde::{Deserialize, Serialize};

use super::citation::Citation;
use super::detail::{ArticleDetail, ClassificationDetail, EnrichmentDetail};

/// Identity and stored evidence of a generated diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: String,
    /// Classification code the diagnosis was generated under.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl Diagnosis {
    /// Session cache key: `{code}:{id}`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.code, self.id)
    }
}

/// A clinical-decision-support source bundling its own citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalSupportSource {
    pub citation: Citation,
    #[serde(default)]
    pub detail: Option<EnrichmentDetail>,
}

/// Final reconciled reference. At most one detail is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedReference {
    pub citation: Citation,
    pub classification_detail: Option<ClassificationDetail>,
    pub article_detail: Option<ArticleDetail>,
    pub is_enriched: bool,
}

impl MergedReference {
    pub fn unenriched(citation: Citation) -> Self {
        Self {
            citation,
            classification_detail: None,
            article_detail: None,
            is_enriched: false,
        }
    }

    pub fn with_classification(citation: Citation, detail: ClassificationDetail) -> Self {
        Self {
            citation,
            classification_detail: Some(detail),
            article_detail: None,
            is_enriched: true,
        }
    }

    pub fn with_article(citation: Citation, detail: ArticleDetail) -> Self {
        Self {
            citation,
            classification_detail: None,
            article_detail: Some(detail),
            is_enriched: true,
        }
    }

    /// Build from an optional detail of either kind.
    pub fn from_detail(citation: Citation, detail: Option<EnrichmentDetail>) -> Self {
        match detail {
            Some(EnrichmentDetail::Classification(d)) => Self::with_classification(citation, d),
            Some(EnrichmentDetail::Article(d)) => Self::with_article(citation, d),
            None => Self::unenriched(citation),
        }
    }
}
