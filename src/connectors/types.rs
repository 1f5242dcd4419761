use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::EvidenceSource;

/// One normalized search hit from any connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorResultItem {
    pub source: EvidenceSource,
    /// Provider-native identifier (PMID, NCT id, set id, code...).
    pub id: String,
    pub title: String,
    /// Canonical, human-browsable URL.
    pub url: String,
    pub provenance: Provenance,
}

/// Source-specific metadata rendered next to the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Article {
        journal: Option<String>,
        published: Option<String>,
        #[serde(default)]
        authors: Vec<String>,
    },
    Classification {
        code: Option<String>,
    },
    AdverseEvent {
        received: Option<String>,
        serious: bool,
        #[serde(default)]
        drugs: Vec<String>,
        #[serde(default)]
        reactions: Vec<String>,
    },
    Trial {
        status: Option<String>,
        #[serde(default)]
        phases: Vec<String>,
        start_date: Option<String>,
        #[serde(default)]
        conditions: Vec<String>,
    },
    DrugLabel {
        brand_name: Option<String>,
        generic_name: Option<String>,
        manufacturer: Option<String>,
        effective_date: Option<String>,
    },
}

impl Provenance {
    /// Compact one-line rendering used by the prompt formatter.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        match self {
            Provenance::Article {
                journal,
                published,
                authors,
            } => {
                parts.extend(journal.clone());
                parts.extend(published.clone());
                if let Some(first) = authors.first() {
                    if authors.len() > 1 {
                        parts.push(format!("{first} et al."));
                    } else {
                        parts.push(first.clone());
                    }
                }
            }
            Provenance::Classification { code } => {
                if let Some(code) = code {
                    parts.push(format!("code {code}"));
                }
            }
            Provenance::AdverseEvent {
                received,
                serious,
                drugs,
                reactions,
            } => {
                if let Some(date) = received {
                    parts.push(format!("received {date}"));
                }
                if *serious {
                    parts.push("serious".to_string());
                }
                if !drugs.is_empty() {
                    parts.push(format!("drugs: {}", drugs.join(", ")));
                }
                if !reactions.is_empty() {
                    parts.push(format!("reactions: {}", reactions.join(", ")));
                }
            }
            Provenance::Trial {
                status,
                phases,
                start_date,
                ..
            } => {
                parts.extend(status.clone());
                if !phases.is_empty() {
                    parts.push(phases.join("/"));
                }
                if let Some(date) = start_date {
                    parts.push(format!("started {date}"));
                }
            }
            Provenance::DrugLabel {
                generic_name,
                manufacturer,
                effective_date,
                ..
            } => {
                parts.extend(generic_name.clone());
                parts.extend(manufacturer.clone());
                if let Some(date) = effective_date {
                    parts.push(format!("effective {date}"));
                }
            }
        }
        parts.join(" | ")
    }
}

static PUBMED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)pubmed\.ncbi\.nlm\.nih\.gov/(\d+)").expect("pubmed id regex")
});
static PMC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ncbi\.nlm\.nih\.gov/pmc/articles/(PMC\d+)").expect("pmc id regex")
});
static EUROPE_PMC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)europepmc\.org/(?:article|abstract)/([a-z]+)/([a-z0-9]+)")
        .expect("europe pmc id regex")
});

/// Literature article identifier, as understood by Europe PMC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleId {
    /// Index the citation came from.
    pub origin: EvidenceSource,
    /// Europe PMC source code: `MED`, `PMC`, `PPR`...
    pub source_code: String,
    pub id: String,
}

impl ArticleId {
    /// Extract an identifier from a literature URL. `None` when the URL
    /// carries no recognizable article id.
    pub fn from_url(url: &str) -> Option<Self> {
        if let Some(cap) = PUBMED_ID.captures(url) {
            return Some(Self {
                origin: EvidenceSource::Pubmed,
                source_code: "MED".to_string(),
                id: cap[1].to_string(),
            });
        }
        if let Some(cap) = PMC_ID.captures(url) {
            return Some(Self {
                origin: EvidenceSource::Pubmed,
                source_code: "PMC".to_string(),
                id: cap[1].to_uppercase(),
            });
        }
        if let Some(cap) = EUROPE_PMC_ID.captures(url) {
            return Some(Self {
                origin: EvidenceSource::EuropePmc,
                source_code: cap[1].to_uppercase(),
                id: cap[2].to_uppercase(),
            });
        }
        None
    }
}
