use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(EvidenceSource {
    Pubmed => "pubmed",
    Icd11 => "icd11",
    EuropePmc => "europe_pmc",
    Faers => "faers",
    ClinicalTrials => "clinical_trials",
    DrugLabels => "drug_labels",
});

str_enum!(ClassificationFetchStatus {
    Success => "success",
    Failed => "failed",
    Timeout => "timeout",
    NoCredentials => "no_credentials",
});

str_enum!(ArticleFetchStatus {
    Success => "success",
    Failed => "failed",
    Timeout => "timeout",
    IdExtractionFailed => "id_extraction_failed",
});

impl EvidenceSource {
    /// Every source, in declaration order.
    pub const ALL: [EvidenceSource; 6] = [
        Self::Pubmed,
        Self::Icd11,
        Self::EuropePmc,
        Self::Faers,
        Self::ClinicalTrials,
        Self::DrugLabels,
    ];

    /// Human-facing provider name used in prompts and failure summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pubmed => "PubMed",
            Self::Icd11 => "ICD-11",
            Self::EuropePmc => "Europe PMC",
            Self::Faers => "openFDA Adverse Events",
            Self::ClinicalTrials => "ClinicalTrials.gov",
            Self::DrugLabels => "Drug Labels",
        }
    }

    /// Literature indexes carry article-level detail (abstract, authors).
    pub fn is_literature(&self) -> bool {
        matches!(self, Self::Pubmed | Self::EuropePmc)
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Self::Icd11)
    }
}
