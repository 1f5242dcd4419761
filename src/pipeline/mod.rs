pub mod aggregate; // Fan-out across the six sources
pub mod prompt;
pub mod citation; // Chat and clinical citation grammars
pub mod reconcile;
pub mod fetch_status;
pub mod enrichment; // Detail lookups for stored citations
pub mod evidence;

pub use aggregate::{AggregatedEvidence, EnabledSources, EvidenceAggregator, EvidenceSummary};
pub use enrichment::{DetailResponse, EnrichmentFetcher};
pub use evidence::{ClinicalSupportProvider, DiagnosisEvidence, EvidenceError};
pub use fetch_status::{summarize_failures, FetchStatus};
pub use prompt::format_evidence;
pub use reconcile::merge_references;
