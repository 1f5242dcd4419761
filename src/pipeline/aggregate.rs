//! Fan-out orchestrator: one query, six sources, one aggregate.
//!
//! Every enabled source runs concurrently under the same timeout. A source
//! that errors or times out contributes an empty list and a warning; the
//! aggregate itself never fails. Timed-out futures are dropped, which
//! cancels their in-flight request.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_RESULTS, DEFAULT_SOURCE_TIMEOUT};
use crate::connectors::{Connector, ConnectorResultItem, ConnectorSet};
use crate::models::EvidenceSource;

/// Per-source enable flags. Everything is enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledSources {
    pub pubmed: bool,
    pub icd11: bool,
    pub europe_pmc: bool,
    pub faers: bool,
    pub clinical_trials: bool,
    pub drug_labels: bool,
}

impl Default for EnabledSources {
    fn default() -> Self {
        Self {
            pubmed: true,
            icd11: true,
            europe_pmc: true,
            faers: true,
            clinical_trials: true,
            drug_labels: true,
        }
    }
}

impl EnabledSources {
    pub fn none() -> Self {
        Self {
            pubmed: false,
            icd11: false,
            europe_pmc: false,
            faers: false,
            clinical_trials: false,
            drug_labels: false,
        }
    }

    /// Only the listed sources.
    pub fn only(sources: &[EvidenceSource]) -> Self {
        let mut enabled = Self::none();
        for source in sources {
            *enabled.flag_mut(*source) = true;
        }
        enabled
    }

    pub fn is_enabled(&self, source: EvidenceSource) -> bool {
        match source {
            EvidenceSource::Pubmed => self.pubmed,
            EvidenceSource::Icd11 => self.icd11,
            EvidenceSource::EuropePmc => self.europe_pmc,
            EvidenceSource::Faers => self.faers,
            EvidenceSource::ClinicalTrials => self.clinical_trials,
            EvidenceSource::DrugLabels => self.drug_labels,
        }
    }

    fn flag_mut(&mut self, source: EvidenceSource) -> &mut bool {
        match source {
            EvidenceSource::Pubmed => &mut self.pubmed,
            EvidenceSource::Icd11 => &mut self.icd11,
            EvidenceSource::EuropePmc => &mut self.europe_pmc,
            EvidenceSource::Faers => &mut self.faers,
            EvidenceSource::ClinicalTrials => &mut self.clinical_trials,
            EvidenceSource::DrugLabels => &mut self.drug_labels,
        }
    }
}

/// Fan-out result: one list per source, empty when disabled or failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedEvidence {
    pub pubmed: Vec<ConnectorResultItem>,
    pub icd11: Vec<ConnectorResultItem>,
    pub europe_pmc: Vec<ConnectorResultItem>,
    pub faers: Vec<ConnectorResultItem>,
    pub clinical_trials: Vec<ConnectorResultItem>,
    pub drug_labels: Vec<ConnectorResultItem>,
}

/// Result counts per source plus the display names of sources that
/// produced anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub counts: BTreeMap<EvidenceSource, usize>,
    pub available: Vec<String>,
}

impl AggregatedEvidence {
    pub fn items(&self, source: EvidenceSource) -> &[ConnectorResultItem] {
        match source {
            EvidenceSource::Pubmed => &self.pubmed,
            EvidenceSource::Icd11 => &self.icd11,
            EvidenceSource::EuropePmc => &self.europe_pmc,
            EvidenceSource::Faers => &self.faers,
            EvidenceSource::ClinicalTrials => &self.clinical_trials,
            EvidenceSource::DrugLabels => &self.drug_labels,
        }
    }

    pub fn is_empty(&self) -> bool {
        EvidenceSource::ALL.iter().all(|s| self.items(*s).is_empty())
    }

    pub fn total(&self) -> usize {
        EvidenceSource::ALL.iter().map(|s| self.items(*s).len()).sum()
    }

    pub fn summary(&self) -> EvidenceSummary {
        let counts: BTreeMap<EvidenceSource, usize> = EvidenceSource::ALL
            .iter()
            .map(|s| (*s, self.items(*s).len()))
            .collect();
        let available = EvidenceSource::ALL
            .iter()
            .filter(|s| counts[s] > 0)
            .map(|s| s.display_name().to_string())
            .collect();
        EvidenceSummary { counts, available }
    }
}

/// Dispatches one query to every enabled connector.
pub struct EvidenceAggregator {
    connectors: ConnectorSet,
    timeout: Duration,
    max_results: usize,
}

impl EvidenceAggregator {
    pub fn new(connectors: ConnectorSet) -> Self {
        Self {
            connectors,
            timeout: DEFAULT_SOURCE_TIMEOUT,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub async fn aggregate(&self, query: &str, enabled: EnabledSources) -> AggregatedEvidence {
        let set = &self.connectors;
        let (pubmed, icd11, europe_pmc, faers, clinical_trials, drug_labels) = tokio::join!(
            self.run(&set.pubmed, query, &enabled),
            self.run(&set.icd11, query, &enabled),
            self.run(&set.europe_pmc, query, &enabled),
            self.run(&set.faers, query, &enabled),
            self.run(&set.clinical_trials, query, &enabled),
            self.run(&set.drug_labels, query, &enabled),
        );

        let evidence = AggregatedEvidence {
            pubmed,
            icd11,
            europe_pmc,
            faers,
            clinical_trials,
            drug_labels,
        };
        tracing::info!(total = evidence.total(), "Evidence aggregated");
        evidence
    }

    async fn run(
        &self,
        connector: &Arc<dyn Connector>,
        query: &str,
        enabled: &EnabledSources,
    ) -> Vec<ConnectorResultItem> {
        let source = connector.source();
        if !enabled.is_enabled(source) {
            return Vec::new();
        }

        match tokio::time::timeout(self.timeout, connector.search(query, self.max_results)).await {
            Ok(Ok(items)) => {
                tracing::debug!(source = %source, count = items.len(), "Source returned");
                items
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %source, error = %e, "Source failed, continuing without it");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    source = %source,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Source timed out, continuing without it"
                );
                Vec::new()
            }
        }
    }
}
