//! Diagnosis evidence service.
//!
//! Loads the two halves of a diagnosis's evidence independently (citation
//! details and clinical-support sources), caches each as it succeeds and
//! reconciles whatever is cached into the reference list. Callers can
//! render after either half lands.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ClinicalSupportSource, Diagnosis, MergedReference};
use crate::pipeline::enrichment::{DetailResponse, EnrichmentFetcher};
use crate::pipeline::fetch_status::summarize_failures;
use crate::pipeline::reconcile::merge_references;
use crate::result_cache::ResultCache;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Every detail lookup failed: {}", failures.join("; "))]
    DetailsUnavailable { failures: Vec<String> },

    #[error("Clinical support unavailable: {0}")]
    ClinicalSupport(String),
}

/// Source of clinical-decision-support evidence for a diagnosis.
#[async_trait]
pub trait ClinicalSupportProvider: Send + Sync {
    async fn clinical_support(
        &self,
        diagnosis: &Diagnosis,
    ) -> Result<Vec<ClinicalSupportSource>, EvidenceError>;
}

pub struct DiagnosisEvidence {
    fetcher: EnrichmentFetcher,
    support: Arc<dyn ClinicalSupportProvider>,
    cache: ResultCache,
}

impl DiagnosisEvidence {
    pub fn new(fetcher: EnrichmentFetcher, support: Arc<dyn ClinicalSupportProvider>) -> Self {
        Self {
            fetcher,
            support,
            cache: ResultCache::new(),
        }
    }

    /// Citation details, from cache or a fresh enrichment pass.
    ///
    /// Errors only when lookups were attempted and none succeeded; such a
    /// result is not cached so the caller can retry.
    pub async fn details(&self, diagnosis: &Diagnosis) -> Result<DetailResponse, EvidenceError> {
        let key = diagnosis.cache_key();
        if let Some(cached) = self.cache.details(&key) {
            return Ok(cached);
        }

        let response = self.fetcher.fetch_details(&diagnosis.citations).await;
        if response.status.all_failed() {
            let failures = summarize_failures(&response.status);
            tracing::warn!(diagnosis = %key, failures = failures.len(), "Detail fetch failed");
            return Err(EvidenceError::DetailsUnavailable { failures });
        }

        self.cache.store_details(&key, response.clone());
        Ok(response)
    }

    /// Clinical-support sources, or `None` when the provider failed.
    pub async fn clinical_support(&self, diagnosis: &Diagnosis) -> Option<Vec<ClinicalSupportSource>> {
        let key = diagnosis.cache_key();
        if let Some(cached) = self.cache.clinical_support(&key) {
            return Some(cached);
        }

        match self.support.clinical_support(diagnosis).await {
            Ok(sources) => {
                self.cache.store_clinical_support(&key, sources.clone());
                Some(sources)
            }
            Err(e) => {
                tracing::warn!(diagnosis = %key, error = %e, "Clinical support not available");
                None
            }
        }
    }

    /// Reconcile the diagnosis's citations with whatever is cached so far.
    pub fn references(&self, diagnosis: &Diagnosis) -> Vec<MergedReference> {
        let key = diagnosis.cache_key();
        let details = self.cache.details(&key).unwrap_or_default();
        let support = self.cache.clinical_support(&key).unwrap_or_default();
        merge_references(
            &diagnosis.citations,
            &details.classification,
            &details.articles,
            &support,
        )
    }

    /// Failure lines for the cached detail fetch, if any.
    pub fn failures(&self, diagnosis: &Diagnosis) -> Vec<String> {
        self.cache
            .details(&diagnosis.cache_key())
            .map(|d| summarize_failures(&d.status))
            .unwrap_or_default()
    }

    /// Run both fetches concurrently, then reconcile.
    pub async fn load(&self, diagnosis: &Diagnosis) -> Vec<MergedReference> {
        let (details, _) = tokio::join!(self.details(diagnosis), self.clinical_support(diagnosis));
        if let Err(e) = details {
            tracing::warn!(diagnosis = %diagnosis.cache_key(), error = %e, "Rendering references without details");
        }
        self.references(diagnosis)
    }
}
