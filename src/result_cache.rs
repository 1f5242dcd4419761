//! Per-diagnosis result cache.
//!
//! Two independent maps keyed by `{code}:{diagnosisId}`: enrichment
//! details and clinical-support sources. Each side is written as soon as
//! its own fetch succeeds, so a reader may see one without the other.
//! Entries live for the session; nothing is evicted.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::ClinicalSupportSource;
use crate::pipeline::enrichment::DetailResponse;

#[derive(Default)]
pub struct ResultCache {
    details: Mutex<HashMap<String, DetailResponse>>,
    support: Mutex<HashMap<String, Vec<ClinicalSupportSource>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn details(&self, key: &str) -> Option<DetailResponse> {
        self.details
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn store_details(&self, key: &str, response: DetailResponse) {
        self.details
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), response);
    }

    pub fn clinical_support(&self, key: &str) -> Option<Vec<ClinicalSupportSource>> {
        self.support
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn store_clinical_support(&self, key: &str, sources: Vec<ClinicalSupportSource>) {
        self.support
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), sources);
    }

    /// Number of diagnoses with cached details.
    pub fn details_len(&self) -> usize {
        self.details.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
