//! openFDA structured product labels.
//!
//! Labels only match literal drug names, so a clinical phrase is expanded
//! into candidate words and each is looked up on its own. Results are
//! merged first-seen by label set id until the requested count is reached.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;

use super::http::{fetch_json, OPENFDA_EMPTY_STATUSES};
use super::sanitize::candidate_drug_words;
use super::types::{ConnectorResultItem, Provenance};
use super::{Connector, ConnectorError};
use crate::config::OPENFDA_BASE_URL;
use crate::models::EvidenceSource;

#[derive(Debug, Default, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<LabelRecord>,
}

#[derive(Debug, Deserialize)]
struct LabelRecord {
    #[serde(default)]
    set_id: String,
    #[serde(default)]
    effective_time: Option<String>,
    #[serde(default)]
    openfda: LabelOpenFda,
}

#[derive(Debug, Default, Deserialize)]
struct LabelOpenFda {
    #[serde(default)]
    brand_name: Vec<String>,
    #[serde(default)]
    generic_name: Vec<String>,
    #[serde(default)]
    manufacturer_name: Vec<String>,
}

pub fn label_url(set_id: &str) -> String {
    format!("https://dailymed.nlm.nih.gov/dailymed/lookup.cfm?setid={set_id}")
}

fn word_search(word: &str) -> String {
    format!(
        "openfda.generic_name:\"{word}\" openfda.brand_name:\"{word}\" openfda.substance_name:\"{word}\""
    )
}

/// Drug-label registry connector.
pub struct DrugLabelConnector {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl DrugLabelConnector {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, OPENFDA_BASE_URL, api_key)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn lookup_word(&self, word: &str, limit: usize) -> Result<Vec<LabelRecord>, ConnectorError> {
        let mut params = vec![("search", word_search(word)), ("limit", limit.to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        let request = self
            .client
            .get(format!("{}/drug/label.json", self.base_url))
            .query(&params);

        let response: LabelResponse =
            fetch_json(request, EvidenceSource::DrugLabels, OPENFDA_EMPTY_STATUSES)
                .await?
                .unwrap_or_default();
        Ok(response.results)
    }
}

fn record_to_item(record: LabelRecord) -> ConnectorResultItem {
    let mut openfda = record.openfda;
    let brand_name = openfda.brand_name.drain(..).next();
    let generic_name = openfda.generic_name.drain(..).next();
    let manufacturer = openfda.manufacturer_name.drain(..).next();

    let title = match (&brand_name, &generic_name) {
        (Some(brand), Some(generic)) if !brand.eq_ignore_ascii_case(generic) => {
            format!("{brand} ({generic}) prescribing information")
        }
        (Some(name), _) | (None, Some(name)) => format!("{name} prescribing information"),
        (None, None) => format!("Drug label {}", record.set_id),
    };

    ConnectorResultItem {
        source: EvidenceSource::DrugLabels,
        url: label_url(&record.set_id),
        id: record.set_id,
        title,
        provenance: Provenance::DrugLabel {
            brand_name,
            generic_name,
            manufacturer,
            effective_date: record.effective_time,
        },
    }
}

#[async_trait]
impl Connector for DrugLabelConnector {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::DrugLabels
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut first_error = None;
        for word in candidate_drug_words(query) {
            let records = match self.lookup_word(&word, max_results).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(word = %word, error = %e, "Label lookup failed, trying next word");
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            for record in records {
                if record.set_id.is_empty() || !seen.insert(record.set_id.clone()) {
                    continue;
                }
                items.push(record_to_item(record));
                if items.len() >= max_results {
                    return Ok(items);
                }
            }
        }

        // Only an error when no word produced anything.
        match first_error {
            Some(e) if items.is_empty() => Err(e),
            _ => Ok(items),
        }
    }
}
