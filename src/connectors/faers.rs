//! openFDA adverse-event reports (FAERS), searched by reaction term.

use async_trait::async_trait;
use serde::Deserialize;

use super::http::{fetch_json, OPENFDA_EMPTY_STATUSES};
use super::sanitize::{sanitize_query, OPENFDA_MAX_WORDS};
use super::types::{ConnectorResultItem, Provenance};
use super::{Connector, ConnectorError};
use crate::config::OPENFDA_BASE_URL;
use crate::models::EvidenceSource;

const MAX_LISTED: usize = 3;

#[derive(Debug, Default, Deserialize)]
struct EventResponse {
    #[serde(default)]
    results: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(default)]
    safetyreportid: String,
    #[serde(default)]
    receivedate: Option<String>,
    /// "1" or 1 for serious reports, depending on the record vintage.
    #[serde(default)]
    serious: serde_json::Value,
    #[serde(default)]
    patient: Option<EventPatient>,
}

#[derive(Debug, Default, Deserialize)]
struct EventPatient {
    #[serde(default)]
    drug: Vec<EventDrug>,
    #[serde(default)]
    reaction: Vec<EventReaction>,
}

#[derive(Debug, Deserialize)]
struct EventDrug {
    #[serde(default)]
    medicinalproduct: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventReaction {
    #[serde(default)]
    reactionmeddrapt: Option<String>,
}

pub fn report_url(safety_report_id: &str) -> String {
    format!("https://api.fda.gov/drug/event.json?search=safetyreportid:{safety_report_id}")
}

fn is_serious(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => s.trim() == "1",
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        serde_json::Value::Bool(b) => *b,
        _ => false,
    }
}

/// Adverse-event registry connector.
pub struct FaersConnector {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FaersConnector {
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
}

fn record_to_item(record: EventRecord) -> Option<ConnectorResultItem> {
    if record.safetyreportid.is_empty() {
        return None;
    }
    let patient = record.patient.unwrap_or_default();
    let drugs: Vec<String> = patient
        .drug
        .into_iter()
        .filter_map(|d| d.medicinalproduct)
        .filter(|d| !d.is_empty())
        .take(MAX_LISTED)
        .collect();
    let reactions: Vec<String> = patient
        .reaction
        .into_iter()
        .filter_map(|r| r.reactionmeddrapt)
        .filter(|r| !r.is_empty())
        .take(MAX_LISTED)
        .collect();

    let title = format!("Adverse event report {}", record.safetyreportid);

    Some(ConnectorResultItem {
        source: EvidenceSource::Faers,
        url: report_url(&record.safetyreportid),
        id: record.safetyreportid,
        title,
        provenance: Provenance::AdverseEvent {
            received: record.receivedate,
            serious: is_serious(&record.serious),
            drugs,
            reactions,
        },
    })
}

#[async_trait]
impl Connector for FaersConnector {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::Faers
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        let terms = sanitize_query(query, OPENFDA_MAX_WORDS);
        if terms.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let mut params = vec![
            ("search", format!("patient.reaction.reactionmeddrapt:\"{terms}\"")),
            ("limit", max_results.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        let request = self
            .client
            .get(format!("{}/drug/event.json", self.base_url))
            .query(&params);

        let response: EventResponse =
            fetch_json(request, EvidenceSource::Faers, OPENFDA_EMPTY_STATUSES)
                .await?
                .unwrap_or_default();

        Ok(response
            .results
            .into_iter()
            .filter_map(record_to_item)
            .take(max_results)
            .collect())
    }
}
