//! ClinicalTrials.gov v2 study search.

use async_trait::async_trait;
use serde::Deserialize;

use super::http::fetch_json;
use super::sanitize::{sanitize_query, TRIALS_MAX_WORDS};
use super::types::{ConnectorResultItem, Provenance};
use super::{Connector, ConnectorError};
use crate::config::CLINICAL_TRIALS_BASE_URL;
use crate::models::EvidenceSource;

#[derive(Debug, Default, Deserialize)]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    #[serde(default)]
    identification_module: IdentificationModule,
    #[serde(default)]
    status_module: StatusModule,
    #[serde(default)]
    design_module: DesignModule,
    #[serde(default)]
    conditions_module: ConditionsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    #[serde(default)]
    nct_id: String,
    #[serde(default)]
    brief_title: Option<String>,
    #[serde(default)]
    official_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    #[serde(default)]
    overall_status: Option<String>,
    #[serde(default)]
    start_date_struct: Option<DateStruct>,
}

#[derive(Debug, Default, Deserialize)]
struct DateStruct {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DesignModule {
    #[serde(default)]
    phases: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionsModule {
    #[serde(default)]
    conditions: Vec<String>,
}

pub fn study_url(nct_id: &str) -> String {
    format!("https://clinicaltrials.gov/study/{nct_id}")
}

/// Trials registry connector.
pub struct ClinicalTrialsConnector {
    client: reqwest::Client,
    base_url: String,
}

impl ClinicalTrialsConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, CLINICAL_TRIALS_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn study_to_item(study: Study) -> Option<ConnectorResultItem> {
    let protocol = study.protocol_section;
    let ident = protocol.identification_module;
    if ident.nct_id.is_empty() {
        return None;
    }
    let title = ident
        .brief_title
        .or(ident.official_title)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| ident.nct_id.clone());

    Some(ConnectorResultItem {
        source: EvidenceSource::ClinicalTrials,
        url: study_url(&ident.nct_id),
        id: ident.nct_id,
        title,
        provenance: Provenance::Trial {
            status: protocol.status_module.overall_status,
            phases: protocol.design_module.phases,
            start_date: protocol.status_module.start_date_struct.and_then(|d| d.date),
            conditions: protocol.conditions_module.conditions,
        },
    })
}

#[async_trait]
impl Connector for ClinicalTrialsConnector {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::ClinicalTrials
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        let terms = sanitize_query(query, TRIALS_MAX_WORDS);
        if terms.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let request = self
            .client
            .get(format!("{}/studies", self.base_url))
            .query(&[
                ("query.term", terms),
                ("pageSize", max_results.to_string()),
                ("format", "json".to_string()),
            ]);

        let response: StudiesResponse = fetch_json(request, EvidenceSource::ClinicalTrials, &[])
            .await?
            .unwrap_or_default();

        Ok(response
            .studies
            .into_iter()
            .filter_map(study_to_item)
            .take(max_results)
            .collect())
    }
}
