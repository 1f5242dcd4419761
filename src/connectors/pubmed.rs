//! PubMed via NCBI E-utilities: `esearch` for ids, one `esummary` for metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::http::fetch_json;
use super::types::{ConnectorResultItem, Provenance};
use super::{Connector, ConnectorError};
use crate::config::PUBMED_BASE_URL;
use crate::models::EvidenceSource;

const MAX_AUTHORS: usize = 3;

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ESummaryResponse {
    #[serde(default)]
    result: ESummaryResult,
}

/// `result` is keyed by PMID next to a `uids` list.
#[derive(Debug, Default, Deserialize)]
struct ESummaryResult {
    #[serde(flatten)]
    docs: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ESummaryDoc {
    #[serde(default)]
    title: String,
    #[serde(default)]
    fulljournalname: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    pubdate: String,
    #[serde(default)]
    authors: Vec<ESummaryAuthor>,
}

#[derive(Debug, Deserialize)]
struct ESummaryAuthor {
    #[serde(default)]
    name: String,
}

pub fn article_url(pmid: &str) -> String {
    format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/")
}

/// Literature search against PubMed.
pub struct PubmedConnector {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PubmedConnector {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, PUBMED_BASE_URL, api_key)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn with_key(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>, ConnectorError> {
        let params = self.with_key(vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmode", "json".to_string()),
            ("retmax", max_results.to_string()),
            ("sort", "relevance".to_string()),
        ]);
        let request = self
            .client
            .get(format!("{}/esearch.fcgi", self.base_url))
            .query(&params);

        let response: Option<ESearchResponse> =
            fetch_json(request, EvidenceSource::Pubmed, &[]).await?;
        Ok(response.map(|r| r.esearchresult.idlist).unwrap_or_default())
    }

    async fn summaries(&self, ids: &[String]) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        let params = self.with_key(vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "json".to_string()),
        ]);
        let request = self
            .client
            .get(format!("{}/esummary.fcgi", self.base_url))
            .query(&params);

        let response: ESummaryResponse = fetch_json(request, EvidenceSource::Pubmed, &[])
            .await?
            .unwrap_or_default();

        // Keep esearch relevance order; ids missing from the summary are dropped.
        let items = ids
            .iter()
            .filter_map(|pmid| {
                let value = response.result.docs.get(pmid)?.clone();
                let doc: ESummaryDoc = serde_json::from_value(value).ok()?;
                Some(doc_to_item(pmid, doc))
            })
            .collect();
        Ok(items)
    }
}

fn doc_to_item(pmid: &str, doc: ESummaryDoc) -> ConnectorResultItem {
    let journal = if doc.fulljournalname.is_empty() {
        doc.source
    } else {
        doc.fulljournalname
    };
    let authors = doc
        .authors
        .into_iter()
        .map(|a| a.name)
        .filter(|n| !n.is_empty())
        .take(MAX_AUTHORS)
        .collect();

    ConnectorResultItem {
        source: EvidenceSource::Pubmed,
        id: pmid.to_string(),
        title: non_empty(doc.title).unwrap_or_else(|| format!("PMID {pmid}")),
        url: article_url(pmid),
        provenance: Provenance::Article {
            journal: non_empty(journal),
            published: non_empty(doc.pubdate),
            authors,
        },
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[async_trait]
impl Connector for PubmedConnector {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::Pubmed
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }
        let ids = self.search_ids(query, max_results).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.summaries(&ids).await
    }
}
