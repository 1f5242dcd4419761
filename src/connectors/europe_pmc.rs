//! Europe PMC REST search, plus article-detail lookup for enrichment.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::http::fetch_json;
use super::types::{ArticleId, ConnectorResultItem, Provenance};
use super::{ArticleLookup, Connector, ConnectorError};
use crate::config::EUROPE_PMC_BASE_URL;
use crate::models::{ArticleDetail, EvidenceSource};

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("markup regex"));

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "resultList")]
    result_list: ResultList,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<EpmcResult>,
}

#[derive(Debug, Deserialize)]
struct EpmcResult {
    #[serde(default)]
    id: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "journalTitle")]
    journal_title: Option<String>,
    #[serde(default, rename = "pubYear")]
    pub_year: Option<String>,
    #[serde(default, rename = "authorString")]
    author_string: Option<String>,
    #[serde(default, rename = "abstractText")]
    abstract_text: Option<String>,
}

pub fn article_url(source_code: &str, id: &str) -> String {
    format!("https://europepmc.org/article/{source_code}/{id}")
}

fn split_authors(author_string: Option<&str>) -> Vec<String> {
    author_string
        .unwrap_or_default()
        .trim_end_matches('.')
        .split(", ")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

fn strip_markup(text: &str) -> String {
    MARKUP
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Second literature index.
pub struct EuropePmcConnector {
    client: reqwest::Client,
    base_url: String,
}

impl EuropePmcConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, EUROPE_PMC_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn query(
        &self,
        query: &str,
        result_type: &str,
        page_size: usize,
    ) -> Result<Vec<EpmcResult>, ConnectorError> {
        let request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("query", query.to_string()),
                ("format", "json".to_string()),
                ("resultType", result_type.to_string()),
                ("pageSize", page_size.to_string()),
            ]);

        let response: SearchResponse = fetch_json(request, EvidenceSource::EuropePmc, &[])
            .await?
            .unwrap_or_default();
        Ok(response.result_list.result)
    }
}

#[async_trait]
impl Connector for EuropePmcConnector {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::EuropePmc
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let results = self.query(query, "lite", max_results).await?;
        let items = results
            .into_iter()
            .filter(|r| !r.id.is_empty() && !r.source.is_empty())
            .take(max_results)
            .map(|r| {
                let authors = split_authors(r.author_string.as_deref());
                ConnectorResultItem {
                    source: EvidenceSource::EuropePmc,
                    url: article_url(&r.source, &r.id),
                    title: strip_markup(&r.title),
                    id: format!("{}/{}", r.source, r.id),
                    provenance: Provenance::Article {
                        journal: r.journal_title,
                        published: r.pub_year,
                        authors,
                    },
                }
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl ArticleLookup for EuropePmcConnector {
    async fn fetch_article(&self, id: &ArticleId) -> Result<ArticleDetail, ConnectorError> {
        let query = match id.source_code.as_str() {
            "PMC" => format!("PMCID:{}", id.id),
            code => format!("EXT_ID:{} AND SRC:{}", id.id, code),
        };

        let hit = self
            .query(&query, "core", 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::NotFound(format!("{}/{}", id.source_code, id.id)))?;

        let url = match id.origin {
            EvidenceSource::Pubmed if id.source_code == "MED" => super::pubmed::article_url(&id.id),
            _ => article_url(&id.source_code, &id.id),
        };

        Ok(ArticleDetail {
            source: id.origin,
            title: strip_markup(&hit.title),
            abstract_text: hit.abstract_text.as_deref().map(strip_markup).unwrap_or_default(),
            authors: split_authors(hit.author_string.as_deref()),
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn search_normalizes_lite_results() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("resultType").map(String::as_str), Some("lite"));
                Json(json!({"resultList": {"result": [
                    {"id": "3456", "source": "MED", "title": "Statins <i>and</i> stroke",
                     "journalTitle": "Stroke", "pubYear": "2019", "authorString": "Lee A, Kim B."},
                    {"id": "", "source": "MED", "title": "dropped"}
                ]}}))
            }),
        );
        let server = serve(router).await;
        let connector = EuropePmcConnector::with_base_url(reqwest::Client::new(), &server.base_url);

        let items = connector.search("statins stroke", 5).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Statins and stroke");
        assert_eq!(items[0].url, "https://europepmc.org/article/MED/3456");
        assert_eq!(
            items[0].provenance,
            Provenance::Article {
                journal: Some("Stroke".into()),
                published: Some("2019".into()),
                authors: vec!["Lee A".into(), "Kim B".into()],
            }
        );
    }

    #[tokio::test]
    async fn fetch_article_returns_abstract_for_pubmed_id() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("query").map(String::as_str), Some("EXT_ID:123 AND SRC:MED"));
                assert_eq!(params.get("resultType").map(String::as_str), Some("core"));
                Json(json!({"resultList": {"result": [
                    {"id": "123", "source": "MED", "title": "A trial",
                     "abstractText": "<h4>Background</h4>Something.", "authorString": "Doe J."}
                ]}}))
            }),
        );
        let server = serve(router).await;
        let connector = EuropePmcConnector::with_base_url(reqwest::Client::new(), &server.base_url);

        let id = ArticleId::from_url("https://pubmed.ncbi.nlm.nih.gov/123/").unwrap();
        let detail = connector.fetch_article(&id).await.unwrap();
        assert_eq!(detail.source, EvidenceSource::Pubmed);
        assert_eq!(detail.abstract_text, "Background Something.");
        assert_eq!(detail.authors, vec!["Doe J".to_string()]);
        assert_eq!(detail.url, "https://pubmed.ncbi.nlm.nih.gov/123/");
    }

    #[tokio::test]
    async fn fetch_article_without_hit_is_not_found() {
        let router = Router::new().route(
            "/search",
            get(|| async { Json(json!({"resultList": {"result": []}})) }),
        );
        let server = serve(router).await;
        let connector = EuropePmcConnector::with_base_url(reqwest::Client::new(), &server.base_url);

        let id = ArticleId::from_url("https://europepmc.org/article/PPR/PPR1").unwrap();
        let err = connector.fetch_article(&id).await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(_)));
    }
}
