//! ICD-11 classification registry (WHO API, OAuth2 bearer auth).
//!
//! Besides plain search, `lookup_detail` resolves a code or term to its
//! stem entity in two phases: `codeinfo` first, free-text search as the
//! fallback. It then fetches that entity and exactly one parent for a
//! one-level breadcrumb.
//!
//! The API emits entity ids as `http://id.who.int/...` while authenticated
//! calls need the secure scheme, so every entity URI is rebased onto the
//! configured (https) API base before it is fetched.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::http::fetch_json;
use super::types::{ConnectorResultItem, Provenance};
use super::{ClassificationLookup, Connector, ConnectorError};
use crate::config::{ICD_API_BASE_URL, ICD_BROWSE_BASE_URL, ICD_RELEASE};
use crate::models::{ClassificationDetail, EvidenceSource, ParentCategory};
use crate::token::TokenProvider;

/// Canonical prefixes of entity URIs returned by the API.
const CANONICAL_ENTITY_PREFIXES: [&str; 2] = ["http://id.who.int/icd", "https://id.who.int/icd"];

static HIGHLIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("highlight regex"));

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "destinationEntities")]
    destination_entities: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "theCode")]
    the_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodeInfo {
    #[serde(default, rename = "stemId")]
    stem_id: String,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    title: Option<LangValue>,
    #[serde(default)]
    definition: Option<LangValue>,
    #[serde(default)]
    parent: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LangValue {
    #[serde(default, rename = "@value")]
    value: String,
}

/// Browser URL anchored on a code or entity id.
pub fn browse_url(anchor: &str) -> String {
    format!("{ICD_BROWSE_BASE_URL}#{anchor}")
}

/// Rewrite an insecure `http://` URI to `https://`.
pub fn secure_uri(uri: &str) -> String {
    match uri.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => uri.to_string(),
    }
}

fn strip_highlight(title: &str) -> String {
    HIGHLIGHT.replace_all(title, "").trim().to_string()
}

/// Last path segment of an entity URI: its numeric id.
fn entity_number(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}

fn looks_like_code(term: &str) -> bool {
    !term.is_empty()
        && term.len() <= 16
        && term
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '&'))
}

fn lang_value(value: Option<LangValue>) -> String {
    value.map(|v| strip_highlight(&v.value)).unwrap_or_default()
}

/// Disease-classification registry connector.
pub struct IcdConnector {
    client: reqwest::Client,
    api_base: String,
    release: String,
    tokens: Arc<TokenProvider>,
}

impl IcdConnector {
    pub fn new(client: reqwest::Client, tokens: Arc<TokenProvider>) -> Self {
        Self::with_base_url(client, ICD_API_BASE_URL, tokens)
    }

    pub fn with_base_url(client: reqwest::Client, api_base: &str, tokens: Arc<TokenProvider>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            release: ICD_RELEASE.to_string(),
            tokens,
        }
    }

    /// False when no client credentials were supplied; every call would
    /// fail with `MissingCredentials`.
    pub fn has_credentials(&self) -> bool {
        self.tokens.is_configured()
    }

    fn mms_url(&self, tail: &str) -> String {
        format!("{}/release/11/{}/mms{}", self.api_base, self.release, tail)
    }

    /// Map an entity URI onto the configured API base.
    fn entity_url(&self, uri: &str) -> String {
        for prefix in CANONICAL_ENTITY_PREFIXES {
            if let Some(rest) = uri.strip_prefix(prefix) {
                return format!("{}{}", self.api_base, rest);
            }
        }
        secure_uri(uri)
    }

    async fn get_authed<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        empty_statuses: &[StatusCode],
    ) -> Result<Option<T>, ConnectorError> {
        let token = self.tokens.bearer().await?;
        let request = self
            .client
            .get(url)
            .query(params)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "en")
            .header("API-Version", "v2");
        fetch_json(request, EvidenceSource::Icd11, empty_statuses).await
    }

    async fn search_hits(&self, query: &str) -> Result<Vec<SearchHit>, ConnectorError> {
        let response: SearchResponse = self
            .get_authed(
                &self.mms_url("/search"),
                &[("q", query), ("flatResults", "true"), ("useFlexisearch", "true")],
                &[],
            )
            .await?
            .unwrap_or_default();
        Ok(response.destination_entities)
    }

    /// Fast path: direct code-to-entity lookup.
    async fn code_stem(&self, code: &str) -> Result<Option<String>, ConnectorError> {
        if !looks_like_code(code) {
            return Ok(None);
        }
        let info: Option<CodeInfo> = self
            .get_authed(
                &self.mms_url(&format!("/codeinfo/{code}")),
                &[("flexiblemode", "true")],
                &[StatusCode::NOT_FOUND],
            )
            .await?;
        Ok(info.map(|i| i.stem_id).filter(|s| !s.is_empty()))
    }

    /// Fallback: top free-text search hit.
    async fn search_stem(&self, term: &str) -> Result<String, ConnectorError> {
        self.search_hits(term)
            .await?
            .into_iter()
            .map(|hit| hit.id)
            .find(|id| !id.is_empty())
            .ok_or_else(|| ConnectorError::NotFound(term.to_string()))
    }

    async fn entity(&self, uri: &str) -> Result<Entity, ConnectorError> {
        self.get_authed(&self.entity_url(uri), &[], &[StatusCode::NOT_FOUND])
            .await?
            .ok_or_else(|| ConnectorError::NotFound(uri.to_string()))
    }
}

#[async_trait]
impl Connector for IcdConnector {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::Icd11
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let hits = self.search_hits(query.trim()).await?;
        let items = hits
            .into_iter()
            .filter(|hit| !hit.id.is_empty())
            .take(max_results)
            .map(|hit| {
                let code = hit.the_code.filter(|c| !c.is_empty());
                let id = code
                    .clone()
                    .unwrap_or_else(|| entity_number(&hit.id).to_string());
                ConnectorResultItem {
                    source: EvidenceSource::Icd11,
                    url: browse_url(&id),
                    title: strip_highlight(&hit.title),
                    id,
                    provenance: Provenance::Classification { code },
                }
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl ClassificationLookup for IcdConnector {
    async fn lookup_detail(&self, term: &str) -> Result<ClassificationDetail, ConnectorError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ConnectorError::NotFound("empty term".to_string()));
        }

        let stem = match self.code_stem(term).await {
            Ok(Some(stem)) => stem,
            Ok(None) => self.search_stem(term).await?,
            Err(e) if e.is_missing_credentials() => return Err(e),
            Err(e) => {
                tracing::debug!(term, error = %e, "ICD-11 code lookup failed, falling back to search");
                self.search_stem(term).await?
            }
        };

        let entity = self.entity(&stem).await?;

        // One parent only: enough for a breadcrumb, bounded cost.
        let mut parents = Vec::new();
        if let Some(parent_uri) = entity.parent.first() {
            match self.entity(parent_uri).await {
                Ok(parent) => parents.push(ParentCategory {
                    code: parent.code.unwrap_or_default(),
                    title: lang_value(parent.title),
                }),
                Err(e) => {
                    tracing::warn!(term, error = %e, "ICD-11 parent lookup failed");
                }
            }
        }

        let code = entity
            .code
            .filter(|c| !c.is_empty())
            .or_else(|| looks_like_code(term).then(|| term.to_string()))
            .unwrap_or_default();
        let anchor = if code.is_empty() {
            entity_number(&stem).to_string()
        } else {
            code.clone()
        };

        Ok(ClassificationDetail {
            browse_url: browse_url(&anchor),
            code,
            title: lang_value(entity.title),
            description: lang_value(entity.definition),
            parents,
            citation_url: String::new(),
        })
    }
}
