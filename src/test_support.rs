//! Shared fixtures for unit tests: in-process stub servers, a settable
//! clock, a counting token exchange and scripted connectors.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Form, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::oneshot;

use crate::connectors::{Connector, ConnectorError, ConnectorResultItem, Provenance};
use crate::models::EvidenceSource;
use crate::token::{ClientCredentials, Clock, IssuedToken, TokenError, TokenExchange};

// ═══════════════════════════════════════════════════════════
// Stub HTTP server
// ═══════════════════════════════════════════════════════════

/// Running stub server. Shuts down when dropped.
pub struct StubServer {
    pub base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Bind `router` on an ephemeral loopback port and serve it in the background.
pub async fn serve(router: Router) -> StubServer {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    StubServer {
        base_url: format!("http://{addr}"),
        shutdown_tx: Some(shutdown_tx),
    }
}

// ═══════════════════════════════════════════════════════════
// Token fixtures
// ═══════════════════════════════════════════════════════════

pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Issues `token-1`, `token-2`... and counts exchanges.
pub struct CountingExchange {
    expires_in: i64,
    calls: AtomicUsize,
}

impl CountingExchange {
    pub fn new(expires_in: i64) -> Self {
        Self {
            expires_in,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchange for CountingExchange {
    async fn exchange(&self, _credentials: &ClientCredentials) -> Result<IssuedToken, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssuedToken {
            access_token: format!("token-{n}"),
            expires_in: self.expires_in,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Classification registry stub
// ═══════════════════════════════════════════════════════════

const STEM_URI: &str = "http://id.who.int/icd/release/11/2024-01/mms/1234";
const PARENT_URI: &str = "http://id.who.int/icd/release/11/2024-01/mms/999";

/// Request counters shared with an `icd_stub_router`.
#[derive(Clone, Default)]
pub struct StubCounters {
    tokens: Arc<AtomicUsize>,
    searches: Arc<AtomicUsize>,
    entities: Arc<AtomicUsize>,
}

impl StubCounters {
    pub fn token_requests(&self) -> usize {
        self.tokens.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn entities(&self) -> usize {
        self.entities.load(Ordering::SeqCst)
    }
}

/// Token endpoint at `/token`, registry API under `/icd`.
///
/// Knows one code, `BA00` (Essential hypertension), whose single parent is
/// an uncoded block. Any search returns that entity.
pub fn icd_stub_router(counters: StubCounters) -> Router {
    let token_counters = counters.clone();
    Router::new()
        .route(
            "/token",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let counters = token_counters.clone();
                async move {
                    assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
                    assert_eq!(form.get("scope").map(String::as_str), Some("icdapi_access"));
                    let n = counters.tokens.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(json!({"access_token": format!("stub-{n}"), "expires_in": 3600}))
                }
            }),
        )
        .route(
            "/icd/release/11/2024-01/mms/*rest",
            get(move |Path(rest): Path<String>, headers: HeaderMap| {
                let counters = counters.clone();
                async move { icd_stub_response(&counters, rest.trim_start_matches('/'), &headers) }
            }),
        )
}

fn icd_stub_response(counters: &StubCounters, rest: &str, headers: &HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer stub-"));
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match rest {
        "codeinfo/BA00" => Json(json!({"code": "BA00", "stemId": STEM_URI})).into_response(),
        "search" => {
            counters.searches.fetch_add(1, Ordering::SeqCst);
            Json(json!({"destinationEntities": [{
                "id": STEM_URI,
                "title": "<em class='found'>Essential</em> hypertension",
                "theCode": "BA00"
            }]}))
            .into_response()
        }
        "1234" => {
            counters.entities.fetch_add(1, Ordering::SeqCst);
            Json(json!({
                "@id": STEM_URI,
                "code": "BA00",
                "title": {"@language": "en", "@value": "Essential hypertension"},
                "definition": {"@language": "en", "@value": "High blood pressure without a known cause."},
                "parent": [PARENT_URI]
            }))
            .into_response()
        }
        "999" => {
            counters.entities.fetch_add(1, Ordering::SeqCst);
            Json(json!({
                "@id": PARENT_URI,
                "title": {"@language": "en", "@value": "Hypertensive diseases"}
            }))
            .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

// ═══════════════════════════════════════════════════════════
// Scripted connectors
// ═══════════════════════════════════════════════════════════

enum Behavior {
    Items(Vec<ConnectorResultItem>),
    Fail,
    Hang(Duration),
}

/// Connector that returns scripted results and counts calls.
pub struct MockConnector {
    source: EvidenceSource,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockConnector {
    /// Returns one item per title, with ids `1`, `2`...
    pub fn returning(source: EvidenceSource, titles: &[&str]) -> Self {
        let items = titles
            .iter()
            .enumerate()
            .map(|(i, title)| mock_item(source, &(i + 1).to_string(), title))
            .collect();
        Self::with_behavior(source, Behavior::Items(items))
    }

    pub fn failing(source: EvidenceSource) -> Self {
        Self::with_behavior(source, Behavior::Fail)
    }

    /// Sleeps for `delay`, then returns nothing.
    pub fn slow(source: EvidenceSource, delay: Duration) -> Self {
        Self::with_behavior(source, Behavior::Hang(delay))
    }

    fn with_behavior(source: EvidenceSource, behavior: Behavior) -> Self {
        Self {
            source,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn source(&self) -> EvidenceSource {
        self.source
    }

    async fn search(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Items(items) => Ok(items.iter().take(max_results).cloned().collect()),
            Behavior::Fail => Err(ConnectorError::Status {
                provider: self.source,
                status: 503,
                body: "unavailable".into(),
            }),
            Behavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Minimal item for a source, with a source-appropriate provenance.
pub fn mock_item(source: EvidenceSource, id: &str, title: &str) -> ConnectorResultItem {
    let provenance = match source {
        EvidenceSource::Pubmed | EvidenceSource::EuropePmc => Provenance::Article {
            journal: None,
            published: None,
            authors: vec![],
        },
        EvidenceSource::Icd11 => Provenance::Classification {
            code: Some(id.to_string()),
        },
        EvidenceSource::Faers => Provenance::AdverseEvent {
            received: None,
            serious: false,
            drugs: vec![],
            reactions: vec![],
        },
        EvidenceSource::ClinicalTrials => Provenance::Trial {
            status: None,
            phases: vec![],
            start_date: None,
            conditions: vec![],
        },
        EvidenceSource::DrugLabels => Provenance::DrugLabel {
            brand_name: None,
            generic_name: None,
            manufacturer: None,
            effective_date: None,
        },
    };
    ConnectorResultItem {
        source,
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://example.org/{source}/{id}"),
        provenance,
    }
}
