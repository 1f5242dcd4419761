//! Shared HTTP plumbing for the connectors.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::ConnectorError;
use crate::config::{APP_NAME, APP_VERSION};
use crate::models::EvidenceSource;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Statuses openFDA uses for "nothing matched": 404 for an empty result
/// set, 400 for queries its grammar cannot parse.
pub const OPENFDA_EMPTY_STATUSES: &[StatusCode] = &[StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND];

/// Build the client shared by every connector.
///
/// No overall request timeout: the fan-out applies its own per-source
/// budget and drops the request future when it expires.
pub fn build_client() -> Result<reqwest::Client, ConnectorError> {
    let client = reqwest::Client::builder()
        .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Send a request and decode a JSON body.
///
/// Returns `Ok(None)` when the status is one of `empty_statuses`.
/// Other non-2xx statuses and undecodable bodies are errors.
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: EvidenceSource,
    empty_statuses: &[StatusCode],
) -> Result<Option<T>, ConnectorError> {
    let response = request.send().await?;

    let status = response.status();
    if empty_statuses.contains(&status) {
        tracing::debug!(source = %provider, status = status.as_u16(), "Provider reported no match");
        return Ok(None);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ConnectorError::Status {
            provider,
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| ConnectorError::ResponseParsing(format!("{provider}: {e}")))
}
