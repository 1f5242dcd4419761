//! Bearer-token lifecycle for the classification registry.
//!
//! The registry authenticates with an OAuth2 client-credentials exchange.
//! `TokenProvider` owns the cached token and refreshes it lazily once it is
//! within `TOKEN_REFRESH_MARGIN_SECS` of expiry. Missing credentials fail
//! fast with `TokenError::MissingCredentials` and never reach the network.
//!
//! The cache lock is only held to read or store the token, never across
//! the exchange itself: two callers that both see an expired token may both
//! refresh. The exchange is idempotent, so the later write simply wins.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ICD_TOKEN_URL, TOKEN_REFRESH_MARGIN_SECS};

const ICD_SCOPE: &str = "icdapi_access";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Classification registry credentials are not configured")]
    MissingCredentials,

    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Source of the current instant. Injected so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    /// Both halves must be present for the registry to be usable.
    pub fn from_parts(client_id: Option<String>, client_secret: Option<String>) -> Option<Self> {
        Some(Self {
            client_id: client_id?,
            client_secret: client_secret?,
        })
    }
}

/// Token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
pub struct BearerToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl BearerToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

/// Observable provider state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// No credentials configured. Terminal.
    Unconfigured,
    /// Credentials present, nothing fetched yet.
    Empty,
    /// A token is cached and usable.
    Cached,
    /// A token is cached but inside the refresh margin.
    Stale,
}

/// Performs the client-credentials exchange.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, credentials: &ClientCredentials) -> Result<IssuedToken, TokenError>;
}

// ═══════════════════════════════════════════════════════════
// OAuth2 exchange
// ═══════════════════════════════════════════════════════════

/// `TokenExchange` against the registry's OAuth2 token endpoint.
pub struct OAuthTokenExchange {
    client: reqwest::Client,
    token_url: String,
}

impl OAuthTokenExchange {
    pub fn new(client: reqwest::Client, token_url: &str) -> Self {
        Self {
            client,
            token_url: token_url.to_string(),
        }
    }

    pub fn default_endpoint(client: reqwest::Client) -> Self {
        Self::new(client, ICD_TOKEN_URL)
    }
}

#[async_trait]
impl TokenExchange for OAuthTokenExchange {
    async fn exchange(&self, credentials: &ClientCredentials) -> Result<IssuedToken, TokenError> {
        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", ICD_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<IssuedToken>().await?)
    }
}

// ═══════════════════════════════════════════════════════════
// TokenProvider
// ═══════════════════════════════════════════════════════════

/// Owns the cached bearer token. Construct once and share by `Arc`.
pub struct TokenProvider {
    credentials: Option<ClientCredentials>,
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<BearerToken>>,
}

impl TokenProvider {
    pub fn new(
        credentials: Option<ClientCredentials>,
        exchange: Arc<dyn TokenExchange>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            exchange,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Provider using the real token endpoint and wall clock.
    pub fn oauth(credentials: Option<ClientCredentials>, client: reqwest::Client) -> Self {
        Self::new(
            credentials,
            Arc::new(OAuthTokenExchange::default_endpoint(client)),
            Arc::new(SystemClock),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn state(&self) -> TokenState {
        if !self.is_configured() {
            return TokenState::Unconfigured;
        }
        match self.cached_token() {
            None => TokenState::Empty,
            Some(token) if token.is_fresh(self.clock.now()) => TokenState::Cached,
            Some(_) => TokenState::Stale,
        }
    }

    /// Current bearer value, exchanging credentials when none is fresh.
    pub async fn bearer(&self) -> Result<String, TokenError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(TokenError::MissingCredentials)?;

        if let Some(token) = self.cached_token() {
            if token.is_fresh(self.clock.now()) {
                return Ok(token.value);
            }
        }

        tracing::debug!("Requesting classification registry token");
        let issued = self.exchange.exchange(credentials).await?;
        let token = BearerToken {
            value: issued.access_token,
            expires_at: self.clock.now() + Duration::seconds(issued.expires_in),
        };

        let value = token.value.clone();
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = Some(token);
        Ok(value)
    }

    fn cached_token(&self) -> Option<BearerToken> {
        self.cached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
