//! Connector adapters, one per external medical knowledge source.
//!
//! Every adapter normalizes its provider's response into
//! `ConnectorResultItem`. Provider-defined "no match" responses come back
//! as an empty list; anything else unexpected is a `ConnectorError` and is
//! left to the caller's failure isolation.

pub mod types;
pub mod http;
pub mod sanitize;
pub mod pubmed;
pub mod europe_pmc;
pub mod icd;
pub mod faers;
pub mod clinical_trials;
pub mod drug_labels;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::EvidenceConfig;
use crate::models::{ArticleDetail, ClassificationDetail, EvidenceSource};
use crate::token::{ClientCredentials, TokenError, TokenProvider};

pub use clinical_trials::ClinicalTrialsConnector;
pub use drug_labels::DrugLabelConnector;
pub use europe_pmc::EuropePmcConnector;
pub use faers::FaersConnector;
pub use icd::IcdConnector;
pub use pubmed::PubmedConnector;
pub use types::{ArticleId, ConnectorResultItem, Provenance};

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: EvidenceSource,
        status: u16,
        body: String,
    },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] TokenError),

    #[error("No match for {0}")]
    NotFound(String),
}

impl ConnectorError {
    /// True when the failure is a configuration problem rather than a
    /// provider problem.
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::Auth(TokenError::MissingCredentials))
    }
}

/// Free-text search against one provider.
#[async_trait]
pub trait Connector: Send + Sync {
    fn source(&self) -> EvidenceSource;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ConnectorResultItem>, ConnectorError>;
}

/// Resolves a code or free-text term to a classification record.
#[async_trait]
pub trait ClassificationLookup: Send + Sync {
    async fn lookup_detail(&self, term: &str) -> Result<ClassificationDetail, ConnectorError>;
}

/// Fetches article-level detail (abstract, authors) by identifier.
#[async_trait]
pub trait ArticleLookup: Send + Sync {
    async fn fetch_article(&self, id: &ArticleId) -> Result<ArticleDetail, ConnectorError>;
}

/// The six connectors the fan-out dispatches to.
#[derive(Clone)]
pub struct ConnectorSet {
    pub pubmed: Arc<dyn Connector>,
    pub icd11: Arc<dyn Connector>,
    pub europe_pmc: Arc<dyn Connector>,
    pub faers: Arc<dyn Connector>,
    pub clinical_trials: Arc<dyn Connector>,
    pub drug_labels: Arc<dyn Connector>,
}

/// Concrete HTTP-backed providers sharing one client and token provider.
pub struct ProviderClients {
    pub pubmed: Arc<PubmedConnector>,
    pub icd: Arc<IcdConnector>,
    pub europe_pmc: Arc<EuropePmcConnector>,
    pub faers: Arc<FaersConnector>,
    pub clinical_trials: Arc<ClinicalTrialsConnector>,
    pub drug_labels: Arc<DrugLabelConnector>,
}

impl ProviderClients {
    /// Wire every provider against its public endpoint.
    pub fn from_config(config: &EvidenceConfig) -> Result<Self, ConnectorError> {
        let client = http::build_client()?;
        let credentials = ClientCredentials::from_parts(
            config.icd_client_id.clone(),
            config.icd_client_secret.clone(),
        );
        if credentials.is_none() {
            tracing::warn!("ICD-11 credentials not configured; classification lookups will be skipped");
        }
        let tokens = Arc::new(TokenProvider::oauth(credentials, client.clone()));

        Ok(Self {
            pubmed: Arc::new(PubmedConnector::new(client.clone(), config.ncbi_api_key.clone())),
            icd: Arc::new(IcdConnector::new(client.clone(), tokens)),
            europe_pmc: Arc::new(EuropePmcConnector::new(client.clone())),
            faers: Arc::new(FaersConnector::new(client.clone(), config.openfda_api_key.clone())),
            clinical_trials: Arc::new(ClinicalTrialsConnector::new(client.clone())),
            drug_labels: Arc::new(DrugLabelConnector::new(client, config.openfda_api_key.clone())),
        })
    }

    pub fn connector_set(&self) -> ConnectorSet {
        ConnectorSet {
            pubmed: self.pubmed.clone(),
            icd11: self.icd.clone(),
            europe_pmc: self.europe_pmc.clone(),
            faers: self.faers.clone(),
            clinical_trials: self.clinical_trials.clone(),
            drug_labels: self.drug_labels.clone(),
        }
    }
}
