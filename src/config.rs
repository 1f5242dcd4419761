use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Corroborate";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Uniform per-source budget for the fan-out and enrichment lookups.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(12);
/// Results requested from each connector per query.
pub const DEFAULT_MAX_RESULTS: usize = 5;
/// Bearer tokens are refreshed this long before their stated expiry.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

// Provider endpoints
pub const PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const EUROPE_PMC_BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";
pub const ICD_API_BASE_URL: &str = "https://id.who.int/icd";
pub const ICD_TOKEN_URL: &str = "https://icdaccessmanagement.who.int/connect/token";
pub const ICD_RELEASE: &str = "2024-01";
pub const ICD_BROWSE_BASE_URL: &str = "https://icd.who.int/browse/2024-01/mms/en";
pub const OPENFDA_BASE_URL: &str = "https://api.fda.gov";
pub const CLINICAL_TRIALS_BASE_URL: &str = "https://clinicaltrials.gov/api/v2";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "corroborate=info,warn"
}

/// Runtime configuration: provider credentials and fan-out limits.
#[derive(Debug, Clone)]
pub struct EvidenceConfig {
    pub icd_client_id: Option<String>,
    pub icd_client_secret: Option<String>,
    pub ncbi_api_key: Option<String>,
    pub openfda_api_key: Option<String>,
    pub source_timeout: Duration,
    pub max_results: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            icd_client_id: None,
            icd_client_secret: None,
            ncbi_api_key: None,
            openfda_api_key: None,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl EvidenceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset;
    /// unparseable numbers keep the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        let source_timeout = get("CORROBORATE_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.source_timeout);
        let max_results = get("CORROBORATE_MAX_RESULTS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_results);

        Self {
            icd_client_id: get("ICD_CLIENT_ID"),
            icd_client_secret: get("ICD_CLIENT_SECRET"),
            ncbi_api_key: get("NCBI_API_KEY"),
            openfda_api_key: get("OPENFDA_API_KEY"),
            source_timeout,
            max_results,
        }
    }
}
