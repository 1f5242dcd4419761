pub mod config;
pub mod models;
pub mod token; // OAuth2 bearer tokens for the classification registry
pub mod connectors;
pub mod pipeline;
pub mod result_cache;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::EvidenceConfig;
use crate::connectors::{ConnectorError, ProviderClients};
use crate::pipeline::{format_evidence, EnabledSources, EvidenceAggregator};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("Failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Query every source and render the prompt block followed by the source
/// summary as JSON.
pub async fn run(query: &str, config: &EvidenceConfig) -> Result<String, RunError> {
    tracing::info!("{} v{} starting", config::APP_NAME, config::APP_VERSION);

    let clients = ProviderClients::from_config(config)?;
    let aggregator = EvidenceAggregator::new(clients.connector_set())
        .with_timeout(config.source_timeout)
        .with_max_results(config.max_results);

    let evidence = aggregator.aggregate(query, enabled_sources(&clients)).await;

    let mut out = format_evidence(&evidence);
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&serde_json::to_string_pretty(&evidence.summary())?);
    out.push('\n');
    Ok(out)
}

/// Every source, minus the classification registry when it has no
/// credentials to authenticate with.
fn enabled_sources(clients: &ProviderClients) -> EnabledSources {
    let mut enabled = EnabledSources::default();
    if !clients.icd.has_credentials() {
        enabled.icd11 = false;
    }
    enabled
}
