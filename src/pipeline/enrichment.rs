//! Detail lookups for a diagnosis's citations.
//!
//! Classification citations resolve through the registry lookup, literature
//! citations through the article lookup. Every lookup runs concurrently
//! under the per-source timeout and reports its own status; nothing here
//! returns an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SOURCE_TIMEOUT;
use crate::connectors::{ArticleId, ArticleLookup, ClassificationLookup};
use crate::models::{
    ArticleDetail, ArticleFetchStatus, Citation, ClassificationDetail, ClassificationFetchStatus,
};
use crate::pipeline::fetch_status::{ArticleStatus, ClassificationStatus, FetchStatus};

/// Everything one enrichment pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailResponse {
    pub classification: Vec<ClassificationDetail>,
    pub articles: Vec<ArticleDetail>,
    pub status: FetchStatus,
}

/// Lookup term for a classification citation: the code in the URL
/// fragment, else the citation title.
pub fn classification_term(citation: &Citation) -> String {
    citation
        .url
        .split_once('#')
        .map(|(_, fragment)| fragment.trim())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| citation.title.trim().to_string())
}

pub struct EnrichmentFetcher {
    classification: Arc<dyn ClassificationLookup>,
    articles: Arc<dyn ArticleLookup>,
    timeout: Duration,
}

impl EnrichmentFetcher {
    pub fn new(classification: Arc<dyn ClassificationLookup>, articles: Arc<dyn ArticleLookup>) -> Self {
        Self {
            classification,
            articles,
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch_details(&self, citations: &[Citation]) -> DetailResponse {
        let mut seen = HashSet::new();
        let unique: Vec<&Citation> = citations.iter().filter(|c| seen.insert(c.lookup_key())).collect();

        let classification_citations: Vec<&Citation> = unique
            .iter()
            .copied()
            .filter(|c| c.source.is_classification())
            .collect();
        let article_citations: Vec<&Citation> = unique
            .iter()
            .copied()
            .filter(|c| c.source.is_literature())
            .collect();

        let (classified, fetched) = tokio::join!(
            join_all(classification_citations.into_iter().map(|c| self.classify(c))),
            join_all(article_citations.into_iter().map(|c| self.article(c))),
        );

        let mut response = DetailResponse::default();
        for (detail, status) in classified {
            response.classification.extend(detail);
            response.status.classification.push(status);
        }
        for (detail, status) in fetched {
            response.articles.extend(detail);
            response.status.articles.push(status);
        }

        tracing::debug!(
            classification = response.classification.len(),
            articles = response.articles.len(),
            failures = response.status.has_failures(),
            "Enrichment fetch finished"
        );
        response
    }

    async fn classify(&self, citation: &Citation) -> (Option<ClassificationDetail>, ClassificationStatus) {
        let term = classification_term(citation);
        let outcome = tokio::time::timeout(self.timeout, self.classification.lookup_detail(&term)).await;

        let (detail, status) = match outcome {
            Ok(Ok(mut detail)) => {
                detail.citation_url = citation.url.clone();
                (Some(detail), ClassificationFetchStatus::Success)
            }
            Ok(Err(e)) if e.is_missing_credentials() => (None, ClassificationFetchStatus::NoCredentials),
            Ok(Err(e)) => {
                tracing::warn!(term = %term, error = %e, "Classification lookup failed");
                (None, ClassificationFetchStatus::Failed)
            }
            Err(_) => {
                tracing::warn!(term = %term, "Classification lookup timed out");
                (None, ClassificationFetchStatus::Timeout)
            }
        };
        (detail, ClassificationStatus { term, status })
    }

    async fn article(&self, citation: &Citation) -> (Option<ArticleDetail>, ArticleStatus) {
        let status = |status| ArticleStatus {
            url: citation.url.clone(),
            source: citation.source,
            status,
        };

        let Some(id) = ArticleId::from_url(&citation.url) else {
            tracing::debug!(url = %citation.url, "No article id in citation URL");
            return (None, status(ArticleFetchStatus::IdExtractionFailed));
        };

        match tokio::time::timeout(self.timeout, self.articles.fetch_article(&id)).await {
            Ok(Ok(mut detail)) => {
                // Pair on the citation's own URL, whatever form the index returned.
                detail.url = citation.url.clone();
                detail.source = citation.source;
                (Some(detail), status(ArticleFetchStatus::Success))
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %citation.url, error = %e, "Article lookup failed");
                (None, status(ArticleFetchStatus::Failed))
            }
            Err(_) => {
                tracing::warn!(url = %citation.url, "Article lookup timed out");
                (None, status(ArticleFetchStatus::Timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ConnectorError;
    use crate::models::EvidenceSource;
    use crate::token::TokenError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Registry {
        mode: &'static str,
    }

    #[async_trait]
    impl ClassificationLookup for Registry {
        async fn lookup_detail(&self, term: &str) -> Result<ClassificationDetail, ConnectorError> {
            match self.mode {
                "no_credentials" => Err(ConnectorError::Auth(TokenError::MissingCredentials)),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(ConnectorError::NotFound(term.into()))
                }
                _ if term == "ZZ99" => Err(ConnectorError::NotFound(term.into())),
                _ => Ok(ClassificationDetail {
                    code: term.into(),
                    title: format!("{term} title"),
                    description: String::new(),
                    parents: vec![],
                    browse_url: String::new(),
                    citation_url: String::new(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct Articles {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArticleLookup for Articles {
        async fn fetch_article(&self, id: &ArticleId) -> Result<ArticleDetail, ConnectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if id.id == "404" {
                return Err(ConnectorError::NotFound(id.id.clone()));
            }
            Ok(ArticleDetail {
                source: EvidenceSource::Pubmed,
                title: format!("Article {}", id.id),
                abstract_text: "Abstract".into(),
                authors: vec![],
                url: format!("https://pubmed.ncbi.nlm.nih.gov/{}/", id.id),
            })
        }
    }

    fn fetcher(mode: &'static str) -> (EnrichmentFetcher, Arc<Articles>) {
        let articles = Arc::new(Articles::default());
        let fetcher = EnrichmentFetcher::new(Arc::new(Registry { mode }), articles.clone())
            .with_timeout(Duration::from_millis(100));
        (fetcher, articles)
    }

    #[test]
    fn term_prefers_url_fragment() {
        let c = Citation::new(
            EvidenceSource::Icd11,
            "Essential hypertension",
            "https://icd.who.int/browse/2024-01/mms/en#BA00",
        );
        assert_eq!(classification_term(&c), "BA00");

        let c = Citation::new(EvidenceSource::Icd11, "Essential hypertension", "https://icd.who.int/x");
        assert_eq!(classification_term(&c), "Essential hypertension");
    }

    #[tokio::test]
    async fn statuses_follow_request_order() {
        let (fetcher, _) = fetcher("ok");
        let citations = vec![
            Citation::new(EvidenceSource::Icd11, "a", "https://icd.who.int/browse/2024-01/mms/en#BA00"),
            Citation::new(EvidenceSource::Pubmed, "p", "https://pubmed.ncbi.nlm.nih.gov/11/"),
            Citation::new(EvidenceSource::Icd11, "b", "https://icd.who.int/browse/2024-01/mms/en#ZZ99"),
            Citation::new(EvidenceSource::EuropePmc, "e", "https://europepmc.org/article/MED/404"),
            Citation::new(EvidenceSource::Pubmed, "bad", "https://pubmed.ncbi.nlm.nih.gov/"),
        ];

        let response = fetcher.fetch_details(&citations).await;

        assert_eq!(response.classification.len(), 1);
        assert_eq!(
            response.classification[0].citation_url,
            "https://icd.who.int/browse/2024-01/mms/en#BA00"
        );
        let statuses: Vec<_> = response.status.classification.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            [ClassificationFetchStatus::Success, ClassificationFetchStatus::Failed]
        );

        let statuses: Vec<_> = response.status.articles.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            [
                ArticleFetchStatus::Success,
                ArticleFetchStatus::Failed,
                ArticleFetchStatus::IdExtractionFailed
            ]
        );
        assert_eq!(response.articles[0].url, "https://pubmed.ncbi.nlm.nih.gov/11/");
    }

    #[tokio::test]
    async fn missing_credentials_are_reported_distinctly() {
        let (fetcher, _) = fetcher("no_credentials");
        let citations = vec![Citation::new(
            EvidenceSource::Icd11,
            "a",
            "https://icd.who.int/browse/2024-01/mms/en#BA00",
        )];
        let response = fetcher.fetch_details(&citations).await;
        assert_eq!(
            response.status.classification[0].status,
            ClassificationFetchStatus::NoCredentials
        );
    }

    #[tokio::test]
    async fn slow_lookup_times_out() {
        let (fetcher, _) = fetcher("slow");
        let citations = vec![Citation::new(
            EvidenceSource::Icd11,
            "a",
            "https://icd.who.int/browse/2024-01/mms/en#BA00",
        )];
        let response = fetcher.fetch_details(&citations).await;
        assert_eq!(response.status.classification[0].status, ClassificationFetchStatus::Timeout);
    }

    #[tokio::test]
    async fn non_literature_sources_and_duplicates_are_skipped() {
        let (fetcher, articles) = fetcher("ok");
        let citations = vec![
            Citation::new(EvidenceSource::Pubmed, "p", "https://pubmed.ncbi.nlm.nih.gov/11/"),
            Citation::new(EvidenceSource::Pubmed, "p again", "http://pubmed.ncbi.nlm.nih.gov/11"),
            Citation::new(EvidenceSource::ClinicalTrials, "t", "https://clinicaltrials.gov/study/NCT1"),
        ];
        let response = fetcher.fetch_details(&citations).await;
        assert_eq!(response.status.articles.len(), 1);
        assert_eq!(articles.calls.load(Ordering::SeqCst), 1);
    }
}
