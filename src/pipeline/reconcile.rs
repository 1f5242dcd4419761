//! Reference reconciliation.
//!
//! Merges a diagnosis's stored citations, the enrichment details fetched
//! for them and clinical-support sources into one deduplicated list.
//! Identity is the normalized URL and the first occurrence of a key wins.
//! The output lists enriched references first, each group in insertion
//! order.

use std::collections::HashMap;

use crate::models::{
    classification_key, normalize_url, ArticleDetail, Citation, ClassificationDetail,
    ClinicalSupportSource, MergedReference,
};

/// Insertion-ordered map from URL key to reference.
#[derive(Default)]
struct ReferenceMap {
    order: Vec<MergedReference>,
    index: HashMap<String, usize>,
}

impl ReferenceMap {
    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert unless `key` is already present.
    fn insert(&mut self, key: String, reference: MergedReference) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.index.insert(key, self.order.len());
        self.order.push(reference);
        true
    }

    fn into_partitioned(self) -> Vec<MergedReference> {
        let (mut enriched, unenriched): (Vec<_>, Vec<_>) =
            self.order.into_iter().partition(|r| r.is_enriched);
        enriched.extend(unenriched);
        enriched
    }
}

/// Pairs classification citations with their details.
///
/// A detail carrying `citation_url` pairs by that URL, anchor included.
/// Details without one pair positionally with the n-th classification
/// citation.
struct ClassificationPairing<'a> {
    by_key: HashMap<String, &'a ClassificationDetail>,
    details: &'a [ClassificationDetail],
}

impl<'a> ClassificationPairing<'a> {
    fn new(details: &'a [ClassificationDetail]) -> Self {
        let mut by_key = HashMap::new();
        for detail in details.iter().filter(|d| !d.citation_url.is_empty()) {
            by_key
                .entry(classification_key(&detail.citation_url))
                .or_insert(detail);
        }
        Self { by_key, details }
    }

    fn find(&self, key: &str, position: usize) -> Option<&'a ClassificationDetail> {
        if let Some(detail) = self.by_key.get(key) {
            return Some(*detail);
        }
        self.details
            .get(position)
            .filter(|d| d.citation_url.is_empty())
    }
}

pub fn merge_references(
    citations: &[Citation],
    classification_details: &[ClassificationDetail],
    article_details: &[ArticleDetail],
    clinical_support: &[ClinicalSupportSource],
) -> Vec<MergedReference> {
    let pairing = ClassificationPairing::new(classification_details);
    let mut articles: HashMap<String, &ArticleDetail> = HashMap::new();
    for detail in article_details {
        articles.entry(normalize_url(&detail.url)).or_insert(detail);
    }

    let mut map = ReferenceMap::default();
    let mut classification_position = 0;

    for citation in citations {
        let key = citation.key();
        let reference = if citation.source.is_classification() {
            let detail = pairing.find(&classification_key(&citation.url), classification_position);
            classification_position += 1;
            match detail {
                Some(d) => MergedReference::with_classification(citation.clone(), d.clone()),
                None => MergedReference::unenriched(citation.clone()),
            }
        } else {
            match articles.get(&key) {
                Some(d) => MergedReference::with_article(citation.clone(), (*d).clone()),
                None => MergedReference::unenriched(citation.clone()),
            }
        };
        map.insert(key, reference);
    }

    for source in clinical_support {
        let key = source.citation.key();
        if map.contains(&key) {
            continue;
        }
        map.insert(
            key,
            MergedReference::from_detail(source.citation.clone(), source.detail.clone()),
        );
    }

    map.into_partitioned()
}
