use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::enums::EvidenceSource;

/// A structured reference to one piece of evidence.
///
/// Either stored with a diagnosis or parsed out of model output; never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: EvidenceSource,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Citation {
    pub fn new(source: EvidenceSource, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            url: url.into(),
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Deduplication key for this citation's URL.
    pub fn key(&self) -> String {
        normalize_url(&self.url)
    }

    /// Key telling apart entries that need separate lookups.
    pub fn lookup_key(&self) -> String {
        if self.source.is_classification() {
            classification_key(&self.url)
        } else {
            self.key()
        }
    }
}

/// Normalize a URL into the key used for every cross-origin dedupe.
///
/// Scheme is dropped, host and path are lower-cased and trailing slashes
/// on the path are stripped. Query and fragment are not part of the key.
/// Unparseable input falls back to the lower-cased raw string with any
/// scheme prefix and trailing slashes removed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    let parsed = Url::parse(trimmed).ok().filter(|u| u.has_host());
    let Some(url) = parsed else {
        let lower = trimmed.to_lowercase();
        let without_scheme = lower
            .split_once("://")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or(lower);
        return without_scheme.trim_end_matches('/').to_string();
    };

    let mut key = url.host_str().unwrap_or_default().to_lowercase();
    if let Some(port) = url.port() {
        key.push_str(&format!(":{port}"));
    }
    key.push_str(&url.path().trim_end_matches('/').to_lowercase());
    key
}

/// `normalize_url` plus the fragment.
///
/// Classification browse links share one path and differ only in their
/// `#CODE` anchor, so lookups and detail pairing key on this instead.
pub fn classification_key(raw: &str) -> String {
    let key = normalize_url(raw);
    match raw.trim().split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => format!("{key}#{}", fragment.to_uppercase()),
        _ => key,
    }
}
