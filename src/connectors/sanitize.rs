//! Query sanitization for providers with strict search grammars.
//!
//! openFDA and ClinicalTrials.gov reject or misparse queries containing
//! their operator characters (quotes, colons, brackets, boolean symbols).
//! Sanitized queries keep letters, digits, apostrophes and in-word
//! hyphens, and are cut to a bounded word count.

/// Word cap for openFDA queries.
pub const OPENFDA_MAX_WORDS: usize = 6;
/// Word cap for ClinicalTrials.gov queries.
pub const TRIALS_MAX_WORDS: usize = 8;
/// Drug names shorter than this are not worth a label lookup.
pub const MIN_DRUG_WORD_LEN: usize = 4;

/// Strip grammar-breaking punctuation and keep at most `max_words` words.
pub fn sanitize_query(query: &str, max_words: usize) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(|w| w.trim_matches(|c| c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Candidate drug names from a clinical phrase: sanitized words of at least
/// `MIN_DRUG_WORD_LEN` characters, lower-cased, first occurrence kept.
pub fn candidate_drug_words(query: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in sanitize_query(query, TRIALS_MAX_WORDS).split_whitespace() {
        let word = word.to_lowercase();
        if word.chars().count() >= MIN_DRUG_WORD_LEN && !words.contains(&word) {
            words.push(word);
        }
    }
    words
}
