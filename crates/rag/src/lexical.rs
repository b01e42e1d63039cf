//! Lexical relevance heuristic
//!
//! Used when a delegated scoring call fails. Scores how well a document covers
//! the content words of a question with TF-IDF-like weighting:
//! - term frequency: sqrt(count in doc) for diminishing returns
//! - IDF approximation: ln(1 + word length) favors specific terms
//! - stopwords are excluded
//! - earlier question terms weigh slightly more

use std::collections::HashSet;

/// Common English function words
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into",
    "through", "during", "before", "after", "above", "below", "between", "under", "again",
    "further", "then", "once", "here", "there", "when", "where", "why", "how", "all", "each",
    "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same",
    "so", "than", "too", "very", "just", "and", "but", "if", "or", "because", "until", "while",
    "about", "i", "me", "my", "we", "our", "you", "your", "he", "him", "his", "she", "her", "it",
    "its", "they", "them", "their", "what", "which", "who", "whom", "this", "that", "these",
    "those", "really", "actually", "good", "bad", "people", "thing", "things", "true",
];

/// Lowercased alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Distinct non-stopword tokens longer than two characters, in order of appearance
pub fn content_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !is_stopword(w))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Overlap score in 0.0..1.0
pub fn overlap_score(query: &str, document: &str) -> f32 {
    let query_terms = content_terms(query);
    if query_terms.is_empty() {
        return 0.0;
    }

    let doc_words = tokenize(document);
    let doc_len = doc_words.len().max(1) as f32;
    // Length normalization: favor shorter docs slightly, never negative
    let length_norm = 1.0 / (1.0 + (doc_len / 50.0).sqrt());

    let mut total_score = 0.0f32;
    let mut matched_terms = 0usize;

    for (pos, term) in query_terms.iter().enumerate() {
        let tf = doc_words.iter().filter(|w| *w == term).count() as f32;
        if tf == 0.0 {
            continue;
        }
        matched_terms += 1;

        let tf_score = tf.sqrt();
        let idf_approx = (1.0 + term.len() as f32).ln();
        let position_weight = 1.0 / (1.0 + pos as f32 * 0.1);

        total_score += tf_score * idf_approx * position_weight * length_norm;
    }

    // Coverage bonus: reward documents that match more query terms
    let coverage = matched_terms as f32 / query_terms.len() as f32;
    let raw_score = total_score + coverage * 0.3;
    (raw_score / (raw_score + 1.0)).min(1.0)
}

/// Relevance of a paper to a question on the 0..=100 scale
///
/// Title matches count for 40%, abstract matches for 60%.
pub fn paper_relevance(question: &str, title: &str, abstract_text: &str) -> f64 {
    let title_score = overlap_score(question, title) as f64;
    let abstract_score = overlap_score(question, abstract_text) as f64;
    ((0.4 * title_score + 0.6 * abstract_score) * 100.0).clamp(0.0, 100.0)
}
