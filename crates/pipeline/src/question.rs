//! Question identity

use sha2::{Digest, Sha256};

use research_agent_core::{normalize_question, ExplanationLevel};

/// Hex characters kept from the digest
const HASH_LEN: usize = 16;

/// Stable identifier of a question: truncated SHA-256 of its normalized text
pub fn question_hash(question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_question(question).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..HASH_LEN].to_string()
}

/// Cache key for a question at an explanation level
pub fn cache_key(hash: &str, level: ExplanationLevel) -> String {
    format!("{}:{}", hash, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ignores_case_and_spacing() {
        let a = question_hash("Is coffee harmful to health?");
        let b = question_hash("  is COFFEE   harmful to health? ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, question_hash("Is tea harmful to health?"));
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc")
        assert_eq!(question_hash("ABC"), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_cache_key_includes_level() {
        let hash = question_hash("Does meditation reduce stress?");
        assert_ne!(
            cache_key(&hash, ExplanationLevel::Simple),
            cache_key(&hash, ExplanationLevel::Academic)
        );
        assert!(cache_key(&hash, ExplanationLevel::Medium).ends_with(":medium"));
    }
}
