//! Decode-or-fallback step for language model replies
//!
//! Model output is free text that usually wraps a JSON object in commentary or
//! code fences. Components decode it once through [`decode_json`] and branch on
//! the tagged result instead of checking sentinel values.

use serde::de::DeserializeOwned;

/// Outcome of decoding a model reply
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Payload parsed successfully
    Ok(T),
    /// Payload unusable; carries the reason
    Fallback(String),
}

impl<T> Decoded<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Decoded<U> {
        match self {
            Self::Ok(value) => Decoded::Ok(f(value)),
            Self::Fallback(reason) => Decoded::Fallback(reason),
        }
    }

    /// Chain a validation step that may reject the parsed value
    pub fn and_then<U, F: FnOnce(T) -> Decoded<U>>(self, f: F) -> Decoded<U> {
        match self {
            Self::Ok(value) => f(value),
            Self::Fallback(reason) => Decoded::Fallback(reason),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Fallback(_) => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Decoded<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Fallback(e.to_string()),
        }
    }
}

/// Slice from the first '{' to the last '}'
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Decode the JSON object embedded in a model reply
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Decoded<T> {
    if text.trim().is_empty() {
        return Decoded::Fallback("empty response".to_string());
    }
    match extract_json_object(text) {
        Some(json) => match serde_json::from_str::<T>(json) {
            Ok(value) => Decoded::Ok(value),
            Err(e) => Decoded::Fallback(format!("invalid JSON payload: {}", e)),
        },
        None => Decoded::Fallback("no JSON object in response".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        score: u32,
    }

    #[test]
    fn test_decode_with_fences_and_commentary() {
        let text = "Sure! Here you go:\n```json\n{\"score\": 72}\n```\nHope this helps.";
        assert_eq!(decode_json::<Payload>(text), Decoded::Ok(Payload { score: 72 }));
    }

    #[test]
    fn test_decode_fallbacks() {
        assert!(decode_json::<Payload>("").is_fallback());
        assert!(decode_json::<Payload>("no braces here").is_fallback());
        assert!(decode_json::<Payload>("} backwards {").is_fallback());
        assert!(decode_json::<Payload>("{\"score\": \"high\"}").is_fallback());
    }

    #[test]
    fn test_and_then_rejects() {
        let decoded: Decoded<Payload> = decode_json("{\"score\": 5}");
        let checked = decoded.and_then(|p| {
            if p.score >= 10 {
                Decoded::Ok(p)
            } else {
                Decoded::Fallback("too low".to_string())
            }
        });
        assert_eq!(checked, Decoded::Fallback("too low".to_string()));
    }

    #[test]
    fn test_from_result() {
        let ok: Decoded<u8> = Ok::<u8, String>(3).into();
        assert_eq!(ok.ok(), Some(3));
        let err: Decoded<u8> = Err::<u8, String>("boom".into()).into();
        assert!(err.is_fallback());
    }
}
