//! Summarizer trait, the abstraction over text-generation backends.
//!
//! A Summarizer knows how to measure text in the backend's own tokens and
//! how to turn a rendered prompt into generated text.
//!
//! Implementations: Gemini (API key), Vertex AI (project + region).

use async_trait::async_trait;
use crate::error::SummarizeError;

/// The summarization capability the reducer is bound to.
///
/// The reducer calls `count_tokens()` and `summarize()` without knowing which
/// backend is behind the trait object.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// A human-readable name for this backend (e.g., "gemini", "vertex").
    fn name(&self) -> &str;

    /// Count the tokens `text` occupies for this backend.
    ///
    /// Never fails and is deterministic for a given backend and text: once
    /// a text has been counted, later calls return the same number even if
    /// the first count came from a fallback estimate. The empty string
    /// counts as zero.
    async fn count_tokens(&self, text: &str) -> usize;

    /// Generate a summary for a fully rendered prompt.
    async fn summarize(&self, prompt: &str) -> std::result::Result<String, SummarizeError>;
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up. Backends fall back to this
/// when their counting endpoint is unreachable.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSummarizer;

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        fn name(&self) -> &str {
            "echo"
        }

        async fn count_tokens(&self, text: &str) -> usize {
            estimate_tokens(text)
        }

        async fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
            Ok(prompt.to_uppercase())
        }
    }

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 4 chars, 8 bytes
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let s: Box<dyn Summarizer> = Box::new(EchoSummarizer);
        assert_eq!(s.name(), "echo");
        assert_eq!(s.count_tokens("").await, 0);
        assert_eq!(s.summarize("abc").await.unwrap(), "ABC");
    }
}
