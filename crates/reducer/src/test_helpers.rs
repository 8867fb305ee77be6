//! Shared test helpers for reducer tests.

use async_trait::async_trait;
use issuefold_core::{SummarizeError, Summarizer};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A summarizer that counts whitespace-separated words as tokens and
/// returns scripted results in order.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedSummarizer {
    results: Mutex<VecDeque<Result<String, SummarizeError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn new(results: Vec<Result<String, SummarizeError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with the given texts.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    async fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.results.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!("ScriptedSummarizer: no more results (call #{call})")
        })
    }
}
