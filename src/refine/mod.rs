//! LLM-based narrative reordering of selected snippets.
//!
//! Asks a reasoning oracle to permute the chosen snippets into a cohesive
//! story. The oracle is untrusted: any failure (call error, malformed JSON,
//! missing field, bad permutation) falls back to the original order.

mod openai;

pub use openai::OpenAIOracle;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Trait for text-completion oracles.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Complete a prompt, returning text expected to contain a JSON payload.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Reorders snippets into a narrative via a completion oracle.
pub struct Refiner {
    oracle: Arc<dyn CompletionOracle>,
}

impl Refiner {
    /// Create a new refiner over the given oracle.
    pub fn new(oracle: Arc<dyn CompletionOracle>) -> Self {
        Self { oracle }
    }

    /// Reorder snippet texts into a cohesive narrative for the query.
    ///
    /// Returns a permutation of `[0, texts.len())`. Never fails: if the
    /// oracle errors or answers with anything that is not a valid complete
    /// permutation, the identity order is returned instead.
    #[instrument(skip(self, texts), fields(snippets = texts.len()))]
    pub async fn reorder(&self, texts: &[String], query: &str) -> Vec<usize> {
        let identity: Vec<usize> = (0..texts.len()).collect();
        if texts.len() < 2 {
            return identity;
        }

        let prompt = build_prompt(texts, query);

        let response = match self.oracle.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Reorder oracle failed, keeping original order: {}", e);
                return identity;
            }
        };

        match try_parse_order(&response).filter(|order| is_permutation(order, texts.len())) {
            Some(order) => {
                debug!("Oracle reordered snippets: {:?}", order);
                order
            }
            None => {
                warn!("Unusable reorder response, keeping original order");
                identity
            }
        }
    }
}

/// Build the reorder prompt enumerating each snippet with its index.
fn build_prompt(texts: &[String], query: &str) -> String {
    let mut prompt = format!("User query: '{}'\n", query);
    prompt.push_str("We have the following snippet texts (in the order we found them):\n");
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("({}): {}\n", i, text));
    }
    prompt.push_str(
        "Reorder these snippets into a cohesive narrative. Return a JSON object \
         with an \"order\" field listing the indices in the desired order, and an \
         \"explanation\" field briefly explaining why.",
    );
    prompt
}

/// Extract the `order` list from an oracle response.
///
/// This is the single place where a malformed response becomes `None`; the
/// caller turns that into the identity-order fallback.
pub fn try_parse_order(response: &str) -> Option<Vec<usize>> {
    // The oracle may wrap the JSON object in prose or a markdown fence.
    let json_start = response.find('{');
    let json_end = response.rfind('}');

    let json_str = match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => response,
    };

    let value: serde_json::Value = serde_json::from_str(json_str).ok()?;
    value
        .get("order")?
        .as_array()?
        .iter()
        .map(|v| v.as_u64().map(|n| n as usize))
        .collect()
}

/// True if `order` is a complete permutation of `[0, len)`.
fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in order {
        if i >= len || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KlippError;

    /// Oracle returning a fixed response or a fixed failure.
    struct FakeOracle {
        response: std::result::Result<String, String>,
    }

    impl FakeOracle {
        fn answering(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
            }
        }
    }

    #[async_trait]
    impl CompletionOracle for FakeOracle {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.response
                .clone()
                .map_err(KlippError::OpenAI)
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("snippet {}", i)).collect()
    }

    #[tokio::test]
    async fn test_reorder_applies_oracle_order() {
        let oracle = FakeOracle::answering(
            r#"{"order": [2, 0, 1], "explanation": "builds up to the reveal"}"#,
        );
        let refiner = Refiner::new(Arc::new(oracle));

        let order = refiner.reorder(&texts(3), "query").await;
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[tokio::test]
    async fn test_reorder_fallback_on_oracle_error() {
        let refiner = Refiner::new(Arc::new(FakeOracle::failing("timeout")));
        let order = refiner.reorder(&texts(4), "query").await;
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_reorder_fallback_on_non_json() {
        let refiner = Refiner::new(Arc::new(FakeOracle::answering(
            "I think the snippets are fine as they are.",
        )));
        let order = refiner.reorder(&texts(3), "query").await;
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reorder_fallback_on_missing_field() {
        let refiner = Refiner::new(Arc::new(FakeOracle::answering(
            r#"{"explanation": "no order given"}"#,
        )));
        let order = refiner.reorder(&texts(3), "query").await;
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reorder_fallback_on_bad_permutation() {
        // Duplicate index
        let refiner = Refiner::new(Arc::new(FakeOracle::answering(r#"{"order": [0, 0, 1]}"#)));
        assert_eq!(refiner.reorder(&texts(3), "query").await, vec![0, 1, 2]);

        // Out of range
        let refiner = Refiner::new(Arc::new(FakeOracle::answering(r#"{"order": [0, 1, 5]}"#)));
        assert_eq!(refiner.reorder(&texts(3), "query").await, vec![0, 1, 2]);

        // Incomplete
        let refiner = Refiner::new(Arc::new(FakeOracle::answering(r#"{"order": [1, 0]}"#)));
        assert_eq!(refiner.reorder(&texts(3), "query").await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reorder_single_snippet_skips_oracle() {
        let refiner = Refiner::new(Arc::new(FakeOracle::failing("should not be called")));
        assert_eq!(refiner.reorder(&texts(1), "query").await, vec![0]);
        assert_eq!(refiner.reorder(&texts(0), "query").await, Vec::<usize>::new());
    }

    #[test]
    fn test_try_parse_order_plain_json() {
        let order = try_parse_order(r#"{"order": [1, 0], "explanation": "x"}"#);
        assert_eq!(order, Some(vec![1, 0]));
    }

    #[test]
    fn test_try_parse_order_with_markdown_fence() {
        let response = "Here you go:\n```json\n{\"order\": [2, 1, 0]}\n```\nHope that helps.";
        assert_eq!(try_parse_order(response), Some(vec![2, 1, 0]));
    }

    #[test]
    fn test_try_parse_order_rejects_garbage() {
        assert_eq!(try_parse_order("not json at all"), None);
        assert_eq!(try_parse_order(r#"{"order": "first"}"#), None);
        assert_eq!(try_parse_order(r#"{"order": [1, -2]}"#), None);
        assert_eq!(try_parse_order(""), None);
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[2, 0, 1], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(!is_permutation(&[0, 1, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
        assert!(is_permutation(&[], 0));
    }

    #[test]
    fn test_build_prompt_enumerates_snippets() {
        let prompt = build_prompt(&texts(2), "the best part");
        assert!(prompt.contains("User query: 'the best part'"));
        assert!(prompt.contains("(0): snippet 0"));
        assert!(prompt.contains("(1): snippet 1"));
        assert!(prompt.contains("\"order\""));
    }
}
