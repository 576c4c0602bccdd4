//! Similarity ranking of transcript chunks against a user query.
//!
//! Embeds the query and every candidate chunk, scores them with cosine
//! similarity, and returns the top-K in descending score order.

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A chunk scored against a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f32,
    /// Position of this chunk in the ranker's input, not its rank.
    pub index: usize,
}

/// Ranks chunks by embedding similarity.
pub struct Ranker {
    embedder: Arc<dyn Embedder>,
}

impl Ranker {
    /// Create a new ranker over the given embedder.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Score all candidates against the query and return the best `top_k`.
    ///
    /// Results are sorted by similarity descending; equal scores keep their
    /// input order (the sort is stable). A `top_k` larger than the candidate
    /// count returns every candidate.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn rank(
        &self,
        candidates: &[Chunk],
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        // Candidate vectors come back attributed by position.
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut scored: Vec<ScoredChunk> = candidates
            .iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(index, (chunk, embedding))| ScoredChunk {
                chunk: chunk.clone(),
                similarity: cosine_similarity(&query_embedding, embedding),
                index,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        debug!("Ranked {} candidates, kept {}", candidates.len(), scored.len());
        Ok(scored)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Length-mismatched or zero-norm inputs score 0; a degenerate case, not an
/// error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
