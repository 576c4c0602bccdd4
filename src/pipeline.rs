//! Highlight pipeline for Klipp.
//!
//! Coordinates the stages from transcript fetch to the spliced output file:
//! transcript -> chunk -> rank -> refine -> splice.

use crate::chunking::{chunk_segments, Chunk};
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{KlippError, Result};
use crate::ranking::{Ranker, ScoredChunk};
use crate::refine::{CompletionOracle, OpenAIOracle, Refiner};
use crate::splicing::{Snippet, Splicer};
use crate::transcript::{TranscriptSource, YoutubeTranscriptSource};
use crate::video_source::{self, SourceVideo};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// The main pipeline for building highlight videos.
///
/// All collaborators are injected so tests can substitute fakes; nothing in
/// here reaches for ambient singletons.
pub struct HighlightPipeline {
    settings: Settings,
    transcript_source: Arc<dyn TranscriptSource>,
    embedder: Arc<dyn Embedder>,
    oracle: Arc<dyn CompletionOracle>,
    output_dir: PathBuf,
}

impl HighlightPipeline {
    /// Create a pipeline with default collaborators.
    pub fn new(settings: Settings) -> Result<Self> {
        let transcript_source = Arc::new(YoutubeTranscriptSource::new());
        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.ranking.model,
            settings.ranking.dimensions as usize,
        ));
        let oracle = Arc::new(OpenAIOracle::with_config(
            &settings.refine.model,
            settings.refine.temperature,
        ));

        Self::with_components(settings, transcript_source, embedder, oracle)
    }

    /// Create a pipeline with custom collaborators.
    pub fn with_components(
        settings: Settings,
        transcript_source: Arc<dyn TranscriptSource>,
        embedder: Arc<dyn Embedder>,
        oracle: Arc<dyn CompletionOracle>,
    ) -> Result<Self> {
        let output_dir = settings.output_dir();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            settings,
            transcript_source,
            embedder,
            oracle,
            output_dir,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetch a video's transcript and break it into word-bounded chunks.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn transcript_chunks(&self, input: &str, max_words: usize) -> Result<Vec<Chunk>> {
        let video_id = video_source::extract_video_id(input).ok_or_else(|| {
            KlippError::InvalidInput(format!("Invalid YouTube URL or ID: {}", input))
        })?;

        let segments = self
            .transcript_source
            .fetch(&video_id, &self.settings.transcript.language)
            .await?;

        info!("Fetched {} transcript segments", segments.len());

        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let chunks = chunk_segments(&segments, max_words)
            .into_iter()
            .map(|c| c.with_source(url.clone(), video_id.clone()))
            .collect();

        Ok(chunks)
    }

    /// Rank chunks against a query, returning the best `top_k`.
    pub async fn search_snippets(
        &self,
        chunks: &[Chunk],
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let ranker = Ranker::new(self.embedder.clone());
        ranker.rank(chunks, query, top_k).await
    }

    /// Reorder snippet texts into a narrative for the query.
    ///
    /// Always returns a usable order; oracle failures degrade to input order.
    pub async fn refine_order(&self, texts: &[String], query: &str) -> Vec<usize> {
        let refiner = Refiner::new(self.oracle.clone());
        refiner.reorder(texts, query).await
    }

    /// Download (or reuse) the source video and splice the given snippets,
    /// in their given order, into a highlight file.
    #[instrument(skip(self, snippets), fields(input = %input, snippets = snippets.len()))]
    pub async fn create_video(&self, input: &str, snippets: &[Snippet]) -> Result<PathBuf> {
        if snippets.is_empty() {
            return Err(KlippError::InvalidInput(
                "No snippets provided".to_string(),
            ));
        }

        let source = self.resolve_source(input).await?;

        let splicer = Splicer::new(&self.output_dir).with_codecs(
            &self.settings.video.video_codec,
            &self.settings.video.audio_codec,
        );
        splicer.splice(&source, snippets).await
    }

    /// Resolve input to a cached, downloaded source video.
    pub async fn resolve_source(&self, input: &str) -> Result<SourceVideo> {
        video_source::resolve(input, &self.output_dir, &self.settings.video.format).await
    }

    /// Run the full pipeline: chunk, rank, optionally refine, splice.
    #[instrument(skip(self), fields(input = %input, query = %query))]
    pub async fn run(&self, input: &str, query: &str, top_k: usize) -> Result<HighlightResult> {
        let chunks = self
            .transcript_chunks(input, self.settings.chunking.max_words)
            .await?;
        info!("Chunked transcript into {} chunks", chunks.len());

        let scored = self.search_snippets(&chunks, query, top_k).await?;
        if scored.is_empty() {
            return Err(KlippError::InvalidInput(
                "No matching snippets for query".to_string(),
            ));
        }
        info!("Selected {} snippets", scored.len());

        let ordered: Vec<&ScoredChunk> = if self.settings.refine.enabled {
            let texts: Vec<String> = scored.iter().map(|s| s.chunk.text.clone()).collect();
            let order = self.refine_order(&texts, query).await;
            order.iter().map(|&i| &scored[i]).collect()
        } else {
            scored.iter().collect()
        };

        let snippets: Vec<Snippet> = ordered
            .iter()
            .map(|s| Snippet::new(s.chunk.start, s.chunk.end, s.chunk.text.clone()))
            .collect();

        let output_path = self.create_video(input, &snippets).await?;

        Ok(HighlightResult {
            output_path,
            snippets,
        })
    }
}

/// Result of a full pipeline run.
#[derive(Debug)]
pub struct HighlightResult {
    /// Path to the spliced highlight video.
    pub output_path: PathBuf,
    /// The snippets included, in narrative order.
    pub snippets: Vec<Snippet>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;
    use async_trait::async_trait;

    struct FixedTranscript {
        segments: Vec<TranscriptSegment>,
    }

    #[async_trait]
    impl TranscriptSource for FixedTranscript {
        async fn fetch(&self, _video_id: &str, _language: &str) -> Result<Vec<TranscriptSegment>> {
            Ok(self.segments.clone())
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct NoOracle;

    #[async_trait]
    impl CompletionOracle for NoOracle {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(KlippError::OpenAI("offline".to_string()))
        }
    }

    fn pipeline(segments: Vec<TranscriptSegment>) -> HighlightPipeline {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.output_dir = dir.keep().to_string_lossy().to_string();

        HighlightPipeline::with_components(
            settings,
            Arc::new(FixedTranscript { segments }),
            Arc::new(UnitEmbedder),
            Arc::new(NoOracle),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_transcript_chunks_end_to_end() {
        let p = pipeline(vec![
            TranscriptSegment::new("intro", 0.0, 2.0),
            TranscriptSegment::new("topic A", 2.0, 3.0),
            TranscriptSegment::new("topic B", 5.0, 3.0),
        ]);

        let chunks = p.transcript_chunks("dQw4w9WgXcQ", 2).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].source_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert!((chunks[2].start, chunks[2].end) == (5.0, 8.0));
    }

    #[tokio::test]
    async fn test_transcript_chunks_rejects_bad_input() {
        let p = pipeline(Vec::new());
        let result = p.transcript_chunks("not a url", 200).await;
        assert!(matches!(result, Err(KlippError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_video_rejects_empty_snippets() {
        let p = pipeline(Vec::new());
        let result = p.create_video("dQw4w9WgXcQ", &[]).await;
        assert!(matches!(result, Err(KlippError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_refine_order_degrades_to_identity() {
        let p = pipeline(Vec::new());
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(p.refine_order(&texts, "query").await, vec![0, 1, 2]);
    }
}
