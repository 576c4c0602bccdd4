//! Klipp - Query-Driven Video Highlights
//!
//! A CLI tool and HTTP service that turns long YouTube transcripts into short,
//! semantically relevant highlight videos.
//!
//! The name "Klipp" comes from the Norwegian/Scandinavian word for "cut" or "clip."
//!
//! # Overview
//!
//! Klipp allows you to:
//! - Fetch timed transcripts for YouTube videos and break them into bounded chunks
//! - Rank chunks against a query using embedding similarity
//! - Reorder the best snippets into a cohesive narrative with an LLM
//! - Splice the matching time ranges out of the source video into one highlight clip
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `video_source` - YouTube URL parsing and video download
//! - `transcript` - Timed transcript fetching
//! - `chunking` - Word-bounded transcript chunking
//! - `embedding` - Embedding generation
//! - `ranking` - Similarity ranking of chunks against a query
//! - `refine` - LLM-based narrative reordering
//! - `splicing` - Sub-range extraction and concatenation
//! - `pipeline` - Stage coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use klipp::config::Settings;
//! use klipp::pipeline::HighlightPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = HighlightPipeline::new(settings)?;
//!
//!     // Build a highlight video for a query
//!     let result = pipeline.run("dQw4w9WgXcQ", "the chorus", 5).await?;
//!     println!("Highlight written to {}", result.output_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod ranking;
pub mod refine;
pub mod splicing;
pub mod transcript;
pub mod video_source;

pub use error::{KlippError, Result};
