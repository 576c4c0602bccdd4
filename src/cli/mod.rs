//! CLI module for Klipp.

pub mod commands;
pub mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Klipp - Query-Driven Video Highlights
///
/// Turns long YouTube transcripts into short highlight videos for a query.
/// The name "Klipp" comes from the Norwegian/Scandinavian word for "cut."
#[derive(Parser, Debug)]
#[command(name = "klipp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Fetch a video transcript and print its word-bounded chunks
    Chunks {
        /// YouTube URL or video ID
        url: String,

        /// Approximate word budget per chunk
        #[arg(short, long, default_value = "200")]
        max_words: usize,

        /// Write chunk JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Rank transcript chunks against a query
    Search {
        /// YouTube URL or video ID
        url: String,

        /// Search query
        query: String,

        /// Maximum number of snippets to return
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Approximate word budget per chunk
        #[arg(short, long, default_value = "200")]
        max_words: usize,
    },

    /// Build a highlight video for a query (chunk, rank, reorder, splice)
    Create {
        /// YouTube URL or video ID
        url: String,

        /// Search query driving snippet selection
        query: String,

        /// Maximum number of snippets to include
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Skip LLM narrative reordering and keep similarity order
        #[arg(long)]
        no_refine: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "5001")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
