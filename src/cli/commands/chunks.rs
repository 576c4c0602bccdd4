//! Chunks command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::pipeline::HighlightPipeline;
use anyhow::Result;

/// Run the chunks command.
pub async fn run_chunks(
    url: &str,
    max_words: usize,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::Chunks)?;

    let pipeline = HighlightPipeline::new(settings)?;

    let spinner = Output::spinner("Fetching transcript...");
    let result = pipeline.transcript_chunks(url, max_words).await;
    spinner.finish_and_clear();

    let chunks = match result {
        Ok(chunks) => chunks,
        Err(e) => {
            Output::error(&format!("Chunking failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    };

    let json = serde_json::to_string_pretty(&chunks)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            Output::success(&format!("Wrote {} chunks to {}", chunks.len(), path));
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
