//! Search command implementation.

use crate::cli::output::format_time_range;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::pipeline::HighlightPipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    url: &str,
    query: &str,
    top_k: usize,
    max_words: usize,
    settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::Search)?;

    let pipeline = HighlightPipeline::new(settings)?;

    let spinner = Output::spinner("Fetching transcript...");
    let chunks = pipeline.transcript_chunks(url, max_words).await;
    spinner.finish_and_clear();

    let chunks = match chunks {
        Ok(chunks) => chunks,
        Err(e) => {
            Output::error(&format!("Transcript fetch failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    };

    let spinner = Output::spinner("Ranking snippets...");
    let results = pipeline.search_snippets(&chunks, query, top_k).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} snippets", results.len()));
                for (rank, scored) in results.iter().enumerate() {
                    Output::snippet_result(
                        rank + 1,
                        &format_time_range(scored.chunk.start, scored.chunk.end),
                        scored.similarity,
                        &scored.chunk.text,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}
