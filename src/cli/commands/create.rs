//! Create command implementation.
//!
//! Runs the whole pipeline: transcript, chunking, ranking, optional
//! narrative reordering, then splicing into one highlight video.

use crate::cli::output::format_time_range;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::pipeline::HighlightPipeline;
use anyhow::Result;

/// Run the create command.
pub async fn run_create(
    url: &str,
    query: &str,
    top_k: usize,
    no_refine: bool,
    mut settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::Create)?;

    if no_refine {
        settings.refine.enabled = false;
    }

    let pipeline = HighlightPipeline::new(settings)?;

    Output::header("Klipp");
    Output::kv("Video", url);
    Output::kv("Query", query);
    println!();

    let spinner = Output::spinner("Building highlight video (this downloads the source)...");
    let result = pipeline.run(url, query, top_k).await;
    spinner.finish_and_clear();

    match result {
        Ok(highlight) => {
            Output::success(&format!(
                "Highlight with {} snippets written to {}",
                highlight.snippets.len(),
                highlight.output_path.display()
            ));
            for (i, snippet) in highlight.snippets.iter().enumerate() {
                Output::kv(
                    &format!("{}", i + 1),
                    &format_time_range(snippet.start, snippet.end),
                );
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Highlight creation failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}
