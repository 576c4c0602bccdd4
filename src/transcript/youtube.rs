//! YouTube transcript source implementation.
//!
//! Fetches timed captions with yt-dlp in json3 format. Both uploaded and
//! auto-generated captions are requested; yt-dlp picks whichever exists.

use super::{TranscriptSegment, TranscriptSource};
use crate::error::{KlippError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// YouTube transcript source backed by yt-dlp.
pub struct YoutubeTranscriptSource;

impl YoutubeTranscriptSource {
    pub fn new() -> Self {
        Self
    }

    /// Map yt-dlp stderr to a transcript error kind.
    fn classify_failure(video_id: &str, stderr: &str) -> KlippError {
        let lower = stderr.to_lowercase();
        if lower.contains("private video") || lower.contains("video unavailable") {
            KlippError::VideoUnavailable(video_id.to_string())
        } else if lower.contains("subtitles are disabled") {
            KlippError::TranscriptsDisabled(video_id.to_string())
        } else if lower.contains("no subtitles") || lower.contains("unable to download video subtitles")
        {
            KlippError::TranscriptNotFound(video_id.to_string())
        } else {
            KlippError::ToolFailed(format!("yt-dlp subtitle fetch failed: {}", stderr.trim()))
        }
    }
}

impl Default for YoutubeTranscriptSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str, language: &str) -> Result<Vec<TranscriptSegment>> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let workdir = tempfile::tempdir()?;
        let template = workdir.path().join("%(id)s");

        let result = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(language)
            .arg("--sub-format").arg("json3")
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(&url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KlippError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(KlippError::ToolFailed(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::classify_failure(video_id, &stderr));
        }

        let caption_path = workdir
            .path()
            .join(format!("{}.{}.json3", video_id, language));

        if !caption_path.exists() {
            // yt-dlp exits 0 when the video exists but has no captions
            return Err(KlippError::TranscriptNotFound(video_id.to_string()));
        }

        let segments = parse_json3(&caption_path)?;
        debug!("Fetched {} transcript segments", segments.len());
        Ok(segments)
    }
}

/// One caption event in the json3 format.
#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    start_ms: Option<f64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<f64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

#[derive(Debug, Deserialize)]
struct Json3Body {
    #[serde(default)]
    events: Vec<Json3Event>,
}

/// Parse a json3 caption file into timed segments.
///
/// Events without text (styling/window events) are skipped.
fn parse_json3(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let content = std::fs::read_to_string(path)?;
    let body: Json3Body = serde_json::from_str(&content)?;

    let segments = body
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs
                .iter()
                .map(|s| s.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ")
                .trim()
                .to_string();

            if text.is_empty() {
                return None;
            }

            let start = event.start_ms? / 1000.0;
            let duration = event.duration_ms.unwrap_or(0.0) / 1000.0;
            Some(TranscriptSegment::new(text, start, duration))
        })
        .collect();

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.json3");
        std::fs::write(
            &path,
            r#"{
                "events": [
                    {"tStartMs": 0, "dDurationMs": 2000, "segs": [{"utf8": "hello "}, {"utf8": "world"}]},
                    {"tStartMs": 1500, "wWinId": 1},
                    {"tStartMs": 2000, "dDurationMs": 3000, "segs": [{"utf8": "second line\n"}]}
                ]
            }"#,
        )
        .unwrap();

        let segments = parse_json3(&path).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert!((segments[0].start - 0.0).abs() < f64::EPSILON);
        assert!((segments[0].duration - 2.0).abs() < f64::EPSILON);
        assert_eq!(segments[1].text, "second line");
        assert!((segments[1].start - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_classify_failure() {
        let err = YoutubeTranscriptSource::classify_failure("abc", "ERROR: Private video");
        assert!(matches!(err, KlippError::VideoUnavailable(_)));

        let err = YoutubeTranscriptSource::classify_failure("abc", "Subtitles are disabled");
        assert!(matches!(err, KlippError::TranscriptsDisabled(_)));

        let err = YoutubeTranscriptSource::classify_failure("abc", "There are no subtitles");
        assert!(matches!(err, KlippError::TranscriptNotFound(_)));

        let err = YoutubeTranscriptSource::classify_failure("abc", "something else broke");
        assert!(matches!(err, KlippError::ToolFailed(_)));
    }
}
