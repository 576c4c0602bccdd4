//! Sub-range extraction and concatenation of source video timelines.
//!
//! Maps caller-ordered snippets onto the source timeline, clamps them to the
//! valid range, extracts each as an independent subclip with ffmpeg, and
//! concatenates the subclips in the given order into one highlight file.

use crate::error::{KlippError, Result};
use crate::video_source::SourceVideo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// A caller-chosen time interval destined for the output video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Snippet text (carried through for display, unused by the splicer).
    #[serde(default)]
    pub text: String,
    /// Seconds to shift the start by (may be negative).
    #[serde(rename = "shiftStart", default)]
    pub shift_start: f64,
    /// Seconds to shift the end by (may be negative).
    #[serde(rename = "shiftEnd", default)]
    pub shift_end: f64,
}

impl Snippet {
    /// Create a snippet with no shift.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            shift_start: 0.0,
            shift_end: 0.0,
        }
    }
}

/// A snippet's time range after shifting and clamping to the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveInterval {
    pub start: f64,
    pub end: f64,
}

impl EffectiveInterval {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Apply shift and clamp a snippet against the source duration.
///
/// Returns `None` when the clamped interval is empty or inverted; such
/// snippets are dropped, not errored.
pub fn effective_interval(snippet: &Snippet, source_duration: f64) -> Option<EffectiveInterval> {
    let start = (snippet.start + snippet.shift_start).max(0.0);
    let end = (snippet.end + snippet.shift_end).min(source_duration);

    if end > start {
        Some(EffectiveInterval { start, end })
    } else {
        None
    }
}

/// Splices snippet intervals out of a source video.
pub struct Splicer {
    output_dir: PathBuf,
    video_codec: String,
    audio_codec: String,
}

impl Splicer {
    /// Create a splicer writing into the given output directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    /// Override the output codecs.
    pub fn with_codecs(mut self, video_codec: &str, audio_codec: &str) -> Self {
        self.video_codec = video_codec.to_string();
        self.audio_codec = audio_codec.to_string();
        self
    }

    /// Deterministic output path for a source video.
    pub fn output_path(&self, video_id: &str) -> PathBuf {
        self.output_dir.join(format!("highlight_{}.mp4", video_id))
    }

    /// Extract every valid snippet interval and concatenate them, in the
    /// given order, into `highlight_<id>.mp4`.
    ///
    /// Snippet order is the caller's narrative order and is never re-sorted
    /// here. Subclip boundaries snap to the codec's nearest representable
    /// timestamp, an approximation inherent to the container format.
    #[instrument(skip(self, source, snippets), fields(video_id = %source.id, snippets = snippets.len()))]
    pub async fn splice(&self, source: &SourceVideo, snippets: &[Snippet]) -> Result<PathBuf> {
        let intervals: Vec<EffectiveInterval> = snippets
            .iter()
            .filter_map(|s| effective_interval(s, source.duration))
            .collect();

        if intervals.is_empty() {
            return Err(KlippError::NoValidSubclips);
        }

        debug!("Extracting {} subclips", intervals.len());

        std::fs::create_dir_all(&self.output_dir)?;

        // Part files live in a temp dir dropped on every exit path.
        let workdir = tempfile::tempdir()?;
        let mut parts = Vec::with_capacity(intervals.len());

        for (i, interval) in intervals.iter().enumerate() {
            let part = workdir.path().join(format!("part_{:04}.mp4", i));
            self.extract_subclip(&source.path, &part, interval).await?;
            parts.push(part);
        }

        let out_path = self.output_path(&source.id);
        concat_parts(workdir.path(), &parts, &out_path).await?;

        info!("Wrote highlight video to {}", out_path.display());
        Ok(out_path)
    }

    /// Extract one interval as an independent subclip.
    ///
    /// Subclips are re-encoded with the configured codecs so the later
    /// concat step can stream-copy uniform parts.
    async fn extract_subclip(
        &self,
        source: &Path,
        dest: &Path,
        interval: &EffectiveInterval,
    ) -> Result<()> {
        let result = Command::new("ffmpeg")
            .arg("-ss").arg(format!("{:.3}", interval.start))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", interval.length()))
            .arg("-c:v").arg(&self.video_codec)
            .arg("-c:a").arg(&self.audio_codec)
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(KlippError::Splice(format!("Subclip extraction failed: {err}")))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(KlippError::ToolNotFound("ffmpeg".into()))
            }
            Err(e) => Err(KlippError::Splice(format!("ffmpeg error: {e}"))),
        }
    }
}

/// Concatenate uniformly-encoded parts with the ffmpeg concat demuxer.
async fn concat_parts(workdir: &Path, parts: &[PathBuf], dest: &Path) -> Result<()> {
    let list_path = workdir.join("concat.txt");
    let list = parts
        .iter()
        .map(|p| format!("file '{}'", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(&list_path, list)?;

    let result = Command::new("ffmpeg")
        .arg("-f").arg("concat")
        .arg("-safe").arg("0")
        .arg("-i").arg(&list_path)
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(KlippError::Splice(format!("Concatenation failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(KlippError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(KlippError::Splice(format!("ffmpeg error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_law() {
        // start=-5, end=10 against a 6-second source clamps to [0, 6)
        let snippet = Snippet::new(-5.0, 10.0, "");
        let interval = effective_interval(&snippet, 6.0).unwrap();
        assert_eq!(interval.start, 0.0);
        assert_eq!(interval.end, 6.0);
    }

    #[test]
    fn test_shift_applied_before_clamp() {
        let mut snippet = Snippet::new(2.0, 4.0, "");
        snippet.shift_start = -1.0;
        snippet.shift_end = 3.0;

        let interval = effective_interval(&snippet, 5.0).unwrap();
        assert_eq!(interval.start, 1.0);
        assert_eq!(interval.end, 5.0);
    }

    #[test]
    fn test_interval_outside_source_dropped() {
        // Entirely past the end
        let snippet = Snippet::new(10.0, 12.0, "");
        assert_eq!(effective_interval(&snippet, 6.0), None);

        // Entirely before the start after shifting
        let mut snippet = Snippet::new(1.0, 2.0, "");
        snippet.shift_start = -5.0;
        snippet.shift_end = -5.0;
        assert_eq!(effective_interval(&snippet, 6.0), None);
    }

    #[test]
    fn test_empty_interval_dropped() {
        let snippet = Snippet::new(3.0, 3.0, "");
        assert_eq!(effective_interval(&snippet, 6.0), None);

        let snippet = Snippet::new(4.0, 2.0, "");
        assert_eq!(effective_interval(&snippet, 6.0), None);
    }

    #[tokio::test]
    async fn test_splice_all_invalid_reports_no_valid_subclips() {
        let splicer = Splicer::new(std::env::temp_dir());
        let source = SourceVideo {
            id: "test".to_string(),
            path: PathBuf::from("/nonexistent.mp4"),
            duration: 6.0,
        };

        // Every snippet clamps to an empty interval; splice must fail
        // before any ffmpeg invocation (the source path does not exist).
        let snippets = vec![Snippet::new(10.0, 12.0, ""), Snippet::new(8.0, 9.0, "")];
        let result = splicer.splice(&source, &snippets).await;
        assert!(matches!(result, Err(KlippError::NoValidSubclips)));
    }

    #[test]
    fn test_output_path_deterministic() {
        let splicer = Splicer::new("/videos");
        assert_eq!(
            splicer.output_path("abc123"),
            PathBuf::from("/videos/highlight_abc123.mp4")
        );
    }

    #[test]
    fn test_snippet_deserializes_wire_names() {
        let snippet: Snippet = serde_json::from_str(
            r#"{"start": 1.0, "end": 2.0, "text": "x", "shiftStart": -0.5, "shiftEnd": 0.5}"#,
        )
        .unwrap();
        assert_eq!(snippet.shift_start, -0.5);
        assert_eq!(snippet.shift_end, 0.5);

        // Shifts default to zero
        let snippet: Snippet = serde_json::from_str(r#"{"start": 1.0, "end": 2.0}"#).unwrap();
        assert_eq!(snippet.shift_start, 0.0);
        assert_eq!(snippet.shift_end, 0.0);
    }
}
