//! YouTube URL parsing and video download.
//!
//! Resolves user input (full URL or bare ID) to a video ID, downloads the
//! source video once per ID into the output directory, and probes its
//! duration with ffprobe.

use crate::error::{KlippError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

/// A downloaded source video with a known duration.
#[derive(Debug, Clone)]
pub struct SourceVideo {
    /// Video ID.
    pub id: String,
    /// Path to the downloaded file.
    pub path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
}

/// Extract a video ID from a YouTube URL or bare 11-character ID.
///
/// Accepts watch, youtu.be, shorts, and embed URLs.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    // Bare video ID
    let bare_id = Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid regex");
    if bare_id.is_match(input) {
        return Some(input.to_string());
    }

    let parsed = Url::parse(input).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.");

    match host {
        "youtu.be" => parsed
            .path_segments()?
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()),
        "youtube.com" | "m.youtube.com" => {
            // watch?v=ID
            if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                return Some(v.to_string());
            }
            // shorts/ID or embed/ID
            let segments: Vec<_> = parsed.path_segments()?.collect();
            match segments.as_slice() {
                ["shorts", id, ..] | ["embed", id, ..] if !id.is_empty() => Some(id.to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Resolve input to a downloaded source video with a known duration.
///
/// The download is cached by presence check on the deterministic path
/// `<output_dir>/<id>.mp4`; concurrent first-time requests for the same ID
/// may race on that path (no per-key lock), matching the single-attempt,
/// no-retry download contract.
pub async fn resolve(input: &str, output_dir: &Path, format: &str) -> Result<SourceVideo> {
    let id = extract_video_id(input)
        .ok_or_else(|| KlippError::InvalidInput(format!("Invalid YouTube URL or ID: {}", input)))?;

    let path = output_dir.join(format!("{}.mp4", id));
    if !path.exists() {
        download_video(&id, &path, format).await?;
    }

    let duration = probe_duration(&path).await?;

    Ok(SourceVideo { id, path, duration })
}

/// Download a YouTube video to the given path using yt-dlp.
async fn download_video(video_id: &str, target: &Path, format: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let url = format!("https://www.youtube.com/watch?v={}", video_id);

    let result = Command::new("yt-dlp")
        .arg("--format").arg(format)
        .arg("--output").arg(target.to_str().unwrap_or_default())
        .arg("--no-playlist")
        .arg("--quiet")
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
            return Err(KlippError::VideoDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lower = stderr.to_lowercase();
        if lower.contains("private video") || lower.contains("video unavailable") {
            return Err(KlippError::VideoUnavailable(video_id.to_string()));
        }
        return Err(KlippError::VideoDownload(format!("yt-dlp failed: {stderr}")));
    }

    if !target.exists() {
        return Err(KlippError::VideoDownload(
            "Video file not found after download".into(),
        ));
    }

    Ok(())
}

/// Query the duration of a media file using ffprobe with JSON output.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(KlippError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(KlippError::VideoDownload(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(KlippError::VideoDownload("ffprobe returned error".into()));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| KlippError::VideoDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| KlippError::VideoDownload("Could not determine video duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_url_formats() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ?feature=share"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_video_id_bare() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("  dQw4w9WgXcQ  "),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_video_id_invalid() {
        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("https://vimeo.com/12345"), None);
        assert_eq!(extract_video_id("https://youtube.com/playlist?list=PL123"), None);
    }
}
