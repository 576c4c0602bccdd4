//! Timed transcript fetching for Klipp.
//!
//! A transcript is an ordered sequence of spoken-utterance segments, each
//! carrying its start time and duration in seconds. Segments arrive ordered
//! by start time and are not re-sorted.

mod youtube;

pub use youtube::YoutubeTranscriptSource;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single timed utterance from a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Spoken text of this segment.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl TranscriptSegment {
    /// Create a new segment.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the timed transcript for a video in the given language.
    ///
    /// Fails with `TranscriptsDisabled`, `TranscriptNotFound`, or
    /// `VideoUnavailable` depending on what the provider reports.
    async fn fetch(&self, video_id: &str, language: &str) -> Result<Vec<TranscriptSegment>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_end() {
        let seg = TranscriptSegment::new("hello", 2.0, 3.5);
        assert!((seg.end() - 5.5).abs() < f64::EPSILON);
    }
}
