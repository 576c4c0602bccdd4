//! Word-bounded transcript chunking.
//!
//! Merges consecutive transcript segments into chunks capped at an
//! approximate word budget, preserving segment-aligned start/end times.

use crate::transcript::TranscriptSegment;
use serde::{Deserialize, Serialize};

/// A merged, time-bounded group of transcript segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Space-joined text of all contributing segments.
    pub text: String,
    /// Start time of the first contributing segment, in seconds.
    pub start: f64,
    /// End time (start + duration) of the last contributing segment, in seconds.
    pub end: f64,
    /// Source video URL, when known.
    #[serde(rename = "sourceUrl", skip_serializing_if = "Option::is_none", default)]
    pub source_url: Option<String>,
    /// Source video ID, when known.
    #[serde(rename = "sourceId", skip_serializing_if = "Option::is_none", default)]
    pub source_id: Option<String>,
}

impl Chunk {
    /// Tag this chunk with its source video.
    pub fn with_source(mut self, url: impl Into<String>, id: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self.source_id = Some(id.into());
        self
    }

    /// Approximate word count of the chunk text.
    pub fn word_count(&self) -> usize {
        count_words(&self.text)
    }
}

/// Words in a text, split on whitespace.
///
/// This is an approximation, not a tokenizer-exact budget.
fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Accumulator state for the chunk fold.
struct Accumulator {
    chunks: Vec<Chunk>,
    texts: Vec<String>,
    words: usize,
    start: f64,
    end: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            texts: Vec::new(),
            words: 0,
            start: 0.0,
            end: 0.0,
        }
    }

    /// Close the open chunk, if any.
    fn flush(&mut self) {
        if self.texts.is_empty() {
            return;
        }
        self.chunks.push(Chunk {
            text: self.texts.join(" "),
            start: self.start,
            end: self.end,
            source_url: None,
            source_id: None,
        });
        self.texts.clear();
        self.words = 0;
    }
}

/// Merge ordered transcript segments into chunks of at most `max_words` words.
///
/// The budget check fires only once the accumulator has content, so a single
/// segment larger than `max_words` still lands in exactly one chunk - segments
/// are never split. With `max_words == 0` every non-empty segment closes the
/// open chunk, degrading to one chunk per segment.
pub fn chunk_segments(segments: &[TranscriptSegment], max_words: usize) -> Vec<Chunk> {
    let mut acc = segments.iter().fold(Accumulator::new(), |mut acc, seg| {
        let seg_words = count_words(&seg.text);

        if !acc.texts.is_empty() && acc.words + seg_words > max_words {
            acc.flush();
        }

        if acc.texts.is_empty() {
            acc.start = seg.start;
        }
        acc.texts.push(seg.text.clone());
        acc.words += seg_words;
        acc.end = seg.end();

        acc
    });

    acc.flush();
    acc.chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, duration: f64) -> TranscriptSegment {
        TranscriptSegment::new(text, start, duration)
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_segments(&[], 200).is_empty());
    }

    #[test]
    fn test_merges_up_to_budget() {
        let segments = vec![
            seg("a b c", 0.0, 1.0),
            seg("d e", 1.0, 1.0),
            seg("f g h i", 2.0, 1.0),
        ];

        let chunks = chunk_segments(&segments, 5);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a b c d e");
        assert!((chunks[0].start - 0.0).abs() < f64::EPSILON);
        assert!((chunks[0].end - 2.0).abs() < f64::EPSILON);
        assert_eq!(chunks[1].text, "f g h i");
        assert!((chunks[1].start - 2.0).abs() < f64::EPSILON);
        assert!((chunks[1].end - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_one_chunk_per_segment_scenario() {
        // Three segments, max_words=2: each closes the previous chunk.
        let segments = vec![
            seg("intro", 0.0, 2.0),
            seg("topic A", 2.0, 3.0),
            seg("topic B", 5.0, 3.0),
        ];

        let chunks = chunk_segments(&segments, 2);
        assert_eq!(chunks.len(), 3);
        assert!((chunks[0].start, chunks[0].end) == (0.0, 2.0));
        assert!((chunks[1].start, chunks[1].end) == (2.0, 5.0));
        assert!((chunks[2].start, chunks[2].end) == (5.0, 8.0));
    }

    #[test]
    fn test_oversized_segment_never_split() {
        let segments = vec![
            seg("one two three four five six", 0.0, 5.0),
            seg("tail", 5.0, 1.0),
        ];

        let chunks = chunk_segments(&segments, 3);
        assert_eq!(chunks.len(), 2);
        // The oversized segment is one intact chunk, over budget.
        assert_eq!(chunks[0].word_count(), 6);
        assert_eq!(chunks[1].text, "tail");
    }

    #[test]
    fn test_zero_budget_degrades_to_one_chunk_per_segment() {
        let segments = vec![seg("a", 0.0, 1.0), seg("b", 1.0, 1.0), seg("c", 2.0, 1.0)];
        let chunks = chunk_segments(&segments, 0);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_lossless_partition() {
        let segments = vec![
            seg("the quick brown", 0.0, 1.0),
            seg("fox jumps", 1.0, 1.0),
            seg("over the lazy", 2.0, 1.0),
            seg("dog", 3.0, 1.0),
        ];

        let chunks = chunk_segments(&segments, 4);

        let joined_chunks = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let joined_segments = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined_chunks, joined_segments);
    }

    #[test]
    fn test_budget_respected_except_oversized() {
        let segments = vec![
            seg("a b", 0.0, 1.0),
            seg("c d", 1.0, 1.0),
            seg("e f g h i j k l", 2.0, 1.0),
            seg("m", 3.0, 1.0),
        ];

        let max_words = 4;
        for chunk in chunk_segments(&segments, max_words) {
            // A chunk may only exceed the budget when it is a single
            // oversized segment passed through intact.
            if chunk.word_count() > max_words {
                assert!(segments.iter().any(|s| s.text == chunk.text));
            }
        }
    }

    #[test]
    fn test_chunks_contiguous_in_time() {
        let segments = vec![
            seg("a b c", 0.0, 2.0),
            seg("d e f", 2.0, 2.0),
            seg("g h i", 4.0, 2.0),
        ];

        let chunks = chunk_segments(&segments, 3);
        for pair in chunks.windows(2) {
            assert!(pair[0].end <= pair[1].start + f64::EPSILON);
        }
        for chunk in &chunks {
            assert!(chunk.end >= chunk.start);
        }
    }
}
