use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSpan {
    pub start: f64,
    pub end: f64,
    pub word: String,
}

/// A contiguous run of transcript segments bounded by the configured
/// chunk duration cap. Chunks partition the transcript: no segment is
/// split, dropped, or reordered.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub segments: Vec<TranscriptSegment>,
}

impl Chunk {
    pub fn duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|seg| (seg.end - seg.start).max(0.0))
            .sum()
    }

    pub fn to_prompt_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.segments)
    }
}

/// Greedy chunking: accumulate segments while the running duration stays
/// within `max_chunk_duration`. A segment that would overflow closes the
/// current chunk and opens the next one, so an oversized segment still
/// lands in a chunk of its own.
pub fn chunk_transcript(segments: &[TranscriptSegment], max_chunk_duration: f64) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk::default();
    let mut current_duration = 0.0;

    for seg in segments {
        let seg_duration = (seg.end - seg.start).max(0.0);
        if !current.segments.is_empty() && current_duration + seg_duration > max_chunk_duration {
            chunks.push(std::mem::take(&mut current));
            current_duration = 0.0;
        }
        current.segments.push(seg.clone());
        current_duration += seg_duration;
    }

    if !current.segments.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Splits `total` moments over `chunk_count` chunks: every chunk gets the
/// base share, and the remainder goes to the earliest chunks one each.
/// The returned counts always sum to `total`.
pub fn distribute_moments(total: usize, chunk_count: usize) -> Vec<usize> {
    if chunk_count == 0 {
        return Vec::new();
    }
    let base = total / chunk_count;
    let extra = total % chunk_count;
    (0..chunk_count)
        .map(|i| base + usize::from(i < extra))
        .collect()
}

const WORD_WEIGHT_ALPHA: f64 = 0.5;

/// Fallback word timing when the transcriber offers only segment-level
/// granularity: each segment's span is divided among its words, weighted
/// by character count so long words hold the screen a little longer.
pub fn words_from_segments(segments: &[TranscriptSegment]) -> Vec<WordSpan> {
    let mut out = Vec::new();

    for seg in segments {
        let words: Vec<&str> = seg.text.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let span = (seg.end - seg.start).max(0.0);
        let total_weight: f64 = words
            .iter()
            .map(|w| (w.chars().count() as f64).powf(WORD_WEIGHT_ALPHA))
            .sum();

        let mut cursor = seg.start;
        for word in &words {
            let weight = (word.chars().count() as f64).powf(WORD_WEIGHT_ALPHA);
            let duration = if total_weight > 0.0 {
                span * weight / total_weight
            } else {
                0.0
            };
            out.push(WordSpan {
                start: cursor,
                end: cursor + duration,
                word: (*word).to_string(),
            });
            cursor += duration;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn chunking_reproduces_transcript_exactly() {
        let segments: Vec<TranscriptSegment> = (0..20)
            .map(|i| seg(i as f64 * 7.0, (i + 1) as f64 * 7.0, "hello there"))
            .collect();

        let chunks = chunk_transcript(&segments, 30.0);
        let rebuilt: Vec<TranscriptSegment> = chunks
            .into_iter()
            .flat_map(|c| c.segments)
            .collect();
        assert_eq!(rebuilt, segments);
    }

    #[test]
    fn chunk_durations_stay_within_cap() {
        let segments: Vec<TranscriptSegment> = (0..12)
            .map(|i| seg(i as f64 * 5.0, (i + 1) as f64 * 5.0, "x"))
            .collect();

        for chunk in chunk_transcript(&segments, 20.0) {
            assert!(chunk.duration() <= 20.0 + f64::EPSILON);
        }
    }

    #[test]
    fn oversized_segment_becomes_its_own_chunk() {
        let segments = vec![
            seg(0.0, 5.0, "a"),
            seg(5.0, 100.0, "long monologue"),
            seg(100.0, 104.0, "b"),
        ];

        let chunks = chunk_transcript(&segments, 10.0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].segments.len(), 1);
        assert_eq!(chunks[1].segments[0].text, "long monologue");
    }

    #[test]
    fn final_partial_chunk_is_flushed() {
        let segments = vec![seg(0.0, 8.0, "a"), seg(8.0, 16.0, "b"), seg(16.0, 18.0, "c")];
        let chunks = chunk_transcript(&segments, 10.0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].segments[0].text, "c");
    }

    #[test]
    fn twenty_minute_transcript_splits_in_two() {
        // ~1200 seconds of contiguous 10-second segments against a 600s cap.
        let segments: Vec<TranscriptSegment> = (0..120)
            .map(|i| seg(i as f64 * 10.0, (i + 1) as f64 * 10.0, "line"))
            .collect();

        let chunks = chunk_transcript(&segments, 600.0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(distribute_moments(5, chunks.len()), vec![3, 2]);
    }

    #[test]
    fn distribution_sums_to_total_and_is_fair() {
        for total in 0..40usize {
            for chunk_count in 1..9usize {
                let counts = distribute_moments(total, chunk_count);
                assert_eq!(counts.len(), chunk_count);
                assert_eq!(counts.iter().sum::<usize>(), total);

                let max = *counts.iter().max().unwrap();
                let min = *counts.iter().min().unwrap();
                assert!(max - min <= 1);
                // Larger shares always come first.
                for pair in counts.windows(2) {
                    assert!(pair[0] >= pair[1]);
                }
            }
        }
    }

    #[test]
    fn distribution_with_no_chunks_is_empty() {
        assert!(distribute_moments(5, 0).is_empty());
    }

    #[test]
    fn word_spans_cover_each_segment() {
        let segments = vec![seg(2.0, 6.0, "one two three"), seg(6.0, 8.0, "four")];
        let words = words_from_segments(&segments);

        assert_eq!(words.len(), 4);
        assert!((words[0].start - 2.0).abs() < 1e-9);
        assert!((words[2].end - 6.0).abs() < 1e-6);
        assert_eq!(words[3].word, "four");
        assert!((words[3].end - 8.0).abs() < 1e-6);
        for pair in words.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
    }
}
