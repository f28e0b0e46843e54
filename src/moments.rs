use crate::error::{ClipError, Result};
use crate::logw;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A selected time range of the source video. `start`/`end` come from
/// transcript timestamps the model was given; the duration window is a
/// prompt instruction only and is not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub start: f64,
    pub end: f64,
    pub transcript: String,
    pub caption: String,
    pub video_title: String,
}

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("code fence regex"));

/// Best-effort repair of the two formatting slips the model is known to
/// make: a fenced ```json wrapper around the payload, and a bare object
/// where a list was asked for. Anything else is left for the parser to
/// reject.
pub fn repair_reply_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = match CODE_FENCE_RE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    };

    if unfenced.starts_with('[') {
        unfenced
    } else {
        format!("[{}]", unfenced)
    }
}

/// Repairs and validates one chunk's raw model reply. The deserialize
/// target is the moment schema: any missing key or malformed element
/// rejects the chunk's entire output, never a subset of it.
pub fn sanitize_chunk_reply(raw: &str, chunk: usize) -> Result<Vec<Moment>> {
    let repaired = repair_reply_text(raw);
    match serde_json::from_str::<Vec<Moment>>(&repaired) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            logw(format!("chunk {}: moment schema rejected reply: {}", chunk, err));
            logw(format!("chunk {}: raw model reply: {}", chunk, raw));
            Err(ClipError::SchemaValidation { chunk })
        }
    }
}

/// Concatenates per-chunk moment lists in chunk order and truncates to the
/// render cap. Chunks see disjoint transcript slices, so no deduplication
/// is attempted.
pub fn aggregate_moments(per_chunk: Vec<Vec<Moment>>, max_renders: usize) -> Vec<Moment> {
    let mut all: Vec<Moment> = per_chunk.into_iter().flatten().collect();
    all.truncate(max_renders);
    all
}
