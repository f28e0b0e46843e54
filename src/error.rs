use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipError {
    #[error("failed to acquire source video from {url}: {reason}")]
    Acquisition { url: String, reason: String },

    #[error("transcription failed for {media}: {reason}")]
    Transcription { media: PathBuf, reason: String },

    #[error("model call failed for chunk {chunk}: {reason}")]
    ModelCall { chunk: usize, reason: String },

    #[error("model reply for chunk {chunk} rejected by moment schema")]
    SchemaValidation { chunk: usize },

    #[error("render configuration error: {reason}")]
    RenderConfig { reason: String },

    #[error("failed to persist {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ClipError>;
