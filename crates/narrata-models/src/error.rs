//! Shared error taxonomy (spec §7). Each kind is a closed enum rather than
//! a dynamic exception type (spec §9: "Exceptions for control flow → result
//! types"), grounded on the constructor-helper-method idiom in
//! `vclip-media/src/error.rs` / `vclip-worker/src/error.rs`.

use thiserror::Error;

/// Caller-visible input validation failure. Surfaced as 4xx by the API or
/// as a stage failure by a pipeline component.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// External service unreachable or responded non-2xx. Retriable only where
/// a component explicitly says so (only C7).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },
    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },
}

/// External response did not conform to the expected schema. Non-retriable.
#[derive(Debug, Error)]
#[error("failed to parse response from {source_name}: {message}")]
pub struct ParseError {
    pub source_name: String,
    pub message: String,
}

impl ParseError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source.into(),
            message: message.into(),
        }
    }
}

/// The image provider responded but produced nothing usable. Retriable in
/// C7.
#[derive(Debug, Error)]
#[error("image generation failed: {0}")]
pub struct GenerationError(pub String);

/// The TTS provider responded but produced nothing usable. Retriable in C7.
#[derive(Debug, Error)]
#[error("speech synthesis failed: {0}")]
pub struct SynthesisError(pub String);

/// The media toolchain (ffmpeg/ffprobe) failed: nonzero exit, timeout, or
/// missing input.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("ffmpeg not found on PATH")]
    ToolNotFound,
    #[error("ffmpeg failed on {stage}: {stderr}")]
    ProcessFailed { stage: String, stderr: String },
    #[error("subprocess for {stage} timed out after {timeout_secs}s")]
    Timeout { stage: String, timeout_secs: u64 },
    #[error("composition cancelled at {stage}")]
    Cancelled { stage: String },
    #[error("missing input for {stage}: {path}")]
    MissingInput { stage: String, path: String },
    #[error("{0}")]
    Validation(String),
    #[error("io error during {stage}: {source}")]
    Io {
        stage: String,
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem write failure in the Task Storage component.
#[derive(Debug, Error)]
#[error("storage error writing {path}: {source}")]
pub struct StorageError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// A referenced image or audio URL could not be fetched.
#[derive(Debug, Error)]
#[error("failed to download {url}: {message}")]
pub struct DownloadError {
    pub url: String,
    pub message: String,
}
