//! Typed `reqwest` wrappers for the three external providers (spec §4.4
//! "Provider Clients"): the structured-text parser LLM, the image
//! generator, and the TTS backend. Each client is stateless past its
//! configured endpoint/credentials and enforces a per-call timeout.

pub mod image;
pub mod parser;
pub mod tts;

pub use image::ImageClient;
pub use parser::ParserClient;
pub use tts::TtsClient;

use narrata_models::{ApiError, GenerationError, ParseError, SynthesisError};

/// The union of error kinds a provider call can fail with (spec §7: each
/// wrapper returns `APIError`/`ParseError`/`GenerationError`/
/// `SynthesisError` as appropriate).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;
