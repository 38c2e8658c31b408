//! Pipeline-level error type (spec §7 "Propagation"): every stage error
//! bubbles up unchanged, and the orchestrator pairs it with the `Stage` it
//! occurred in to fill `Task::failed_stage` (spec §4.9 "A failure at any
//! stage transitions to `failed` with the stage name captured in the
//! error"). Grounded on the teacher's `WorkerError`
//! `#[from]`-per-collaborator-crate shape.

use narrata_models::{
    ApiError, CompositionError, GenerationError, ParseError, StorageError, SynthesisError,
    ValidationError,
};
use narrata_providers::ProviderError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// The stage a `PipelineError` occurred in, used to populate the failed
/// progress record and `Task::failed_stage` (spec §4.9, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsing,
    Storyboarding,
    Rendering,
    Composing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Parsing => "parsing",
            Stage::Storyboarding => "storyboarding",
            Stage::Rendering => "rendering",
            Stage::Composing => "composing",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The union of error kinds any pipeline stage can fail with (spec §7).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Api(e) => PipelineError::Api(e),
            ProviderError::Parse(e) => PipelineError::Parse(e),
            ProviderError::Generation(e) => PipelineError::Generation(e),
            ProviderError::Synthesis(e) => PipelineError::Synthesis(e),
        }
    }
}
