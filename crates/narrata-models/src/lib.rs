//! Shared data model for the narrata pipeline: task lifecycle, progress
//! records, the parsed-novel entities, the storyboard, and the rendered/
//! composed results. See `SPEC_FULL.md` section 3 ("DATA MODEL").

mod character;
mod error;
mod novel;
mod progress;
mod render;
mod storyboard;
mod task;

pub use character::{CharacterAppearance, CharacterInfo, CharacterRenderInfo};
pub use error::{
    ApiError, CompositionError, DownloadError, GenerationError, ParseError, StorageError,
    SynthesisError, ValidationError,
};
pub use novel::{Chapter, ContentType, NovelParseResult, PlotPoint, Scene};
pub use progress::{ProgressRecord, ProgressStatus};
pub use render::{RenderResult, RenderedChapter, RenderedScene};
pub use storyboard::{
    AudioContentType, AudioInfo, ImageRenderInfo, StoryboardChapter, StoryboardResult,
    StoryboardScene,
};
pub use task::{Task, TaskId, TaskStatus};
