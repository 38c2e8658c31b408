//! Pipeline Orchestrator (spec §4.9). Grounded directly on
//! `original_source/core/pipeline.py::AnimePipeline.execute` (identical
//! stage order and progress checkpoint values) and
//! `vclip-worker/src/processor.rs`'s overall shape: emit progress, call the
//! next stage, capture a typed error into the registry on failure.

use std::path::PathBuf;

use tokio::sync::watch;

use narrata_bus::{ProgressBus, TaskRegistry};
use narrata_models::{ProgressRecord, TaskId};
use narrata_providers::{ImageClient, ParserClient, TtsClient};
use narrata_storage::TaskWorkspace;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Stage};
use crate::logging::TaskLogger;
use crate::parser::{self, ParseMode};
use crate::{composer, scene_renderer, storyboard};

/// Progress checkpoints (spec §4.9): `init=1, parsing_in=10 → out=20,
/// storyboarding_in=25 → out=30, rendering_in=40 → out=70,
/// composing_in=80 → out=100`.
mod checkpoint {
    pub const INIT: u8 = 1;
    pub const PARSING_IN: u8 = 10;
    pub const PARSING_OUT: u8 = 20;
    pub const STORYBOARDING_IN: u8 = 25;
    pub const STORYBOARDING_OUT: u8 = 30;
    pub const RENDERING_IN: u8 = 40;
    pub const RENDERING_OUT: u8 = 70;
    pub const COMPOSING_IN: u8 = 80;
}

/// Everything the orchestrator needs to run one task end to end. Cloned
/// cheaply (every field is itself a handle), so one instance is shared
/// across every `tokio::spawn`ed task (spec §4.10 "submit spawns a
/// background activity").
#[derive(Clone)]
pub struct Orchestrator {
    registry: TaskRegistry,
    bus: ProgressBus,
    config: PipelineConfig,
    parser_client: ParserClient,
    image_client: ImageClient,
    tts_client: TtsClient,
    storage_root: PathBuf,
}

impl Orchestrator {
    pub fn new(
        registry: TaskRegistry,
        bus: ProgressBus,
        config: PipelineConfig,
        parser_client: ParserClient,
        image_client: ImageClient,
        tts_client: TtsClient,
        storage_root: PathBuf,
    ) -> Self {
        Self {
            registry,
            bus,
            config,
            parser_client,
            image_client,
            tts_client,
            storage_root,
        }
    }

    /// Run the full `parse → storyboard → render → compose` state machine
    /// for one task (spec §4.9 "State machine"). Never panics or returns an
    /// error past the registry/bus records: every failure is captured as a
    /// terminal `ProgressRecord`/`Task` state instead of propagated to the
    /// caller, since this runs detached inside `tokio::spawn`.
    pub async fn execute(&self, task_id: TaskId, text: String, mode: ParseMode, cancel: watch::Receiver<bool>) {
        self.registry.mark_running(&task_id);
        self.bus.publish(ProgressRecord::init(task_id.clone()));

        if let Err(err) = self.run(&task_id, &text, mode, &cancel).await {
            self.fail(&task_id, err);
        }
    }

    async fn run(
        &self,
        task_id: &TaskId,
        text: &str,
        mode: ParseMode,
        cancel: &watch::Receiver<bool>,
    ) -> Result<(), (Stage, PipelineError)> {
        let workspace = TaskWorkspace::create(&self.storage_root, task_id)
            .await
            .map_err(|e| (Stage::Parsing, e.into()))?;

        let parsing_logger = TaskLogger::new(task_id, Stage::Parsing.as_str());
        self.publish(task_id, Stage::Parsing.as_str(), checkpoint::PARSING_IN, "parsing novel text");
        parsing_logger.log_start("extracting entities");
        let parsed = parser::parse(&self.parser_client, text, mode, &self.config)
            .await
            .map_err(|e| (Stage::Parsing, e))?;
        self.publish(task_id, Stage::Parsing.as_str(), checkpoint::PARSING_OUT, "parsing complete");

        let storyboard_logger = TaskLogger::new(task_id, Stage::Storyboarding.as_str());
        self.publish(
            task_id,
            Stage::Storyboarding.as_str(),
            checkpoint::STORYBOARDING_IN,
            "building storyboard",
        );
        storyboard_logger.log_start("computing per-scene rendering plan");
        let storyboard_result = storyboard::create(&parsed, &self.config);
        self.publish(
            task_id,
            Stage::Storyboarding.as_str(),
            checkpoint::STORYBOARDING_OUT,
            "storyboard complete",
        );

        let render_logger = TaskLogger::new(task_id, Stage::Rendering.as_str());
        self.publish(task_id, Stage::Rendering.as_str(), checkpoint::RENDERING_IN, "rendering scenes");
        let render_result = scene_renderer::render(
            &storyboard_result,
            &workspace,
            &self.image_client,
            &self.tts_client,
            &self.config,
            cancel,
            &render_logger,
        )
        .await
        .map_err(|e| (Stage::Rendering, e))?;
        self.publish(task_id, Stage::Rendering.as_str(), checkpoint::RENDERING_OUT, "rendering complete");

        let compose_logger = TaskLogger::new(task_id, Stage::Composing.as_str());
        self.publish(task_id, Stage::Composing.as_str(), checkpoint::COMPOSING_IN, "composing final video");
        let composed = composer::compose(render_result, &workspace, &self.config, cancel, &compose_logger)
            .await
            .map_err(|e| (Stage::Composing, e))?;

        self.registry.mark_completed(task_id, composed);
        self.bus
            .publish(ProgressRecord::completed(task_id.clone(), "video generation complete"));

        Ok(())
    }

    fn publish(&self, task_id: &TaskId, stage: &str, progress: u8, message: &str) {
        self.bus
            .publish(ProgressRecord::new(task_id.clone(), stage, progress, message));
    }

    /// Record a stage failure in both the registry and the progress bus
    /// (spec §4.9 "A failure at any stage transitions to `failed` with the
    /// stage name captured in the error").
    fn fail(&self, task_id: &TaskId, (stage, error): (Stage, PipelineError)) {
        if is_cancellation(&error) {
            self.registry.mark_cancelled(task_id);
            self.bus.publish(ProgressRecord::cancelled(task_id.clone()));
            return;
        }

        let progress = self.bus.latest(task_id).map(|r| r.progress).unwrap_or(checkpoint::INIT);
        let message = error.to_string();
        self.registry.mark_failed(task_id, stage.as_str(), &message);
        self.bus
            .publish(ProgressRecord::failed(task_id.clone(), stage.as_str(), progress, message));
    }
}

/// Distinguish an explicit `cancel(task_id)` from a genuine stage failure
/// (spec §4.9/§5: cancellation transitions to `cancelled`, not `failed`).
fn is_cancellation(error: &PipelineError) -> bool {
    matches!(
        error,
        PipelineError::Composition(narrata_models::CompositionError::Cancelled { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_are_strictly_increasing_and_end_at_full_progress() {
        let values = [
            checkpoint::INIT,
            checkpoint::PARSING_IN,
            checkpoint::PARSING_OUT,
            checkpoint::STORYBOARDING_IN,
            checkpoint::STORYBOARDING_OUT,
            checkpoint::RENDERING_IN,
            checkpoint::RENDERING_OUT,
            checkpoint::COMPOSING_IN,
        ];
        for pair in values.windows(2) {
            assert!(pair[0] < pair[1], "{} should be < {}", pair[0], pair[1]);
        }
        assert!(*values.last().unwrap() < 100);
    }
}
