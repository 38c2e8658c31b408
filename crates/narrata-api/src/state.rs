//! Application state.

use narrata_bus::{ProgressBus, TaskRegistry};
use narrata_pipeline::{Orchestrator, PipelineConfig};
use narrata_providers::{ImageClient, ParserClient, TtsClient};

use crate::cancellation::CancellationRegistry;
use crate::config::ApiConfig;

/// Shared application state: the task registry/progress bus the handlers
/// read from, the per-task cancellation registry `cancel` fires into, plus
/// the orchestrator every `submit` hands a task to.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: TaskRegistry,
    pub bus: ProgressBus,
    pub cancellations: CancellationRegistry,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        let registry = TaskRegistry::new();
        let bus = ProgressBus::new(narrata_bus::DEFAULT_CAPACITY);
        let cancellations = CancellationRegistry::new();
        let pipeline_config = PipelineConfig::from_env();

        let parser_client = ParserClient::new(
            config.parser_endpoint.clone(),
            config.parser_api_key.clone(),
            config.parser_model.clone(),
        );
        let image_client = ImageClient::new(
            config.image_endpoint.clone(),
            config.image_api_key.clone(),
            config.image_model.clone(),
        );
        let tts_client = TtsClient::new(config.tts_endpoint.clone(), config.tts_api_key.clone());

        let orchestrator = Orchestrator::new(
            registry.clone(),
            bus.clone(),
            pipeline_config,
            parser_client,
            image_client,
            tts_client,
            config.storage_root.clone(),
        );

        Self {
            config,
            registry,
            bus,
            cancellations,
            orchestrator,
        }
    }
}
