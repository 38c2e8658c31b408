//! Pipeline-wide tunables (spec §4.5-§4.8 default values, §6 env vars).
//! Grounded on the teacher's `WorkerConfig::from_env` idiom (env var per
//! field, sane defaults, no config file); the numeric defaults themselves
//! are grounded on the per-agent `*Config` pydantic models under
//! `original_source/agents/*/config.py`, adjusted to spec.md's own values
//! where the two disagree (e.g. `max_text_length` is spec's 100000, not
//! the source's 50000).

use std::time::Duration;

/// Tunables shared by the parser, storyboard, renderer and composer
/// stages. One struct rather than one per stage, since the orchestrator
/// threads a single config through all four (spec §4.9).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parser Stage (spec §4.5).
    pub min_text_length: usize,
    pub max_text_length: usize,
    pub chunk_size: usize,
    pub max_characters: usize,
    pub max_scenes: usize,

    /// Storyboard Stage (spec §4.6).
    pub dialogue_chars_per_second: f64,
    pub action_duration: f64,
    pub min_scene_duration: f64,
    pub max_scene_duration: f64,
    pub default_style_tags: Vec<String>,

    /// Scene Renderer (spec §4.7).
    pub retry_attempts: u32,
    pub silent_audio_duration: f64,
    pub narrator_voice_type: String,
    pub default_voice_type: String,
    pub image_size: String,
    pub tts_encoding: String,
    pub tts_speed: f64,
    pub provider_timeout: Duration,

    /// Composer (spec §4.8).
    pub compose_timeout: Duration,

    /// Task Registry (spec §4.3).
    pub task_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_text_length: 100,
            max_text_length: 100_000,
            chunk_size: 4000,
            max_characters: 10,
            max_scenes: 30,

            dialogue_chars_per_second: 3.0,
            action_duration: 1.5,
            min_scene_duration: 3.0,
            max_scene_duration: 10.0,
            default_style_tags: vec!["anime".to_string()],

            retry_attempts: 3,
            silent_audio_duration: 3.0,
            narrator_voice_type: "narrator_default".to_string(),
            default_voice_type: "adult_neutral_default".to_string(),
            image_size: "1024x1024".to_string(),
            tts_encoding: "mp3".to_string(),
            tts_speed: 1.0,
            provider_timeout: Duration::from_secs(60),

            compose_timeout: Duration::from_secs(600),

            task_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Overlay `CORE_MAX_RETRIES`/`CORE_TASK_TIMEOUT` and friends (spec
    /// §6 "Environment") onto the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("CORE_MAX_RETRIES") {
            config.retry_attempts = v;
        }
        if let Some(v) = env_parse::<u64>("CORE_TASK_TIMEOUT") {
            config.compose_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse("CORE_CHUNK_SIZE") {
            config.chunk_size = v;
        }
        if let Some(v) = env_parse("CORE_TASK_TTL_SECS") {
            config.task_ttl = Duration::from_secs(v);
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
