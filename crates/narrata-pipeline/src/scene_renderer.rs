//! Scene Renderer (spec §4.7). Grounded on `clip_pipeline/scene.rs`'s
//! `join_all`-per-scene-items pattern (generalized from N styles to exactly
//! 2 futures: image + audio) and `clip_pipeline/mod.rs`'s
//! sequential-across-groups loop; retries via `crate::retry`
//! (`RetryConfig`/`retry_async`, reused with `base_delay = 1s` to match the
//! literal `2^attempt` second backoff). Silent-audio fallback and duration
//! reconciliation are grounded on `narrata_media::clip`/`probe`.

use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use narrata_media::{FfmpegCommand, FfmpegRunner};
use narrata_models::{
    CompositionError, GenerationError, RenderResult, RenderedChapter, RenderedScene,
    StoryboardResult, StoryboardScene, SynthesisError,
};
use narrata_providers::{ImageClient, TtsClient};
use narrata_storage::{AssetKind, TaskWorkspace};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::TaskLogger;
use crate::retry::{retry_async, RetryConfig, RetryResult};
use crate::voice::VoiceCache;

/// Render every scene of `storyboard` to an image + audio pair on disk
/// (spec §4.7 "render(storyboard) → RenderResult"). Scenes within a
/// chapter, and chapters within the storyboard, are rendered sequentially;
/// within one scene, image and audio generation run concurrently.
pub async fn render(
    storyboard: &StoryboardResult,
    workspace: &TaskWorkspace,
    image_client: &ImageClient,
    tts_client: &TtsClient,
    config: &PipelineConfig,
    cancel: &watch::Receiver<bool>,
    logger: &TaskLogger,
) -> PipelineResult<RenderResult> {
    let mut voice_cache = VoiceCache::new();
    let mut rendered_chapters = Vec::with_capacity(storyboard.chapters.len());

    for chapter in &storyboard.chapters {
        check_cancelled(cancel)?;

        let mut rendered_scenes = Vec::with_capacity(chapter.scenes.len());
        for scene in &chapter.scenes {
            check_cancelled(cancel)?;
            let rendered = render_one_scene(
                scene,
                workspace,
                image_client,
                tts_client,
                config,
                cancel,
                &mut voice_cache,
            )
            .await?;
            logger.log_progress(&format!(
                "rendered scene {} of chapter {}",
                scene.scene_id, chapter.chapter_id
            ));
            rendered_scenes.push(rendered);
        }

        rendered_chapters.push(RenderedChapter {
            chapter_id: chapter.chapter_id,
            title: chapter.title.clone(),
            scenes: rendered_scenes,
        });
    }

    Ok(RenderResult::new(rendered_chapters))
}

async fn render_one_scene(
    scene: &StoryboardScene,
    workspace: &TaskWorkspace,
    image_client: &ImageClient,
    tts_client: &TtsClient,
    config: &PipelineConfig,
    cancel: &watch::Receiver<bool>,
    voice_cache: &mut VoiceCache,
) -> PipelineResult<RenderedScene> {
    let uuid = Uuid::new_v4();
    let image_name = format!("scene_{}_{}_{}.png", scene.chapter_id, scene.scene_id, uuid);
    let audio_name = format!("audio_{}_{}_{}.mp3", scene.chapter_id, scene.scene_id, uuid);

    let voice_type = speaker_voice(scene, config, voice_cache);

    let image_fut = generate_image(scene, image_client, config, cancel);
    let audio_fut = generate_audio(scene, &voice_type, tts_client, config, cancel);
    let (image_bytes, audio_bytes) = tokio::try_join!(image_fut, audio_fut)?;

    let image_path = workspace.write(AssetKind::Images, &image_name, &image_bytes).await?;

    let audio_path = match audio_bytes {
        Some(bytes) => workspace.write(AssetKind::Audio, &audio_name, &bytes).await?,
        None => {
            let path = workspace.path(AssetKind::Audio, &audio_name);
            generate_silence(&path, config.silent_audio_duration, cancel).await?;
            path
        }
    };

    let audio_duration = narrata_media::probe_duration(&audio_path)
        .await
        .unwrap_or(3.0);
    let duration = scene.duration.max(audio_duration);

    Ok(RenderedScene {
        scene_id: scene.scene_id,
        chapter_id: scene.chapter_id,
        image_path: image_path.display().to_string(),
        audio_path: audio_path.display().to_string(),
        duration,
        audio_duration,
        metadata: serde_json::Value::Null,
    })
}

/// Narration is always voiced by `narrator_voice_type` (spec §4.7 step 1);
/// dialogue is voiced via the per-task `VoiceCache` keyed by speaker name.
fn speaker_voice(scene: &StoryboardScene, config: &PipelineConfig, cache: &mut VoiceCache) -> String {
    if scene.audio.speaker == "narrator" {
        return config.narrator_voice_type.clone();
    }
    match scene.characters.iter().find(|c| c.name == scene.audio.speaker) {
        Some(character) => cache.voice_for(character, &config.default_voice_type),
        None => config.default_voice_type.clone(),
    }
}

async fn generate_image(
    scene: &StoryboardScene,
    client: &ImageClient,
    config: &PipelineConfig,
    cancel: &watch::Receiver<bool>,
) -> PipelineResult<Vec<u8>> {
    let retry_config = RetryConfig::new(format!("image:{}", scene.scene_id))
        .with_max_retries(config.retry_attempts)
        .with_base_delay(Duration::from_secs(1));

    let result = with_cancellation(
        cancel,
        "image_generation",
        retry_async(&retry_config, || async {
            client.generate(&scene.image.prompt, &config.image_size, None).await
        }),
    )
    .await?;

    match result {
        RetryResult::Success(bytes) => Ok(bytes),
        RetryResult::Failed { error, .. } => {
            Err(PipelineError::from(GenerationError(error.to_string())))
        }
    }
}

async fn generate_audio(
    scene: &StoryboardScene,
    voice_type: &str,
    client: &TtsClient,
    config: &PipelineConfig,
    cancel: &watch::Receiver<bool>,
) -> PipelineResult<Option<Vec<u8>>> {
    if scene.audio.text.trim().is_empty() {
        return Ok(None);
    }

    let retry_config = RetryConfig::new(format!("audio:{}", scene.scene_id))
        .with_max_retries(config.retry_attempts)
        .with_base_delay(Duration::from_secs(1));

    let result = with_cancellation(
        cancel,
        "speech_synthesis",
        retry_async(&retry_config, || async {
            client
                .speak(&scene.audio.text, voice_type, &config.tts_encoding, config.tts_speed)
                .await
        }),
    )
    .await?;

    match result {
        RetryResult::Success(bytes) => Ok(Some(bytes)),
        RetryResult::Failed { error, .. } => {
            Err(PipelineError::from(SynthesisError(error.to_string())))
        }
    }
}

/// Race `fut` against the cancellation token so an in-flight provider call
/// is abandoned within the stage's cancellation bound rather than run to
/// completion (spec §4.9 "honor cancellation within ≤ 5s"). A closed
/// channel (every `watch::Sender` dropped) means cancellation can never be
/// signaled, not that it already has been — that arm keeps waiting on `fut`
/// instead of short-circuiting.
async fn with_cancellation<T>(
    cancel: &watch::Receiver<bool>,
    stage: &str,
    fut: impl std::future::Future<Output = T>,
) -> PipelineResult<T> {
    let mut cancel = cancel.clone();
    if *cancel.borrow() {
        return Err(cancelled(stage));
    }
    tokio::pin!(fut);
    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return Err(cancelled(stage)),
                Ok(()) => continue,
                Err(_) => return Ok(fut.await),
            },
            result = &mut fut => return Ok(result),
        }
    }
}

fn check_cancelled(cancel: &watch::Receiver<bool>) -> PipelineResult<()> {
    if *cancel.borrow() {
        return Err(cancelled("scene_renderer"));
    }
    Ok(())
}

fn cancelled(stage: &str) -> PipelineError {
    CompositionError::Cancelled {
        stage: stage.to_string(),
    }
    .into()
}

/// Generate `duration` seconds of digital silence at `path` via the
/// `anullsrc` filter, mp3 container (spec §4.7 "Empty speech").
async fn generate_silence(
    path: &std::path::Path,
    duration: f64,
    cancel: &watch::Receiver<bool>,
) -> PipelineResult<()> {
    let cmd = FfmpegCommand::new(path)
        .input(
            ["-f", "lavfi"],
            "anullsrc=channel_layout=stereo:sample_rate=44100",
        )
        .output_args(["-t", &format!("{duration:.1}"), "-c:a", "libmp3lame"]);

    let runner = FfmpegRunner::new().with_cancel(cancel.clone()).with_timeout(30);
    runner.run(&cmd, "silent_audio").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrata_models::{AudioContentType, AudioInfo, CharacterRenderInfo, ImageRenderInfo};

    fn dialogue_scene(speaker_name: &str, text: &str) -> StoryboardScene {
        StoryboardScene {
            scene_id: 1,
            chapter_id: 1,
            location: String::new(),
            time: String::new(),
            atmosphere: String::new(),
            description: String::new(),
            characters: vec![CharacterRenderInfo {
                name: speaker_name.to_string(),
                gender: "female".to_string(),
                age: Some(20),
                ..Default::default()
            }],
            audio: AudioInfo {
                content_type: AudioContentType::Dialogue,
                speaker: speaker_name.to_string(),
                text: text.to_string(),
                estimated_duration: 0.0,
            },
            image: ImageRenderInfo::default(),
            duration: 3.0,
        }
    }

    #[test]
    fn speaker_voice_uses_narrator_type_for_narration() {
        let mut scene = dialogue_scene("Rin", "hi");
        scene.audio.speaker = "narrator".to_string();
        let config = PipelineConfig::default();
        let mut cache = VoiceCache::new();
        assert_eq!(speaker_voice(&scene, &config, &mut cache), config.narrator_voice_type);
    }

    #[test]
    fn speaker_voice_resolves_dialogue_character_via_cache() {
        let scene = dialogue_scene("Rin", "hi");
        let config = PipelineConfig::default();
        let mut cache = VoiceCache::new();
        let voice = speaker_voice(&scene, &config, &mut cache);
        assert_eq!(voice, "female_young_01");
    }

    #[tokio::test]
    async fn check_cancelled_errors_once_flag_is_set() {
        let (tx, rx) = watch::channel(false);
        assert!(check_cancelled(&rx).is_ok());
        tx.send(true).unwrap();
        assert!(check_cancelled(&rx).is_err());
    }

    #[tokio::test]
    async fn with_cancellation_awaits_future_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let result = with_cancellation(&rx, "test", async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn with_cancellation_errors_once_signaled() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let result = with_cancellation(&rx, "test", async { 42 }).await;
        assert!(result.is_err());
    }
}
