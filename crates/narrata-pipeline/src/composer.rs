//! Composer (spec §4.8). Grounded on `narrata_media::clip`'s per-clip
//! builder/runner pattern (`render_scene_clip`/`concat_clips`), generalized
//! from "trim an existing source video" to "loop a still image over an
//! audio track". The two-level (chapter, then final) concat structure is
//! grounded on `original_source/agents/video_composer/agent.py`.

use std::path::PathBuf;

use tokio::sync::watch;

use narrata_media::{concat_clips, render_scene_clip};
use narrata_models::{CompositionError, RenderResult, ValidationError};
use narrata_storage::{AssetKind, TaskWorkspace};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::TaskLogger;

/// Compose the final video from a completed `RenderResult` (spec §4.8
/// "compose(render_result) → {video_path, duration, file_size, ...}").
/// Returns the populated `RenderResult` with `video_path`/`duration`/
/// `file_size` filled in.
pub async fn compose(
    mut render_result: RenderResult,
    workspace: &TaskWorkspace,
    config: &PipelineConfig,
    cancel: &watch::Receiver<bool>,
    logger: &TaskLogger,
) -> PipelineResult<RenderResult> {
    validate_inputs_exist(&render_result)?;

    let timeout_secs = config.compose_timeout.as_secs();
    let mut chapter_clips = Vec::with_capacity(render_result.chapters.len());

    for chapter in &render_result.chapters {
        let mut scene_clips = Vec::with_capacity(chapter.scenes.len());
        for scene in &chapter.scenes {
            let clip_path = workspace.path(
                AssetKind::Temp,
                &format!("scene_{}_{}.mp4", scene.scene_id, uuid::Uuid::new_v4()),
            );
            let audio_path = PathBuf::from(&scene.audio_path);
            let audio_arg = if audio_path.exists() { Some(audio_path.as_path()) } else { None };

            render_scene_clip(
                std::path::Path::new(&scene.image_path),
                audio_arg,
                scene.duration,
                &clip_path,
                Some(cancel.clone()),
                timeout_secs,
            )
            .await?;
            scene_clips.push(clip_path);
        }

        let chapter_video = workspace.path(
            AssetKind::Temp,
            &format!("chapter_{}_{}.mp4", chapter.chapter_id, uuid::Uuid::new_v4()),
        );
        let list_dir = workspace.path(AssetKind::Temp, "");
        concat_clips(&scene_clips, &chapter_video, &list_dir, timeout_secs).await?;

        for clip in &scene_clips {
            let _ = tokio::fs::remove_file(clip).await;
        }
        logger.log_progress(&format!("composed chapter {}", chapter.chapter_id));
        chapter_clips.push(chapter_video);
    }

    let final_path = workspace.path(AssetKind::Videos, "final.mp4");
    let list_dir = workspace.path(AssetKind::Temp, "");
    concat_clips(&chapter_clips, &final_path, &list_dir, timeout_secs).await?;

    for clip in &chapter_clips {
        let _ = tokio::fs::remove_file(clip).await;
    }

    let duration = narrata_media::probe_duration(&final_path).await.unwrap_or(0.0);
    let file_size = tokio::fs::metadata(&final_path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    render_result.video_path = Some(final_path.display().to_string());
    render_result.duration = Some(duration);
    render_result.file_size = Some(file_size);

    logger.log_completion(&format!("final video at {}", final_path.display()));
    Ok(render_result)
}

/// Every `RenderedScene.image_path` must exist at compose time, otherwise
/// `ValidationError` (spec §4.8 "Preconditions"). Missing audio is
/// tolerated: the per-scene clip command substitutes `anullsrc`.
fn validate_inputs_exist(render_result: &RenderResult) -> PipelineResult<()> {
    for chapter in &render_result.chapters {
        for scene in &chapter.scenes {
            if !std::path::Path::new(&scene.image_path).exists() {
                return Err(ValidationError::new(format!(
                    "scene {} of chapter {}: missing image at {}",
                    scene.scene_id, chapter.chapter_id, scene.image_path
                ))
                .into());
            }
        }
    }
    if render_result.chapters.is_empty() {
        return Err(CompositionError::Validation("no chapters to compose".to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrata_models::RenderedChapter;
    use narrata_models::RenderedScene;

    fn scene(image_path: &str) -> RenderedScene {
        RenderedScene {
            scene_id: 1,
            chapter_id: 1,
            image_path: image_path.to_string(),
            audio_path: "/nonexistent/audio.mp3".to_string(),
            duration: 3.0,
            audio_duration: 2.0,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn validate_inputs_rejects_missing_image() {
        let render_result = RenderResult::new(vec![RenderedChapter {
            chapter_id: 1,
            title: String::new(),
            scenes: vec![scene("/nonexistent/image.png")],
        }]);
        assert!(validate_inputs_exist(&render_result).is_err());
    }

    #[test]
    fn validate_inputs_rejects_empty_chapters() {
        let render_result = RenderResult::new(vec![]);
        assert!(validate_inputs_exist(&render_result).is_err());
    }

    #[tokio::test]
    async fn validate_inputs_accepts_existing_image() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let render_result = RenderResult::new(vec![RenderedChapter {
            chapter_id: 1,
            title: String::new(),
            scenes: vec![scene(tmp.path().to_str().unwrap())],
        }]);
        assert!(validate_inputs_exist(&render_result).is_ok());
    }
}
