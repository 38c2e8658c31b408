//! Scene clip construction and concatenation (spec §4.8 "Composer", spec §6
//! wire-level ffmpeg invocations).

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::watch;

use narrata_models::CompositionError;

use crate::command::{FfmpegCommand, FfmpegRunner, MediaResult};

/// Build a single scene clip: loop `image` for `duration` seconds, muxed
/// with `audio` if present, or with digital silence otherwise (spec §6
/// scene clip command: `-c:v libx264 -preset medium -tune stillimage -c:a
/// aac -b:a 192k -pix_fmt yuv420p -shortest -t <duration>`).
pub async fn render_scene_clip(
    image: &Path,
    audio: Option<&Path>,
    duration: f64,
    output: &Path,
    cancel: Option<watch::Receiver<bool>>,
    timeout_secs: u64,
) -> MediaResult<()> {
    if !image.exists() {
        return Err(CompositionError::MissingInput {
            stage: "scene_clip".to_string(),
            path: image.display().to_string(),
        });
    }

    let mut cmd =
        FfmpegCommand::new(output).input(["-loop", "1"], image.to_string_lossy().to_string());

    cmd = match audio.filter(|a| a.exists()) {
        Some(audio) => cmd.input::<[&str; 0], &str>([], audio.to_string_lossy().to_string()),
        None => cmd.input(
            ["-f", "lavfi"],
            "anullsrc=channel_layout=stereo:sample_rate=44100",
        ),
    };

    let cmd = cmd
        .output_args([
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-tune",
            "stillimage",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-pix_fmt",
            "yuv420p",
            "-shortest",
            "-t",
        ])
        .output_arg(format!("{duration:.1}"));

    let mut runner = FfmpegRunner::new().with_timeout(timeout_secs);
    if let Some(rx) = cancel {
        runner = runner.with_cancel(rx);
    }
    runner.run(&cmd, "scene_clip").await
}

/// Concatenate clips via the ffmpeg concat demuxer (spec §4.8 chapter and
/// final concatenation: `-f concat -safe 0 -i <list> -c copy`). Scene clips
/// share identical encoding settings, so a stream copy is lossless.
pub async fn concat_clips(
    clips: &[PathBuf],
    output: &Path,
    list_dir: &Path,
    timeout_secs: u64,
) -> MediaResult<()> {
    if clips.is_empty() {
        return Err(CompositionError::Validation(
            "concat_clips called with no inputs".to_string(),
        ));
    }

    let list_path = list_dir.join(format!("{}.txt", uuid::Uuid::new_v4()));
    let mut body = String::new();
    for clip in clips {
        if !clip.exists() {
            return Err(CompositionError::MissingInput {
                stage: "concat".to_string(),
                path: clip.display().to_string(),
            });
        }
        body.push_str("file '");
        body.push_str(&escape_concat_path(clip));
        body.push_str("'\n");
    }

    fs::write(&list_path, body)
        .await
        .map_err(|source| CompositionError::Io {
            stage: "concat".to_string(),
            source,
        })?;

    let cmd = FfmpegCommand::new(output)
        .input(
            ["-f", "concat", "-safe", "0"],
            list_path.to_string_lossy().to_string(),
        )
        .output_args(["-c", "copy"]);

    let result = FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd, "concat")
        .await;

    let _ = fs::remove_file(&list_path).await;
    result
}

/// Escape a path for a concat-demuxer list entry: single quotes are doubled
/// per the demuxer's own quoting rule (`'` -> `'\''`).
fn escape_concat_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_single_quotes_in_concat_paths() {
        let path = Path::new("/tmp/scene's clip.mp4");
        assert_eq!(escape_concat_path(path), "/tmp/scene'\\''s clip.mp4");
    }

    #[tokio::test]
    async fn concat_rejects_empty_input_list() {
        let result = concat_clips(&[], Path::new("/tmp/out.mp4"), Path::new("/tmp"), 30).await;
        assert!(matches!(result, Err(CompositionError::Validation(_))));
    }

    #[tokio::test]
    async fn scene_clip_rejects_missing_image() {
        let result = render_scene_clip(
            Path::new("/nonexistent/image.png"),
            None,
            3.0,
            Path::new("/tmp/scene.mp4"),
            None,
            30,
        )
        .await;
        assert!(matches!(result, Err(CompositionError::MissingInput { .. })));
    }
}
