//! FFmpeg command builder and runner (spec §6: scene clip rendering, chapter
//! and final concatenation).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use narrata_models::CompositionError;

pub type MediaResult<T> = Result<T, CompositionError>;

/// One `-i` input, with any flags that must precede it (e.g. `-loop 1` or
/// `-f lavfi`).
#[derive(Debug, Clone)]
struct Input {
    flags: Vec<String>,
    source: String,
}

/// Builder for an FFmpeg invocation over one or more inputs. Unlike a single
/// `-i` wrapper, scene clip construction needs an image input and either an
/// audio input or a `lavfi` silence source (spec §6).
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    output: PathBuf,
    inputs: Vec<Input>,
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            inputs: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add an input preceded by `flags` (e.g. `["-loop", "1"]`, or `[]` for a
    /// plain input).
    pub fn input<I, S>(mut self, flags: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(Input {
            flags: flags.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];

        for input in &self.inputs {
            args.extend(input.flags.clone());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Runner for FFmpeg commands with optional timeout and cooperative
/// cancellation.
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command. `stage` labels the caller's pipeline stage for
    /// error attribution (spec §7 `CompositionError`).
    pub async fn run(&self, cmd: &FfmpegCommand, stage: &str) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| CompositionError::ToolNotFound)?;

        let args = cmd.build_args();
        debug!(stage, "running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompositionError::Io {
                stage: stage.to_string(),
                source,
            })?;

        self.wait_for_completion(stage, &mut child).await
    }

    async fn wait_for_completion(&self, stage: &str, child: &mut Child) -> MediaResult<()> {
        let mut stderr_pipe = child.stderr.take();

        let wait_future = child.wait();
        let wait_result = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), wait_future)
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(stage, timeout_secs, "ffmpeg timed out, killing process");
                    let _ = child.kill().await;
                    return Err(CompositionError::Timeout {
                        stage: stage.to_string(),
                        timeout_secs,
                    });
                }
            }
        } else {
            wait_future.await
        };

        if let Some(ref cancel_rx) = self.cancel_rx {
            if *cancel_rx.borrow() {
                info!(stage, "ffmpeg cancelled, killing process");
                let _ = child.kill().await;
                return Err(CompositionError::Cancelled {
                    stage: stage.to_string(),
                });
            }
        }

        let status = wait_result.map_err(|source| CompositionError::Io {
            stage: stage.to_string(),
            source,
        })?;

        if status.success() {
            return Ok(());
        }

        let stderr = if let Some(pipe) = stderr_pipe.take() {
            use tokio::io::AsyncReadExt;
            let mut pipe = pipe;
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf).await;
            buf
        } else {
            String::new()
        };

        Err(CompositionError::ProcessFailed {
            stage: stage.to_string(),
            stderr,
        })
    }
}

/// Locate the `ffmpeg` binary, if any.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| CompositionError::ToolNotFound)
}

/// Locate the `ffprobe` binary, if any.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| CompositionError::ToolNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_orders_flags_then_inputs_then_output() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input(["-loop", "1"], "image.png")
            .input(["-f", "lavfi"], "anullsrc=channel_layout=stereo:sample_rate=44100")
            .output_args(["-c:v", "libx264", "-shortest"]);

        let args = cmd.build_args();
        assert_eq!(
            args,
            vec![
                "-y", "-v", "error", "-loop", "1", "-i", "image.png", "-f", "lavfi", "-i",
                "anullsrc=channel_layout=stereo:sample_rate=44100", "-c:v", "libx264",
                "-shortest", "out.mp4",
            ]
        );
    }
}
