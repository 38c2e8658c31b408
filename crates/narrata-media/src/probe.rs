//! FFprobe duration queries (spec §4.7: "reconcile against the audio file's
//! actual duration"; spec §6: `ffprobe -show_format` only, no stream probing
//! is needed since only `format.duration` is consumed).

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use narrata_models::CompositionError;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file's duration in seconds.
pub async fn probe_duration(path: impl AsRef<Path>) -> Result<f64, CompositionError> {
    let path = path.as_ref();

    which::which("ffprobe").map_err(|_| CompositionError::ToolNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| CompositionError::Io {
            stage: "probe".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CompositionError::ProcessFailed {
            stage: "probe".to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let probe: FfprobeOutput =
        serde_json::from_slice(&output.stdout).map_err(|e| CompositionError::ProcessFailed {
            stage: "probe".to_string(),
            stderr: format!("unparseable ffprobe output: {e}"),
        })?;

    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| CompositionError::ProcessFailed {
            stage: "probe".to_string(),
            stderr: "ffprobe output missing format.duration".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_surfaces_an_error() {
        let result = probe_duration("/nonexistent/path/does-not-exist.wav").await;
        assert!(result.is_err());
    }
}
