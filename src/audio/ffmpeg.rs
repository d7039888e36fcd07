use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::interface::{ConversionError, MediaConverter};

/// Media converter backed by an `ffmpeg` child process.
///
/// The process runs outside the async worker threads and is killed if the
/// conversion future is dropped (e.g. the client went away).
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    binary: String,
}

impl FfmpegConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check that the configured binary can be executed.
    pub async fn probe(&self) -> Result<(), ConversionError> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ConversionError::Spawn)?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ConversionError::Failed {
                status: output.status.code(),
                detail: format!("{} -version exited with {}", self.binary, output.status),
            })
        }
    }

    fn command(&self, input: &Path, output: &Path, sample_rate: u32) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "-ac", "1", "-ar"])
            .arg(sample_rate.to_string())
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl MediaConverter for FfmpegConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        sample_rate: u32,
    ) -> Result<(), ConversionError> {
        info!("Converting audio to PCM: {}", output.display());

        let result = self
            .command(input, output, sample_rate)
            .output()
            .await
            .map_err(ConversionError::Spawn)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            debug!("ffmpeg stderr: {}", stderr);
            return Err(ConversionError::Failed {
                status: result.status.code(),
                detail: last_error_line(&stderr)
                    .unwrap_or_else(|| format!("ffmpeg exited with {}", result.status)),
            });
        }

        let written = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(ConversionError::EmptyOutput);
        }

        info!("Converted audio to PCM: {} ({} bytes)", output.display(), written);
        Ok(())
    }
}

fn last_error_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(|line| line.to_string())
}
