//! Pre-flight check for the external audio-decoding tool.
//!
//! Every job starts by asking `ffmpeg -version`.  A missing binary is the
//! most common failure on fresh machines, so it gets its own error with
//! remediation steps instead of a bare "file not found".

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DecoderConfig;

// ---------------------------------------------------------------------------
// EnvironmentError
// ---------------------------------------------------------------------------

/// The decoding tool is not usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvironmentError {
    /// The program could not be found.
    #[error(
        "FFmpeg executable not found ({}).\n\n\
         Quick fixes:\n\
         1) Install FFmpeg and add its 'bin' folder to PATH, then restart, OR\n\
         2) Set `decoder.ffmpeg_path` in settings.toml to the full path of the ffmpeg binary.",
        .program.display()
    )]
    NotFound { program: PathBuf },

    /// The program started but reported failure.
    #[error("FFmpeg exists but failed to run. Output:\n{output}")]
    Failed { output: String },

    /// The program did not answer in time.
    #[error("FFmpeg did not answer `-version` within {secs} s")]
    Timeout { secs: u64 },

    /// The program could not be started for another reason (permissions, …).
    #[error("Could not start FFmpeg ({}): {reason}", .program.display())]
    Spawn { program: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// EnvironmentProbe trait
// ---------------------------------------------------------------------------

/// Verifies that external tools a job depends on are reachable.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    /// Returns a one-line description of the tool (its version banner).
    async fn check(&self) -> Result<String, EnvironmentError>;
}

// ---------------------------------------------------------------------------
// FfmpegProbe
// ---------------------------------------------------------------------------

/// Runs `<program> -version` with a timeout.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegProbe {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            Duration::from_secs(config.probe_timeout_secs.max(1)),
        )
    }
}

#[async_trait]
impl EnvironmentProbe for FfmpegProbe {
    async fn check(&self) -> Result<String, EnvironmentError> {
        let run = tokio::process::Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Err(_) => {
                return Err(EnvironmentError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EnvironmentError::NotFound {
                    program: self.program.clone(),
                })
            }
            Ok(Err(e)) => {
                return Err(EnvironmentError::Spawn {
                    program: self.program.clone(),
                    reason: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(EnvironmentError::Failed {
                output: format!("{stdout}{stderr}").trim().to_string(),
            });
        }

        let banner = stdout
            .lines()
            .chain(stderr.lines())
            .find(|l| !l.trim().is_empty())
            .unwrap_or("ffmpeg found")
            .trim()
            .to_string();
        log::debug!("environment: {banner}");
        Ok(banner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
