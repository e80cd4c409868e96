//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! `#[serde(default)]`, so a hand-edited file only needs the keys it changes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::pipeline::Job;
use crate::stt::Task;

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Default options for new jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Model identifier (e.g. `"small"`, `"large-v3"`).
    pub model: String,
    /// Source language as an ISO-639-1 code.  `None` lets the engine detect
    /// it.
    pub language: Option<String>,
    /// Translate to English instead of transcribing.
    pub translate: bool,
    /// Collect per-word timing in the JSON artifact.
    pub word_timestamps: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "small".into(),
            language: Some("pa".into()),
            translate: false,
            word_timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelsConfig
// ---------------------------------------------------------------------------

/// Where models live and how they are fetched and run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Override for the models directory.  `None` uses the platform data dir.
    pub dir: Option<PathBuf>,
    /// Base URL that GGML file names are appended to for downloads.
    pub base_url: String,
    /// Inference threads; `0` picks automatically (at most 8).
    pub n_threads: u32,
    /// Let whisper.cpp use a GPU backend when one is compiled in.
    pub use_gpu: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            base_url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main".into(),
            n_threads: 0,
            use_gpu: false,
        }
    }
}

// ---------------------------------------------------------------------------
// DecoderConfig
// ---------------------------------------------------------------------------

/// The external `ffmpeg` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Program name or full path of `ffmpeg`.
    pub ffmpeg_path: PathBuf,
    /// Seconds to wait for `ffmpeg -version` before giving up.
    pub probe_timeout_secs: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            probe_timeout_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Override for the artifact directory.  `None` uses `./whisper_outputs`.
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use media_transcriber::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("default model: {}", config.transcription.model);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub transcription: TranscriptionConfig,
    pub models: ModelsConfig,
    pub decoder: DecoderConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Effective models directory.
    pub fn models_dir(&self) -> PathBuf {
        self.models
            .dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().models_dir)
    }

    /// Effective artifact directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().output_dir)
    }

    /// A job for `path` using the `[transcription]` defaults.
    pub fn job_for(&self, path: impl Into<PathBuf>) -> Job {
        let t = &self.transcription;
        Job {
            path: path.into(),
            model: t.model.clone(),
            language: t.language.clone(),
            task: if t.translate {
                Task::Translate
            } else {
                Task::Transcribe
            },
            word_timestamps: t.word_timestamps,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
