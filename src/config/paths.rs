//! Where settings, models and artifacts live on disk.
//!
//! ```text
//! <config dir>/media-transcriber/settings.toml     (dirs::config_dir)
//! <data dir>/media-transcriber/models/ggml-*.bin   (dirs::data_local_dir)
//! <cwd>/whisper_outputs/{base}.txt|json|srt
//! ```
//!
//! Each location can be overridden from `settings.toml`; see
//! [`AppConfig::models_dir`](super::AppConfig::models_dir) and
//! [`AppConfig::output_dir`](super::AppConfig::output_dir).

use std::path::{Path, PathBuf};

const APP_NAME: &str = "media-transcriber";
const SETTINGS_FILE: &str = "settings.toml";
const MODELS_DIR: &str = "models";
const OUTPUT_DIR: &str = "whisper_outputs";

/// Default locations, resolved once per call to [`AppPaths::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// `settings.toml` inside `config_dir`.
    pub settings_file: PathBuf,
    /// Downloaded GGML model files.
    pub models_dir: PathBuf,
    /// Transcription artifacts, relative to the working directory.
    pub output_dir: PathBuf,
}

impl AppPaths {
    /// Platform defaults.  A platform without a standard config or data
    /// directory falls back to `.`.
    pub fn new() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::under(
            &dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")),
            &dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")),
            &cwd,
        )
    }

    /// Lay the application out under explicit base directories.
    pub fn under(config_base: &Path, data_base: &Path, work_dir: &Path) -> Self {
        let config_dir = config_base.join(APP_NAME);
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
            models_dir: data_base.join(APP_NAME).join(MODELS_DIR),
            output_dir: work_dir.join(OUTPUT_DIR),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_explicit_bases() {
        let paths = AppPaths::under(Path::new("/cfg"), Path::new("/data"), Path::new("/work"));
        assert_eq!(paths.config_dir, PathBuf::from("/cfg/media-transcriber"));
        assert_eq!(
            paths.settings_file,
            PathBuf::from("/cfg/media-transcriber/settings.toml")
        );
        assert_eq!(paths.models_dir, PathBuf::from("/data/media-transcriber/models"));
        assert_eq!(paths.output_dir, PathBuf::from("/work/whisper_outputs"));
    }

    #[test]
    fn platform_defaults_keep_file_names() {
        let paths = AppPaths::new();
        assert!(paths.settings_file.ends_with("media-transcriber/settings.toml"));
        assert!(paths.models_dir.ends_with("models"));
        assert!(paths.output_dir.ends_with("whisper_outputs"));
    }
}
