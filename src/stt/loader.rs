//! Turning a model identifier into a ready [`EngineHandle`].
//!
//! [`ModelLoader`] is the seam the model cache loads through.
//! [`WhisperModelLoader`] resolves the identifier against the registry,
//! downloads the GGML file on first use and builds a [`WhisperEngine`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use whisper_rs::{WhisperContext, WhisperContextParameters};

use crate::config::AppConfig;
use crate::stt::engine::{EngineHandle, WhisperEngine};
use crate::stt::model::{find_model_by_id, ModelInfo, ModelPaths};
use crate::stt::transcribe::optimal_threads;

// ---------------------------------------------------------------------------
// ModelLoadError
// ---------------------------------------------------------------------------

/// Loading (or downloading) a model failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Failed to load model '{model}': {reason}")]
pub struct ModelLoadError {
    /// The identifier that was requested.
    pub model: String,
    /// Underlying cause.
    pub reason: String,
}

impl ModelLoadError {
    pub fn new(model: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ModelLoader trait
// ---------------------------------------------------------------------------

/// Produces engine handles from model identifiers.
///
/// Loading may be slow and may hit the network; it is awaited on the
/// worker, never on the caller's thread.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn EngineHandle>, ModelLoadError>;
}

// ---------------------------------------------------------------------------
// WhisperModelLoader
// ---------------------------------------------------------------------------

/// Loads whisper.cpp GGML models, downloading them when missing.
#[derive(Debug, Clone)]
pub struct WhisperModelLoader {
    paths: ModelPaths,
    base_url: String,
    ffmpeg: PathBuf,
    n_threads: i32,
    use_gpu: bool,
    client: reqwest::Client,
}

impl WhisperModelLoader {
    pub fn new(paths: ModelPaths, base_url: impl Into<String>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            paths,
            base_url: base_url.into(),
            ffmpeg: ffmpeg.into(),
            n_threads: optimal_threads(),
            use_gpu: false,
            client: reqwest::Client::new(),
        }
    }

    /// Build a loader from the `[models]` and `[decoder]` config sections.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut loader = Self::new(
            ModelPaths::new(config.models_dir()),
            config.models.base_url.clone(),
            config.decoder.ffmpeg_path.clone(),
        );
        if config.models.n_threads > 0 {
            loader.n_threads = config.models.n_threads.min(i32::MAX as u32) as i32;
        }
        loader.use_gpu = config.models.use_gpu;
        loader
    }

    /// Where `model` lives (or will live) on disk.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.paths.model_path(model)
    }

    fn download_url(&self, model: &ModelInfo) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), model.file_name)
    }

    /// Fetch `model` into `dest` via a `.part` file so an interrupted
    /// download never looks like a finished one.
    async fn download(&self, model: &ModelInfo, dest: &Path) -> Result<(), String> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
        }

        let url = self.download_url(model);
        log::info!(
            "model-loader: downloading {} (~{} MB) from {url}",
            model.file_name,
            model.file_size_mb
        );

        let part = dest.with_extension("bin.part");
        let result = self.fetch_to(&url, &part).await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| format!("cannot move download into place: {e}"))
    }

    async fn fetch_to(&self, url: &str, part: &Path) -> Result<(), String> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("download failed: {e}"))?;

        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| format!("cannot create {}: {e}", part.display()))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| format!("download interrupted: {e}"))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write failed: {e}"))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| format!("write failed: {e}"))?;

        log::info!("model-loader: downloaded {written} bytes");
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for WhisperModelLoader {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn EngineHandle>, ModelLoadError> {
        let model = find_model_by_id(model_id)
            .ok_or_else(|| ModelLoadError::new(model_id, "unknown model identifier"))?;

        let path = self.model_path(model);
        if !self.paths.is_available(model) {
            self.download(model, &path)
                .await
                .map_err(|reason| ModelLoadError::new(model_id, reason))?;
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| {
                ModelLoadError::new(
                    model_id,
                    format!("model path contains non-UTF-8 characters: {}", path.display()),
                )
            })?
            .to_string();

        let use_gpu = self.use_gpu;
        log::info!("model-loader: loading {} from {}", model.id, path.display());
        let ctx = tokio::task::spawn_blocking(move || {
            let mut ctx_params = WhisperContextParameters::default();
            ctx_params.use_gpu = use_gpu;
            WhisperContext::new_with_params(&path_str, ctx_params)
        })
        .await
        .map_err(|e| ModelLoadError::new(model_id, format!("loader task failed: {e}")))?
        .map_err(|e| ModelLoadError::new(model_id, format!("whisper context init: {e}")))?;

        Ok(Arc::new(WhisperEngine::new(
            model_id,
            ctx,
            self.ffmpeg.clone(),
            self.n_threads,
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(dir: &Path, base_url: &str) -> WhisperModelLoader {
        WhisperModelLoader::new(ModelPaths::new(dir), base_url, "ffmpeg")
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path(), "http://127.0.0.1:9")
            .load("gigantic")
            .await
            .err()
            .unwrap();
        assert_eq!(err.model, "gigantic");
        assert!(err.reason.contains("unknown"));
    }

    #[tokio::test]
    async fn failed_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // Port 9 (discard) is closed on test machines; the connect fails fast.
        let err = loader(dir.path(), "http://127.0.0.1:9")
            .load("tiny")
            .await
            .err()
            .unwrap();
        assert!(err.reason.contains("download"), "got: {err}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn corrupt_model_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ggml-tiny.bin"), b"not a model").unwrap();

        let err = loader(dir.path(), "http://127.0.0.1:9")
            .load("tiny")
            .await
            .err()
            .unwrap();
        assert!(err.reason.contains("whisper context"), "got: {err}");
    }

    #[test]
    fn download_url_joins_cleanly() {
        let l = loader(Path::new("/models"), "https://example.com/repo/");
        let m = find_model_by_id("base").unwrap();
        assert_eq!(l.download_url(m), "https://example.com/repo/ggml-base.bin");
    }

    #[test]
    fn error_display_names_model() {
        let e = ModelLoadError::new("small", "disk full");
        assert_eq!(e.to_string(), "Failed to load model 'small': disk full");
    }
}
