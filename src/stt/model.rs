//! Model registry, metadata and path resolution.
//!
//! [`WHISPER_MODELS`] lists the GGML builds of the OpenAI Whisper checkpoints
//! that [`crate::stt::WhisperModelLoader`] knows how to fetch.  Identifiers
//! follow the names users already know from the Python tooling (`"small"`,
//! `"large-v3"`, …).
//!
//! [`ModelPaths`] resolves where a model lives on disk.

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Identifier accepted in a job (e.g. `"small"`).
    pub id: &'static str,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// File name under the models directory and in the download repository.
    pub file_name: &'static str,
    /// Approximate file size in megabytes.
    pub file_size_mb: u64,
    /// `true` for the English-only `.en` checkpoints.
    pub english_only: bool,
}

const fn model(
    id: &'static str,
    display_name: &'static str,
    file_name: &'static str,
    file_size_mb: u64,
    english_only: bool,
) -> ModelInfo {
    ModelInfo {
        id,
        display_name,
        file_name,
        file_size_mb,
        english_only,
    }
}

/// Every model identifier a job may name.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    model("tiny", "Whisper Tiny", "ggml-tiny.bin", 75, false),
    model("tiny.en", "Whisper Tiny (English)", "ggml-tiny.en.bin", 75, true),
    model("base", "Whisper Base", "ggml-base.bin", 142, false),
    model("base.en", "Whisper Base (English)", "ggml-base.en.bin", 142, true),
    model("small", "Whisper Small", "ggml-small.bin", 466, false),
    model("small.en", "Whisper Small (English)", "ggml-small.en.bin", 466, true),
    model("medium", "Whisper Medium", "ggml-medium.bin", 1_500, false),
    model("medium.en", "Whisper Medium (English)", "ggml-medium.en.bin", 1_500, true),
    model("large-v1", "Whisper Large v1", "ggml-large-v1.bin", 2_900, false),
    model("large-v2", "Whisper Large v2", "ggml-large-v2.bin", 2_900, false),
    model("large-v3", "Whisper Large v3", "ggml-large-v3.bin", 2_900, false),
];

/// Identifiers that resolve to another entry.
const ALIASES: &[(&str, &str)] = &[("large", "large-v3")];

/// Find a [`ModelInfo`] by identifier, following aliases.
///
/// ```
/// use media_transcriber::stt::find_model_by_id;
///
/// assert_eq!(find_model_by_id("large").unwrap().id, "large-v3");
/// assert!(find_model_by_id("huge").is_none());
/// ```
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    let id = ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .map(|(_, target)| *target)
        .unwrap_or(id);
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Construct directly from a models directory path.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }

    /// All registered models present on disk.
    pub fn list_local_models(&self) -> Vec<&'static ModelInfo> {
        WHISPER_MODELS
            .iter()
            .filter(|m| self.is_available(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
