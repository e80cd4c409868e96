//! Speech-recognition engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    ModelLoader (trait)                        │
//! │                                                               │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │ ModelPaths    │   │WhisperModelLoader│   │ WhisperEngine│  │
//! │  │ - resolve     │──▶│ - download       │──▶│ (EngineHandle│  │
//! │  │ - exists?     │   │ - context init   │   │  trait)      │  │
//! │  └──────────────┘   └──────────────────┘   └──────┬───────┘  │
//! │                                                   │          │
//! │                                                   ▼          │
//! │                               ffmpeg → PCM → whisper.cpp     │
//! │                                       → TranscriptionResult  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use media_transcriber::config::AppConfig;
//! use media_transcriber::stt::{EngineHandle, EngineRequest, ModelLoader, Task, WhisperModelLoader};
//!
//! # async fn example() {
//! let loader = WhisperModelLoader::from_config(&AppConfig::default());
//! let engine = loader.load("small").await.unwrap();
//!
//! let request = EngineRequest {
//!     path: PathBuf::from("interview.mp4"),
//!     task: Task::Transcribe,
//!     language: Some("pa".into()),
//!     word_timestamps: false,
//!     fp16: false,
//! };
//! // Blocking: run it on the blocking pool in real code.
//! let result = engine.run(&request).unwrap();
//! println!("{}", result.text);
//! # }
//! ```

pub mod decode;
pub mod engine;
pub mod loader;
pub mod model;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use decode::decode_to_pcm;
pub use engine::{EngineError, EngineHandle, WhisperEngine};
pub use loader::{ModelLoadError, ModelLoader, WhisperModelLoader};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, WHISPER_MODELS};
pub use transcribe::{EngineRequest, Segment, Task, TranscriptionResult, Word};

// test-only re-export so the pipeline tests can import MockEngine directly.
#[cfg(test)]
pub use engine::MockEngine;
