//! Job orchestration for media transcription.
//!
//! This module owns the lifecycle of one transcription job: environment
//! check, model (re)loading, the blocking engine call, cooperative
//! cancellation, artifact writing and status reporting.
//!
//! # Architecture
//!
//! ```text
//! caller ── submit / cancel / current_status ──▶ JobOrchestrator
//!                                                    │  (std Mutex: status + running flag)
//!                                                    │
//!                                  mpsc(1) Job ──────┘
//!                                                    ▼
//!                                       Worker::run()  ← persistent tokio task
//!                                                    │
//!                                                    ├─ EnvironmentProbe::check      (ffmpeg -version)
//!                                                    ├─ ModelCache::ensure           (ModelLoader on miss)
//!                                                    ├─ spawn_blocking(EngineHandle::run)
//!                                                    ├─ cancel checkpoint
//!                                                    └─ spawn_blocking(OutputWriter::write)
//!
//! StatusListener::on_status ◀── every transition, in order
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use media_transcriber::config::AppConfig;
//! use media_transcriber::output::OutputWriter;
//! use media_transcriber::pipeline::{ChannelListener, FfmpegProbe, JobOrchestrator};
//! use media_transcriber::stt::WhisperModelLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let (listener, mut updates) = ChannelListener::channel();
//!
//!     let orchestrator = JobOrchestrator::start(
//!         &tokio::runtime::Handle::current(),
//!         Arc::new(FfmpegProbe::from_config(&config.decoder)),
//!         Arc::new(WhisperModelLoader::from_config(&config)),
//!         OutputWriter::new(config.output_dir())?,
//!         Arc::new(listener),
//!     );
//!     orchestrator.submit(config.job_for("lecture.mp4"))?;
//!
//!     while let Some(update) = updates.recv().await {
//!         println!("{}: {}", update.status, update.detail);
//!         if update.is_final() {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod environment;
pub mod job;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use cache::ModelCache;
pub use environment::{EnvironmentError, EnvironmentProbe, FfmpegProbe};
pub use job::Job;
pub use runner::{CancelOutcome, JobError, JobOrchestrator};
pub use state::{ChannelListener, FailureKind, JobStatus, LogListener, StatusListener, StatusUpdate};
