//! Job orchestrator: single-flight lifecycle of one transcription job.
//!
//! [`JobOrchestrator`] is the control surface (submit / cancel / status).
//! It never blocks: every call takes one short `std::sync::Mutex` and
//! returns.  The actual work runs on a persistent worker task that receives
//! jobs over a capacity-1 `tokio::sync::mpsc` channel.
//!
//! # Job flow
//!
//! ```text
//! submit(job)
//!   └─▶ [CheckingEnvironment] probe.check()             ── Err → Failed(Environment)
//!         └─▶ [LoadingModel]   cache.ensure(model)       ── Err → Failed(ModelLoad)
//!               └─▶ [Processing] spawn_blocking(engine.run)  ── Err/panic → Failed(Engine)
//!                     └─▶ cancel flag set?  ── yes → Canceled (nothing written)
//!                           └─▶ spawn_blocking(writer.write)  ── Err → Failed(Write)
//!                                 └─▶ Done
//! ```
//!
//! Cancellation is cooperative: the engine call cannot be interrupted, so
//! the flag is only honoured at the checkpoint after it returns.
//!
//! A panic anywhere in a job (environment check, model load, listener) is caught
//! on the worker and reported as `Failed` with the kind of the step that
//! was running, so the orchestrator is free for the next job.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::output::{ArtifactSet, OutputWriter, WriteError};
use crate::stt::{EngineError, ModelLoadError, ModelLoader};

use super::cache::ModelCache;
use super::environment::{EnvironmentError, EnvironmentProbe};
use super::job::Job;
use super::state::{FailureKind, JobStatus, StatusListener, StatusUpdate};

// ---------------------------------------------------------------------------
// JobError
// ---------------------------------------------------------------------------

/// Errors surfaced by the orchestrator.
///
/// `Busy` and `WorkerStopped` are returned synchronously from
/// [`JobOrchestrator::submit`]; the remaining variants end a job and are
/// reported through the status listener.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("A transcription is already in progress. Please wait or cancel.")]
    Busy,

    #[error("The transcription worker is not running")]
    WorkerStopped,

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Code running during the `kind` step panicked.
    #[error("Internal error ({kind}): {message}")]
    Panicked { kind: FailureKind, message: String },
}

impl JobError {
    /// The failure this error ends a job with; `None` for submission errors.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            JobError::Busy | JobError::WorkerStopped => None,
            JobError::Environment(_) => Some(FailureKind::Environment),
            JobError::ModelLoad(_) => Some(FailureKind::ModelLoad),
            JobError::Engine(_) => Some(FailureKind::Engine),
            JobError::Write(_) => Some(FailureKind::Write),
            JobError::Panicked { kind, .. } => Some(*kind),
        }
    }
}

/// Result of [`JobOrchestrator::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A job is running; it will end `Canceled` at its next checkpoint.
    Acknowledged,
    /// Nothing was running.
    Ignored,
}

// ---------------------------------------------------------------------------
// Shared control state
// ---------------------------------------------------------------------------

struct Control {
    current: StatusUpdate,
    running: bool,
}

struct Shared {
    control: Mutex<Control>,
    cancel: Arc<AtomicBool>,
    listener: Arc<dyn StatusListener>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a transition and notify the listener.  The caller holds the
    /// lock, so listeners observe transitions in the order they happen.
    fn publish(&self, control: &mut Control, status: JobStatus, detail: String) {
        control.current = StatusUpdate {
            status,
            detail,
            running: control.running,
        };
        self.listener.on_status(&control.current);
    }
}

// ---------------------------------------------------------------------------
// JobOrchestrator
// ---------------------------------------------------------------------------

/// Accepts at most one job at a time and reports its progress.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use media_transcriber::config::AppConfig;
/// use media_transcriber::output::OutputWriter;
/// use media_transcriber::pipeline::{FfmpegProbe, JobOrchestrator, LogListener};
/// use media_transcriber::stt::WhisperModelLoader;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let orchestrator = JobOrchestrator::start(
///     &tokio::runtime::Handle::current(),
///     Arc::new(FfmpegProbe::from_config(&config.decoder)),
///     Arc::new(WhisperModelLoader::from_config(&config)),
///     OutputWriter::new(config.output_dir())?,
///     Arc::new(LogListener),
/// );
/// orchestrator.submit(config.job_for("interview.mp3"))?;
/// # Ok(())
/// # }
/// ```
pub struct JobOrchestrator {
    shared: Arc<Shared>,
    jobs: mpsc::Sender<Job>,
    output_dir: PathBuf,
}

impl JobOrchestrator {
    /// Spawn the worker on `runtime` and return the control handle.
    ///
    /// The worker lives until the orchestrator is dropped (or the runtime
    /// shuts down).
    pub fn start(
        runtime: &Handle,
        probe: Arc<dyn EnvironmentProbe>,
        loader: Arc<dyn ModelLoader>,
        writer: OutputWriter,
        listener: Arc<dyn StatusListener>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                current: StatusUpdate::idle(),
                running: false,
            }),
            cancel: Arc::new(AtomicBool::new(false)),
            listener,
        });
        let output_dir = writer.dir().to_path_buf();

        let worker = Worker {
            shared: Arc::clone(&shared),
            probe,
            cache: ModelCache::new(loader),
            writer: Arc::new(writer),
            step: FailureKind::Environment,
        };
        runtime.spawn(worker.run(rx));
        log::info!("pipeline: worker started, output dir {}", output_dir.display());

        Self {
            shared,
            jobs: tx,
            output_dir,
        }
    }

    /// Hand `job` to the worker.
    ///
    /// Returns [`JobError::Busy`] while another job is running; submissions
    /// are never queued.
    pub fn submit(&self, job: Job) -> Result<(), JobError> {
        let mut control = self.shared.lock();
        if control.running {
            log::warn!("pipeline: rejected {}: busy", job.path.display());
            return Err(JobError::Busy);
        }

        let previous = control.current.clone();
        control.running = true;
        self.shared.cancel.store(false, Ordering::SeqCst);
        let detail = format!("Checking FFmpeg before processing {}…", job.path.display());

        match self.jobs.try_send(job) {
            Ok(()) => {
                self.shared
                    .publish(&mut control, JobStatus::CheckingEnvironment, detail);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                log::error!("pipeline: worker is gone, job dropped");
                control.running = false;
                self.shared.publish(
                    &mut control,
                    JobStatus::Idle,
                    "Worker stopped. No job can run.".into(),
                );
                Err(JobError::WorkerStopped)
            }
            Err(TrySendError::Full(_)) => {
                // The worker always takes its job before `running` clears.
                control.running = false;
                control.current = previous;
                Err(JobError::Busy)
            }
        }
    }

    /// Request cancellation of the running job.
    ///
    /// The engine step is not interrupted; its result is discarded once it
    /// returns and no artifacts are written.
    pub fn cancel(&self) -> CancelOutcome {
        let mut control = self.shared.lock();
        if !control.running {
            return CancelOutcome::Ignored;
        }
        if !self.shared.cancel.swap(true, Ordering::SeqCst) {
            log::info!("pipeline: cancel requested");
            self.shared.publish(
                &mut control,
                JobStatus::Canceled,
                "Cancel requested… the current step will finish, then its result is discarded."
                    .into(),
            );
        }
        CancelOutcome::Acknowledged
    }

    /// Latest published status.
    pub fn current_status(&self) -> StatusUpdate {
        self.shared.lock().current.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Directory artifacts are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

enum Outcome {
    Done(ArtifactSet),
    Canceled,
}

struct Worker {
    shared: Arc<Shared>,
    probe: Arc<dyn EnvironmentProbe>,
    cache: ModelCache,
    writer: Arc<OutputWriter>,
    /// Step the current job is in, for attributing a panic.
    step: FailureKind,
}

impl Worker {
    async fn run(mut self, mut jobs: mpsc::Receiver<Job>) {
        while let Some(job) = jobs.recv().await {
            log::info!(
                "pipeline: job started: {} (model={}, task={})",
                job.path.display(),
                job.model,
                job.task
            );
            self.step = FailureKind::Environment;
            let outcome = match AssertUnwindSafe(self.execute(&job)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => Err(JobError::Panicked {
                    kind: self.step,
                    message: panic_message(payload.as_ref()),
                }),
            };
            self.finish(outcome);
        }

        self.cache.clear();
        log::info!("pipeline: job channel closed, worker shutting down");
    }

    async fn execute(&mut self, job: &Job) -> Result<Outcome, JobError> {
        // ── 1. Environment ───────────────────────────────────────────────
        self.step = FailureKind::Environment;
        let version = self.probe.check().await?;
        log::info!("pipeline: {version}");

        // ── 2. Model ─────────────────────────────────────────────────────
        let detail = if self.cache.is_loaded(&job.model) {
            format!("Model '{}' already loaded.", job.model)
        } else {
            format!("Loading model '{}' (first use downloads it)…", job.model)
        };
        self.step = FailureKind::ModelLoad;
        self.advance(JobStatus::LoadingModel, detail);
        let engine = self.cache.ensure(&job.model).await?;

        // ── 3. Engine (blocking, not interruptible) ──────────────────────
        self.step = FailureKind::Engine;
        self.advance(
            JobStatus::Processing,
            format!(
                "Processing {} (task={}, language={}, word timestamps={})…",
                job.path.display(),
                job.task,
                job.language.as_deref().unwrap_or("auto"),
                if job.word_timestamps { "on" } else { "off" }
            ),
        );
        let request = job.engine_request();
        let result = tokio::task::spawn_blocking(move || engine.run(&request))
            .await
            .map_err(|e| EngineError::Crashed(e.to_string()))??;
        log::debug!(
            "pipeline: engine returned {} segment(s), language={:?}",
            result.segments.len(),
            result.language
        );

        // ── 4. Cancellation checkpoint ───────────────────────────────────
        if self.shared.cancel.load(Ordering::SeqCst) {
            log::info!("pipeline: canceled, discarding result for {}", job.path.display());
            return Ok(Outcome::Canceled);
        }

        // ── 5. Artifacts ─────────────────────────────────────────────────
        self.step = FailureKind::Write;
        let writer = Arc::clone(&self.writer);
        let base = job.base_name();
        let set = tokio::task::spawn_blocking(move || writer.write(&base, &result))
            .await
            .map_err(|e| WriteError::Interrupted(e.to_string()))??;

        Ok(Outcome::Done(set))
    }

    /// Publish an intermediate phase unless a cancel is pending.
    fn advance(&self, status: JobStatus, detail: String) {
        let mut control = self.shared.lock();
        if self.shared.cancel.load(Ordering::SeqCst) {
            log::debug!("pipeline: {status} (cancel pending, not published)");
            return;
        }
        log::info!("pipeline: {status}");
        self.shared.publish(&mut control, status, detail);
    }

    /// Resolve the job: clear the flags and publish the terminal status in a
    /// single critical section.
    fn finish(&self, outcome: Result<Outcome, JobError>) {
        let (status, detail) = match outcome {
            Ok(Outcome::Done(set)) => {
                log::info!("pipeline: done, {} artifact(s) written", set.len());
                (
                    JobStatus::Done,
                    format!(
                        "Done. Output saved to:\n{}\n\nFiles:\n{}",
                        self.writer.dir().display(),
                        set.file_names().join("\n")
                    ),
                )
            }
            Ok(Outcome::Canceled) => (JobStatus::Canceled, "Canceled by user.".to_string()),
            Err(e) => {
                log::error!("pipeline: job failed: {e}");
                // The worker never produces the submission-only variants.
                let kind = e.failure_kind().unwrap_or(FailureKind::Engine);
                (JobStatus::Failed(kind), e.to_string())
            }
        };

        let mut control = self.shared.lock();
        control.running = false;
        self.shared.cancel.store(false, Ordering::SeqCst);
        self.shared.publish(&mut control, status, detail);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
