//! Job status state machine and the listener that observes it.
//!
//! [`JobStatus`] is the single authoritative phase of the orchestrator.
//! Every transition is wrapped in a [`StatusUpdate`] (status + human-readable
//! detail) and pushed to the registered [`StatusListener`].

use std::fmt;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// Why a job ended in [`JobStatus::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The audio-decoding tool is missing or broken.
    Environment,
    /// The model could not be loaded or downloaded.
    ModelLoad,
    /// The engine call failed.
    Engine,
    /// An artifact could not be written.
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Environment => "environment error",
            FailureKind::ModelLoad => "model load error",
            FailureKind::Engine => "engine error",
            FailureKind::Write => "write error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Phases of a job.
///
/// ```text
/// Idle ──submit──▶ CheckingEnvironment ──▶ LoadingModel ──▶ Processing
///                        │                      │              │
///                        ▼                      ▼              ├──▶ Canceled  (flag set at checkpoint)
///                 Failed(Environment)    Failed(ModelLoad)     ├──▶ Done
///                                                              ├──▶ Failed(Engine)
///                                                              └──▶ Failed(Write)
/// Canceled / Done / Failed ──submit──▶ CheckingEnvironment
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    /// No job has run yet.
    #[default]
    Idle,
    CheckingEnvironment,
    LoadingModel,
    Processing,
    /// Cancellation was requested (while the job is still winding down) or
    /// the job ended canceled.
    Canceled,
    Done,
    Failed(FailureKind),
}

impl JobStatus {
    /// `true` for the phases a running job moves through.
    ///
    /// ```
    /// use media_transcriber::pipeline::JobStatus;
    ///
    /// assert!(!JobStatus::Idle.is_active());
    /// assert!(JobStatus::CheckingEnvironment.is_active());
    /// assert!(JobStatus::Processing.is_active());
    /// assert!(!JobStatus::Done.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::CheckingEnvironment | JobStatus::LoadingModel | JobStatus::Processing
        )
    }

    /// `true` for outcomes a job can end in.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Canceled | JobStatus::Done | JobStatus::Failed(_))
    }

    /// A short label for a status bar.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Idle => "Idle",
            JobStatus::CheckingEnvironment => "Checking environment",
            JobStatus::LoadingModel => "Loading model",
            JobStatus::Processing => "Processing",
            JobStatus::Canceled => "Canceled",
            JobStatus::Done => "Done",
            JobStatus::Failed(_) => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Failed(kind) => write!(f, "Failed ({kind})"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusUpdate
// ---------------------------------------------------------------------------

/// One status transition as seen by the outside world.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: JobStatus,
    /// Explains the active phase or the terminal outcome.
    pub detail: String,
    /// Whether a job still occupies the orchestrator after this transition.
    /// A requested-but-pending cancel reports `Canceled` with `running`
    /// still `true`.
    pub running: bool,
}

impl StatusUpdate {
    pub fn idle() -> Self {
        Self {
            status: JobStatus::Idle,
            detail: "Idle. Ready for next file.".into(),
            running: false,
        }
    }

    /// `true` once the job has fully resolved.
    pub fn is_final(&self) -> bool {
        !self.running && self.status.is_terminal()
    }
}

impl Default for StatusUpdate {
    fn default() -> Self {
        Self::idle()
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Receives every status transition, in order.
///
/// Called while the orchestrator's status lock is held: implementations must
/// return quickly and must not call back into the orchestrator.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, update: &StatusUpdate);
}

/// Forwards updates into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelListener {
    pub fn new(tx: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { tx }
    }

    /// A listener plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl StatusListener for ChannelListener {
    fn on_status(&self, update: &StatusUpdate) {
        if self.tx.send(update.clone()).is_err() {
            log::debug!("status: receiver dropped, update discarded");
        }
    }
}

/// Writes every update to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl StatusListener for LogListener {
    fn on_status(&self, update: &StatusUpdate) {
        match update.status {
            JobStatus::Failed(_) => log::error!("status: {}: {}", update.status, update.detail),
            _ => log::info!("status: {}: {}", update.status, update.detail),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_phases() {
        assert!(JobStatus::LoadingModel.is_active());
        assert!(!JobStatus::Canceled.is_active());
        assert!(!JobStatus::Failed(FailureKind::Engine).is_active());
    }

    #[test]
    fn terminal_outcomes() {
        assert!(JobStatus::Canceled.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed(FailureKind::Write).is_terminal());
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn display_includes_failure_kind() {
        assert_eq!(
            JobStatus::Failed(FailureKind::ModelLoad).to_string(),
            "Failed (model load error)"
        );
        assert_eq!(JobStatus::LoadingModel.to_string(), "Loading model");
    }

    #[test]
    fn pending_cancel_is_not_final() {
        let pending = StatusUpdate {
            status: JobStatus::Canceled,
            detail: "Cancel requested…".into(),
            running: true,
        };
        assert!(!pending.is_final());
        assert!(StatusUpdate {
            running: false,
            ..pending
        }
        .is_final());
        assert!(!StatusUpdate::idle().is_final());
    }

    #[test]
    fn channel_listener_forwards_in_order() {
        let (listener, mut rx) = ChannelListener::channel();
        for status in [JobStatus::CheckingEnvironment, JobStatus::Processing, JobStatus::Done] {
            listener.on_status(&StatusUpdate {
                status,
                detail: String::new(),
                running: status.is_active(),
            });
        }
        let seen: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|u| u.status)
            .collect();
        assert_eq!(
            seen,
            vec![JobStatus::CheckingEnvironment, JobStatus::Processing, JobStatus::Done]
        );
    }

    #[test]
    fn channel_listener_survives_dropped_receiver() {
        let (listener, rx) = ChannelListener::channel();
        drop(rx);
        listener.on_status(&StatusUpdate::idle());
    }

    #[test]
    fn listeners_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChannelListener>();
        assert_send_sync::<LogListener>();
    }
}
