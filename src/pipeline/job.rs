//! A single transcription request.

use std::path::PathBuf;

use crate::stt::{EngineRequest, Task};

/// One request to transcribe or translate a single media file.
///
/// Immutable once submitted; the worker consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Media file to process.
    pub path: PathBuf,
    /// Model identifier (e.g. `"small"`).
    pub model: String,
    /// ISO-639-1 source language; `None` lets the engine detect it.
    pub language: Option<String>,
    pub task: Task,
    pub word_timestamps: bool,
}

impl Job {
    /// A transcription job with auto-detected language and no word timing.
    pub fn new(path: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            model: model.into(),
            language: None,
            task: Task::Transcribe,
            word_timestamps: false,
        }
    }

    /// Name the artifacts are written under: the input file name without its
    /// last extension.
    ///
    /// ```
    /// use media_transcriber::pipeline::Job;
    ///
    /// assert_eq!(Job::new("/media/talk.final.mp4", "tiny").base_name(), "talk.final");
    /// ```
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "output".to_string())
    }

    /// The engine call for this job.  Half precision is never requested.
    pub fn engine_request(&self) -> EngineRequest {
        EngineRequest {
            path: self.path.clone(),
            task: self.task,
            language: self.language.clone(),
            word_timestamps: self.word_timestamps,
            fp16: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_directory_and_extension() {
        assert_eq!(Job::new("recordings/interview.wav", "tiny").base_name(), "interview");
        assert_eq!(Job::new("noext", "tiny").base_name(), "noext");
        assert_eq!(Job::new(".hidden", "tiny").base_name(), ".hidden");
    }

    #[test]
    fn base_name_falls_back_when_path_has_no_file_name() {
        assert_eq!(Job::new("/", "tiny").base_name(), "output");
    }

    #[test]
    fn engine_request_carries_options_and_full_precision() {
        let job = Job {
            language: Some("pa".into()),
            task: Task::Translate,
            word_timestamps: true,
            ..Job::new("a.mp3", "small")
        };
        let req = job.engine_request();
        assert_eq!(req.path, PathBuf::from("a.mp3"));
        assert_eq!(req.task, Task::Translate);
        assert_eq!(req.language.as_deref(), Some("pa"));
        assert!(req.word_timestamps);
        assert!(!req.fp16);
    }
}
