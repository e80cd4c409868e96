//! Engine request and result types.
//!
//! [`EngineRequest`] carries everything a single engine run needs.
//! [`TranscriptionResult`] is what a successful run hands back to the
//! orchestrator; it is serialised verbatim into the `.json` artifact.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// What the engine should produce from the source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Text in the spoken language.
    #[default]
    Transcribe,
    /// English text regardless of the spoken language.
    Translate,
}

impl Task {
    /// The lowercase name used in logs and the JSON artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Transcribe => "transcribe",
            Task::Translate => "translate",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EngineRequest
// ---------------------------------------------------------------------------

/// All parameters for a single engine run.
///
/// `fp16` is part of the contract so callers state the precision they want;
/// the orchestrator always sends `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    /// Media file to transcribe. Decoding is the engine's business.
    pub path: PathBuf,
    /// Transcribe or translate.
    pub task: Task,
    /// ISO-639-1 language code, or `None` to let the engine detect it.
    pub language: Option<String>,
    /// Collect per-word timing inside each segment.
    pub word_timestamps: bool,
    /// Request half-precision compute.
    pub fp16: bool,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The output of a successful engine run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Full transcript text as produced by the engine (not trimmed).
    pub text: String,

    /// Time-aligned segments in engine order.
    pub segments: Vec<Segment>,

    /// Language the engine transcribed from, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A single time-aligned text span.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    /// Start offset in seconds from the beginning of the media.
    pub start: f64,
    /// End offset in seconds; never before `start`.
    pub end: f64,
    /// Segment text, including any leading space the engine emits.
    pub text: String,
    /// Word timings, only filled in when word timestamps were requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
}

/// Timing for a single word inside a [`Segment`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    pub word: String,
    pub probability: f32,
}

/// Returns the number of CPU threads to hand to the engine, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Task::Translate).unwrap(), "\"translate\"");
        assert_eq!(Task::Transcribe.to_string(), "transcribe");
    }

    #[test]
    fn empty_words_and_language_are_omitted_from_json() {
        let result = TranscriptionResult {
            text: "hi".into(),
            segments: vec![Segment {
                start: 0.0,
                end: 1.0,
                text: "hi".into(),
                words: Vec::new(),
            }],
            language: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("words"));
        assert!(!json.contains("language"));
    }

    #[test]
    fn optimal_threads_is_positive_and_at_most_8() {
        let t = optimal_threads();
        assert!((1..=8).contains(&t));
    }
}
