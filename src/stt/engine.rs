//! Engine contract and the whisper.cpp implementation.
//!
//! # Overview
//!
//! [`EngineHandle`] is the interface the orchestrator drives.  It is
//! object-safe and `Send + Sync` so a loaded model can live behind an
//! `Arc<dyn EngineHandle>` and be moved onto the blocking pool.
//!
//! [`WhisperEngine`] is the production handle wrapping a
//! `whisper_rs::WhisperContext`.  It is built by
//! [`crate::stt::WhisperModelLoader`].
//!
//! `MockEngine` (available under `#[cfg(test)]`) returns a pre-configured
//! result without touching any model file.

use std::path::PathBuf;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext};

use crate::stt::decode::{decode_to_pcm, SAMPLE_RATE};
use crate::stt::transcribe::{EngineRequest, Segment, Task, TranscriptionResult, Word};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors raised by a running engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The media file could not be turned into PCM audio.
    #[error("Audio decoding failed: {0}")]
    Decode(String),

    /// The inference pass itself failed.
    #[error("Transcription error: {0}")]
    Inference(String),

    /// The engine call panicked or its task was torn down.
    #[error("Engine crashed: {0}")]
    Crashed(String),
}

// ---------------------------------------------------------------------------
// EngineHandle trait
// ---------------------------------------------------------------------------

/// A loaded model that can run transcription jobs.
///
/// `run` blocks for the whole inference and cannot be interrupted; call it
/// from `tokio::task::spawn_blocking`.
pub trait EngineHandle: Send + Sync {
    /// Identifier of the model this handle was loaded from.
    fn model_id(&self) -> &str;

    /// Transcribe (or translate) the file named in `request`.
    fn run(&self, request: &EngineRequest) -> Result<TranscriptionResult, EngineError>;
}

// Compile-time assertion: Box<dyn EngineHandle> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn EngineHandle>) {}
};

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production engine wrapping a `whisper_rs::WhisperContext`.
///
/// A fresh `WhisperState` is created per run so the handle needs no
/// locking.
pub struct WhisperEngine {
    model_id: String,
    ctx: WhisperContext,
    ffmpeg: PathBuf,
    n_threads: i32,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("model_id", &self.model_id)
            .field("ffmpeg", &self.ffmpeg)
            .field("n_threads", &self.n_threads)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Wrap an already-initialised context.
    pub fn new(
        model_id: impl Into<String>,
        ctx: WhisperContext,
        ffmpeg: impl Into<PathBuf>,
        n_threads: i32,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            ctx,
            ffmpeg: ffmpeg.into(),
            n_threads,
        }
    }

    fn infer(&self, audio: &[f32], request: &EngineRequest) -> Result<TranscriptionResult, EngineError> {
        if request.fp16 {
            log::debug!("whisper: fp16 requested; whisper.cpp decides precision from the model file");
        }

        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // `fp` borrows the language string until state.full() returns.
        let lang: Option<&str> = request.language.as_deref();
        fp.set_language(lang.or(Some("auto")));
        fp.set_translate(request.task == Task::Translate);
        fp.set_token_timestamps(request.word_timestamps);
        fp.set_n_threads(self.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp.set_print_special(false);
        fp.set_print_timestamps(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| EngineError::Inference(format!("state init: {e}")))?;

        state
            .full(fp, audio)
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let mut text = String::new();
        let mut segments = Vec::with_capacity(n_segments.max(0) as usize);

        for i in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| EngineError::Inference(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds.
            let start = centis_to_secs(state.full_get_segment_t0(i).unwrap_or(0));
            let end = centis_to_secs(state.full_get_segment_t1(i).unwrap_or(0)).max(start);

            let words = if request.word_timestamps {
                let n_tokens = state
                    .full_n_tokens(i)
                    .map_err(|e| EngineError::Inference(format!("segment {i} tokens: {e}")))?;
                let mut tokens = Vec::new();
                for j in 0..n_tokens {
                    let token = match state.full_get_token_text(i, j) {
                        Ok(t) => t,
                        Err(_) => continue,
                    };
                    if is_special_token(&token) {
                        continue;
                    }
                    let data = state
                        .full_get_token_data(i, j)
                        .map_err(|e| EngineError::Inference(format!("token {i}/{j}: {e}")))?;
                    let w_start = centis_to_secs(data.t0);
                    tokens.push(Word {
                        start: w_start,
                        end: centis_to_secs(data.t1).max(w_start),
                        word: token,
                        probability: data.p,
                    });
                }
                merge_tokens(tokens)
            } else {
                Vec::new()
            };

            text.push_str(&seg_text);
            segments.push(Segment {
                start,
                end,
                text: seg_text,
                words,
            });
        }

        let language = match request.language.clone() {
            Some(code) => Some(code),
            None => state
                .full_lang_id_from_state()
                .ok()
                .and_then(whisper_rs::get_lang_str)
                .map(str::to_string),
        };

        Ok(TranscriptionResult {
            text,
            segments,
            language,
        })
    }
}

impl EngineHandle for WhisperEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn run(&self, request: &EngineRequest) -> Result<TranscriptionResult, EngineError> {
        let audio = decode_to_pcm(&self.ffmpeg, &request.path)?;
        log::info!(
            "whisper: {} {} ({:.1} s of audio, model {})",
            request.task,
            request.path.display(),
            audio.len() as f64 / SAMPLE_RATE as f64,
            self.model_id
        );
        let wall_start = std::time::Instant::now();
        let result = self.infer(&audio, request)?;
        log::info!(
            "whisper: {} segments in {} ms",
            result.segments.len(),
            wall_start.elapsed().as_millis()
        );
        Ok(result)
    }
}

fn centis_to_secs(t: i64) -> f64 {
    t.max(0) as f64 / 100.0
}

/// Join whisper.cpp sub-word tokens into whole words.
///
/// A token whose text starts with whitespace opens a new word; any other
/// token (a word piece or trailing punctuation) extends the current one.
/// The merged word spans the first token's start to the last token's end and
/// carries the mean token probability.
pub(crate) fn merge_tokens(tokens: impl IntoIterator<Item = Word>) -> Vec<Word> {
    let mut groups: Vec<Vec<Word>> = Vec::new();
    for token in tokens {
        let opens_word = token.word.starts_with(char::is_whitespace);
        match groups.last_mut() {
            Some(group) if !opens_word => group.push(token),
            _ => groups.push(vec![token]),
        }
    }

    groups
        .into_iter()
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;
            let text: String = group.iter().map(|t| t.word.as_str()).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let probability = group.iter().map(|t| t.probability).sum::<f32>() / group.len() as f32;
            Some(Word {
                start: first.start,
                end: last.end.max(first.start),
                word: text.to_string(),
                probability,
            })
        })
        .collect()
}

/// Control tokens such as `[_BEG_]` or `<|en|>` carry no text.
fn is_special_token(token: &str) -> bool {
    let t = token.trim();
    t.is_empty() || (t.starts_with("[_") && t.ends_with(']')) || (t.starts_with("<|") && t.ends_with("|>"))
}

// ---------------------------------------------------------------------------
// MockEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response and records every
/// request it receives.
#[cfg(test)]
pub struct MockEngine {
    model_id: String,
    response: Result<TranscriptionResult, EngineError>,
    requests: std::sync::Mutex<Vec<EngineRequest>>,
}

#[cfg(test)]
impl MockEngine {
    /// Create a mock that always returns `Ok(result)`.
    pub fn ok(model_id: impl Into<String>, result: TranscriptionResult) -> Self {
        Self {
            model_id: model_id.into(),
            response: Ok(result),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(model_id: impl Into<String>, error: EngineError) -> Self {
        Self {
            model_id: model_id.into(),
            response: Err(error),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl EngineHandle for MockEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn run(&self, request: &EngineRequest) -> Result<TranscriptionResult, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EngineRequest {
        EngineRequest {
            path: PathBuf::from("clip.mp3"),
            task: Task::Transcribe,
            language: None,
            word_timestamps: false,
            fp16: false,
        }
    }

    #[test]
    fn mock_ok_returns_configured_result() {
        let result = TranscriptionResult {
            text: " hello".into(),
            ..Default::default()
        };
        let engine = MockEngine::ok("tiny", result.clone());
        assert_eq!(engine.run(&request()).unwrap(), result);
        assert_eq!(engine.requests().len(), 1);
    }

    #[test]
    fn mock_err_returns_configured_error() {
        let engine = MockEngine::err("tiny", EngineError::Inference("boom".into()));
        assert!(matches!(engine.run(&request()), Err(EngineError::Inference(_))));
    }

    #[test]
    fn box_dyn_engine_handle_compiles() {
        let engine: Box<dyn EngineHandle> = Box::new(MockEngine::ok("base", Default::default()));
        assert_eq!(engine.model_id(), "base");
    }

    #[test]
    fn centiseconds_convert_and_clamp() {
        assert_eq!(centis_to_secs(125), 1.25);
        assert_eq!(centis_to_secs(-3), 0.0);
    }

    #[test]
    fn special_tokens_are_recognised() {
        assert!(is_special_token("[_BEG_]"));
        assert!(is_special_token("[_TT_150]"));
        assert!(is_special_token("<|en|>"));
        assert!(is_special_token("  "));
        assert!(!is_special_token(" hello"));
        assert!(!is_special_token("[music"));
    }

    fn tok(text: &str, start: f64, end: f64, probability: f32) -> Word {
        Word {
            start,
            end,
            word: text.into(),
            probability,
        }
    }

    #[test]
    fn word_pieces_merge_into_whole_words() {
        let words = merge_tokens(vec![
            tok(" Hel", 0.0, 0.2, 0.9),
            tok("lo", 0.2, 0.4, 0.7),
            tok(",", 0.4, 0.45, 1.0),
            tok(" world", 0.5, 1.0, 0.6),
        ]);

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "Hello,");
        assert_eq!(words[0].start, 0.0);
        assert_eq!(words[0].end, 0.45);
        assert!((words[0].probability - 0.866_666_7).abs() < 1e-5);
        assert_eq!(words[1].word, "world");
        assert_eq!((words[1].start, words[1].end), (0.5, 1.0));
        assert!((words[1].probability - 0.6).abs() < 1e-6);
    }

    #[test]
    fn leading_piece_without_space_starts_first_word() {
        let words = merge_tokens(vec![tok("Sat", 1.0, 1.2, 0.5), tok(" sri", 1.2, 1.5, 0.5)]);
        let texts: Vec<_> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(texts, ["Sat", "sri"]);
    }

    #[test]
    fn no_tokens_no_words() {
        assert!(merge_tokens(Vec::new()).is_empty());
    }

    #[test]
    fn engine_error_display() {
        let e = EngineError::Decode("no audio".into());
        assert!(e.to_string().contains("no audio"));
    }
}
