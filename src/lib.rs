//! Media transcription job orchestrator.
//!
//! Point it at an audio or video file and it produces a transcript (or an
//! English translation) through whisper.cpp, saved as `.txt`, `.json` and
//! `.srt` artifacts.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod stt;
