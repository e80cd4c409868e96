//! Media decoding through the external `ffmpeg` tool.
//!
//! Whisper needs **16 kHz, mono, f32** PCM.  Rather than linking a codec
//! stack, every media file is piped through
//!
//! ```text
//! ffmpeg -nostdin -threads 0 -i <file> -f f32le -ac 1 -ar 16000 -
//! ```
//!
//! and the raw little-endian floats on stdout are collected.  This is a
//! blocking call; run it on the blocking pool.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::stt::engine::EngineError;

/// Sample rate the engine consumes.
pub const SAMPLE_RATE: u32 = 16_000;

/// Decode `media` to 16 kHz mono `f32` samples using the `ffmpeg` program at
/// `ffmpeg`.
///
/// # Errors
///
/// [`EngineError::Decode`] when ffmpeg cannot be started, exits non-zero, or
/// produces no audio.
pub fn decode_to_pcm(ffmpeg: &Path, media: &Path) -> Result<Vec<f32>, EngineError> {
    if !media.exists() {
        return Err(EngineError::Decode(format!(
            "input file not found: {}",
            media.display()
        )));
    }

    let output = Command::new(ffmpeg)
        .arg("-nostdin")
        .args(["-threads", "0", "-i"])
        .arg(media)
        .args(["-f", "f32le", "-ac", "1", "-ar"])
        .arg(SAMPLE_RATE.to_string())
        .arg("-")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| EngineError::Decode(format!("failed to start {}: {e}", ffmpeg.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        return Err(EngineError::Decode(format!(
            "ffmpeg exited with {}: {last}",
            output.status
        )));
    }

    let samples = pcm_from_le_bytes(&output.stdout);
    if samples.is_empty() {
        return Err(EngineError::Decode(format!(
            "no audio stream decoded from {}",
            media.display()
        )));
    }

    log::debug!(
        "decode: {} → {} samples ({:.1} s)",
        media.display(),
        samples.len(),
        samples.len() as f64 / SAMPLE_RATE as f64
    );
    Ok(samples)
}

/// Reinterpret raw `f32le` bytes as samples.  A trailing partial sample is
/// dropped.
pub(crate) fn pcm_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
