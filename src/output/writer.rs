//! Artifact writer: persists a [`TranscriptionResult`] as `.txt`, `.json`
//! and `.srt` files in one output directory.
//!
//! | Artifact  | Content                                            |
//! |-----------|----------------------------------------------------|
//! | `.txt`    | trimmed full text, newline-terminated when non-empty |
//! | `.json`   | the whole result, pretty-printed                   |
//! | `.srt`    | one cue per segment; skipped when there are none   |
//!
//! Files are written in that order and overwritten if present.  A failure
//! stops the sequence and names the artifact; files already written stay.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::output::timestamp::format_srt_timestamp;
use crate::stt::{Segment, TranscriptionResult};

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// One of the three output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Text,
    Json,
    Subtitles,
}

impl ArtifactKind {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Text => "txt",
            ArtifactKind::Json => "json",
            ArtifactKind::Subtitles => "srt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Text => "text",
            ArtifactKind::Json => "JSON",
            ArtifactKind::Subtitles => "subtitle",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// WriteError
// ---------------------------------------------------------------------------

/// Persisting an artifact failed.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Creating or writing one artifact failed.
    #[error("Failed to write {artifact} file {}: {source}", .path.display())]
    Io {
        artifact: ArtifactKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The writer task did not run to completion.
    #[error("Writing was interrupted: {0}")]
    Interrupted(String),
}

impl WriteError {
    /// The artifact that failed, if known.
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            WriteError::Io { artifact, .. } => Some(*artifact),
            WriteError::Interrupted(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactSet
// ---------------------------------------------------------------------------

/// Paths of the files produced by one [`OutputWriter::write`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub text: PathBuf,
    pub json: PathBuf,
    /// `None` when the result had no segments.
    pub subtitles: Option<PathBuf>,
}

impl ArtifactSet {
    /// Every written path, in write order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [Some(&self.text), Some(&self.json), self.subtitles.as_ref()]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
    }

    /// Number of files written (2 or 3).
    pub fn len(&self) -> usize {
        self.paths().count()
    }

    /// Always `false`; text and JSON are unconditional.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Bare file names, for status messages.
    pub fn file_names(&self) -> Vec<String> {
        self.paths()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// OutputWriter
// ---------------------------------------------------------------------------

/// Writes artifacts into a fixed directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Create a writer for `dir`, creating the directory if it is missing.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the `kind` artifact for `base_name`.
    pub fn artifact_path(&self, base_name: &str, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!("{base_name}.{}", kind.extension()))
    }

    /// Write the text, JSON and (when there are segments) subtitle files for
    /// `result` under `base_name`.
    pub fn write(&self, base_name: &str, result: &TranscriptionResult) -> Result<ArtifactSet, WriteError> {
        let text = self.write_artifact(base_name, ArtifactKind::Text, |w| write_text(w, result))?;
        let json = self.write_artifact(base_name, ArtifactKind::Json, |w| write_json(w, result))?;

        let subtitles = if result.segments.is_empty() {
            log::debug!("output: no segments, skipping {base_name}.srt");
            None
        } else {
            Some(self.write_artifact(base_name, ArtifactKind::Subtitles, |w| {
                write_srt(w, &result.segments)
            })?)
        };

        let set = ArtifactSet {
            text,
            json,
            subtitles,
        };
        log::info!("output: wrote {} in {}", set.file_names().join(", "), self.dir.display());
        Ok(set)
    }

    fn write_artifact<F>(&self, base_name: &str, kind: ArtifactKind, body: F) -> Result<PathBuf, WriteError>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        let path = self.artifact_path(base_name, kind);
        let attempt = File::create(&path).and_then(|file| {
            let mut w = BufWriter::new(file);
            body(&mut w)?;
            w.flush()?;
            w.get_ref().sync_all()
        });
        match attempt {
            Ok(()) => Ok(path),
            Err(source) => Err(WriteError::Io {
                artifact: kind,
                path,
                source,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

fn write_text<W: Write>(w: &mut W, result: &TranscriptionResult) -> io::Result<()> {
    let text = result.text.trim();
    if !text.is_empty() {
        writeln!(w, "{text}")?;
    }
    Ok(())
}

fn write_json<W: Write>(w: &mut W, result: &TranscriptionResult) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, result)?;
    writeln!(w)
}

/// SubRip body: `index`, `start --> end`, text, blank line, per segment.
pub(crate) fn write_srt<W: Write>(w: &mut W, segments: &[Segment]) -> io::Result<()> {
    for (i, seg) in segments.iter().enumerate() {
        writeln!(w, "{}", i + 1)?;
        writeln!(
            w,
            "{} --> {}",
            format_srt_timestamp(seg.start),
            format_srt_timestamp(seg.end)
        )?;
        writeln!(w, "{}", seg.text.trim())?;
        writeln!(w)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.into(),
            words: Vec::new(),
        }
    }

    fn hello_world() -> TranscriptionResult {
        TranscriptionResult {
            text: " hello world".into(),
            segments: vec![seg(0.0, 1.25, " hello"), seg(1.25, 3.0, " world")],
            language: Some("en".into()),
        }
    }

    #[test]
    fn hello_world_subtitles() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();

        let set = writer.write("clip", &hello_world()).unwrap();
        let srt = std::fs::read_to_string(set.subtitles.unwrap()).unwrap();
        assert!(srt.starts_with(
            "1\n00:00:00,000 --> 00:00:01,250\nhello\n\n2\n00:00:01,250 --> 00:00:03,000\nworld\n\n"
        ));
    }

    #[test]
    fn text_is_trimmed_and_newline_terminated() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();

        let set = writer.write("clip", &hello_world()).unwrap();
        assert_eq!(std::fs::read_to_string(set.text).unwrap(), "hello world\n");
    }

    #[test]
    fn empty_text_writes_empty_file() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let result = TranscriptionResult {
            text: "   ".into(),
            ..Default::default()
        };

        let set = writer.write("silence", &result).unwrap();
        assert_eq!(std::fs::read_to_string(set.text).unwrap(), "");
    }

    #[test]
    fn zero_segments_yield_two_artifacts() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let result = TranscriptionResult {
            text: "words without timing".into(),
            ..Default::default()
        };

        let set = writer.write("clip", &result).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.subtitles.is_none());
        assert!(!writer.artifact_path("clip", ArtifactKind::Subtitles).exists());
        assert_eq!(set.file_names(), vec!["clip.txt", "clip.json"]);
    }

    #[test]
    fn n_segments_yield_n_cues_in_order() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let segments: Vec<_> = (0..7)
            .map(|i| seg(i as f64, i as f64 + 0.5, &format!("line {i}")))
            .collect();
        let result = TranscriptionResult {
            text: "x".into(),
            segments,
            language: None,
        };

        let set = writer.write("clip", &result).unwrap();
        assert_eq!(set.len(), 3);
        let srt = std::fs::read_to_string(set.subtitles.unwrap()).unwrap();
        let cues: Vec<&str> = srt.split("\n\n").filter(|c| !c.is_empty()).collect();
        assert_eq!(cues.len(), 7);
        for (i, cue) in cues.iter().enumerate() {
            let mut lines = cue.lines();
            assert_eq!(lines.next(), Some((i + 1).to_string().as_str()));
            assert!(lines.next().unwrap().contains(" --> "));
            assert_eq!(lines.next(), Some(format!("line {i}").as_str()));
        }
    }

    #[test]
    fn json_round_trips_losslessly() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let mut result = hello_world();
        result.segments[0].start = 0.1 + 0.2; // not exactly representable
        result.segments[1].text = " ਸਤ ਸ੍ਰੀ ਅਕਾਲ".into();

        let set = writer.write("clip", &result).unwrap();
        let raw = std::fs::read_to_string(&set.json).unwrap();
        assert!(raw.contains("ਸਤ ਸ੍ਰੀ ਅਕਾਲ"), "non-ASCII must not be escaped");
        assert!(raw.contains("\n  \"text\""), "two-space indentation");

        let back: TranscriptionResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn existing_files_are_overwritten() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        std::fs::write(writer.artifact_path("clip", ArtifactKind::Text), "stale content that is long").unwrap();

        let set = writer.write("clip", &hello_world()).unwrap();
        assert_eq!(std::fs::read_to_string(set.text).unwrap(), "hello world\n");
    }

    #[test]
    fn new_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("whisper_outputs");
        let writer = OutputWriter::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.dir(), nested.as_path());
    }

    #[test]
    fn failure_names_the_artifact_and_keeps_earlier_files() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        // A directory where the JSON file should go makes File::create fail.
        std::fs::create_dir(writer.artifact_path("clip", ArtifactKind::Json)).unwrap();

        let err = writer.write("clip", &hello_world()).unwrap_err();
        assert_eq!(err.artifact(), Some(ArtifactKind::Json));
        assert!(err.to_string().contains("JSON"));
        assert!(writer.artifact_path("clip", ArtifactKind::Text).is_file());
        assert!(!writer.artifact_path("clip", ArtifactKind::Subtitles).exists());
    }
}
