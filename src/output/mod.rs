//! Output serialisation: subtitle timestamps and the three-file artifact set.

pub mod timestamp;
pub mod writer;

pub use timestamp::format_srt_timestamp;
pub use writer::{ArtifactKind, ArtifactSet, OutputWriter, WriteError};
