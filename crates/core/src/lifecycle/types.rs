//! Types for the lifecycle module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a captured recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingKind {
    /// Demodulated soft bits, ready for decoding.
    SoftBit,
    /// Raw IQ baseband samples, needing demodulation first.
    Iq,
}

impl RecordingKind {
    /// File extension of recordings of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::SoftBit => "s",
            Self::Iq => "iq",
        }
    }

    /// Suffix of the lifecycle directories for this kind.
    pub fn dir_suffix(&self) -> &'static str {
        match self {
            Self::SoftBit => "s",
            Self::Iq => "iq",
        }
    }

    /// The other recording kind.
    pub fn counterpart(&self) -> Self {
        match self {
            Self::SoftBit => Self::Iq,
            Self::Iq => Self::SoftBit,
        }
    }
}

/// What happens to a claimed recording when processing finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalPolicy {
    /// Move into the complete directory.
    #[default]
    Archive,
    /// Remove the file.
    Delete,
}

/// The lifecycle directory tree under a single data directory.
///
/// Per recording kind: `new_<kind>` (discovered), `found_<kind>`
/// (claimed, in progress), `complete_<kind>` (archived). A shared `tmp`
/// directory holds intermediate artifacts.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    data_dir: PathBuf,
}

impl DirectoryLayout {
    /// Creates a layout rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// The root data directory.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Directory where newly captured recordings appear.
    pub fn new_dir(&self, kind: RecordingKind) -> PathBuf {
        self.data_dir.join(format!("new_{}", kind.dir_suffix()))
    }

    /// Directory holding claimed, in-progress recordings.
    pub fn found_dir(&self, kind: RecordingKind) -> PathBuf {
        self.data_dir.join(format!("found_{}", kind.dir_suffix()))
    }

    /// Directory holding fully processed recordings.
    pub fn complete_dir(&self, kind: RecordingKind) -> PathBuf {
        self.data_dir.join(format!("complete_{}", kind.dir_suffix()))
    }

    /// Shared directory for intermediate artifacts.
    pub fn work_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }
}
