//! Error types for the toolchain module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the external toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Demodulator binary not found.
    #[error("Demodulator not found at path: {path}")]
    DemodulatorNotFound { path: PathBuf },

    /// Decoder binary not found.
    #[error("Decoder not found at path: {path}")]
    DecoderNotFound { path: PathBuf },

    /// Image utility binary not found.
    #[error("Image utility not found at path: {path}")]
    ImageToolNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The demodulator did not produce its expected output file.
    #[error("Demodulation failed: {reason}")]
    DemodulationFailed {
        reason: String,
        exit_code: Option<i32>,
    },

    /// The decoder did not produce any of the expected channel images.
    #[error("Decode failed: {reason}")]
    DecodeFailed {
        reason: String,
        exit_code: Option<i32>,
    },

    /// I/O error while invoking a tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolchainError {
    /// Creates a demodulation failed error.
    pub fn demodulation_failed(reason: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::DemodulationFailed {
            reason: reason.into(),
            exit_code,
        }
    }

    /// Creates a decode failed error.
    pub fn decode_failed(reason: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
            exit_code,
        }
    }

    /// Exit code of the failed tool invocation, when one was observed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::DemodulationFailed { exit_code, .. } | Self::DecodeFailed { exit_code, .. } => {
                *exit_code
            }
            _ => None,
        }
    }
}
