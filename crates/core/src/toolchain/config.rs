//! Configuration for the toolchain module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the external toolchain binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Path to the demodulator binary.
    #[serde(default = "default_demodulator_path")]
    pub demodulator_path: PathBuf,

    /// Path to the decoder binary.
    #[serde(default = "default_decoder_path")]
    pub decoder_path: PathBuf,

    /// Path to the image conversion utility.
    #[serde(default = "default_image_tool_path")]
    pub image_tool_path: PathBuf,
}

fn default_demodulator_path() -> PathBuf {
    PathBuf::from("meteor_demod")
}

fn default_decoder_path() -> PathBuf {
    PathBuf::from("medet")
}

fn default_image_tool_path() -> PathBuf {
    PathBuf::from("convert")
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            demodulator_path: default_demodulator_path(),
            decoder_path: default_decoder_path(),
            image_tool_path: default_image_tool_path(),
        }
    }
}

impl ToolchainConfig {
    /// Creates a config with explicit binary paths.
    pub fn with_paths(demodulator: PathBuf, decoder: PathBuf, image_tool: PathBuf) -> Self {
        Self {
            demodulator_path: demodulator,
            decoder_path: decoder,
            image_tool_path: image_tool,
        }
    }
}
