//! Toolchain module wrapping the external demodulator, decoder, and image
//! utility.
//!
//! This module provides the `Toolchain` trait and the subprocess-backed
//! `CommandToolchain`. The adapter is a single-attempt, fail-fast boundary:
//! success of a stage is decided by the presence of its expected output
//! files, not by the exit code alone — the external tools are known to exit
//! zero without producing output and to produce usable output after a
//! non-zero exit.

mod command;
mod config;
mod error;
mod traits;
mod types;

pub use command::CommandToolchain;
pub use config::ToolchainConfig;
pub use error::ToolchainError;
pub use traits::Toolchain;
pub use types::{
    channel_image_path, intermediate_path, output_image_path, ChannelImage, ComposeFailure,
    ComposeJob, ComposeOp, ComposeOutput, ComposeResult, ComposedImage, CompositionMode,
    DecodeParams, DecodeRequest, DecodeResult, DemodParams, DemodRequest, DemodResult, ImageKind,
    CHANNEL_IMAGE_EXT, OUTPUT_IMAGE_EXT,
};
