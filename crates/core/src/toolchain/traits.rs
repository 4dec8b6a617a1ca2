//! Trait definitions for the toolchain module.

use async_trait::async_trait;

use super::error::ToolchainError;
use super::types::{ComposeJob, ComposeResult, DecodeRequest, DecodeResult, DemodRequest, DemodResult};

/// Uniform interface over the demodulator, decoder, and image utility.
///
/// Every operation is a single, fail-fast attempt: success is decided by
/// the presence of the expected output files after the process returns,
/// with the exit code logged but not trusted. No retries happen at this
/// boundary, and invocations carry no timeout — a hung tool blocks the
/// caller, which is inherited behavior.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Returns the name of this toolchain implementation.
    fn name(&self) -> &str;

    /// Demodulates an IQ recording into a soft-bit file.
    ///
    /// Fails with `DemodulationFailed` when the expected output file is
    /// absent after the process returns, regardless of exit code.
    async fn demodulate(&self, request: DemodRequest) -> Result<DemodResult, ToolchainError>;

    /// Decodes a soft-bit file (or an intermediate product) into channel
    /// images.
    ///
    /// Succeeds when at least one requested channel image exists. Two
    /// invocations against the same logical recording must use disjoint
    /// output basenames.
    async fn decode(&self, request: DecodeRequest) -> Result<DecodeResult, ToolchainError>;

    /// Produces the composed output images.
    ///
    /// Outputs are independent: one failing does not abort the rest. The
    /// result reports both the produced subset and the failures.
    async fn compose(&self, job: ComposeJob) -> ComposeResult;

    /// Validates that the configured binaries are present and runnable.
    async fn validate(&self) -> Result<(), ToolchainError>;
}
