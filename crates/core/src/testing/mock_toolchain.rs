//! Mock toolchain for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::toolchain::{
    channel_image_path, intermediate_path, ChannelImage, ComposeFailure, ComposeJob, ComposeOp,
    ComposeResult, ComposedImage, DecodeRequest, DecodeResult, DemodRequest, DemodResult,
    ImageKind, Toolchain, ToolchainError,
};

/// Decoder behavior for one invocation.
#[derive(Debug, Clone)]
pub struct DecodeBehavior {
    /// Channels whose image files get written; empty means the decode
    /// fails with zero outputs.
    pub channels: Vec<u8>,
    /// Whether an intermediate product is left behind.
    pub intermediate: bool,
}

impl Default for DecodeBehavior {
    fn default() -> Self {
        Self {
            channels: vec![0, 1, 2],
            intermediate: true,
        }
    }
}

/// Mock implementation of the Toolchain trait.
///
/// Writes real files into the caller's directories so lifecycle
/// invariants can be asserted end-to-end, and records every request for
/// assertions. Behavior is controllable per stage:
/// - `set_demodulation_fails` makes demodulation produce nothing
/// - `push_decode_behavior` queues one-shot decoder outcomes (FIFO;
///   the default behavior applies once the queue is empty)
/// - `fail_compose_kind` makes outputs of one kind fail
#[derive(Debug, Clone, Default)]
pub struct MockToolchain {
    demod_fails: Arc<RwLock<bool>>,
    decode_queue: Arc<RwLock<Vec<DecodeBehavior>>>,
    default_decode: Arc<RwLock<DecodeBehavior>>,
    failing_compose_kinds: Arc<RwLock<HashSet<ImageKind>>>,
    demod_requests: Arc<RwLock<Vec<DemodRequest>>>,
    decode_requests: Arc<RwLock<Vec<DecodeRequest>>>,
    compose_jobs: Arc<RwLock<Vec<ComposeJob>>>,
}

impl MockToolchain {
    /// Create a new mock toolchain with all stages succeeding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every demodulation fail with no output.
    pub async fn set_demodulation_fails(&self, fails: bool) {
        *self.demod_fails.write().await = fails;
    }

    /// Queue a one-shot decoder behavior (FIFO).
    pub async fn push_decode_behavior(&self, behavior: DecodeBehavior) {
        self.decode_queue.write().await.push(behavior);
    }

    /// Set the decoder behavior used when the queue is empty.
    pub async fn set_default_decode(&self, behavior: DecodeBehavior) {
        *self.default_decode.write().await = behavior;
    }

    /// Make composition outputs of `kind` fail.
    pub async fn fail_compose_kind(&self, kind: ImageKind) {
        self.failing_compose_kinds.write().await.insert(kind);
    }

    /// Demodulation requests seen so far.
    pub async fn demod_requests(&self) -> Vec<DemodRequest> {
        self.demod_requests.read().await.clone()
    }

    /// Decode requests seen so far.
    pub async fn decode_requests(&self) -> Vec<DecodeRequest> {
        self.decode_requests.read().await.clone()
    }

    /// Compose jobs seen so far.
    pub async fn compose_jobs(&self) -> Vec<ComposeJob> {
        self.compose_jobs.read().await.clone()
    }

    async fn next_decode_behavior(&self) -> DecodeBehavior {
        let mut queue = self.decode_queue.write().await;
        if queue.is_empty() {
            self.default_decode.read().await.clone()
        } else {
            queue.remove(0)
        }
    }
}

#[async_trait]
impl Toolchain for MockToolchain {
    fn name(&self) -> &str {
        "mock"
    }

    async fn demodulate(&self, request: DemodRequest) -> Result<DemodResult, ToolchainError> {
        self.demod_requests.write().await.push(request.clone());

        if *self.demod_fails.read().await {
            return Err(ToolchainError::demodulation_failed(
                "mock demodulator produced no output",
                Some(0),
            ));
        }

        tokio::fs::write(&request.output, b"soft bits").await?;
        Ok(DemodResult {
            soft_bits: request.output,
            exit_code: Some(0),
        })
    }

    async fn decode(&self, request: DecodeRequest) -> Result<DecodeResult, ToolchainError> {
        self.decode_requests.write().await.push(request.clone());

        let behavior = self.next_decode_behavior().await;

        let mut channels = Vec::new();
        for channel in behavior.channels {
            let path = channel_image_path(&request.output_basename, channel);
            tokio::fs::write(&path, b"bmp").await?;
            channels.push(ChannelImage { channel, path });
        }

        if channels.is_empty() {
            return Err(ToolchainError::decode_failed(
                "mock decoder produced no channel images",
                Some(0),
            ));
        }

        let intermediate = if behavior.intermediate {
            let path = intermediate_path(&request.output_basename);
            tokio::fs::write(&path, b"dec").await?;
            Some(path)
        } else {
            None
        };

        Ok(DecodeResult {
            channels,
            intermediate,
            exit_code: Some(0),
        })
    }

    async fn compose(&self, job: ComposeJob) -> ComposeResult {
        self.compose_jobs.write().await.push(job.clone());

        let failing = self.failing_compose_kinds.read().await.clone();
        let mut result = ComposeResult::default();

        for output in job.outputs {
            if failing.contains(&output.kind) {
                result.failures.push(ComposeFailure {
                    kind: output.kind,
                    output: output.output,
                    reason: "mock composition failure".to_string(),
                });
                continue;
            }

            // Fail like the real tool when an input is missing.
            let inputs: Vec<_> = match &output.op {
                ComposeOp::Append { inputs } => inputs.clone(),
                ComposeOp::CombineRgb { red, green, blue } => {
                    vec![red.clone(), green.clone(), blue.clone()]
                }
                ComposeOp::Convert { input } => vec![input.clone()],
            };
            if let Some(missing) = inputs.iter().find(|p| !p.exists()) {
                result.failures.push(ComposeFailure {
                    kind: output.kind,
                    output: output.output,
                    reason: format!("missing input: {}", missing.display()),
                });
                continue;
            }

            if tokio::fs::write(&output.output, b"png").await.is_ok() {
                result.images.push(ComposedImage {
                    kind: output.kind,
                    path: output.output,
                });
            } else {
                result.failures.push(ComposeFailure {
                    kind: output.kind,
                    output: output.output,
                    reason: "mock write failed".to_string(),
                });
            }
        }

        result
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        Ok(())
    }
}
