//! Subprocess-based toolchain implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::ToolchainConfig;
use super::error::ToolchainError;
use super::types::{
    channel_image_path, intermediate_path, ChannelImage, ComposeFailure, ComposeJob, ComposeOp,
    ComposeResult, ComposedImage, DecodeRequest, DecodeResult, DemodRequest, DemodResult,
};
use super::traits::Toolchain;

/// Name of the demodulator stdout capture, written beside the output file.
const DEMOD_LOG_NAME: &str = "demodulate.log";

/// Toolchain implementation that invokes the configured external binaries.
pub struct CommandToolchain {
    config: ToolchainConfig,
}

impl CommandToolchain {
    /// Creates a new toolchain with the given configuration.
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Creates a toolchain with default binary paths.
    pub fn with_defaults() -> Self {
        Self::new(ToolchainConfig::default())
    }

    /// Builds demodulator arguments for a request.
    fn build_demod_args(request: &DemodRequest) -> Vec<String> {
        let params = &request.params;
        vec![
            "-B".to_string(),
            "-R".to_string(),
            params.refresh_rate_ms.to_string(),
            "-f".to_string(),
            params.interpolation.to_string(),
            "-b".to_string(),
            params.pll_bandwidth.to_string(),
            "-s".to_string(),
            params.sample_rate.to_string(),
            "-r".to_string(),
            params.symbol_rate.to_string(),
            "-d".to_string(),
            params.freq_delta_hz.to_string(),
            "-m".to_string(),
            params.mode.clone(),
            "-o".to_string(),
            request.output.to_string_lossy().to_string(),
            request.input.to_string_lossy().to_string(),
        ]
    }

    /// Builds decoder arguments for a request.
    fn build_decode_args(request: &DecodeRequest) -> Vec<String> {
        let params = &request.params;
        let mut args = vec![
            request.input.to_string_lossy().to_string(),
            request.output_basename.to_string_lossy().to_string(),
            "-q".to_string(),
            "-s".to_string(),
            "-r".to_string(),
            params.apid_red.to_string(),
            "-g".to_string(),
            params.apid_green.to_string(),
            "-b".to_string(),
            params.apid_blue.to_string(),
        ];
        if params.diff_decode {
            args.push("-diff".to_string());
        }
        if params.interleaved {
            args.push("-int".to_string());
        }
        args
    }

    /// Builds image-utility arguments for one composition operation.
    fn build_compose_args(op: &ComposeOp, output: &Path) -> Vec<String> {
        match op {
            ComposeOp::Append { inputs } => {
                let mut args: Vec<String> = inputs
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect();
                args.push("-append".to_string());
                args.push(output.to_string_lossy().to_string());
                args
            }
            ComposeOp::CombineRgb { red, green, blue } => vec![
                red.to_string_lossy().to_string(),
                green.to_string_lossy().to_string(),
                blue.to_string_lossy().to_string(),
                "-channel".to_string(),
                "RGB".to_string(),
                "-combine".to_string(),
                output.to_string_lossy().to_string(),
            ],
            ComposeOp::Convert { input } => vec![
                input.to_string_lossy().to_string(),
                output.to_string_lossy().to_string(),
            ],
        }
    }

    /// Runs a binary to completion, capturing its output.
    async fn run(
        binary: &Path,
        args: &[String],
        not_found: impl FnOnce(PathBuf) -> ToolchainError,
    ) -> Result<Output, ToolchainError> {
        info!(tool = %binary.display(), ?args, "invoking external tool");

        let output = Command::new(binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    not_found(binary.to_path_buf())
                } else {
                    ToolchainError::Io(e)
                }
            })?;

        info!(
            tool = %binary.display(),
            exit = ?output.status.code(),
            "external tool finished"
        );

        Ok(output)
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    fn name(&self) -> &str {
        "command"
    }

    async fn demodulate(&self, request: DemodRequest) -> Result<DemodResult, ToolchainError> {
        if !request.input.exists() {
            return Err(ToolchainError::InputNotFound {
                path: request.input.clone(),
            });
        }

        let args = Self::build_demod_args(&request);
        let output = Self::run(&self.config.demodulator_path, &args, |path| {
            ToolchainError::DemodulatorNotFound { path }
        })
        .await?;

        let exit_code = output.status.code();

        // Keep the demodulator's stdout beside the output for inspection.
        if let Some(parent) = request.output.parent() {
            let log_path = parent.join(DEMOD_LOG_NAME);
            if let Err(e) = tokio::fs::write(&log_path, &output.stdout).await {
                warn!(path = %log_path.display(), "failed to write demodulator log: {}", e);
            }
        }

        // Output existence wins over exit code in both directions.
        if !request.output.exists() {
            return Err(ToolchainError::demodulation_failed(
                format!(
                    "no soft-bit file at {} after demodulator exit",
                    request.output.display()
                ),
                exit_code,
            ));
        }

        Ok(DemodResult {
            soft_bits: request.output,
            exit_code,
        })
    }

    async fn decode(&self, request: DecodeRequest) -> Result<DecodeResult, ToolchainError> {
        if !request.input.exists() {
            return Err(ToolchainError::InputNotFound {
                path: request.input.clone(),
            });
        }

        let args = Self::build_decode_args(&request);
        let output = Self::run(&self.config.decoder_path, &args, |path| {
            ToolchainError::DecoderNotFound { path }
        })
        .await?;

        let exit_code = output.status.code();
        if !output.status.success() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "decoder exited non-zero"
            );
        }

        let mut channels = Vec::new();
        for channel in 0..=2u8 {
            let path = channel_image_path(&request.output_basename, channel);
            if path.exists() {
                channels.push(ChannelImage { channel, path });
            }
        }

        if channels.is_empty() {
            return Err(ToolchainError::decode_failed(
                format!(
                    "no channel images under {} after decoder exit",
                    request.output_basename.display()
                ),
                exit_code,
            ));
        }

        let intermediate = Some(intermediate_path(&request.output_basename)).filter(|p| p.exists());

        Ok(DecodeResult {
            channels,
            intermediate,
            exit_code,
        })
    }

    async fn compose(&self, job: ComposeJob) -> ComposeResult {
        let mut result = ComposeResult::default();

        for planned in job.outputs {
            let args = Self::build_compose_args(&planned.op, &planned.output);
            let run = Self::run(&self.config.image_tool_path, &args, |path| {
                ToolchainError::ImageToolNotFound { path }
            })
            .await;

            let reason = match run {
                Ok(output) if planned.output.exists() => {
                    if !output.status.success() {
                        debug!(
                            output = %planned.output.display(),
                            exit = ?output.status.code(),
                            "image utility exited non-zero but produced output"
                        );
                    }
                    result.images.push(ComposedImage {
                        kind: planned.kind,
                        path: planned.output,
                    });
                    continue;
                }
                Ok(output) => format!(
                    "no output file after image utility exit (code {:?})",
                    output.status.code()
                ),
                Err(e) => e.to_string(),
            };

            warn!(output = %planned.output.display(), "composition output failed: {}", reason);
            result.failures.push(ComposeFailure {
                kind: planned.kind,
                output: planned.output,
                reason,
            });
        }

        result
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        let checks: [(&Path, fn(PathBuf) -> ToolchainError); 3] = [
            (self.config.demodulator_path.as_path(), |path| {
                ToolchainError::DemodulatorNotFound { path }
            }),
            (self.config.decoder_path.as_path(), |path| {
                ToolchainError::DecoderNotFound { path }
            }),
            (self.config.image_tool_path.as_path(), |path| {
                ToolchainError::ImageToolNotFound { path }
            }),
        ];

        // Only a failure to spawn counts; the tools disagree on what a
        // no-op invocation exits with.
        for (binary, not_found) in checks {
            Command::new(binary)
                .arg("-h")
                .output()
                .await
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        not_found(binary.to_path_buf())
                    } else {
                        ToolchainError::Io(e)
                    }
                })?;
        }

        Ok(())
    }
}
