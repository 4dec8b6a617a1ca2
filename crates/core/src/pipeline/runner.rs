//! Pass pipeline implementation.
//!
//! Drives each claimed recording through the stage state machine:
//! claim → settle wait → (demodulate) → decode → compose → publish, with a
//! thermal re-entry into decode+compose when the profile asks for it, and a
//! retire exactly once whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{FileLifecycle, LifecycleError};
use crate::metrics;
use crate::profile::{ProfileRegistry, SatelliteProfile, ThermalPass};
use crate::scan;
use crate::toolchain::{
    output_image_path, ComposeJob, ComposeOp, ComposeOutput, ComposedImage, DecodeRequest,
    DecodeResult, DemodRequest, ImageKind, Toolchain,
};

use super::config::PipelineConfig;
use super::types::{
    FailedRecording, JobReport, PassReport, PublishedImage, Recording, RecordingOutcome, Stage,
};

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No profile registered for the satellite. Hard stop for the pass;
    /// nothing is claimed or deleted.
    #[error("Unknown satellite: catalog number {catalog_number}")]
    UnknownSatellite { catalog_number: u32 },

    /// The demodulator produced no soft-bit file.
    #[error("Demodulation failed: {reason}")]
    DemodulationFailed { reason: String },

    /// The decoder produced no channel images.
    #[error("Decode failed: {reason}")]
    DecodeFailed { reason: String },

    /// Composition produced zero output images.
    #[error("Composition produced no images for {recording}")]
    CompositionFailed { recording: String },

    /// A lifecycle move failed.
    #[error("Lifecycle operation failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// The pass pipeline: sequential, one recording at a time.
///
/// Safety against other instances comes entirely from the claim rename;
/// after a successful claim this instance is the only one allowed to touch
/// the recording.
pub struct PassPipeline<T: Toolchain> {
    config: PipelineConfig,
    registry: ProfileRegistry,
    toolchain: Arc<T>,
    lifecycle: FileLifecycle,
    destination_dir: PathBuf,
}

impl<T: Toolchain + 'static> PassPipeline<T> {
    /// Creates a new pass pipeline.
    pub fn new(
        config: PipelineConfig,
        registry: ProfileRegistry,
        toolchain: T,
        lifecycle: FileLifecycle,
        destination_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            registry,
            toolchain: Arc::new(toolchain),
            lifecycle,
            destination_dir,
        }
    }

    /// Processes every new recording of one pass for one satellite.
    ///
    /// Recordings of the kind the profile does not consume are discarded;
    /// the rest are claimed and processed sequentially. Per-recording
    /// failures are collected in the report, never aborting the iteration.
    pub async fn process_pass(
        &self,
        pass_id: u64,
        catalog_number: u32,
    ) -> Result<PassReport, PipelineError> {
        let profile = self
            .registry
            .lookup(catalog_number)
            .map_err(|_| PipelineError::UnknownSatellite { catalog_number })?;

        let kind = profile.input_kind();
        info!(
            pass_id,
            catalog_number,
            satellite = %profile.name,
            kind = ?kind,
            "processing pass"
        );

        // A pass recorded in both kinds keeps only the kind this profile
        // consumes.
        let counterpart = kind.counterpart();
        let unused = scan::discover(
            &self.lifecycle.layout().new_dir(counterpart),
            pass_id,
            counterpart,
        )
        .await
        .map_err(LifecycleError::Io)?;
        for recording in unused {
            if let Err(e) = self.lifecycle.discard(&recording.path).await {
                warn!(recording = %recording.path.display(), "failed to discard: {}", e);
            }
        }

        let recordings = scan::discover(&self.lifecycle.layout().new_dir(kind), pass_id, kind)
            .await
            .map_err(LifecycleError::Io)?;
        info!(count = recordings.len(), "discovered recordings");

        let mut report = PassReport {
            pass_id,
            catalog_number,
            satellite: profile.name.clone(),
            processed: 0,
            skipped: 0,
            published: Vec::new(),
            failures: Vec::new(),
        };

        for recording in &recordings {
            match self.process_recording(recording, profile).await {
                RecordingOutcome::Published(job) => {
                    report.processed += 1;
                    report
                        .published
                        .extend(job.published.iter().map(|p| p.path.clone()));
                }
                RecordingOutcome::Skipped => report.skipped += 1,
                RecordingOutcome::Failed { error, report: job } => {
                    error!(
                        recording = %job.recording.display(),
                        "recording failed: {}",
                        error
                    );
                    report.failures.push(FailedRecording {
                        recording: job.recording.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Runs one recording through the state machine to a terminal state.
    ///
    /// Never propagates stage failures: the recording is retired either
    /// way and the outcome is returned as data.
    pub async fn process_recording(
        &self,
        recording: &Recording,
        profile: &SatelliteProfile,
    ) -> RecordingOutcome {
        let mut report = JobReport::new(recording);

        let claimed = match self.lifecycle.claim(&recording.path, recording.kind).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                metrics::RECORDINGS_PROCESSED
                    .with_label_values(&["skipped"])
                    .inc();
                return RecordingOutcome::Skipped;
            }
            Err(e) => {
                report.finish();
                metrics::RECORDINGS_PROCESSED
                    .with_label_values(&["failed"])
                    .inc();
                return RecordingOutcome::Failed {
                    error: e.into(),
                    report,
                };
            }
        };

        // The capture process may still be flushing the file.
        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            info!(
                recording = %claimed.display(),
                secs = settle.as_secs(),
                "waiting for capture to settle"
            );
            tokio::time::sleep(settle).await;
        }

        let stem = recording.stem();

        // Intermediates share the recording's basename across stages; a
        // stale artifact would be indistinguishable from this job's output.
        if let Err(e) = self.lifecycle.purge_work_files(&stem).await {
            warn!("pre-job purge failed: {}", e);
        }

        let result = self.run_stages(&claimed, &stem, profile, &mut report).await;

        if let Err(e) = self.lifecycle.purge_work_files(&stem).await {
            warn!("post-job purge failed: {}", e);
        }

        let retired = self.lifecycle.retire(&claimed, recording.kind).await;
        report.finish();

        if let Ok(json) = serde_json::to_string(&report) {
            debug!(%json, "job report");
        }

        match (result, retired) {
            (Ok(()), Ok(())) => {
                metrics::RECORDINGS_PROCESSED
                    .with_label_values(&["published"])
                    .inc();
                RecordingOutcome::Published(report)
            }
            (Ok(()), Err(e)) => {
                metrics::RECORDINGS_PROCESSED
                    .with_label_values(&["failed"])
                    .inc();
                RecordingOutcome::Failed {
                    error: e.into(),
                    report,
                }
            }
            (Err(error), retired) => {
                if let Err(e) = retired {
                    error!(recording = %claimed.display(), "failed to retire: {}", e);
                }
                metrics::RECORDINGS_PROCESSED
                    .with_label_values(&["failed"])
                    .inc();
                RecordingOutcome::Failed { error, report }
            }
        }
    }

    /// Runs the decode stages against a claimed recording.
    async fn run_stages(
        &self,
        claimed: &Path,
        stem: &str,
        profile: &SatelliteProfile,
        report: &mut JobReport,
    ) -> Result<(), PipelineError> {
        let work_dir = self.lifecycle.layout().work_dir();
        let basename = work_dir.join(stem);

        let decode_input = if profile.requires_demodulation {
            let params = profile.demod.clone().ok_or_else(|| {
                // Registry validation rejects this; a hand-built profile
                // can still get here.
                PipelineError::DemodulationFailed {
                    reason: "profile has no demodulator parameters".to_string(),
                }
            })?;

            let request = DemodRequest {
                input: claimed.to_path_buf(),
                output: work_dir.join(format!("{}.s", stem)),
                params,
            };

            let timer = Instant::now();
            match self.toolchain.demodulate(request).await {
                Ok(result) => {
                    metrics::STAGE_DURATION
                        .with_label_values(&[Stage::Demodulate.name()])
                        .observe(timer.elapsed().as_secs_f64());
                    report.record(
                        Stage::Demodulate,
                        true,
                        result.exit_code,
                        vec![result.soft_bits.clone()],
                    );
                    result.soft_bits
                }
                Err(e) => {
                    metrics::STAGE_FAILURES
                        .with_label_values(&[Stage::Demodulate.name()])
                        .inc();
                    report.record(Stage::Demodulate, false, e.exit_code(), vec![]);
                    return Err(PipelineError::DemodulationFailed {
                        reason: e.to_string(),
                    });
                }
            }
        } else {
            claimed.to_path_buf()
        };

        let request = DecodeRequest {
            input: decode_input,
            output_basename: basename.clone(),
            params: profile.decode.clone(),
        };

        let timer = Instant::now();
        let decoded = match self.toolchain.decode(request).await {
            Ok(result) => {
                metrics::STAGE_DURATION
                    .with_label_values(&[Stage::Decode.name()])
                    .observe(timer.elapsed().as_secs_f64());
                report.record(
                    Stage::Decode,
                    true,
                    result.exit_code,
                    result.channels.iter().map(|c| c.path.clone()).collect(),
                );
                result
            }
            Err(e) => {
                metrics::STAGE_FAILURES
                    .with_label_values(&[Stage::Decode.name()])
                    .inc();
                report.record(Stage::Decode, false, e.exit_code(), vec![]);
                return Err(PipelineError::DecodeFailed {
                    reason: e.to_string(),
                });
            }
        };

        let plan = profile.composition.plan(&decoded.channels, &basename);
        let composed = self.toolchain.compose(ComposeJob { outputs: plan }).await;
        report.record(
            Stage::Compose,
            !composed.images.is_empty(),
            None,
            composed.images.iter().map(|i| i.path.clone()).collect(),
        );

        if composed.images.is_empty() {
            metrics::STAGE_FAILURES
                .with_label_values(&[Stage::Compose.name()])
                .inc();
            return Err(PipelineError::CompositionFailed {
                recording: stem.to_string(),
            });
        }

        self.publish_images(&composed.images, report).await;

        if let Some(thermal) = &profile.thermal {
            self.run_thermal_pass(&decoded, stem, thermal, report).await;
        }

        Ok(())
    }

    /// Second decode+compose cycle against the first pass's intermediate
    /// product. Failures here never revoke the visible products.
    async fn run_thermal_pass(
        &self,
        first: &DecodeResult,
        stem: &str,
        thermal: &ThermalPass,
        report: &mut JobReport,
    ) {
        let Some(intermediate) = &first.intermediate else {
            warn!(
                recording = stem,
                "decoder left no intermediate product; skipping thermal pass"
            );
            return;
        };

        let work_dir = self.lifecycle.layout().work_dir();
        // Disjoint from the visible pass basename so the two decode
        // invocations cannot clobber each other.
        let thermal_basename = work_dir.join(format!("{}_ir", stem));

        let request = DecodeRequest {
            input: intermediate.clone(),
            output_basename: thermal_basename,
            params: thermal.decode.clone(),
        };

        let timer = Instant::now();
        let decoded = match self.toolchain.decode(request).await {
            Ok(result) => {
                metrics::STAGE_DURATION
                    .with_label_values(&[Stage::ThermalDecode.name()])
                    .observe(timer.elapsed().as_secs_f64());
                report.record(
                    Stage::ThermalDecode,
                    true,
                    result.exit_code,
                    result.channels.iter().map(|c| c.path.clone()).collect(),
                );
                result
            }
            Err(e) => {
                metrics::STAGE_FAILURES
                    .with_label_values(&[Stage::ThermalDecode.name()])
                    .inc();
                report.record(Stage::ThermalDecode, false, e.exit_code(), vec![]);
                warn!(
                    recording = stem,
                    "thermal decode failed, visible products stand: {}", e
                );
                return;
            }
        };

        // Decode guarantees at least one channel on success.
        let Some(channel) = decoded.channels.first() else {
            return;
        };

        let job = ComposeJob {
            outputs: vec![ComposeOutput {
                kind: ImageKind::Infrared,
                output: output_image_path(&work_dir.join(stem), ImageKind::Infrared),
                op: ComposeOp::Convert {
                    input: channel.path.clone(),
                },
            }],
        };

        let composed = self.toolchain.compose(job).await;
        report.record(
            Stage::ThermalCompose,
            !composed.images.is_empty(),
            None,
            composed.images.iter().map(|i| i.path.clone()).collect(),
        );

        if composed.images.is_empty() {
            metrics::STAGE_FAILURES
                .with_label_values(&[Stage::ThermalCompose.name()])
                .inc();
            warn!(recording = stem, "thermal composition produced no image");
            return;
        }

        self.publish_images(&composed.images, report).await;
    }

    /// Moves composed images into the destination directory. Each image
    /// publishes independently; one failing does not roll back the rest.
    async fn publish_images(&self, images: &[ComposedImage], report: &mut JobReport) {
        let mut published = Vec::new();

        for image in images {
            match self.lifecycle.publish(&image.path, &self.destination_dir).await {
                Ok(path) => {
                    metrics::IMAGES_PUBLISHED.inc();
                    report.published.push(PublishedImage {
                        kind: image.kind,
                        path: path.clone(),
                    });
                    published.push(path);
                }
                Err(e) => {
                    metrics::STAGE_FAILURES
                        .with_label_values(&[Stage::Publish.name()])
                        .inc();
                    error!(image = %image.path.display(), "failed to publish: {}", e);
                }
            }
        }

        report.record(Stage::Publish, !published.is_empty(), None, published);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{DirectoryLayout, DisposalPolicy};
    use crate::testing::MockToolchain;
    use tempfile::TempDir;

    fn pipeline(temp: &TempDir) -> PassPipeline<MockToolchain> {
        let layout = DirectoryLayout::new(temp.path().join("data"));
        let lifecycle = FileLifecycle::new(layout, DisposalPolicy::Archive);
        PassPipeline::new(
            PipelineConfig::default().with_settle_delay(0),
            ProfileRegistry::builtin(),
            MockToolchain::new(),
            lifecycle,
            temp.path().join("dest"),
        )
    }

    #[tokio::test]
    async fn test_unknown_satellite_is_a_hard_stop() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp);

        let err = pipeline.process_pass(1, 99999).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownSatellite { catalog_number: 99999 }
        ));
    }

    #[tokio::test]
    async fn test_empty_pass_reports_nothing() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp);

        let report = pipeline
            .process_pass(1, crate::profile::METEOR_M2_ID)
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 0);
        assert!(report.published.is_empty());
        assert!(report.failures.is_empty());
    }
}
