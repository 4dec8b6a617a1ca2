//! Types for the pipeline module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::lifecycle::RecordingKind;
use crate::toolchain::ImageKind;

/// A discovered recording, not yet claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Kind of the recording.
    pub kind: RecordingKind,
    /// Current path (in the new directory until claimed).
    pub path: PathBuf,
}

impl Recording {
    /// The recording's basename without extension; used as the fixed
    /// basename of every intermediate and output.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// One stage of a decode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Demodulate,
    Decode,
    Compose,
    ThermalDecode,
    ThermalCompose,
    Publish,
}

impl Stage {
    /// Stage name for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Demodulate => "demodulate",
            Self::Decode => "decode",
            Self::Compose => "compose",
            Self::ThermalDecode => "thermal_decode",
            Self::ThermalCompose => "thermal_compose",
            Self::Publish => "publish",
        }
    }
}

/// Outcome of one stage, in invocation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage ran.
    pub stage: Stage,
    /// Whether the stage succeeded.
    pub success: bool,
    /// Exit code of the underlying tool, when one was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Files the stage produced.
    pub produced: Vec<PathBuf>,
}

/// An image that reached the destination directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedImage {
    /// What the image is.
    pub kind: ImageKind,
    /// Final path in the destination directory.
    pub path: PathBuf,
}

/// Report for one claimed recording, discarded after the recording
/// reaches a terminal lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// Original recording path at discovery time.
    pub recording: PathBuf,
    /// Kind of the recording.
    pub kind: RecordingKind,
    /// When the job started.
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Ordered stage outcomes.
    pub stages: Vec<StageResult>,
    /// Images that were published.
    pub published: Vec<PublishedImage>,
}

impl JobReport {
    /// Creates an empty report for a recording.
    pub fn new(recording: &Recording) -> Self {
        Self {
            recording: recording.path.clone(),
            kind: recording.kind,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            published: Vec::new(),
        }
    }

    /// Records a stage outcome.
    pub fn record(
        &mut self,
        stage: Stage,
        success: bool,
        exit_code: Option<i32>,
        produced: Vec<PathBuf>,
    ) {
        self.stages.push(StageResult {
            stage,
            success,
            exit_code,
            produced,
        });
    }

    /// Marks the job finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// Terminal outcome of one discovered recording.
#[derive(Debug)]
pub enum RecordingOutcome {
    /// Another instance claimed the recording first.
    Skipped,
    /// At least one image was published; the recording was retired.
    Published(JobReport),
    /// A stage failed terminally; the recording was still retired.
    Failed {
        error: super::runner::PipelineError,
        report: JobReport,
    },
}

/// A recording that failed, for the pass summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecording {
    pub recording: PathBuf,
    pub error: String,
}

/// Summary of one processed pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Pass identifier used for discovery.
    pub pass_id: u64,
    /// Catalog number of the satellite.
    pub catalog_number: u32,
    /// Satellite name from the profile.
    pub satellite: String,
    /// Recordings that produced published imagery.
    pub processed: usize,
    /// Recordings another instance claimed first.
    pub skipped: usize,
    /// All published image paths.
    pub published: Vec<PathBuf>,
    /// Recordings that failed terminally.
    pub failures: Vec<FailedRecording>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_stem() {
        let recording = Recording {
            kind: RecordingKind::SoftBit,
            path: PathBuf::from("/data/new_s/data_1234_20200101.s"),
        };
        assert_eq!(recording.stem(), "data_1234_20200101");
    }

    #[test]
    fn test_job_report_records_stages_in_order() {
        let recording = Recording {
            kind: RecordingKind::Iq,
            path: PathBuf::from("/data/new_iq/data_1_a.iq"),
        };
        let mut report = JobReport::new(&recording);

        report.record(Stage::Demodulate, true, Some(0), vec![PathBuf::from("/t/a.s")]);
        report.record(Stage::Decode, false, Some(1), vec![]);
        report.finish();

        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages[0].stage, Stage::Demodulate);
        assert!(report.stages[0].success);
        assert_eq!(report.stages[1].stage, Stage::Decode);
        assert!(!report.stages[1].success);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_pass_report_serialization() {
        let report = PassReport {
            pass_id: 1234,
            catalog_number: 40069,
            satellite: "METEOR-M 2".to_string(),
            processed: 1,
            skipped: 0,
            published: vec![PathBuf::from("/dest/data_1234_x_fc.png")],
            failures: vec![],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"pass_id\":1234"));
        assert!(json.contains("METEOR-M 2"));
    }
}
