//! Pipeline lifecycle integration tests.
//!
//! These tests drive the pass pipeline with the mock toolchain over real
//! tempdir lifecycles:
//! - Directory disjointness through claim/retire
//! - Claim-race idempotence
//! - One vs two decode cycles depending on the thermal flag
//! - Independent visible/infrared publication
//! - Work-file purge guarantees
//! - Unknown satellite and stage-failure terminal states

use std::path::PathBuf;

use tempfile::TempDir;

use meteor_core::{
    lifecycle::{DirectoryLayout, DisposalPolicy, FileLifecycle, RecordingKind},
    pipeline::{PassPipeline, PipelineConfig, PipelineError, Recording, RecordingOutcome},
    profile::{ProfileRegistry, SatelliteProfile, ThermalPass},
    testing::{DecodeBehavior, MockToolchain},
    toolchain::{CompositionMode, DecodeParams, DemodParams, ImageKind},
};

/// Catalog numbers of the test profiles.
const APPEND_SAT: u32 = 1001;
const THERMAL_SAT: u32 = 1002;
const IQ_SAT: u32 = 1003;
const FALSE_COLOR_SAT: u32 = 1004;

/// Test helper wiring a pipeline over tempdirs and the mock toolchain.
struct TestHarness {
    pipeline: PassPipeline<MockToolchain>,
    toolchain: MockToolchain,
    temp: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_disposal(DisposalPolicy::Archive)
    }

    fn with_disposal(disposal: DisposalPolicy) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let layout = DirectoryLayout::new(temp.path().join("data"));
        let lifecycle = FileLifecycle::new(layout, disposal);
        let toolchain = MockToolchain::new();

        let pipeline = PassPipeline::new(
            PipelineConfig::default().with_settle_delay(0),
            test_registry(),
            toolchain.clone(),
            lifecycle,
            temp.path().join("dest"),
        );

        let harness = Self {
            pipeline,
            toolchain,
            temp,
        };
        harness.ensure_layout();
        harness
    }

    fn ensure_layout(&self) {
        let layout = DirectoryLayout::new(self.data_dir());
        for kind in [RecordingKind::SoftBit, RecordingKind::Iq] {
            for dir in [
                layout.new_dir(kind),
                layout.found_dir(kind),
                layout.complete_dir(kind),
            ] {
                std::fs::create_dir_all(dir).unwrap();
            }
        }
        std::fs::create_dir_all(layout.work_dir()).unwrap();
    }

    fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    fn dest_dir(&self) -> PathBuf {
        self.temp.path().join("dest")
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.data_dir().join(name)
    }

    /// Creates a recording file in the new directory of its kind.
    fn create_recording(&self, name: &str, kind: RecordingKind) -> PathBuf {
        let dir = match kind {
            RecordingKind::SoftBit => self.dir("new_s"),
            RecordingKind::Iq => self.dir("new_iq"),
        };
        let path = dir.join(name);
        std::fs::write(&path, b"recording").expect("Failed to create recording");
        path
    }

    fn dest_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.dest_dir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn work_files_with_prefix(&self, prefix: &str) -> Vec<String> {
        std::fs::read_dir(self.dir("tmp"))
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                    .filter(|n| n.starts_with(prefix))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn decode_params() -> DecodeParams {
    DecodeParams {
        apid_red: 68,
        apid_green: 65,
        apid_blue: 64,
        diff_decode: false,
        interleaved: false,
    }
}

fn test_registry() -> ProfileRegistry {
    let append = SatelliteProfile {
        name: "APPEND-SAT".to_string(),
        requires_demodulation: false,
        demod: None,
        decode: decode_params(),
        composition: CompositionMode::CompositeAppend {
            channels: vec![2, 1, 0],
        },
        thermal: None,
    };

    let thermal = SatelliteProfile {
        thermal: Some(ThermalPass {
            decode: DecodeParams {
                apid_red: 68,
                apid_green: 68,
                apid_blue: 68,
                diff_decode: false,
                interleaved: false,
            },
        }),
        name: "THERMAL-SAT".to_string(),
        ..append.clone()
    };

    let iq = SatelliteProfile {
        name: "IQ-SAT".to_string(),
        requires_demodulation: true,
        demod: Some(DemodParams::default()),
        decode: decode_params(),
        composition: CompositionMode::CompositeAppend {
            channels: vec![2, 1, 0],
        },
        thermal: None,
    };

    let false_color = SatelliteProfile {
        name: "FC-SAT".to_string(),
        requires_demodulation: false,
        demod: None,
        decode: decode_params(),
        composition: CompositionMode::FalseColorCombine {
            red: 1,
            green: 1,
            blue: 0,
            infrared: 2,
        },
        thermal: None,
    };

    ProfileRegistry::builtin()
        .with_profile(APPEND_SAT, append)
        .unwrap()
        .with_profile(THERMAL_SAT, thermal)
        .unwrap()
        .with_profile(IQ_SAT, iq)
        .unwrap()
        .with_profile(FALSE_COLOR_SAT, false_color)
        .unwrap()
}

/// Asserts a basename exists in exactly one of the three lifecycle
/// directories.
fn assert_in_exactly_one(harness: &TestHarness, kind_suffix: &str, name: &str) {
    let dirs = [
        format!("new_{}", kind_suffix),
        format!("found_{}", kind_suffix),
        format!("complete_{}", kind_suffix),
    ];
    let holders: Vec<&String> = dirs
        .iter()
        .filter(|d| harness.dir(d).join(name).exists())
        .collect();
    assert_eq!(holders.len(), 1, "{} found in {:?}", name, holders);
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn test_soft_bit_composite_append_end_to_end() {
    let harness = TestHarness::new();
    harness.create_recording("data_1234_20200101.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1234, APPEND_SAT).await.unwrap();

    assert_eq!(report.processed, 1);
    assert!(report.failures.is_empty());
    assert_eq!(harness.dest_files(), vec!["data_1234_20200101.png"]);
    assert!(harness.dir("complete_s").join("data_1234_20200101.s").exists());
    assert!(!harness.dir("new_s").join("data_1234_20200101.s").exists());
    assert!(!harness.dir("found_s").join("data_1234_20200101.s").exists());
}

#[tokio::test]
async fn test_iq_demodulation_failure_is_terminal() {
    let harness = TestHarness::new();
    harness.toolchain.set_demodulation_fails(true).await;
    harness.create_recording("data_5678_20200101.iq", RecordingKind::Iq);

    let report = harness.pipeline.process_pass(5678, IQ_SAT).await.unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("Demodulation failed"));

    // No later stage ever ran and nothing was published.
    assert!(harness.toolchain.decode_requests().await.is_empty());
    assert!(harness.toolchain.compose_jobs().await.is_empty());
    assert!(harness.dest_files().is_empty());

    // The recording is still retired so it is never reprocessed.
    assert!(harness.dir("complete_iq").join("data_5678_20200101.iq").exists());
}

#[tokio::test]
async fn test_iq_demodulation_success_decodes_soft_bits() {
    let harness = TestHarness::new();
    harness.create_recording("data_5678_20200101.iq", RecordingKind::Iq);

    let report = harness.pipeline.process_pass(5678, IQ_SAT).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(harness.toolchain.demod_requests().await.len(), 1);

    // The decode consumed the demodulated soft bits, not the IQ file.
    let decodes = harness.toolchain.decode_requests().await;
    assert_eq!(decodes.len(), 1);
    assert_eq!(
        decodes[0].input,
        harness.dir("tmp").join("data_5678_20200101.s")
    );
    assert_eq!(harness.dest_files(), vec!["data_5678_20200101.png"]);
}

// =============================================================================
// Thermal pass behavior
// =============================================================================

#[tokio::test]
async fn test_no_thermal_means_exactly_one_decode_cycle() {
    let harness = TestHarness::new();
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    assert_eq!(harness.toolchain.decode_requests().await.len(), 1);
    assert_eq!(harness.toolchain.compose_jobs().await.len(), 1);
}

#[tokio::test]
async fn test_thermal_runs_two_decode_cycles() {
    let harness = TestHarness::new();
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1, THERMAL_SAT).await.unwrap();

    let decodes = harness.toolchain.decode_requests().await;
    assert_eq!(decodes.len(), 2);
    // The second decode runs against the first pass's intermediate
    // product, with a disjoint output basename.
    assert_eq!(decodes[1].input, harness.dir("tmp").join("data_1_a.dec"));
    assert_eq!(decodes[1].output_basename, harness.dir("tmp").join("data_1_a_ir"));

    assert_eq!(report.processed, 1);
    assert_eq!(
        harness.dest_files(),
        vec!["data_1_a.png", "data_1_a_ir.png"]
    );
}

#[tokio::test]
async fn test_thermal_compose_failure_keeps_visible_image() {
    let harness = TestHarness::new();
    harness.toolchain.fail_compose_kind(ImageKind::Infrared).await;
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1, THERMAL_SAT).await.unwrap();

    // Infrared failed but the recording still counts as published.
    assert_eq!(report.processed, 1);
    assert!(report.failures.is_empty());
    assert_eq!(harness.dest_files(), vec!["data_1_a.png"]);
}

#[tokio::test]
async fn test_thermal_decode_failure_keeps_visible_image() {
    let harness = TestHarness::new();
    // First decode succeeds, second produces nothing.
    harness
        .toolchain
        .push_decode_behavior(DecodeBehavior::default())
        .await;
    harness
        .toolchain
        .push_decode_behavior(DecodeBehavior {
            channels: vec![],
            intermediate: false,
        })
        .await;
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1, THERMAL_SAT).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(harness.dest_files(), vec!["data_1_a.png"]);
}

#[tokio::test]
async fn test_thermal_skipped_without_intermediate() {
    let harness = TestHarness::new();
    harness
        .toolchain
        .push_decode_behavior(DecodeBehavior {
            channels: vec![0, 1, 2],
            intermediate: false,
        })
        .await;
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1, THERMAL_SAT).await.unwrap();

    // Only the visible cycle ran.
    assert_eq!(harness.toolchain.decode_requests().await.len(), 1);
    assert_eq!(report.processed, 1);
    assert_eq!(harness.dest_files(), vec!["data_1_a.png"]);
}

// =============================================================================
// False color composition
// =============================================================================

#[tokio::test]
async fn test_false_color_publishes_fc_and_ir() {
    let harness = TestHarness::new();
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness
        .pipeline
        .process_pass(1, FALSE_COLOR_SAT)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(
        harness.dest_files(),
        vec!["data_1_a_fc.png", "data_1_a_ir.png"]
    );
}

#[tokio::test]
async fn test_false_color_partial_success_publishes_the_rest() {
    let harness = TestHarness::new();
    harness.toolchain.fail_compose_kind(ImageKind::FalseColor).await;
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness
        .pipeline
        .process_pass(1, FALSE_COLOR_SAT)
        .await
        .unwrap();

    // One output failing does not abort the other.
    assert_eq!(report.processed, 1);
    assert!(report.failures.is_empty());
    assert_eq!(harness.dest_files(), vec!["data_1_a_ir.png"]);
}

#[tokio::test]
async fn test_compose_zero_images_is_terminal() {
    let harness = TestHarness::new();
    harness.toolchain.fail_compose_kind(ImageKind::FalseColor).await;
    harness.toolchain.fail_compose_kind(ImageKind::Infrared).await;
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness
        .pipeline
        .process_pass(1, FALSE_COLOR_SAT)
        .await
        .unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(harness.dest_files().is_empty());
    // Still retired.
    assert!(harness.dir("complete_s").join("data_1_a.s").exists());
}

// =============================================================================
// Lifecycle invariants
// =============================================================================

#[tokio::test]
async fn test_basename_in_exactly_one_directory_after_processing() {
    let harness = TestHarness::new();
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    assert_in_exactly_one(&harness, "s", "data_1_a.s");
}

#[tokio::test]
async fn test_decode_failure_still_retires_the_recording() {
    let harness = TestHarness::new();
    harness
        .toolchain
        .push_decode_behavior(DecodeBehavior {
            channels: vec![],
            intermediate: false,
        })
        .await;
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("Decode failed"));
    assert_in_exactly_one(&harness, "s", "data_1_a.s");
    assert!(harness.dir("complete_s").join("data_1_a.s").exists());
}

#[tokio::test]
async fn test_delete_disposal_removes_the_recording() {
    let harness = TestHarness::with_disposal(DisposalPolicy::Delete);
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let report = harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    assert_eq!(report.processed, 1);
    for dir in ["new_s", "found_s", "complete_s"] {
        assert!(!harness.dir(dir).join("data_1_a.s").exists());
    }
    // The image was still published.
    assert_eq!(harness.dest_files(), vec!["data_1_a.png"]);
}

#[tokio::test]
async fn test_claim_race_is_a_silent_skip() {
    let harness = TestHarness::new();

    // The file vanished between discovery and claim.
    let recording = Recording {
        kind: RecordingKind::SoftBit,
        path: harness.dir("new_s").join("data_1_gone.s"),
    };
    let profile = test_registry().lookup(APPEND_SAT).unwrap().clone();

    let outcome = harness
        .pipeline
        .process_recording(&recording, &profile)
        .await;

    assert!(matches!(outcome, RecordingOutcome::Skipped));
    // Nothing ran and nothing was published.
    assert!(harness.toolchain.decode_requests().await.is_empty());
    assert!(harness.dest_files().is_empty());
}

#[tokio::test]
async fn test_stale_work_files_are_purged_before_the_job() {
    let harness = TestHarness::new();

    // Leftovers from a previous job under the same fixed basename.
    std::fs::write(harness.dir("tmp").join("data_1_a_0.bmp"), b"stale").unwrap();
    std::fs::write(harness.dir("tmp").join("data_1_a.dec"), b"stale").unwrap();

    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);
    let report = harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    assert_eq!(report.processed, 1);
    // The post-job purge leaves no trace of the basename in the work dir.
    assert!(harness.work_files_with_prefix("data_1_a").is_empty());
}

#[tokio::test]
async fn test_unknown_satellite_leaves_recordings_untouched() {
    let harness = TestHarness::new();
    let path = harness.create_recording("data_1_a.s", RecordingKind::SoftBit);

    let err = harness.pipeline.process_pass(1, 99999).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnknownSatellite { .. }));
    assert!(path.exists(), "recording must stay in its pre-claim directory");
    assert!(harness.dest_files().is_empty());
}

#[tokio::test]
async fn test_counterpart_kind_recordings_are_discarded() {
    let harness = TestHarness::new();
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);
    let same_pass_iq = harness.create_recording("data_1_a.iq", RecordingKind::Iq);
    let other_pass_iq = harness.create_recording("data_2_b.iq", RecordingKind::Iq);

    harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    // The unused kind for this pass is removed; other passes are not.
    assert!(!same_pass_iq.exists());
    assert!(other_pass_iq.exists());
}

#[tokio::test]
async fn test_multiple_recordings_processed_independently() {
    let harness = TestHarness::new();
    harness.create_recording("data_1_a.s", RecordingKind::SoftBit);
    harness.create_recording("data_1_b.s", RecordingKind::SoftBit);

    // Second file's decode fails; first must still publish.
    harness
        .toolchain
        .push_decode_behavior(DecodeBehavior::default())
        .await;
    harness
        .toolchain
        .push_decode_behavior(DecodeBehavior {
            channels: vec![],
            intermediate: false,
        })
        .await;

    let report = harness.pipeline.process_pass(1, APPEND_SAT).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(harness.dest_files(), vec!["data_1_a.png"]);
    assert!(harness.dir("complete_s").join("data_1_a.s").exists());
    assert!(harness.dir("complete_s").join("data_1_b.s").exists());
}

// =============================================================================
// Job reports
// =============================================================================

#[tokio::test]
async fn test_report_records_stage_order() {
    let harness = TestHarness::new();
    let path = harness.create_recording("data_1_a.s", RecordingKind::SoftBit);
    let profile = test_registry().lookup(THERMAL_SAT).unwrap().clone();
    let recording = Recording {
        kind: RecordingKind::SoftBit,
        path,
    };

    let outcome = harness
        .pipeline
        .process_recording(&recording, &profile)
        .await;

    let RecordingOutcome::Published(report) = outcome else {
        panic!("expected published outcome");
    };
    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage.name()).collect();
    assert_eq!(
        stages,
        vec![
            "decode",
            "compose",
            "publish",
            "thermal_decode",
            "thermal_compose",
            "publish"
        ]
    );
    assert!(report.stages.iter().all(|s| s.success));
    assert_eq!(report.published.len(), 2);
    assert!(report.finished_at.is_some());
}
