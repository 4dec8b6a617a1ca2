//! Prometheus metrics for the pass pipeline.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

/// Recordings processed, by terminal outcome.
pub static RECORDINGS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "meteor_recordings_processed_total",
            "Total recordings that reached a terminal state",
        ),
        &["result"], // "published", "failed", "skipped"
    )
    .unwrap()
});

/// Stage failures, by stage.
pub static STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("meteor_stage_failures_total", "Total failed pipeline stages"),
        &["stage"],
    )
    .unwrap()
});

/// Images published to the destination directory.
pub static IMAGES_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "meteor_images_published_total",
        "Total images moved to the destination directory",
    )
    .unwrap()
});

/// Stage durations in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "meteor_stage_duration_seconds",
            "Duration of pipeline stages",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["stage"],
    )
    .unwrap()
});

/// Get all pipeline metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RECORDINGS_PROCESSED.clone()),
        Box::new(STAGE_FAILURES.clone()),
        Box::new(IMAGES_PUBLISHED.clone()),
        Box::new(STAGE_DURATION.clone()),
    ]
}
