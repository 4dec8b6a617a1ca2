//! Pipeline module: the per-recording state machine.
//!
//! For each discovered recording the pipeline claims it exclusively, waits
//! out the settle delay, drives the external toolchain stages with
//! stage-specific failure policy, publishes whatever imagery was produced,
//! and retires the recording exactly once. Failures are terminal per
//! recording and never abort the iteration over sibling recordings.

mod config;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use runner::{PassPipeline, PipelineError};
pub use types::{
    FailedRecording, JobReport, PassReport, PublishedImage, Recording, RecordingOutcome, Stage,
    StageResult,
};
