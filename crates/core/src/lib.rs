pub mod config;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod profile;
pub mod scan;
pub mod testing;
pub mod toolchain;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use lifecycle::{DirectoryLayout, DisposalPolicy, FileLifecycle, LifecycleError, RecordingKind};
pub use pipeline::{PassPipeline, PassReport, PipelineConfig, PipelineError, RecordingOutcome};
pub use profile::{
    catalog_number_from_tle, resolve_catalog_number, ProfileError, ProfileRegistry,
    SatelliteProfile,
};
pub use toolchain::{CommandToolchain, Toolchain, ToolchainConfig, ToolchainError};
