//! Configuration for the pipeline module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::lifecycle::DisposalPolicy;

/// Configuration for the pass pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seconds to wait after claiming a recording before the first tool
    /// invocation. The capture process may still be flushing the file
    /// when it first appears; decoding a still-growing recording yields
    /// corrupt output.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// What happens to a recording once processing finishes.
    #[serde(default)]
    pub disposal: DisposalPolicy,
}

fn default_settle_delay() -> u64 {
    120
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: default_settle_delay(),
            disposal: DisposalPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// The settle delay as a duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Sets the settle delay in seconds.
    pub fn with_settle_delay(mut self, secs: u64) -> Self {
        self.settle_delay_secs = secs;
        self
    }

    /// Sets the disposal policy.
    pub fn with_disposal(mut self, disposal: DisposalPolicy) -> Self {
        self.disposal = disposal;
        self
    }
}
