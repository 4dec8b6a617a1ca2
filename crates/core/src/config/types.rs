use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::pipeline::PipelineConfig;
use crate::profile::SatelliteProfile;
use crate::toolchain::ToolchainConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub station: StationConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Per-satellite profile tables keyed by catalog number, extending
    /// or overriding the built-in registry.
    #[serde(default)]
    pub profiles: HashMap<String, SatelliteProfile>,
}

/// Ground station directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationConfig {
    /// Root of the lifecycle directory tree
    /// (`new_*`/`found_*`/`complete_*`/`tmp`).
    pub data_dir: PathBuf,
    /// Upload-staging directory for finished imagery.
    pub destination_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DisposalPolicy;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[station]
data_dir = "/datadrive/meteor"
destination_dir = "/srv/upload"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.station.data_dir, PathBuf::from("/datadrive/meteor"));
        assert_eq!(config.pipeline.settle_delay_secs, 120);
        assert_eq!(config.pipeline.disposal, DisposalPolicy::Archive);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_deserialize_missing_station_fails() {
        let toml = r#"
[pipeline]
settle_delay_secs = 0
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_with_profile_table() {
        let toml = r#"
[station]
data_dir = "/datadrive/meteor"
destination_dir = "/srv/upload"

[pipeline]
settle_delay_secs = 30
disposal = "delete"

[toolchain]
decoder_path = "/opt/bin/medet_arm"

[profiles.57166]
name = "METEOR-M2 3"

[profiles.57166.decode]
apid_red = 68
apid_green = 65
apid_blue = 64
diff_decode = true
interleaved = true

[profiles.57166.composition]
mode = "separate_convert"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pipeline.settle_delay_secs, 30);
        assert_eq!(config.pipeline.disposal, DisposalPolicy::Delete);
        assert_eq!(
            config.toolchain.decoder_path,
            PathBuf::from("/opt/bin/medet_arm")
        );

        let profile = config.profiles.get("57166").unwrap();
        assert_eq!(profile.name, "METEOR-M2 3");
        assert!(profile.decode.interleaved);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let toml = r#"
[station]
data_dir = "/data"
destination_dir = "/dest"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.station.data_dir, config.station.data_dir);
    }
}
