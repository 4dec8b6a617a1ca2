use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("METEOR_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[station]
data_dir = "/datadrive/meteor"
destination_dir = "/srv/upload"

[pipeline]
settle_delay_secs = 60
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.pipeline.settle_delay_secs, 60);
    }

    #[test]
    fn test_load_config_from_str_missing_station() {
        let toml = r#"
[pipeline]
settle_delay_secs = 60
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_env_override_wins_over_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[station]
data_dir = "/datadrive/meteor"
destination_dir = "/srv/upload"

[pipeline]
disposal = "archive"
"#
        )
        .unwrap();

        std::env::set_var("METEOR_PIPELINE_DISPOSAL", "delete");
        let config = load_config(temp_file.path());
        std::env::remove_var("METEOR_PIPELINE_DISPOSAL");

        let config = config.unwrap();
        assert_eq!(
            config.pipeline.disposal,
            crate::lifecycle::DisposalPolicy::Delete
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[station]
data_dir = "/datadrive/meteor"
destination_dir = "/srv/upload"

[toolchain]
decoder_path = "/opt/bin/medet"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.station.data_dir, PathBuf::from("/datadrive/meteor"));
        assert_eq!(config.toolchain.decoder_path, PathBuf::from("/opt/bin/medet"));
    }
}
