use super::{types::Config, ConfigError};
use crate::profile::ProfileRegistry;

/// Validate configuration
/// Currently validates:
/// - Station section exists (enforced by serde)
/// - Destination directory is outside the lifecycle tree
/// - Profile tables build a valid registry
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.station.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "station.data_dir cannot be empty".to_string(),
        ));
    }

    if config.station.destination_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "station.destination_dir cannot be empty".to_string(),
        ));
    }

    // Publishing into the lifecycle tree would break the one-directory
    // basename invariant.
    if config.station.destination_dir.starts_with(&config.station.data_dir) {
        return Err(ConfigError::ValidationError(
            "station.destination_dir must not be inside station.data_dir".to_string(),
        ));
    }

    ProfileRegistry::from_config(&config.profiles)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base_config(data_dir: &str, destination_dir: &str) -> Config {
        load_config_from_str(&format!(
            r#"
[station]
data_dir = "{}"
destination_dir = "{}"
"#,
            data_dir, destination_dir
        ))
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = base_config("/datadrive/meteor", "/srv/upload");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_destination_inside_data_dir_fails() {
        let config = base_config("/datadrive/meteor", "/datadrive/meteor/out");
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_bad_profile_fails() {
        let config = load_config_from_str(
            r#"
[station]
data_dir = "/data"
destination_dir = "/dest"

[profiles.12345]
name = "BROKEN"
requires_demodulation = true

[profiles.12345.decode]
apid_red = 68
apid_green = 65
apid_blue = 64

[profiles.12345.composition]
mode = "separate_convert"
"#,
        )
        .unwrap();

        let result = validate_config(&config);
        assert!(result.is_err());
    }
}
