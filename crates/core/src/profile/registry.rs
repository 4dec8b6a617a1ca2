//! Satellite profile registry implementation.

use regex_lite::Regex;
use std::collections::HashMap;
use thiserror::Error;

use crate::toolchain::{CompositionMode, DecodeParams, DemodParams};

use super::types::SatelliteProfile;

/// Catalog number of METEOR-M 2.
pub const METEOR_M2_ID: u32 = 40069;

/// Catalog number of METEOR-M2 2.
pub const METEOR_M2_2_ID: u32 = 44387;

/// Errors from profile lookup and registry construction.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile registered for the catalog number.
    #[error("Unknown satellite: catalog number {catalog_number}")]
    UnknownSatellite { catalog_number: u32 },

    /// A profile failed load-time validation.
    #[error("Invalid profile for catalog number {catalog_number}: {reason}")]
    InvalidProfile { catalog_number: u32, reason: String },

    /// A configured profile key is not a catalog number.
    #[error("Invalid catalog number key in profile table: {key}")]
    InvalidCatalogKey { key: String },
}

/// Read-only lookup table from catalog number to decode parameters.
///
/// Validated at construction so an unregistered or inconsistent satellite
/// fails fast instead of surfacing deep inside a decode stage.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<u32, SatelliteProfile>,
}

impl ProfileRegistry {
    /// The built-in profiles for the METEOR LRPT birds.
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert(
            METEOR_M2_ID,
            SatelliteProfile {
                name: "METEOR-M 2".to_string(),
                requires_demodulation: false,
                demod: None,
                decode: DecodeParams {
                    apid_red: 68,
                    apid_green: 65,
                    apid_blue: 64,
                    diff_decode: false,
                    interleaved: false,
                },
                composition: CompositionMode::FalseColorCombine {
                    red: 1,
                    green: 1,
                    blue: 0,
                    infrared: 2,
                },
                thermal: None,
            },
        );

        profiles.insert(
            METEOR_M2_2_ID,
            SatelliteProfile {
                name: "METEOR-M2 2".to_string(),
                requires_demodulation: true,
                demod: Some(DemodParams::default()),
                decode: DecodeParams {
                    apid_red: 68,
                    apid_green: 65,
                    apid_blue: 64,
                    diff_decode: true,
                    interleaved: false,
                },
                composition: CompositionMode::FalseColorCombine {
                    red: 1,
                    green: 1,
                    blue: 0,
                    infrared: 2,
                },
                thermal: None,
            },
        );

        Self { profiles }
    }

    /// An empty registry; useful with `with_profile`.
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Adds or replaces a profile. The profile is validated.
    pub fn with_profile(
        mut self,
        catalog_number: u32,
        profile: SatelliteProfile,
    ) -> Result<Self, ProfileError> {
        validate_profile(catalog_number, &profile)?;
        self.profiles.insert(catalog_number, profile);
        Ok(self)
    }

    /// Builds a registry from the built-ins extended (and overridden) by
    /// configured profile tables keyed by catalog number.
    pub fn from_config(
        overrides: &HashMap<String, SatelliteProfile>,
    ) -> Result<Self, ProfileError> {
        let mut registry = Self::builtin();

        for (key, profile) in overrides {
            let catalog_number: u32 =
                key.parse()
                    .map_err(|_| ProfileError::InvalidCatalogKey { key: key.clone() })?;
            registry.profiles.insert(catalog_number, profile.clone());
        }

        registry.validate()?;
        Ok(registry)
    }

    /// Looks up the profile for a catalog number.
    pub fn lookup(&self, catalog_number: u32) -> Result<&SatelliteProfile, ProfileError> {
        self.profiles
            .get(&catalog_number)
            .ok_or(ProfileError::UnknownSatellite { catalog_number })
    }

    /// Validates every registered profile.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (catalog_number, profile) in &self.profiles {
            validate_profile(*catalog_number, profile)?;
        }
        Ok(())
    }

    /// Number of registered profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry has no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn validate_profile(catalog_number: u32, profile: &SatelliteProfile) -> Result<(), ProfileError> {
    let invalid = |reason: String| ProfileError::InvalidProfile {
        catalog_number,
        reason,
    };

    if profile.requires_demodulation && profile.demod.is_none() {
        return Err(invalid(
            "requires_demodulation is set but no demod parameters given".to_string(),
        ));
    }

    match &profile.composition {
        CompositionMode::CompositeAppend { channels } => {
            if channels.is_empty() {
                return Err(invalid("composite_append lists no channels".to_string()));
            }
            if let Some(ch) = channels.iter().find(|ch| **ch > 2) {
                return Err(invalid(format!("composite_append channel {} out of range", ch)));
            }
        }
        CompositionMode::FalseColorCombine {
            red,
            green,
            blue,
            infrared,
        } => {
            if let Some(ch) = [red, green, blue, infrared].into_iter().find(|ch| **ch > 2) {
                return Err(invalid(format!("false_color_combine channel {} out of range", ch)));
            }
            // Both would publish the _ir output.
            if profile.thermal.is_some() {
                return Err(invalid(
                    "false_color_combine already emits an infrared image; thermal pass would clash"
                        .to_string(),
                ));
            }
        }
        CompositionMode::SeparateConvert => {}
    }

    Ok(())
}

/// Extracts the catalog number from a two-line element block: the field
/// after `"1 "` on the first element line.
pub fn catalog_number_from_tle(tle: &str) -> Option<u32> {
    let re = Regex::new(r"1 (\d+)U").ok()?;
    re.captures(tle)?.get(1)?.as_str().parse().ok()
}

/// Resolves the satellite identity: an explicit catalog number wins over
/// one extracted from a TLE block.
pub fn resolve_catalog_number(explicit: Option<u32>, tle: Option<&str>) -> Option<u32> {
    explicit.or_else(|| tle.and_then(catalog_number_from_tle))
}
