//! Types for the satellite profile registry.

use serde::{Deserialize, Serialize};

use crate::lifecycle::RecordingKind;
use crate::toolchain::{CompositionMode, DecodeParams, DemodParams};

/// Decode parameters for one satellite, keyed by catalog number in the
/// registry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteProfile {
    /// Human-readable satellite name, for logs and reports.
    pub name: String,

    /// Whether recordings arrive as raw IQ and need demodulation.
    #[serde(default)]
    pub requires_demodulation: bool,

    /// Demodulator tuning; required when `requires_demodulation`.
    #[serde(default)]
    pub demod: Option<DemodParams>,

    /// Decoder channel selection for the visible-light pass.
    pub decode: DecodeParams,

    /// How decoded channels become published imagery.
    pub composition: CompositionMode,

    /// Optional second decode pass against the first pass's intermediate
    /// product, yielding an infrared image.
    #[serde(default)]
    pub thermal: Option<ThermalPass>,
}

/// Parameters of the thermal second pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalPass {
    /// Decoder channel selection for the infrared product.
    pub decode: DecodeParams,
}

impl SatelliteProfile {
    /// The recording kind this profile consumes.
    pub fn input_kind(&self) -> RecordingKind {
        if self.requires_demodulation {
            RecordingKind::Iq
        } else {
            RecordingKind::SoftBit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind_follows_demodulation_flag() {
        let mut profile = SatelliteProfile {
            name: "TEST-SAT".to_string(),
            requires_demodulation: false,
            demod: None,
            decode: DecodeParams {
                apid_red: 68,
                apid_green: 65,
                apid_blue: 64,
                diff_decode: false,
                interleaved: false,
            },
            composition: CompositionMode::SeparateConvert,
            thermal: None,
        };
        assert_eq!(profile.input_kind(), RecordingKind::SoftBit);

        profile.requires_demodulation = true;
        assert_eq!(profile.input_kind(), RecordingKind::Iq);
    }

    #[test]
    fn test_profile_deserialization() {
        let toml = r#"
name = "METEOR-M2 2"
requires_demodulation = true

[demod]
mode = "oqpsk"

[decode]
apid_red = 68
apid_green = 65
apid_blue = 64
diff_decode = true

[composition]
mode = "false_color_combine"
red = 1
green = 1
blue = 0
infrared = 2
"#;
        let profile: SatelliteProfile = toml::from_str(toml).unwrap();
        assert_eq!(profile.name, "METEOR-M2 2");
        assert!(profile.requires_demodulation);
        assert!(profile.demod.is_some());
        assert!(profile.decode.diff_decode);
        assert!(profile.thermal.is_none());
    }
}
