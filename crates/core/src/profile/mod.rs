//! Satellite profile registry.
//!
//! Maps a satellite catalog number to the parameters that drive its decode:
//! demodulator tuning, decoder channel selection, composition mode, and the
//! optional thermal second pass. The registry is immutable after
//! construction and validated up front.

mod registry;
mod types;

pub use registry::{
    catalog_number_from_tle, resolve_catalog_number, ProfileError, ProfileRegistry, METEOR_M2_2_ID,
    METEOR_M2_ID,
};
pub use types::{SatelliteProfile, ThermalPass};
