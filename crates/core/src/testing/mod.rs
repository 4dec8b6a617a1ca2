//! Testing utilities and mock implementations.
//!
//! Provides a controllable mock of the external toolchain so the pipeline
//! can be exercised end-to-end without the real binaries.

mod mock_toolchain;

pub use mock_toolchain::{DecodeBehavior, MockToolchain};
