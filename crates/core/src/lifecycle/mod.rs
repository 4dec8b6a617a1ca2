//! Lifecycle module moving recordings between state directories.
//!
//! A recording's basename exists in exactly one of `new`, `found`,
//! `complete` at any instant (or nowhere, once deleted): every transition
//! is an exclusive rename, never a copy. The claim rename doubles as the
//! only cross-instance synchronization primitive.

mod error;
mod manager;
mod types;

pub use error::LifecycleError;
pub use manager::FileLifecycle;
pub use types::{DirectoryLayout, DisposalPolicy, RecordingKind};
