//! This module defines the core, strongly-typed values passed between the layers
//! of the pull pipeline.
//!
//! It includes the `Signal` half of the pull result (the `Fault` half lives in
//! `crate::error`) and the `CodecKind` enum which names every codec the
//! pipeline can build.

pub mod codec_kind;
pub mod signal;

// Re-export the main type(s) for easier access.
pub use codec_kind::{CodecKind, Direction};
pub use signal::{PullResult, Signal, StageState};
