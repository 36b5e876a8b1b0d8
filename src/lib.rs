//! This file is the root of the `sevenpull` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`source`, `cursor`,
//!     `kernels`, `pipeline`, etc.) and re-exporting the types callers use.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (feature `python`).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[doc(hidden)]
pub use log as __log;

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod config;
pub mod cursor;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod source;
pub mod types;

#[cfg(feature = "python")]
mod ffi;

pub use config::{PipelineConfig, RetryPolicy};
pub use cursor::BufferedCursor;
pub use error::{EntryDisposition, Fault, FaultKind};
pub use pipeline::{drain_independent, ChainPlan, CodecMethod, CodecStage, Pipeline, ProgressObserver};
pub use source::ByteSource;
pub use types::{CodecKind, Direction, PullResult, Signal, StageState};

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `sevenpull` Python module, containing all exposed Rust functions.
#[cfg(feature = "python")]
#[pymodule]
fn sevenpull(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use ffi::python::{PyPipeline, SevenPullError};

    // --- Streaming class ---
    m.add_class::<PyPipeline>()?;

    // --- One-shot helpers ---
    m.add_function(wrap_pyfunction!(ffi::python::encode_bytes_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::python::decode_bytes_py, m)?)?;

    // --- Expose the custom error type ---
    m.add("SevenPullError", m.py().get_type_bound::<SevenPullError>())?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;

    m.add_function(wrap_pyfunction!(ffi::python::enable_verbose_logging_py, m)?)?;

    Ok(())
}
