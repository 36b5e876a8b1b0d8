// In: src/error.rs

//! This module defines the single, unified fault type for the entire sevenpull library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every layer (sources, cursor, codec stages, the pipeline driver and the FFI
//! boundary) reports failures as a `Fault`. Non-failure outcomes are carried by
//! `crate::types::Signal`.

use thiserror::Error;

/// The category of a fault. Every fault is terminal for the pipeline that saw it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    // =========================================================================
    // === Boundary faults (raised while crossing into the foreign runtime)
    // =========================================================================
    /// The foreign call raised an exception.
    #[error("foreign exception")]
    ForeignException,

    /// The foreign call returned a non-zero native-style result code.
    #[error("native code {0}")]
    NativeCode(i32),

    /// The foreign object lacks the capability the adapter binds to.
    #[error("missing capability")]
    MissingCapability,

    // =========================================================================
    // === Data faults (local to one coded entry)
    // =========================================================================
    /// Malformed or truncated compressed data.
    #[error("codec corruption")]
    CodecCorruption,

    /// Output decoded fine but does not match the expected CRC-32.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The coder id is not one this crate can build.
    #[error("unsupported method")]
    UnsupportedMethod,

    // =========================================================================
    // === Usage and resource faults
    // =========================================================================
    /// A stage or pipeline was pulled after it reached `Eof` or `Faulted`.
    #[error("use after terminal state")]
    UseAfterTerminal,

    /// An allocation or a fixed capacity could not satisfy the request.
    #[error("resource exhausted")]
    ResourceExhausted,

    #[error("invalid configuration")]
    InvalidConfig,

    /// An I/O error from a Rust-side source (file, reader).
    #[error("i/o error")]
    Io,

    /// A `DeadlineSource` budget expired.
    #[error("timed out")]
    TimedOut,

    /// The encoder side of a codec failed.
    #[error("encoder failure")]
    EncoderFailure,

    /// `NeedsRetry` persisted past the retry policy in a draining helper.
    #[error("retry budget exhausted")]
    RetryExhausted,
}

/// What an archive-level caller should do with the entry whose pipeline faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDisposition {
    /// The fault is confined to this entry's coded data; other entries may still be read.
    SkipEntry,
    /// The source, boundary or caller is broken; continuing is pointless.
    AbortArchive,
}

/// A terminal failure: a kind plus a human-readable message.
///
/// Immutable once produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct Fault {
    kind: FaultKind,
    message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// A non-zero status returned by the foreign `read` call.
    pub fn native_code(code: i32) -> Self {
        Self::new(
            FaultKind::NativeCode(code),
            format!("foreign read returned status {}", code),
        )
    }

    pub fn foreign_exception(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ForeignException, message)
    }

    pub fn corruption(codec: &str, message: impl std::fmt::Display) -> Self {
        Self::new(FaultKind::CodecCorruption, format!("{}: {}", codec, message))
    }

    pub fn use_after_terminal(what: &str) -> Self {
        Self::new(
            FaultKind::UseAfterTerminal,
            format!("{} was pulled after reaching a terminal state", what),
        )
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidConfig, message)
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ResourceExhausted, message)
    }

    /// Decides whether the fault is local to one entry or fatal for the whole archive.
    pub fn disposition(&self) -> EntryDisposition {
        match self.kind {
            FaultKind::CodecCorruption | FaultKind::ChecksumMismatch | FaultKind::UnsupportedMethod => {
                EntryDisposition::SkipEntry
            }
            _ => EntryDisposition::AbortArchive,
        }
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::new(FaultKind::Io, err.to_string())
    }
}

impl From<std::collections::TryReserveError> for Fault {
    fn from(err: std::collections::TryReserveError) -> Self {
        Fault::exhausted(err.to_string())
    }
}

impl From<serde_json::Error> for Fault {
    fn from(err: serde_json::Error) -> Self {
        Fault::invalid_config(format!("malformed JSON: {}", err))
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for Fault {
    fn from(err: pyo3::PyErr) -> Self {
        Fault::foreign_exception(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<Fault> for pyo3::PyErr {
    fn from(err: Fault) -> pyo3::PyErr {
        crate::ffi::python::SevenPullError::new_err(err.to_string())
    }
}
