//! The non-fault outcomes of a single pull, and the per-stage lifecycle.

use std::fmt;

use crate::error::Fault;

/// The outcome of one `pull()` that did not fail.
///
/// Together with `Fault` this forms the single result space every layer of the
/// pipeline speaks: sources, the cursor, codec stages and the top-level driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `n` bytes were written to the front of the caller's buffer. `n` may be
    /// smaller than requested (a short read) and is never an error on its own.
    Ok(usize),
    /// Transient condition; the same call can be re-issued immediately.
    NeedsRetry,
    /// Normal end of stream.
    Eof,
}

impl Signal {
    /// Number of bytes transferred, zero for `NeedsRetry` and `Eof`.
    pub fn transferred(&self) -> usize {
        match self {
            Signal::Ok(n) => *n,
            Signal::NeedsRetry | Signal::Eof => 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Signal::Eof)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Ok(n) => write!(f, "Ok({})", n),
            Signal::NeedsRetry => write!(f, "NeedsRetry"),
            Signal::Eof => write!(f, "Eof"),
        }
    }
}

/// The unified result of every pull in the crate.
pub type PullResult = Result<Signal, Fault>;

/// Lifecycle of a codec stage: `Ready -> Streaming -> (Eof | Faulted)`.
///
/// `Eof` and `Faulted` are terminal; a stage in either state rejects further
/// pulls with `FaultKind::UseAfterTerminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Ready,
    Streaming,
    Eof,
    Faulted,
}

impl StageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Eof | StageState::Faulted)
    }
}
