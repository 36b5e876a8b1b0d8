//! This module contains the codec transforms a `CodecStage` drives.
//!
//! A transform is incremental: it is handed whatever contiguous input the
//! stage's cursor currently holds plus a scratch output buffer, and reports
//! how much it consumed and produced. It never consumes input it cannot use
//! yet; bytes it leaves unconsumed stay in the cursor. Working state
//! (dictionary windows, delta history, partial blocks) lives inside the
//! transform and only ever moves forward.

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod copy;
pub mod deflate;
pub mod delta;
pub mod zstd;

use crate::error::Fault;
use crate::pipeline::plan::CodecMethod;
use crate::types::{CodecKind, Direction};

//==================================================================================
// 2. The Transform Contract
//==================================================================================

/// Outcome of one `process` or `finish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes the transform took ownership of.
    pub consumed: usize,
    /// Output bytes written to the front of the output buffer.
    pub produced: usize,
    /// The coded stream has ended; no more output will follow.
    pub done: bool,
}

impl Progress {
    pub fn new(consumed: usize, produced: usize) -> Self {
        Self {
            consumed,
            produced,
            done: false,
        }
    }

    pub fn finished(produced: usize) -> Self {
        Self {
            consumed: 0,
            produced,
            done: true,
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.consumed == 0 && self.produced == 0 && !self.done
    }
}

pub trait Transform: Send {
    fn kind(&self) -> CodecKind;

    /// Transforms a prefix of `input` into a prefix of `output`.
    ///
    /// A stalled result (nothing consumed, nothing produced, not done) means
    /// the transform needs more contiguous input than `input` holds.
    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault>;

    /// Called once the upstream has ended and all input has been offered.
    ///
    /// Drains internal state into `output`; repeated until `done`. A coded
    /// stream that ends mid-unit is `FaultKind::CodecCorruption`.
    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, Fault>;
}

//==================================================================================
// 3. Registry
//==================================================================================

/// Builds the transform for one stage of a chain.
pub fn build_transform(
    method: &CodecMethod,
    direction: Direction,
) -> Result<Box<dyn Transform>, Fault> {
    method.validate()?;
    let transform: Box<dyn Transform> = match (method, direction) {
        (CodecMethod::Copy, _) => Box::new(copy::CopyTransform::new()),
        (CodecMethod::Delta { distance }, Direction::Decode) => {
            Box::new(delta::DeltaDecoder::new(*distance)?)
        }
        (CodecMethod::Delta { distance }, Direction::Encode) => {
            Box::new(delta::DeltaEncoder::new(*distance)?)
        }
        (CodecMethod::Zstd { .. }, Direction::Decode) => Box::new(zstd::ZstdDecoder::new()?),
        (CodecMethod::Zstd { level }, Direction::Encode) => {
            Box::new(zstd::ZstdEncoder::new(*level)?)
        }
        (CodecMethod::Deflate { .. }, Direction::Decode) => {
            Box::new(deflate::DeflateDecoder::new())
        }
        (CodecMethod::Deflate { level }, Direction::Encode) => {
            Box::new(deflate::DeflateEncoder::new(*level))
        }
    };
    Ok(transform)
}
