//! Byte sources: the leaf of every pull chain.
//!
//! A `ByteSource` is the only place the pipeline touches the outside world.
//! Everything above it (cursor, codec stages, driver) is pure in-process state.

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod decorators;
pub mod foreign;
pub mod memory;
pub mod reader;
pub mod volumes;

#[cfg(test)]
pub(crate) mod foreign_tests;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::decorators::{DeadlineSource, MeteredSource, ShortReadSource};
pub use self::foreign::{BoundaryBuffer, ForeignCall, ForeignRuntime, ForeignStreamSource};
pub use self::memory::MemorySource;
pub use self::reader::{FileSource, ReaderSource};
pub use self::volumes::VolumeSource;

use crate::types::PullResult;

/// **CONTRACT:** a pollable producer of raw bytes.
///
/// `pull` attempts to fill up to `buf.len()` bytes and reports how many it
/// wrote with `Signal::Ok(n)`. Returning fewer bytes than requested is a short
/// read, not an error; only `Signal::Eof` or a `Fault` terminate the stream.
/// An empty `buf` is answered with `Signal::Ok(0)` and no side effects.
///
/// A source is exclusively owned by the cursor wrapping it and is never pulled
/// from two threads at once; `Send` only lets a whole pipeline move between threads.
pub trait ByteSource: Send {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        (**self).pull(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        (**self).pull(buf)
    }
}
