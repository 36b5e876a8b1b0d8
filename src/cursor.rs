// In: src/cursor.rs

//! The buffered cursor that sits between a byte source and a codec stage.
//!
//! It absorbs short reads and gives the stage above a simple contract:
//! "at least N contiguous bytes, or end of stream".
//!
//! Invariant: `0 <= cursor <= valid <= capacity`.

use log::trace;

use crate::error::Fault;
use crate::source::ByteSource;
use crate::types::{PullResult, Signal};

#[derive(Debug)]
pub struct BufferedCursor<S> {
    source: S,
    buf: Vec<u8>,
    /// Read position inside `buf`.
    cursor: usize,
    /// End of the valid bytes inside `buf`.
    valid: usize,
    /// Set once the source reported `Eof`; the source is not pulled again.
    source_eof: bool,
    /// Total bytes pulled from the source.
    pulled: u64,
}

impl<S: ByteSource> BufferedCursor<S> {
    /// Creates a cursor with a fixed buffer of `capacity` bytes.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero capacity, `ResourceExhausted` if the buffer
    /// cannot be allocated.
    pub fn new(source: S, capacity: usize) -> Result<Self, Fault> {
        if capacity == 0 {
            return Err(Fault::invalid_config("cursor capacity must be positive"));
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)?;
        buf.resize(capacity, 0);
        Ok(Self {
            source,
            buf,
            cursor: 0,
            valid: 0,
            source_eof: false,
            pulled: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes buffered and not yet consumed.
    pub fn available(&self) -> usize {
        self.valid - self.cursor
    }

    /// The unread bytes, in order.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.cursor..self.valid]
    }

    pub fn bytes_pulled(&self) -> u64 {
        self.pulled
    }

    pub fn is_source_exhausted(&self) -> bool {
        self.source_eof
    }

    /// Ensures at least `min_bytes` unread bytes are buffered.
    ///
    /// Returns `Signal::Ok(0)` without touching the source when already
    /// satisfied, `Signal::Ok(added)` after a successful refill, `Signal::Eof`
    /// if the source ended first (fewer than `min_bytes` remain available), and
    /// passes `Signal::NeedsRetry` and faults through unchanged. Short reads are
    /// retried for as long as the source keeps making progress.
    pub fn fill(&mut self, min_bytes: usize) -> PullResult {
        if self.available() >= min_bytes {
            return Ok(Signal::Ok(0));
        }
        if min_bytes > self.capacity() {
            return Err(Fault::exhausted(format!(
                "fill of {} bytes exceeds cursor capacity {}",
                min_bytes,
                self.capacity()
            )));
        }
        if self.source_eof {
            return Ok(Signal::Eof);
        }

        self.compact();
        let mut added = 0usize;
        while self.available() < min_bytes {
            let signal = self.source.pull(&mut self.buf[self.valid..])?;
            match signal {
                Signal::Ok(n) => {
                    self.valid += n;
                    self.pulled += n as u64;
                    added += n;
                }
                Signal::NeedsRetry => return Ok(Signal::NeedsRetry),
                Signal::Eof => {
                    trace!("cursor source ended with {} bytes unread", self.available());
                    self.source_eof = true;
                    return Ok(Signal::Eof);
                }
            }
        }
        Ok(Signal::Ok(added))
    }

    /// Advances past `n` unread bytes. Performs no I/O.
    ///
    /// `n` is clamped to `available()` so the cursor invariant always holds.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available(), "consume({}) beyond available", n);
        self.cursor += n.min(self.available());
        if self.cursor == self.valid {
            self.cursor = 0;
            self.valid = 0;
        }
    }

    /// Moves the unread bytes to the front of the buffer.
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.buf.copy_within(self.cursor..self.valid, 0);
        self.valid -= self.cursor;
        self.cursor = 0;
    }
}

/// A cursor is itself a source, so cursors and stages can be stacked freely.
impl<S: ByteSource> ByteSource for BufferedCursor<S> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }
        if self.available() == 0 {
            match self.fill(1)? {
                Signal::Ok(_) => {}
                other => return Ok(other),
            }
        }
        let n = buf.len().min(self.available());
        buf[..n].copy_from_slice(&self.unread()[..n]);
        self.consume(n);
        Ok(Signal::Ok(n))
    }
}
