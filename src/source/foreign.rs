// In: src/source/foreign.rs

//! The foreign-stream adapter: a `ByteSource` whose bytes come from an object
//! living in another runtime (a Python file-like object, a JVM stream, ...).
//!
//! The runtime itself is abstracted behind `ForeignRuntime`, so the discipline
//! that matters here is written exactly once:
//!
//! 1. The `read` capability is resolved when the adapter is built. An object
//!    without it fails construction with `FaultKind::MissingCapability`; it
//!    never gets as far as the first pull.
//! 2. Every boundary call runs through `transact`: clear latent exception state,
//!    make the call, then check for a newly raised exception and turn it into
//!    `FaultKind::ForeignException`.
//! 3. The temporary buffer handed across the boundary is held by a
//!    `BoundaryBuffer` guard and released on every exit path, including early
//!    returns on faults.

use log::{debug, trace};

use crate::error::{Fault, FaultKind};
use crate::source::ByteSource;
use crate::types::{PullResult, Signal};

//==================================================================================
// 1. Runtime Abstraction
//==================================================================================

/// What the foreign `read(buffer, max_len)` call returned.
///
/// `status == 0` is success with `bytes_read` valid; anything else is a
/// native-style failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignCall {
    pub status: i32,
    pub bytes_read: i64,
}

/// The shapes a foreign `read` may return, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadReturn {
    /// `(bytes_read, status)`.
    CountAndStatus(i64, i32),
    /// A bare count, as from a `readinto`-style callable; status is 0.
    Count(i64),
}

impl From<ReadReturn> for ForeignCall {
    fn from(ret: ReadReturn) -> Self {
        match ret {
            ReadReturn::CountAndStatus(bytes_read, status) => Self { status, bytes_read },
            ReadReturn::Count(bytes_read) => Self {
                status: 0,
                bytes_read,
            },
        }
    }
}

/// The operations the adapter needs from a managed runtime.
pub trait ForeignRuntime: Send {
    /// Handle to the resolved `read` method, cached for the adapter's lifetime.
    type Method: Send;
    /// A temporary buffer owned by the foreign runtime.
    type Buffer;

    /// Human-readable name of the wrapped object, used in fault messages.
    fn describe(&self) -> String;

    /// Looks up the `read` capability once. Absence is `MissingCapability`.
    fn resolve_read(&mut self) -> Result<Self::Method, Fault>;

    /// Allocates a boundary buffer of `len` bytes. Failure is `ResourceExhausted`.
    fn alloc_buffer(&mut self, len: usize) -> Result<Self::Buffer, Fault>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Discards any exception state left over from earlier, unrelated calls.
    fn clear_pending(&mut self);

    /// Takes the exception raised by the most recent call, if any.
    fn take_pending(&mut self) -> Option<String>;

    fn invoke_read(
        &mut self,
        method: &Self::Method,
        buffer: &mut Self::Buffer,
        max_len: usize,
    ) -> ForeignCall;

    /// Copies the first `dst.len()` bytes of `buffer` into `dst`.
    fn copy_out(&mut self, buffer: &Self::Buffer, dst: &mut [u8]) -> Result<(), Fault>;
}

//==================================================================================
// 2. Boundary Helpers
//==================================================================================

/// Scoped ownership of one boundary buffer; releases it when dropped.
pub struct BoundaryBuffer<'a, R: ForeignRuntime> {
    runtime: &'a mut R,
    buffer: Option<R::Buffer>,
}

impl<'a, R: ForeignRuntime> BoundaryBuffer<'a, R> {
    pub fn acquire(runtime: &'a mut R, len: usize) -> Result<Self, Fault> {
        let buffer = runtime.alloc_buffer(len)?;
        Ok(Self {
            runtime,
            buffer: Some(buffer),
        })
    }

    /// Splits the guard into the runtime and the buffer it protects.
    pub fn parts(&mut self) -> Result<(&mut R, &mut R::Buffer), Fault> {
        match self.buffer.as_mut() {
            Some(buffer) => Ok((&mut *self.runtime, buffer)),
            None => Err(Fault::exhausted("boundary buffer already released")),
        }
    }
}

impl<R: ForeignRuntime> Drop for BoundaryBuffer<'_, R> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.runtime.release_buffer(buffer);
        }
    }
}

/// The first `n` bytes of a boundary buffer the foreign call may have resized.
pub fn checked_prefix(buffer: &[u8], n: usize) -> Result<&[u8], Fault> {
    buffer.get(..n).ok_or_else(|| {
        Fault::foreign_exception(format!(
            "read shrank its buffer to {} bytes, {} expected",
            buffer.len(),
            n
        ))
    })
}

/// Runs one boundary call with the clear-call-check discipline.
pub fn transact<R, T>(runtime: &mut R, call: impl FnOnce(&mut R) -> T) -> Result<T, Fault>
where
    R: ForeignRuntime,
{
    runtime.clear_pending();
    let out = call(runtime);
    match runtime.take_pending() {
        Some(message) => Err(Fault::foreign_exception(message)),
        None => Ok(out),
    }
}

//==================================================================================
// 3. The Adapter
//==================================================================================

/// A `ByteSource` that pulls through a foreign object's `read` method.
///
/// A successful read of zero bytes is end of stream. Only the bytes the
/// foreign side reports as read are copied into the caller's buffer.
pub struct ForeignStreamSource<R: ForeignRuntime> {
    runtime: R,
    read: R::Method,
    calls: u64,
}

impl<R: ForeignRuntime> ForeignStreamSource<R> {
    pub fn new(mut runtime: R) -> Result<Self, Fault> {
        let read = runtime.resolve_read().map_err(|e| {
            if e.kind() == FaultKind::MissingCapability {
                e
            } else {
                Fault::new(
                    FaultKind::MissingCapability,
                    format!("cannot bind read on {}: {}", runtime.describe(), e),
                )
            }
        })?;
        debug!("bound foreign read capability on {}", runtime.describe());
        Ok(Self {
            runtime,
            read,
            calls: 0,
        })
    }

    /// Number of boundary calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R: ForeignRuntime> ByteSource for ForeignStreamSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }
        let requested = buf.len();
        self.calls += 1;

        let mut scope = BoundaryBuffer::acquire(&mut self.runtime, requested)?;
        let (runtime, buffer) = scope.parts()?;
        let read = &self.read;
        let call = transact(runtime, |rt| rt.invoke_read(read, buffer, requested))?;

        if call.status != 0 {
            return Err(Fault::native_code(call.status));
        }
        if call.bytes_read < 0 || call.bytes_read as u64 > requested as u64 {
            return Err(Fault::foreign_exception(format!(
                "read reported {} bytes for a {}-byte buffer",
                call.bytes_read, requested
            )));
        }

        let n = call.bytes_read as usize;
        trace!("foreign read #{} returned {} of {} bytes", self.calls, n, requested);
        if n == 0 {
            return Ok(Signal::Eof);
        }
        runtime.copy_out(buffer, &mut buf[..n])?;
        Ok(Signal::Ok(n))
    }
}
