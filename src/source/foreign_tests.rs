//! Boundary-discipline tests for `ForeignStreamSource`, driven by a scripted
//! in-process runtime that counts every boundary buffer it hands out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Fault, FaultKind};
use crate::source::foreign::{
    checked_prefix, transact, BoundaryBuffer, ForeignCall, ForeignRuntime, ReadReturn,
};
use crate::source::{ByteSource, ForeignStreamSource};
use crate::types::Signal;

//==================================================================================
// 1. Scripted Runtime
//==================================================================================

/// Handle returned by `resolve_read`.
pub(crate) struct ReadHandle;

pub(crate) struct FakeBuffer {
    bytes: Vec<u8>,
}

/// A runtime whose `read` serves `data` and misbehaves on chosen calls.
///
/// Call numbers are 1-based and count `invoke_read` calls.
pub(crate) struct FakeRuntime {
    data: Vec<u8>,
    pos: usize,
    has_read: bool,
    max_per_read: usize,
    calls: usize,
    raise_on_call: Option<usize>,
    status_on_call: Option<(usize, i32)>,
    bogus_len_on_call: Option<(usize, i64)>,
    fail_alloc_on_call: Option<usize>,
    pending: Option<String>,
    live_buffers: Arc<AtomicUsize>,
    allocations: Arc<AtomicUsize>,
}

impl FakeRuntime {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            has_read: true,
            max_per_read: usize::MAX,
            calls: 0,
            raise_on_call: None,
            status_on_call: None,
            bogus_len_on_call: None,
            fail_alloc_on_call: None,
            pending: None,
            live_buffers: Arc::new(AtomicUsize::new(0)),
            allocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn without_read(mut self) -> Self {
        self.has_read = false;
        self
    }

    pub(crate) fn max_per_read(mut self, n: usize) -> Self {
        self.max_per_read = n;
        self
    }

    pub(crate) fn raise_on_call(mut self, call: usize) -> Self {
        self.raise_on_call = Some(call);
        self
    }

    pub(crate) fn status_on_call(mut self, call: usize, status: i32) -> Self {
        self.status_on_call = Some((call, status));
        self
    }

    pub(crate) fn bogus_len_on_call(mut self, call: usize, len: i64) -> Self {
        self.bogus_len_on_call = Some((call, len));
        self
    }

    pub(crate) fn fail_alloc_on_call(mut self, call: usize) -> Self {
        self.fail_alloc_on_call = Some(call);
        self
    }

    /// Leaves an exception pending from some earlier, unrelated call.
    pub(crate) fn with_stale_exception(mut self, message: &str) -> Self {
        self.pending = Some(message.to_string());
        self
    }

    pub(crate) fn live_buffers(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live_buffers)
    }

    pub(crate) fn allocations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.allocations)
    }
}

impl ForeignRuntime for FakeRuntime {
    type Method = ReadHandle;
    type Buffer = FakeBuffer;

    fn describe(&self) -> String {
        "<FakeStream>".to_string()
    }

    fn resolve_read(&mut self) -> Result<ReadHandle, Fault> {
        if self.has_read {
            Ok(ReadHandle)
        } else {
            Err(Fault::foreign_exception(
                "AttributeError: 'FakeStream' object has no attribute 'read'",
            ))
        }
    }

    fn alloc_buffer(&mut self, len: usize) -> Result<FakeBuffer, Fault> {
        if self.fail_alloc_on_call == Some(self.calls + 1) {
            return Err(Fault::exhausted(format!("cannot allocate {} byte bytearray", len)));
        }
        self.live_buffers.fetch_add(1, Ordering::SeqCst);
        self.allocations.fetch_add(1, Ordering::SeqCst);
        // Garbage fill, so tests can tell copied bytes from stale ones.
        Ok(FakeBuffer {
            bytes: vec![0xEE; len],
        })
    }

    fn release_buffer(&mut self, _buffer: FakeBuffer) {
        self.live_buffers.fetch_sub(1, Ordering::SeqCst);
    }

    fn clear_pending(&mut self) {
        self.pending = None;
    }

    fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    fn invoke_read(
        &mut self,
        _method: &ReadHandle,
        buffer: &mut FakeBuffer,
        max_len: usize,
    ) -> ForeignCall {
        self.calls += 1;
        if self.raise_on_call == Some(self.calls) {
            self.pending = Some("OSError: device went away".to_string());
            return ForeignCall {
                status: 0,
                bytes_read: -1,
            };
        }
        if let Some((call, status)) = self.status_on_call {
            if call == self.calls {
                return ForeignCall {
                    status,
                    bytes_read: 0,
                };
            }
        }
        if let Some((call, len)) = self.bogus_len_on_call {
            if call == self.calls {
                return ForeignCall {
                    status: 0,
                    bytes_read: len,
                };
            }
        }
        let n = max_len
            .min(self.max_per_read)
            .min(self.data.len() - self.pos);
        buffer.bytes[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        ForeignCall {
            status: 0,
            bytes_read: n as i64,
        }
    }

    fn copy_out(&mut self, buffer: &FakeBuffer, dst: &mut [u8]) -> Result<(), Fault> {
        dst.copy_from_slice(&buffer.bytes[..dst.len()]);
        Ok(())
    }
}

//==================================================================================
// 2. Tests
//==================================================================================

fn source(runtime: FakeRuntime) -> ForeignStreamSource<FakeRuntime> {
    ForeignStreamSource::new(runtime).expect("fake runtime exposes read")
}

#[test]
fn test_missing_read_fails_at_construction() {
    let runtime = FakeRuntime::new(vec![1, 2, 3]).without_read();
    let err = ForeignStreamSource::new(runtime)
        .err()
        .expect("construction must fail");
    assert_eq!(err.kind(), FaultKind::MissingCapability);
    assert!(err.message().contains("no attribute 'read'"));
}

#[test]
fn test_reads_until_zero_length_read() {
    let mut src = source(FakeRuntime::new(b"hello".to_vec()).max_per_read(2));
    let mut out = Vec::new();
    let mut buf = [0u8; 8];
    loop {
        match src.pull(&mut buf).unwrap() {
            Signal::Ok(n) => out.extend_from_slice(&buf[..n]),
            Signal::Eof => break,
            Signal::NeedsRetry => unreachable!(),
        }
    }
    assert_eq!(out, b"hello");
    // Three data reads plus the zero-length read.
    assert_eq!(src.calls(), 4);
}

#[test]
fn test_only_reported_bytes_are_copied() {
    let mut src = source(FakeRuntime::new(vec![7u8; 3]));
    let mut buf = [0xAAu8; 10];
    assert_eq!(src.pull(&mut buf).unwrap(), Signal::Ok(3));
    assert_eq!(&buf[..3], &[7, 7, 7]);
    assert!(buf[3..].iter().all(|&b| b == 0xAA));
}

#[test]
fn test_exception_on_nth_call_surfaces_once_without_leaks() {
    let runtime = FakeRuntime::new(vec![0u8; 100]).max_per_read(10).raise_on_call(3);
    let live = runtime.live_buffers();
    let allocations = runtime.allocations();
    let mut src = source(runtime);

    let mut buf = [0u8; 16];
    let mut exceptions = 0;
    for _ in 0..5 {
        match src.pull(&mut buf) {
            Ok(_) => {}
            Err(fault) => {
                assert_eq!(fault.kind(), FaultKind::ForeignException);
                assert!(fault.message().contains("device went away"));
                exceptions += 1;
            }
        }
        assert_eq!(live.load(Ordering::SeqCst), 0, "boundary buffer leaked");
    }
    assert_eq!(exceptions, 1);
    assert_eq!(allocations.load(Ordering::SeqCst), 5);
}

#[test]
fn test_nonzero_status_is_native_code() {
    let runtime = FakeRuntime::new(vec![1u8; 8]).status_on_call(1, 1);
    let live = runtime.live_buffers();
    let mut src = source(runtime);
    let mut buf = [0u8; 8];
    let err = src.pull(&mut buf).unwrap_err();
    assert_eq!(err.kind(), FaultKind::NativeCode(1));
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_out_of_range_length_is_foreign_exception() {
    for bogus in [-5i64, 9] {
        let runtime = FakeRuntime::new(vec![1u8; 32]).bogus_len_on_call(1, bogus);
        let live = runtime.live_buffers();
        let mut src = source(runtime);
        let mut buf = [0u8; 8];
        let err = src.pull(&mut buf).unwrap_err();
        assert_eq!(err.kind(), FaultKind::ForeignException, "length {}", bogus);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_allocation_failure_is_resource_exhausted() {
    let runtime = FakeRuntime::new(vec![1u8; 32]).fail_alloc_on_call(2);
    let live = runtime.live_buffers();
    let mut src = source(runtime);
    let mut buf = [0u8; 8];
    assert_eq!(src.pull(&mut buf).unwrap(), Signal::Ok(8));
    let err = src.pull(&mut buf).unwrap_err();
    assert_eq!(err.kind(), FaultKind::ResourceExhausted);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stale_exception_is_cleared_before_the_call() {
    let runtime = FakeRuntime::new(vec![4u8; 4]).with_stale_exception("ValueError: earlier");
    let mut src = source(runtime);
    let mut buf = [0u8; 4];
    assert_eq!(src.pull(&mut buf).unwrap(), Signal::Ok(4));
}

#[test]
fn test_boundary_buffer_releases_on_early_return() {
    let mut runtime = FakeRuntime::new(Vec::new());
    let live = runtime.live_buffers();

    fn bail(runtime: &mut FakeRuntime) -> Result<(), Fault> {
        let mut scope = BoundaryBuffer::acquire(runtime, 64)?;
        let (rt, _buffer) = scope.parts()?;
        transact(rt, |rt| rt.pending = Some("boom".to_string()))?;
        Ok(())
    }

    let err = bail(&mut runtime).unwrap_err();
    assert_eq!(err.kind(), FaultKind::ForeignException);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_read_return_shapes_normalize_to_a_call() {
    assert_eq!(
        ForeignCall::from(ReadReturn::CountAndStatus(12, 0)),
        ForeignCall { status: 0, bytes_read: 12 }
    );
    assert_eq!(
        ForeignCall::from(ReadReturn::CountAndStatus(0, 7)),
        ForeignCall { status: 7, bytes_read: 0 }
    );
    assert_eq!(
        ForeignCall::from(ReadReturn::Count(-1)),
        ForeignCall { status: 0, bytes_read: -1 }
    );
}

#[test]
fn test_checked_prefix_rejects_a_shrunken_buffer() {
    let buffer = [1u8, 2, 3, 4];
    assert_eq!(checked_prefix(&buffer, 3).unwrap(), &[1, 2, 3]);
    assert_eq!(checked_prefix(&buffer, 4).unwrap(), &buffer);
    let err = checked_prefix(&buffer, 5).unwrap_err();
    assert_eq!(err.kind(), FaultKind::ForeignException);
}
