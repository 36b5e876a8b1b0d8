//! Decorating sources that wrap another `ByteSource`.
//!
//! The core never enforces timeouts or counts bytes itself; callers compose
//! these around the real source instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Fault, FaultKind};
use crate::source::ByteSource;
use crate::types::{PullResult, Signal};

//==================================================================================
// 1. ShortReadSource
//==================================================================================

/// Caps every pull at `max_per_pull` bytes.
///
/// Useful to throttle a source, and to prove that nothing above it depends on
/// how the source happens to chunk its data.
#[derive(Debug)]
pub struct ShortReadSource<S> {
    inner: S,
    max_per_pull: usize,
}

impl<S: ByteSource> ShortReadSource<S> {
    pub fn new(inner: S, max_per_pull: usize) -> Result<Self, Fault> {
        if max_per_pull == 0 {
            return Err(Fault::invalid_config("max_per_pull must be positive"));
        }
        Ok(Self {
            inner,
            max_per_pull,
        })
    }
}

impl<S: ByteSource> ByteSource for ShortReadSource<S> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        let n = buf.len().min(self.max_per_pull);
        self.inner.pull(&mut buf[..n])
    }
}

//==================================================================================
// 2. DeadlineSource
//==================================================================================

/// Enforces a wall-clock budget measured from the first pull.
///
/// A pull cannot be interrupted once it is inside the inner source, so the
/// budget is checked on entry: data that arrives before the deadline is still
/// delivered, and the next pull after it faults with `FaultKind::TimedOut`.
#[derive(Debug)]
pub struct DeadlineSource<S> {
    inner: S,
    budget: Duration,
    started: Option<Instant>,
}

impl<S: ByteSource> DeadlineSource<S> {
    pub fn new(inner: S, budget: Duration) -> Self {
        Self {
            inner,
            budget,
            started: None,
        }
    }
}

impl<S: ByteSource> ByteSource for DeadlineSource<S> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        match self.started {
            None => self.started = Some(Instant::now()),
            Some(started) => {
                let elapsed = started.elapsed();
                if elapsed > self.budget {
                    return Err(Fault::new(
                        FaultKind::TimedOut,
                        format!(
                            "source exceeded its {} ms budget ({} ms elapsed)",
                            self.budget.as_millis(),
                            elapsed.as_millis()
                        ),
                    ));
                }
            }
        }
        self.inner.pull(buf)
    }
}

//==================================================================================
// 3. MeteredSource
//==================================================================================

/// Counts every byte the inner source delivers into a shared counter.
///
/// The pipeline driver keeps a clone of the counter to report source-side
/// progress without reaching down through the stage chain.
#[derive(Debug)]
pub struct MeteredSource<S> {
    inner: S,
    counter: Arc<AtomicU64>,
}

impl<S: ByteSource> MeteredSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.counter)
    }
}

impl<S: ByteSource> ByteSource for MeteredSource<S> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        let signal = self.inner.pull(buf)?;
        if let Signal::Ok(n) = signal {
            self.counter.fetch_add(n as u64, Ordering::Relaxed);
        }
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_short_read_source_caps_each_pull() {
        let mut source = ShortReadSource::new(MemorySource::new(vec![1u8, 2, 3]), 2).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Ok(2));
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Ok(1));
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Eof);
    }

    #[test]
    fn test_short_read_source_rejects_zero_cap() {
        let err = ShortReadSource::new(MemorySource::new(vec![1u8]), 0).unwrap_err();
        assert_eq!(err.kind(), FaultKind::InvalidConfig);
    }

    #[test]
    fn test_deadline_source_faults_after_budget() {
        let mut source = DeadlineSource::new(MemorySource::new(vec![0u8; 8]), Duration::ZERO);
        let mut buf = [0u8; 4];
        // The first pull starts the clock and is always inside the budget.
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Ok(4));
        std::thread::sleep(Duration::from_millis(2));
        let fault = source.pull(&mut buf).unwrap_err();
        assert_eq!(fault.kind(), FaultKind::TimedOut);
    }

    #[test]
    fn test_metered_source_counts_delivered_bytes() {
        let mut source = MeteredSource::new(MemorySource::new(vec![5u8; 10]));
        let counter = source.counter();
        let mut buf = [0u8; 4];
        while source.pull(&mut buf).unwrap() != Signal::Eof {}
        assert_eq!(counter.load(Ordering::Relaxed), 10);
    }
}
