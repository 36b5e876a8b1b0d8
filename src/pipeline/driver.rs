// In: src/pipeline/driver.rs

//! The top-level pipeline driver.
//!
//! `Pipeline` owns the whole chain (source wrappers, cursors and stages) by
//! nested ownership: the terminal stage owns its upstream, which owns its own,
//! down to the source. `pull` forwards to the terminal stage and applies the
//! only recovery policy the crate has: re-issuing `NeedsRetry`, at the top,
//! a bounded number of times. Faults are never retried.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::config::{PipelineConfig, RetryPolicy};
use crate::error::{Fault, FaultKind};
use crate::pipeline::plan::{ChainPlan, CodecMethod};
use crate::pipeline::stage::{CodecStage, TransformStage};
use crate::source::{ByteSource, DeadlineSource, MeteredSource};
use crate::types::{CodecKind, Direction, PullResult, Signal};

//==================================================================================
// 1. Progress Reporting
//==================================================================================

/// Receives `(source_bytes, produced_bytes)` after every successful pull.
pub trait ProgressObserver: Send {
    /// Told the expected source size once it is known (e.g. a packed size
    /// from the archive header).
    fn on_total(&mut self, _source_total: u64) {}

    fn on_progress(&mut self, source_bytes: u64, produced_bytes: u64);
}

impl<F> ProgressObserver for F
where
    F: FnMut(u64, u64) + Send,
{
    fn on_progress(&mut self, source_bytes: u64, produced_bytes: u64) {
        self(source_bytes, produced_bytes)
    }
}

//==================================================================================
// 2. The Pipeline
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Active,
    Ended,
    Faulted,
}

/// CRC-32 of everything handed to the caller, checked at end of stream.
struct OutputCheck {
    expected: u32,
    hasher: crc32fast::Hasher,
}

pub struct Pipeline {
    /// The chain; released as soon as the pipeline faults.
    head: Option<Box<dyn CodecStage>>,
    kinds: Vec<CodecKind>,
    direction: Direction,
    retry: RetryPolicy,
    check: Option<OutputCheck>,
    source_bytes: Arc<AtomicU64>,
    produced: u64,
    state: DriverState,
    observer: Option<Box<dyn ProgressObserver>>,
    source_total: Option<u64>,
    drain_chunk: usize,
}

impl Pipeline {
    /// Builds a pipeline whose stages run `methods` in order, starting at `source`.
    ///
    /// # Errors
    /// `InvalidConfig` for an empty chain, a bad parameter or a bad config;
    /// `ResourceExhausted` if a buffer cannot be allocated.
    pub fn new<S>(
        source: S,
        methods: &[CodecMethod],
        direction: Direction,
        config: &PipelineConfig,
    ) -> Result<Self, Fault>
    where
        S: ByteSource + 'static,
    {
        config.validate()?;
        let (first, rest) = methods
            .split_first()
            .ok_or_else(|| Fault::invalid_config("a chain needs at least one stage"))?;

        let metered = MeteredSource::new(source);
        let source_bytes = metered.counter();
        let leaf: Box<dyn ByteSource> = match config.read_timeout_ms {
            Some(ms) => Box::new(DeadlineSource::new(metered, Duration::from_millis(ms))),
            None => Box::new(metered),
        };

        let build = |upstream: Box<dyn ByteSource>, method: &CodecMethod| {
            TransformStage::new(
                upstream,
                method,
                direction,
                config.cursor_capacity,
                config.stage_buffer_size,
            )
        };
        let mut head = build(leaf, first)?;
        for method in rest {
            head = build(Box::new(head), method)?;
        }

        let kinds: Vec<CodecKind> = methods.iter().map(CodecMethod::kind).collect();
        debug!("built {} pipeline {:?}", direction, kinds);
        log_metric!("event"="pipeline_built", "direction"=&direction, "stages"=&kinds.len());

        Ok(Self {
            head: Some(Box::new(head)),
            kinds,
            direction,
            retry: config.retry,
            check: config.expected_crc32.map(|expected| OutputCheck {
                expected,
                hasher: crc32fast::Hasher::new(),
            }),
            source_bytes,
            produced: 0,
            state: DriverState::Active,
            observer: None,
            source_total: None,
            drain_chunk: config.stage_buffer_size,
        })
    }

    pub fn decoder<S>(source: S, plan: &ChainPlan, config: &PipelineConfig) -> Result<Self, Fault>
    where
        S: ByteSource + 'static,
    {
        Self::new(source, &plan.stages, Direction::Decode, config)
    }

    pub fn encoder<S>(source: S, plan: &ChainPlan, config: &PipelineConfig) -> Result<Self, Fault>
    where
        S: ByteSource + 'static,
    {
        Self::new(source, &plan.stages, Direction::Encode, config)
    }

    /// Attaches a progress observer.
    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        let mut observer: Box<dyn ProgressObserver> = Box::new(observer);
        if let Some(total) = self.source_total {
            observer.on_total(total);
        }
        self.observer = Some(observer);
        self
    }

    /// Records the expected number of source bytes and passes it to the observer.
    pub fn with_source_total(mut self, total: u64) -> Self {
        self.source_total = Some(total);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_total(total);
        }
        self
    }

    pub fn source_total(&self) -> Option<u64> {
        self.source_total
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Codec kinds in the order bytes flow from the source.
    pub fn stage_kinds(&self) -> &[CodecKind] {
        &self.kinds
    }

    /// Bytes delivered to the caller so far.
    pub fn bytes_produced(&self) -> u64 {
        self.produced
    }

    /// Bytes taken from the source so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.source_bytes.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.state != DriverState::Active
    }

    /// The sole streaming entry point: fills a prefix of `buf`.
    ///
    /// After `Eof` every further pull returns `Eof` again. After a fault every
    /// further pull is `FaultKind::UseAfterTerminal`.
    pub fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        match self.state {
            DriverState::Ended => return Ok(Signal::Eof),
            DriverState::Faulted => return Err(Fault::use_after_terminal("pipeline")),
            DriverState::Active => {}
        }
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }

        let head = match self.head.as_mut() {
            Some(head) => head,
            None => return Err(Fault::use_after_terminal("pipeline")),
        };
        let mut retries = 0u32;
        let result = loop {
            match head.pull(buf) {
                Ok(Signal::NeedsRetry) if retries < self.retry.max_retries => {
                    retries += 1;
                    trace!("re-issuing pull after NeedsRetry ({})", retries);
                }
                other => break other,
            }
        };

        match result {
            Ok(Signal::Ok(n)) => {
                self.produced += n as u64;
                if let Some(check) = self.check.as_mut() {
                    check.hasher.update(&buf[..n]);
                }
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_progress(self.source_bytes.load(Ordering::Relaxed), self.produced);
                }
                Ok(Signal::Ok(n))
            }
            Ok(Signal::Eof) => {
                if let Some(check) = self.check.take() {
                    let actual = check.hasher.finalize();
                    if actual != check.expected {
                        return Err(self.fail(Fault::new(
                            FaultKind::ChecksumMismatch,
                            format!("expected crc32 {:08x}, got {:08x}", check.expected, actual),
                        )));
                    }
                }
                self.state = DriverState::Ended;
                self.head = None;
                debug!(
                    "{} pipeline finished: {} bytes in, {} bytes out",
                    self.direction,
                    self.bytes_consumed(),
                    self.produced
                );
                log_metric!(
                    "event"="pipeline_eof",
                    "consumed"=&self.bytes_consumed(),
                    "produced"=&self.produced
                );
                Ok(Signal::Eof)
            }
            Ok(Signal::NeedsRetry) => Ok(Signal::NeedsRetry),
            Err(fault) => Err(self.fail(fault)),
        }
    }

    /// Marks the pipeline faulted and tears down the chain, source included.
    fn fail(&mut self, fault: Fault) -> Fault {
        self.state = DriverState::Faulted;
        self.head = None;
        warn!(
            "{} pipeline {:?} faulted after {} bytes: {}",
            self.direction, self.kinds, self.produced, fault
        );
        fault
    }

    /// Drains the pipeline into memory.
    ///
    /// # Errors
    /// Any fault from the chain, or `RetryExhausted` if `NeedsRetry` persists
    /// past the retry policy.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, Fault> {
        let mut out = Vec::new();
        self.copy_to(&mut out)?;
        Ok(out)
    }

    /// Drains the pipeline into `writer`, returning the number of bytes written.
    pub fn copy_to<W: Write>(&mut self, writer: &mut W) -> Result<u64, Fault> {
        let mut chunk = Vec::new();
        chunk.try_reserve_exact(self.drain_chunk)?;
        chunk.resize(self.drain_chunk, 0);

        let mut written = 0u64;
        loop {
            match self.pull(&mut chunk)? {
                Signal::Ok(n) => {
                    if let Err(e) = writer.write_all(&chunk[..n]) {
                        return Err(self.fail(e.into()));
                    }
                    written += n as u64;
                }
                Signal::Eof => return Ok(written),
                Signal::NeedsRetry => {
                    return Err(self.fail(Fault::new(
                        FaultKind::RetryExhausted,
                        format!(
                            "source still not ready after {} retries",
                            self.retry.max_retries
                        ),
                    )))
                }
            }
        }
    }
}

impl Read for Pipeline {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.pull(buf) {
            Ok(Signal::Ok(n)) => Ok(n),
            Ok(Signal::Eof) => Ok(0),
            Ok(Signal::NeedsRetry) => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "pipeline source is not ready",
            )),
            Err(fault) => Err(io::Error::new(io::ErrorKind::Other, fault)),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("direction", &self.direction)
            .field("stages", &self.kinds)
            .field("state", &self.state)
            .field("produced", &self.produced)
            .finish()
    }
}
