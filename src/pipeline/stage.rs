// In: src/pipeline/stage.rs

//! A single codec stage: one transform between two byte streams.
//!
//! Every stage owns a `BufferedCursor` over its upstream (the byte source for
//! the first stage, the previous stage otherwise) plus a scratch buffer of
//! transformed bytes not yet handed downstream. Bytes the transform has not
//! consumed stay in the cursor, so a stage never pushes data back upstream and
//! never has to rewind.

use log::{debug, trace};

use crate::cursor::BufferedCursor;
use crate::error::Fault;
use crate::kernels::{build_transform, Transform};
use crate::pipeline::plan::CodecMethod;
use crate::source::ByteSource;
use crate::types::{CodecKind, Direction, PullResult, Signal, StageState};

/// **CONTRACT:** a pullable transform stage with an observable lifecycle.
///
/// Stages follow `Ready -> Streaming -> (Eof | Faulted)`. A pull in a terminal
/// state is `FaultKind::UseAfterTerminal`.
pub trait CodecStage: ByteSource {
    fn kind(&self) -> CodecKind;
    fn direction(&self) -> Direction;
    fn state(&self) -> StageState;
    /// Bytes handed downstream so far.
    fn bytes_produced(&self) -> u64;
}

pub struct TransformStage {
    transform: Box<dyn Transform>,
    direction: Direction,
    input: BufferedCursor<Box<dyn ByteSource>>,
    out: Vec<u8>,
    out_pos: usize,
    out_len: usize,
    /// The upstream reported `Eof`; only `finish` remains.
    input_ended: bool,
    /// The transform could not use the bytes it was offered last time.
    stalled: bool,
    /// The transform reported the end of its coded stream.
    done: bool,
    state: StageState,
    produced: u64,
}

impl TransformStage {
    pub fn new(
        upstream: Box<dyn ByteSource>,
        method: &CodecMethod,
        direction: Direction,
        cursor_capacity: usize,
        output_size: usize,
    ) -> Result<Self, Fault> {
        let transform = build_transform(method, direction)?;
        Self::with_transform(upstream, transform, direction, cursor_capacity, output_size)
    }

    /// Builds a stage around an already constructed transform.
    pub fn with_transform(
        upstream: Box<dyn ByteSource>,
        transform: Box<dyn Transform>,
        direction: Direction,
        cursor_capacity: usize,
        output_size: usize,
    ) -> Result<Self, Fault> {
        if output_size == 0 {
            return Err(Fault::invalid_config("stage output buffer must be positive"));
        }
        let input = BufferedCursor::new(upstream, cursor_capacity)?;
        let mut out = Vec::new();
        out.try_reserve_exact(output_size)?;
        out.resize(output_size, 0);

        debug!(
            "built {} {} stage (cursor {} B, output {} B)",
            transform.kind(),
            direction,
            cursor_capacity,
            output_size
        );
        Ok(Self {
            transform,
            direction,
            input,
            out,
            out_pos: 0,
            out_len: 0,
            input_ended: false,
            stalled: false,
            done: false,
            state: StageState::Ready,
            produced: 0,
        })
    }

    /// Bytes this stage has pulled from its upstream.
    pub fn bytes_consumed(&self) -> u64 {
        self.input.bytes_pulled()
    }

    /// Produces the next bytes without touching the lifecycle state.
    fn step(&mut self, buf: &mut [u8]) -> PullResult {
        loop {
            if self.out_pos < self.out_len {
                let n = buf.len().min(self.out_len - self.out_pos);
                buf[..n].copy_from_slice(&self.out[self.out_pos..self.out_pos + n]);
                self.out_pos += n;
                return Ok(Signal::Ok(n));
            }
            if self.done {
                return self.end_of_stream();
            }
            self.out_pos = 0;
            self.out_len = 0;

            if !self.input_ended && (self.input.available() == 0 || self.stalled) {
                // A stalled transform needs at least one byte beyond what it saw.
                let want = if self.stalled { self.input.available() + 1 } else { 1 };
                match self.input.fill(want)? {
                    Signal::Ok(_) => self.stalled = false,
                    Signal::NeedsRetry => return Ok(Signal::NeedsRetry),
                    Signal::Eof => self.input_ended = true,
                }
            }

            if self.input.available() > 0 && !(self.stalled && self.input_ended) {
                let progress = self.transform.process(self.input.unread(), &mut self.out)?;
                self.input.consume(progress.consumed);
                self.out_len = progress.produced;
                self.done = progress.done;
                if progress.is_stalled() {
                    self.stalled = true;
                }
                continue;
            }

            if self.input_ended {
                let progress = self.transform.finish(&mut self.out)?;
                self.out_len = progress.produced;
                self.done = progress.done;
                if progress.is_stalled() {
                    return Err(Fault::corruption(
                        self.transform.kind().name(),
                        "stream ended with undecodable trailing input",
                    ));
                }
            }
        }
    }
}

impl TransformStage {
    /// Confirms nothing follows the coded stream before reporting `Eof`.
    ///
    /// Bytes left in the cursor, or still arriving from upstream once the
    /// transform is done, are `FaultKind::CodecCorruption`.
    fn end_of_stream(&mut self) -> PullResult {
        if !self.input_ended && self.input.available() == 0 {
            match self.input.fill(1)? {
                Signal::Ok(_) => {}
                Signal::NeedsRetry => return Ok(Signal::NeedsRetry),
                Signal::Eof => self.input_ended = true,
            }
        }
        let trailing = self.input.available();
        if trailing > 0 {
            return Err(Fault::corruption(
                self.transform.kind().name(),
                format!("{} bytes follow the end of the coded stream", trailing),
            ));
        }
        Ok(Signal::Eof)
    }
}

impl ByteSource for TransformStage {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        if self.state.is_terminal() {
            return Err(Fault::use_after_terminal(self.transform.kind().name()));
        }
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }
        match self.step(buf) {
            Ok(Signal::Ok(n)) => {
                self.state = StageState::Streaming;
                self.produced += n as u64;
                Ok(Signal::Ok(n))
            }
            Ok(Signal::Eof) => {
                trace!(
                    "{} stage reached eof after {} bytes",
                    self.transform.kind(),
                    self.produced
                );
                self.state = StageState::Eof;
                Ok(Signal::Eof)
            }
            Ok(Signal::NeedsRetry) => Ok(Signal::NeedsRetry),
            Err(fault) => {
                self.state = StageState::Faulted;
                Err(fault)
            }
        }
    }
}

impl CodecStage for TransformStage {
    fn kind(&self) -> CodecKind {
        self.transform.kind()
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn state(&self) -> StageState {
        self.state
    }

    fn bytes_produced(&self) -> u64 {
        self.produced
    }
}
