//! This module contains the streaming Zstandard transforms.
//!
//! Unlike a one-shot `bulk` call, these wrap the `zstd` raw streaming API so a
//! stage can feed whatever its cursor holds and receive output in bounded
//! pieces. The decoder accepts any number of concatenated frames; a stream
//! that ends inside a frame is corruption.

use std::io::Write;

use zstd::stream::raw::{Decoder, Encoder, Operation, OutBuffer};

use crate::error::{Fault, FaultKind};
use crate::kernels::{Progress, Transform};
use crate::types::CodecKind;

//==================================================================================
// 1. Decoder
//==================================================================================

pub struct ZstdDecoder {
    inner: Decoder<'static>,
    /// True while a frame has been started but not fully decoded and flushed.
    in_frame: bool,
}

impl ZstdDecoder {
    pub fn new() -> Result<Self, Fault> {
        let inner = Decoder::new().map_err(|e| Fault::exhausted(format!("zstd: {}", e)))?;
        Ok(Self {
            inner,
            in_frame: false,
        })
    }
}

impl Transform for ZstdDecoder {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let status = self
            .inner
            .run_on_buffers(input, output)
            .map_err(|e| Fault::corruption("zstd", e))?;
        if status.bytes_read > 0 || status.bytes_written > 0 {
            // A zero hint means the current frame is fully decoded and flushed.
            self.in_frame = status.remaining != 0;
        }
        Ok(Progress::new(status.bytes_read, status.bytes_written))
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, Fault> {
        let status = self
            .inner
            .run_on_buffers(&[], output)
            .map_err(|e| Fault::corruption("zstd", e))?;
        if status.bytes_written > 0 {
            self.in_frame = status.remaining != 0;
            return Ok(Progress::new(0, status.bytes_written));
        }
        // Between frames the hint describes the next header, so it only
        // matters while a frame is open.
        if self.in_frame && status.remaining != 0 {
            return Err(Fault::corruption("zstd", "stream ended inside a frame"));
        }
        self.in_frame = false;
        Ok(Progress::finished(0))
    }
}

//==================================================================================
// 2. Encoder
//==================================================================================

pub struct ZstdEncoder {
    inner: Encoder<'static>,
    ended: bool,
}

impl ZstdEncoder {
    pub fn new(level: i32) -> Result<Self, Fault> {
        let inner = Encoder::new(level)
            .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("zstd: {}", e)))?;
        Ok(Self {
            inner,
            ended: false,
        })
    }
}

impl Transform for ZstdEncoder {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let status = self
            .inner
            .run_on_buffers(input, output)
            .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("zstd: {}", e)))?;
        Ok(Progress::new(status.bytes_read, status.bytes_written))
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, Fault> {
        if self.ended {
            return Ok(Progress::finished(0));
        }
        let mut out = OutBuffer::around(output);
        // `finish` returns how many bytes are still waiting to be flushed.
        let remaining = self
            .inner
            .finish(&mut out, true)
            .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("zstd: {}", e)))?;
        let produced = out.pos();
        if remaining == 0 {
            self.ended = true;
            return Ok(Progress::finished(produced));
        }
        Ok(Progress::new(0, produced))
    }
}

/// One-shot helper producing a single zstd frame, used to build fixtures.
pub fn encode_frame(input: &[u8], level: i32) -> Result<Vec<u8>, Fault> {
    let mut encoder = zstd::stream::Encoder::new(Vec::new(), level)
        .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("zstd: {}", e)))?;
    encoder
        .write_all(input)
        .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("zstd: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("zstd: {}", e)))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
