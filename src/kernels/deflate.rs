//! Raw deflate transforms (7z method `Deflate`) via `flate2`.
//!
//! 7z stores deflate data without a zlib header, so both directions use the
//! raw stream form.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::{Fault, FaultKind};
use crate::kernels::{Progress, Transform};
use crate::types::CodecKind;

pub const MAX_LEVEL: u32 = 9;

pub struct DeflateDecoder {
    inner: Decompress,
    ended: bool,
}

impl DeflateDecoder {
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(false),
            ended: false,
        }
    }

    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self
            .inner
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| Fault::corruption("deflate", e))?;
        let mut progress = Progress::new(
            (self.inner.total_in() - in_before) as usize,
            (self.inner.total_out() - out_before) as usize,
        );
        if status == Status::StreamEnd {
            self.ended = true;
            progress.done = true;
        }
        Ok(progress)
    }
}

impl Default for DeflateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for DeflateDecoder {
    fn kind(&self) -> CodecKind {
        CodecKind::Deflate
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        if self.ended {
            return Ok(Progress::finished(0));
        }
        self.step(input, output)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, Fault> {
        if self.ended {
            return Ok(Progress::finished(0));
        }
        let progress = self.step(&[], output)?;
        if progress.produced == 0 && !progress.done {
            return Err(Fault::corruption("deflate", "stream ended before the final block"));
        }
        Ok(progress)
    }
}

pub struct DeflateEncoder {
    inner: Compress,
    ended: bool,
}

impl DeflateEncoder {
    pub fn new(level: u32) -> Self {
        Self {
            inner: Compress::new(Compression::new(level.min(MAX_LEVEL)), false),
            ended: false,
        }
    }

    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushCompress,
    ) -> Result<(Progress, Status), Fault> {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self
            .inner
            .compress(input, output, flush)
            .map_err(|e| Fault::new(FaultKind::EncoderFailure, format!("deflate: {}", e)))?;
        let progress = Progress::new(
            (self.inner.total_in() - in_before) as usize,
            (self.inner.total_out() - out_before) as usize,
        );
        Ok((progress, status))
    }
}

impl Transform for DeflateEncoder {
    fn kind(&self) -> CodecKind {
        CodecKind::Deflate
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let (progress, _) = self.step(input, output, FlushCompress::None)?;
        Ok(progress)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, Fault> {
        if self.ended {
            return Ok(Progress::finished(0));
        }
        let (mut progress, status) = self.step(&[], output, FlushCompress::Finish)?;
        if status == Status::StreamEnd {
            self.ended = true;
            progress.done = true;
        }
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::test_support::run_transform;
    use std::io::Write;

    fn sample() -> Vec<u8> {
        (0..50_000u32).map(|i| ((i / 7) % 61) as u8).collect()
    }

    fn reference_deflate(input: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(input).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_deflate_decoder_reads_reference_stream_in_small_pieces() {
        let original = sample();
        let compressed = reference_deflate(&original);

        let mut decoder = DeflateDecoder::new();
        let decoded = run_transform(&mut decoder, &compressed, 3, 700).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_deflate_encoder_output_is_standard_raw_deflate() {
        let original = sample();
        let mut encoder = DeflateEncoder::new(6);
        let encoded = run_transform(&mut encoder, &original, 1000, 4096).unwrap();

        let mut decoder = flate2::read::DeflateDecoder::new(&encoded[..]);
        let mut decoded = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_deflate_truncated_stream_is_corruption() {
        let compressed = reference_deflate(&sample());
        let truncated = &compressed[..compressed.len() - 10];

        let mut decoder = DeflateDecoder::new();
        let err = run_transform(&mut decoder, truncated, 512, 4096).unwrap_err();
        assert_eq!(err.kind(), FaultKind::CodecCorruption);
    }
}
