//! This module contains the byte-wise delta filter (7z method `Delta`).
//!
//! This is a Layer 1 (Value Reduction) transform for interleaved fixed-width
//! samples such as PCM audio or raw image rows: each byte is stored as the
//! difference to the byte `distance` positions earlier. The history is a
//! 256-byte ring indexed by a wrapping position, so any distance in
//! `1..=256` works without reallocating.

use crate::error::Fault;
use crate::kernels::{Progress, Transform};
use crate::types::CodecKind;

pub const MIN_DISTANCE: u16 = 1;
pub const MAX_DISTANCE: u16 = 256;

/// Ring history shared by the encoder and decoder.
#[derive(Debug)]
struct History {
    bytes: [u8; 256],
    distance: u8,
    pos: u8,
}

impl History {
    fn new(distance: u16) -> Result<Self, Fault> {
        if !(MIN_DISTANCE..=MAX_DISTANCE).contains(&distance) {
            return Err(Fault::invalid_config(format!(
                "delta distance must be in {}..={}, got {}",
                MIN_DISTANCE, MAX_DISTANCE, distance
            )));
        }
        Ok(Self {
            bytes: [0; 256],
            // 256 wraps to 0, which indexes the slot written 256 steps ago.
            distance: distance as u8,
            pos: 0,
        })
    }

    /// The byte `distance` positions before the current one.
    #[inline]
    fn back(&self) -> u8 {
        self.bytes[self.distance.wrapping_add(self.pos) as usize]
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.bytes[self.pos as usize] = byte;
        self.pos = self.pos.wrapping_sub(1);
    }
}

/// Reconstructs the original bytes from a delta stream.
#[derive(Debug)]
pub struct DeltaDecoder {
    history: History,
}

impl DeltaDecoder {
    pub fn new(distance: u16) -> Result<Self, Fault> {
        Ok(Self {
            history: History::new(distance)?,
        })
    }
}

impl Transform for DeltaDecoder {
    fn kind(&self) -> CodecKind {
        CodecKind::Delta
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let n = input.len().min(output.len());
        for (dst, &src) in output[..n].iter_mut().zip(&input[..n]) {
            let byte = src.wrapping_add(self.history.back());
            self.history.push(byte);
            *dst = byte;
        }
        Ok(Progress::new(n, n))
    }

    fn finish(&mut self, _output: &mut [u8]) -> Result<Progress, Fault> {
        Ok(Progress::finished(0))
    }
}

/// Produces a delta stream from raw bytes.
#[derive(Debug)]
pub struct DeltaEncoder {
    history: History,
}

impl DeltaEncoder {
    pub fn new(distance: u16) -> Result<Self, Fault> {
        Ok(Self {
            history: History::new(distance)?,
        })
    }
}

impl Transform for DeltaEncoder {
    fn kind(&self) -> CodecKind {
        CodecKind::Delta
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let n = input.len().min(output.len());
        for (dst, &src) in output[..n].iter_mut().zip(&input[..n]) {
            let back = self.history.back();
            self.history.push(src);
            *dst = src.wrapping_sub(back);
        }
        Ok(Progress::new(n, n))
    }

    fn finish(&mut self, _output: &mut [u8]) -> Result<Progress, Fault> {
        Ok(Progress::finished(0))
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::kernels::test_support::run_transform;

    #[test]
    fn test_delta_distance_one_encodes_differences() {
        let mut encoder = DeltaEncoder::new(1).unwrap();
        let out = run_transform(&mut encoder, &[10, 12, 15, 15, 5], 64, 64).unwrap();
        assert_eq!(out, vec![10, 2, 3, 0, 5u8.wrapping_sub(15)]);
    }

    #[test]
    fn test_delta_distance_two_uses_interleaved_history() {
        // Two interleaved 8-bit channels: (1, 100), (2, 101), (3, 102)
        let input = [1u8, 100, 2, 101, 3, 102];
        let mut encoder = DeltaEncoder::new(2).unwrap();
        let encoded = run_transform(&mut encoder, &input, 64, 64).unwrap();
        assert_eq!(encoded, vec![1, 100, 1, 1, 1, 1]);

        let mut decoder = DeltaDecoder::new(2).unwrap();
        let decoded = run_transform(&mut decoder, &encoded, 64, 64).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_delta_state_survives_split_input() {
        let input: Vec<u8> = (0..2000u32).map(|i| (i * i % 253) as u8).collect();
        for distance in [1u16, 3, 4, 255, 256] {
            let mut encoder = DeltaEncoder::new(distance).unwrap();
            let encoded = run_transform(&mut encoder, &input, 2000, 2000).unwrap();

            let mut decoder = DeltaDecoder::new(distance).unwrap();
            let decoded = run_transform(&mut decoder, &encoded, 1, 3).unwrap();
            assert_eq!(decoded, input, "distance {}", distance);
        }
    }

    #[test]
    fn test_delta_distance_256_reaches_full_ring() {
        let mut input = vec![0u8; 256];
        input.extend(std::iter::repeat(9u8).take(256));
        let mut encoder = DeltaEncoder::new(256).unwrap();
        let encoded = run_transform(&mut encoder, &input, 512, 512).unwrap();
        assert!(encoded[..256].iter().all(|&b| b == 0));
        assert!(encoded[256..].iter().all(|&b| b == 9));
    }

    #[test]
    fn test_delta_rejects_out_of_range_distance() {
        for distance in [0u16, 257] {
            let err = DeltaDecoder::new(distance).unwrap_err();
            assert_eq!(err.kind(), FaultKind::InvalidConfig);
        }
    }
}
