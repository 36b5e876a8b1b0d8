//! The identity codec (7z method `Copy`).

use crate::error::Fault;
use crate::kernels::{Progress, Transform};
use crate::types::CodecKind;

/// Passes bytes through unchanged. Used for stored entries and as the
/// simplest possible stage when testing the chain itself.
#[derive(Debug, Default)]
pub struct CopyTransform;

impl CopyTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for CopyTransform {
    fn kind(&self) -> CodecKind {
        CodecKind::Copy
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, Fault> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        Ok(Progress::new(n, n))
    }

    fn finish(&mut self, _output: &mut [u8]) -> Result<Progress, Fault> {
        Ok(Progress::finished(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::test_support::run_transform;

    #[test]
    fn test_copy_is_identity_across_small_buffers() {
        let input: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut transform = CopyTransform::new();
        let out = run_transform(&mut transform, &input, 33, 7).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_copy_of_empty_input_finishes_immediately() {
        let mut transform = CopyTransform::new();
        let out = run_transform(&mut transform, &[], 16, 16).unwrap();
        assert!(out.is_empty());
    }
}
