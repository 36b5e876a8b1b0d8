//! In-memory byte source.

use std::sync::Arc;

use crate::source::ByteSource;
use crate::types::{PullResult, Signal};

/// Serves bytes from a shared, immutable buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
    pos: usize,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for MemorySource {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }
        if self.remaining() == 0 {
            return Ok(Signal::Eof);
        }
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(Signal::Ok(n))
    }
}
