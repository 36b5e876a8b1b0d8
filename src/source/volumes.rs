//! Multi-volume input: several sources read back to back as one stream.
//!
//! Split archives (`name.7z.001`, `name.7z.002`, ...) carry a single packed
//! stream cut at arbitrary offsets, so codec frames routinely straddle a
//! volume boundary. The stages above never see the seam.

use std::path::Path;

use log::debug;

use crate::error::Fault;
use crate::source::{ByteSource, FileSource};
use crate::types::{PullResult, Signal};

/// Concatenates its volumes in order.
///
/// A volume is dropped as soon as it reports `Eof`, so at most one is open at
/// a time once reading has started. Faults keep their kind and gain the
/// one-based volume number in the message.
pub struct VolumeSource {
    volumes: Vec<Option<Box<dyn ByteSource>>>,
    current: usize,
}

impl VolumeSource {
    pub fn new(volumes: Vec<Box<dyn ByteSource>>) -> Result<Self, Fault> {
        if volumes.is_empty() {
            return Err(Fault::invalid_config("volume list is empty"));
        }
        Ok(Self {
            volumes: volumes.into_iter().map(Some).collect(),
            current: 0,
        })
    }

    /// Opens every path up front so a missing volume fails before any decoding.
    pub fn open_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Fault> {
        let mut volumes: Vec<Box<dyn ByteSource>> = Vec::with_capacity(paths.len());
        for path in paths {
            volumes.push(Box::new(FileSource::open(path)?));
        }
        Self::new(volumes)
    }

    /// One-based number of the volume being read; past the last once ended.
    pub fn current_volume(&self) -> usize {
        self.current + 1
    }

    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }
}

impl ByteSource for VolumeSource {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }
        while self.current < self.volumes.len() {
            let volume = match self.volumes[self.current].as_mut() {
                Some(volume) => volume,
                None => {
                    self.current += 1;
                    continue;
                }
            };
            match volume.pull(buf) {
                Ok(Signal::Eof) => {
                    debug!("volume {} of {} ended", self.current + 1, self.volumes.len());
                    self.volumes[self.current] = None;
                    self.current += 1;
                }
                Ok(signal) => return Ok(signal),
                Err(fault) => {
                    return Err(Fault::new(
                        fault.kind(),
                        format!("volume {}: {}", self.current + 1, fault.message()),
                    ))
                }
            }
        }
        Ok(Signal::Eof)
    }
}
