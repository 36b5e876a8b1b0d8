//! Sources backed by `std::io::Read`, including files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::Fault;
use crate::source::ByteSource;
use crate::types::{PullResult, Signal};

/// Adapts any `Read` implementation into a `ByteSource`.
///
/// `Interrupted` and `WouldBlock` become `Signal::NeedsRetry`; a zero-length
/// read of a non-empty buffer is end of stream; every other error is a
/// `FaultKind::Io` fault.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

/// A `ReaderSource` over a file on disk.
pub type FileSource = ReaderSource<File>;

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Fault> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Fault::new(
                crate::error::FaultKind::Io,
                format!("cannot open {}: {}", path.display(), e),
            )
        })?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> PullResult {
        if buf.is_empty() {
            return Ok(Signal::Ok(0));
        }
        match self.inner.read(buf) {
            Ok(0) => Ok(Signal::Eof),
            Ok(n) => Ok(Signal::Ok(n)),
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                Ok(Signal::NeedsRetry)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use std::io::Cursor;

    struct Stuttering {
        calls: usize,
    }

    impl Read for Stuttering {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.calls {
                1 => Err(io::ErrorKind::Interrupted.into()),
                2 => {
                    buf[0] = 7;
                    Ok(1)
                }
                _ => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
            }
        }
    }

    #[test]
    fn test_reader_source_maps_io_outcomes() {
        let mut source = ReaderSource::new(Stuttering { calls: 0 });
        let mut buf = [0u8; 8];

        assert_eq!(source.pull(&mut buf).unwrap(), Signal::NeedsRetry);
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Ok(1));
        assert_eq!(buf[0], 7);
        let fault = source.pull(&mut buf).unwrap_err();
        assert_eq!(fault.kind(), FaultKind::Io);
    }

    #[test]
    fn test_reader_source_reports_eof_on_zero_read() {
        let mut source = ReaderSource::new(Cursor::new(vec![1u8, 2]));
        let mut buf = [0u8; 4];
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Ok(2));
        assert_eq!(source.pull(&mut buf).unwrap(), Signal::Eof);
    }

    #[test]
    fn test_missing_file_is_io_fault() {
        let err = FileSource::open("/definitely/not/here.7z").unwrap_err();
        assert_eq!(err.kind(), FaultKind::Io);
        assert!(err.message().contains("not/here.7z"));
    }
}
