//! `std::io::Write` sink, including files.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{FailureKind, Sink, StreamError};

/// A sink backed by any [`Write`] implementation.
///
/// Each [`accept()`](Sink::accept) is a single `write` call, so a short
/// write surfaces as partial consumption. Wrap it in a
/// [`BufferedSink`](crate::BufferedSink) to batch small chunks.
///
/// The writer is flushed and dropped on [`close()`](Sink::close). On
/// [`abort()`](Sink::abort) it is dropped without a final flush. Bytes
/// already written are not rolled back.
///
/// # Example
///
/// ```no_run
/// use stream_pipe::{BufferedSink, WriterSink};
///
/// let sink = BufferedSink::new(WriterSink::create("out.csv")?, 8192);
/// # Ok::<(), stream_pipe::StreamError>(())
/// ```
pub struct WriterSink<W: Write> {
    name: String,
    path: Option<PathBuf>,
    writer: Option<W>,
    failed: Option<StreamError>,
}

impl<W: Write> WriterSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self::with_name("writer", writer)
    }

    /// Wraps a writer with a custom name used in logs.
    pub fn with_name(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            path: None,
            writer: Some(writer),
            failed: None,
        }
    }

    /// Human-readable name for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the writer has been released.
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Returns the writer, if the sink has not been closed.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }

    fn io_failure(&mut self, err: &std::io::Error) -> StreamError {
        let kind = match &self.path {
            Some(path) => FailureKind::file(path, err),
            None => FailureKind::Io {
                kind: err.kind(),
                message: err.to_string(),
            },
        };
        let err = StreamError::Downstream(kind);
        self.failed = Some(err.clone());
        err
    }

    fn writer(&mut self) -> Result<&mut W, StreamError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        self.writer
            .as_mut()
            .ok_or(StreamError::Downstream(FailureKind::Closed))
    }
}

impl WriterSink<File> {
    /// Creates (or truncates) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Downstream`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file =
            File::create(path).map_err(|e| StreamError::Downstream(FailureKind::file(path, &e)))?;
        Ok(Self {
            name: format!("file:{}", path.display()),
            path: Some(path.to_path_buf()),
            writer: Some(file),
            failed: None,
        })
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        if data.is_empty() {
            return self.writer().map(|_| 0);
        }
        loop {
            let result = self.writer()?.write(data);
            match result {
                Ok(0) => {
                    let err = std::io::Error::from(ErrorKind::WriteZero);
                    return Err(self.io_failure(&err));
                }
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(self.io_failure(&e)),
            }
        }
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        let result = self.writer()?.flush();
        result.map_err(|e| self.io_failure(&e))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        if self.failed.is_some() {
            return Ok(());
        }
        tracing::trace!(sink = %self.name, "flushing and releasing writer");
        writer.flush().map_err(|e| self.io_failure(&e))
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        if self.writer.take().is_some() {
            tracing::trace!(sink = %self.name, %reason, "writer released without flush");
        }
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tempfile::tempdir;

    struct ShortWriter {
        written: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(2);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sink_short_write_is_partial() {
        let mut sink = WriterSink::new(ShortWriter {
            written: Vec::new(),
        });
        assert_eq!(sink.accept(b"abcdef").unwrap(), 2);
        assert_eq!(sink.into_inner().unwrap().written, b"ab");
    }

    #[test]
    fn test_writer_sink_error_is_sticky() {
        let mut sink = WriterSink::new(BrokenWriter);
        let first = sink.accept(b"abc").unwrap_err();
        let second = sink.accept(b"abc").unwrap_err();
        assert_eq!(first, second);
        assert!(matches!(
            first,
            StreamError::Downstream(FailureKind::Io {
                kind: io::ErrorKind::BrokenPipe,
                ..
            })
        ));
    }

    #[test]
    fn test_writer_sink_rejects_after_close() {
        let mut sink = WriterSink::new(Vec::new());
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert_eq!(
            sink.accept(b"x"),
            Err(StreamError::Downstream(FailureKind::Closed))
        );
        // closing twice is fine
        sink.close().unwrap();
    }

    #[test]
    fn test_writer_sink_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut sink = WriterSink::create(&path).unwrap();
        assert_eq!(sink.name(), format!("file:{}", path.display()));
        let mut written = 0;
        while written < 5 {
            written += sink.accept(&b"hello"[written..]).unwrap();
        }
        sink.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_writer_sink_invalid_path_error() {
        let Err(err) = WriterSink::create("/nonexistent/directory/out.txt") else {
            panic!("expected create to fail");
        };
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_writer_sink_abort_skips_flush() {
        let mut sink = WriterSink::new(Vec::new());
        sink.accept(b"abc").unwrap();
        sink.abort(&StreamError::Cancelled).unwrap();
        assert!(sink.is_closed());
    }
}
