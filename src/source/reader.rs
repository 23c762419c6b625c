//! `std::io::Read` source, including files.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::{Buffer, FailureKind, Fill, Source, StreamError};

enum ReadState {
    Open,
    Ended,
    Failed(StreamError),
}

/// A source backed by any [`Read`] implementation.
///
/// The reader is dropped on [`close()`](Source::close), which releases the
/// file handle or socket behind it. An I/O failure is reported as
/// [`StreamError::Upstream`] and repeated on every later call.
///
/// # Example
///
/// ```no_run
/// use stream_pipe::ReaderSource;
///
/// let source = ReaderSource::open("records.csv")?;
/// # Ok::<(), stream_pipe::StreamError>(())
/// ```
pub struct ReaderSource<R> {
    name: String,
    reader: Option<R>,
    state: ReadState,
}

impl<R: Read> ReaderSource<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self::with_name("reader", reader)
    }

    /// Wraps a reader with a custom name used in logs.
    pub fn with_name(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader: Some(reader),
            state: ReadState::Open,
        }
    }

    /// Human-readable name for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the reader has been released.
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl ReaderSource<File> {
    /// Opens the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Upstream`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|e| StreamError::Upstream(FailureKind::file(path, &e)))?;
        Ok(Self::with_name(format!("file:{}", path.display()), file))
    }
}

impl<R: Read> Source for ReaderSource<R> {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        match &self.state {
            ReadState::Ended => return Ok(Fill::End),
            ReadState::Failed(err) => return Err(err.clone()),
            ReadState::Open => {}
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(Fill::End);
        };
        if buf.remaining() == 0 {
            return Ok(Fill::Data(0));
        }

        loop {
            match reader.read(buf.spare_mut()) {
                Ok(0) => {
                    tracing::trace!(source = %self.name, "end of input");
                    self.state = ReadState::Ended;
                    return Ok(Fill::End);
                }
                Ok(n) => {
                    buf.commit(n)?;
                    return Ok(Fill::Data(n));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    let err = StreamError::upstream_io(e);
                    self.state = ReadState::Failed(err.clone());
                    return Err(err);
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if self.reader.take().is_some() {
            tracing::trace!(source = %self.name, "reader released");
        }
        if matches!(self.state, ReadState::Open) {
            self.state = ReadState::Ended;
        }
        Ok(())
    }
}

impl<R> std::fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            ReadState::Open => "open",
            ReadState::Ended => "ended",
            ReadState::Failed(_) => "failed",
        };
        f.debug_struct("ReaderSource")
            .field("name", &self.name)
            .field("closed", &self.reader.is_none())
            .field("state", &state)
            .finish_non_exhaustive()
    }
}
