//! In-memory collecting sink.

use crate::{FailureKind, Sink, StreamError};

/// A sink that appends everything it accepts to a `Vec<u8>`.
///
/// [`with_accept_limit()`](CollectSink::with_accept_limit) makes the sink
/// consume at most N bytes per call, which simulates a slow consumer and
/// exercises the backpressure path of whatever is writing into it.
///
/// # Example
///
/// ```
/// use stream_pipe::{CollectSink, Sink};
///
/// let mut sink = CollectSink::new().with_accept_limit(2);
/// assert_eq!(sink.accept(b"abc").unwrap(), 2);
/// assert_eq!(sink.bytes(), b"ab");
/// ```
#[derive(Debug, Default)]
pub struct CollectSink {
    bytes: Vec<u8>,
    accept_limit: Option<usize>,
    flushes: usize,
    closed: bool,
}

impl CollectSink {
    /// Creates an empty collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes at most `limit` bytes per [`accept()`](Sink::accept) call.
    #[must_use]
    pub fn with_accept_limit(mut self, limit: usize) -> Self {
        self.accept_limit = Some(limit);
        self
    }

    /// The bytes collected so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the sink and returns the collected bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of times [`flush()`](Sink::flush) has been called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Returns `true` once [`close()`](Sink::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Sink for CollectSink {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        if self.closed {
            return Err(StreamError::Downstream(FailureKind::Closed));
        }
        let n = data.len().min(self.accept_limit.unwrap_or(usize::MAX));
        self.bytes.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        self.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_sink_accepts_everything() {
        let mut sink = CollectSink::new();
        assert_eq!(sink.accept(b"hello ").unwrap(), 6);
        assert_eq!(sink.accept(b"world").unwrap(), 5);
        assert_eq!(sink.into_bytes(), b"hello world");
    }

    #[test]
    fn test_collect_sink_partial_accept() {
        let mut sink = CollectSink::new().with_accept_limit(3);
        assert_eq!(sink.accept(b"abcdef").unwrap(), 3);
        assert_eq!(sink.accept(b"def").unwrap(), 3);
        assert_eq!(sink.bytes(), b"abcdef");
    }

    #[test]
    fn test_collect_sink_rejects_after_close() {
        let mut sink = CollectSink::new();
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert_eq!(
            sink.accept(b"late"),
            Err(StreamError::Downstream(FailureKind::Closed))
        );
        assert_eq!(
            sink.accept(b"later"),
            Err(StreamError::Downstream(FailureKind::Closed))
        );
    }

    #[test]
    fn test_collect_sink_counts_flushes() {
        let mut sink = CollectSink::new();
        sink.flush().unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.flush_count(), 2);
    }
}
