//! Batching sink decorator.

use crate::{Buffer, Sink, StreamError};

/// A sink that accumulates small writes and hands them downstream in batches.
///
/// Bytes are copied into a private [`Buffer`]. When the buffer fills, its
/// whole contents are offered to the wrapped sink in one `accept` call. A
/// write at least as large as the batch that arrives while the batch is
/// empty skips the copy and goes straight downstream.
///
/// Call [`flush()`](Sink::flush) at end of stream to push the trailing
/// partial batch. `flush` keeps retrying while the wrapped sink applies
/// backpressure; the [`Driver`](crate::Driver) uses
/// [`try_flush()`](Sink::try_flush) instead so it can stop on cancellation.
/// [`close()`](Sink::close) does not flush.
///
/// # Example
///
/// ```
/// use stream_pipe::{BufferedSink, CollectSink, Sink};
///
/// let mut sink = BufferedSink::new(CollectSink::new(), 4);
/// sink.accept(b"ab").unwrap();
/// assert_eq!(sink.get_ref().bytes(), b"");
///
/// sink.flush().unwrap();
/// assert_eq!(sink.get_ref().bytes(), b"ab");
/// ```
#[derive(Debug)]
pub struct BufferedSink<K> {
    inner: K,
    batch: Buffer,
}

impl<K: Sink> BufferedSink<K> {
    /// Wraps `inner` with a batch of `capacity` bytes.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(inner: K, capacity: usize) -> Self {
        Self {
            inner,
            batch: Buffer::with_capacity(capacity.max(1)),
        }
    }

    /// Number of bytes waiting in the batch.
    pub fn buffered(&self) -> usize {
        self.batch.len()
    }

    /// Batch capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.batch.capacity()
    }

    /// Returns a reference to the wrapped sink.
    pub fn get_ref(&self) -> &K {
        &self.inner
    }

    /// Unwraps the sink, discarding any unflushed bytes.
    pub fn into_inner(self) -> K {
        self.inner
    }

    /// Offers the batch downstream once and drops whatever was consumed.
    ///
    /// Returns how many bytes left the batch.
    fn push_batch(&mut self) -> Result<usize, StreamError> {
        let limit = self.inner.max_accept().unwrap_or(usize::MAX).max(1);
        let offered = self.batch.len().min(limit);
        let n = self.inner.accept(&self.batch.as_slice()[..offered])?;
        if n > offered {
            return Err(StreamError::CapacityViolation {
                offered: n,
                capacity: offered,
            });
        }
        self.batch.consume(n);
        Ok(n)
    }
}

impl<K: Sink> Sink for BufferedSink<K> {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        if data.is_empty() {
            return Ok(0);
        }
        if self.batch.is_full() {
            self.push_batch()?;
            if self.batch.is_full() {
                return Ok(0);
            }
        }

        if self.batch.is_empty() && data.len() >= self.batch.capacity() {
            let limit = self.inner.max_accept().unwrap_or(usize::MAX).max(1);
            let offered = data.len().min(limit);
            let n = self.inner.accept(&data[..offered])?;
            if n > offered {
                return Err(StreamError::CapacityViolation {
                    offered: n,
                    capacity: offered,
                });
            }
            return Ok(n);
        }

        let n = self.batch.extend_from_slice(data);
        if self.batch.is_full() {
            self.push_batch()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        while !self.try_flush()? {
            std::thread::yield_now();
        }
        Ok(())
    }

    fn try_flush(&mut self) -> Result<bool, StreamError> {
        if !self.batch.is_empty() {
            self.push_batch()?;
            if !self.batch.is_empty() {
                return Ok(false);
            }
        }
        self.inner.try_flush()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if !self.batch.is_empty() {
            tracing::debug!(
                discarded = self.batch.len(),
                "closing batched sink with unflushed bytes"
            );
            self.batch.clear();
        }
        self.inner.close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.batch.clear();
        self.inner.abort(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectSink;

    /// Records the size of every accept call it receives.
    #[derive(Default)]
    struct CallLog {
        calls: Vec<usize>,
        bytes: Vec<u8>,
        per_call: Option<usize>,
    }

    impl Sink for CallLog {
        fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
            let n = data.len().min(self.per_call.unwrap_or(usize::MAX));
            self.calls.push(data.len());
            self.bytes.extend_from_slice(&data[..n]);
            Ok(n)
        }
    }

    #[test]
    fn test_buffered_sink_batches_small_writes() {
        let mut sink = BufferedSink::new(CallLog::default(), 4);
        for byte in b"abcdefgh" {
            assert_eq!(sink.accept(&[*byte]).unwrap(), 1);
        }
        assert_eq!(sink.get_ref().calls, vec![4, 4]);
        assert_eq!(sink.get_ref().bytes, b"abcdefgh");
    }

    #[test]
    fn test_buffered_sink_flush_pushes_partial_batch() {
        let mut sink = BufferedSink::new(CallLog::default(), 4);
        sink.accept(b"ab").unwrap();
        assert!(sink.get_ref().calls.is_empty());
        assert_eq!(sink.buffered(), 2);

        sink.flush().unwrap();
        assert_eq!(sink.get_ref().calls, vec![2]);
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_buffered_sink_large_write_bypasses_batch() {
        let mut sink = BufferedSink::new(CallLog::default(), 4);
        assert_eq!(sink.accept(b"0123456789").unwrap(), 10);
        assert_eq!(sink.get_ref().calls, vec![10]);
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_buffered_sink_keeps_unconsumed_tail() {
        let inner = CallLog {
            per_call: Some(3),
            ..CallLog::default()
        };
        let mut sink = BufferedSink::new(inner, 4);

        assert_eq!(sink.accept(b"ab").unwrap(), 2);
        assert_eq!(sink.accept(b"cd").unwrap(), 2);
        assert_eq!(sink.get_ref().calls, vec![4]);
        assert_eq!(sink.buffered(), 1);

        sink.flush().unwrap();
        assert_eq!(sink.get_ref().bytes, b"abcd");
    }

    #[test]
    fn test_buffered_sink_backpressure_when_stuck() {
        let inner = CallLog {
            per_call: Some(0),
            ..CallLog::default()
        };
        let mut sink = BufferedSink::new(inner, 2);
        assert_eq!(sink.accept(b"a").unwrap(), 1);
        assert_eq!(sink.accept(b"b").unwrap(), 1);
        assert_eq!(sink.accept(b"c").unwrap(), 0);
        assert_eq!(sink.buffered(), 2);
    }

    #[test]
    fn test_buffered_sink_try_flush_reports_progress() {
        let inner = CallLog {
            per_call: Some(2),
            ..CallLog::default()
        };
        let mut sink = BufferedSink::new(inner, 8);
        sink.accept(b"abcde").unwrap();

        assert!(!sink.try_flush().unwrap());
        assert!(!sink.try_flush().unwrap());
        assert!(sink.try_flush().unwrap());
        assert_eq!(sink.get_ref().bytes, b"abcde");
        assert!(sink.try_flush().unwrap());
    }

    #[test]
    fn test_buffered_sink_close_discards_batch() {
        let mut sink = BufferedSink::new(CollectSink::new(), 8);
        sink.accept(b"tail").unwrap();
        sink.close().unwrap();
        assert!(sink.get_ref().is_closed());
        assert!(sink.get_ref().bytes().is_empty());
    }
}
