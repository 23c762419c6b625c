//! Sink trait and implementations for byte destinations.
//!
//! A [`Sink`] is any destination that can accept bytes. The crate provides
//! these built-in sinks:
//!
//! - [`CollectSink`]: Collects everything into a `Vec<u8>`
//! - [`WriterSink`]: Writes to any [`std::io::Write`], including files
//! - [`ChannelSink`]: Sends chunks to a tokio mpsc channel
//! - [`BufferedSink`]: Batches small writes before handing them downstream
//!
//! You can implement the [`Sink`] trait for custom destinations like
//! network endpoints or record encoders.

mod buffered;
mod channel;
mod collect;
mod writer;

pub use buffered::BufferedSink;
pub use channel::ChannelSink;
pub use collect::CollectSink;
pub use writer::WriterSink;

use crate::StreamError;

/// A destination for bytes.
///
/// # Implementation Notes
///
/// - `accept` returns how many of the offered bytes were consumed. Consuming
///   fewer than offered is backpressure, not an error; the caller retries with
///   the remainder
/// - Consuming more than offered is a [`StreamError::CapacityViolation`]
/// - `max_accept` declares the most bytes one call may be offered
/// - At end of stream the [`Driver`](crate::Driver) calls `try_flush` until it
///   reports completion, checking the cancel signal in between. Sinks that
///   batch internally override `try_flush` so a stuck downstream cannot pin
///   the driver
/// - `close` releases the resource on every exit path; `abort` replaces it
///   when the pipeline failed or was cancelled
///
/// # Example
///
/// ```
/// use stream_pipe::{Sink, StreamError};
///
/// struct CountingSink {
///     bytes: usize,
/// }
///
/// impl Sink for CountingSink {
///     fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
///         self.bytes += data.len();
///         Ok(data.len())
///     }
/// }
/// ```
pub trait Sink {
    /// Consumes a prefix of `data` and returns its length.
    ///
    /// # Errors
    ///
    /// Returns the sink's failure, typically [`StreamError::Downstream`].
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError>;

    /// Pushes any internally batched bytes downstream.
    ///
    /// Default implementation does nothing.
    fn flush(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    /// Makes one attempt at pushing batched bytes downstream.
    ///
    /// Returns `true` once nothing is left to push. `false` means the
    /// downstream sink is applying backpressure and the call should be
    /// repeated. Default implementation calls [`flush()`](Sink::flush) and
    /// returns `true`.
    ///
    /// # Errors
    ///
    /// Returns the sink's failure.
    fn try_flush(&mut self) -> Result<bool, StreamError> {
        self.flush().map(|()| true)
    }

    /// Releases the underlying resource.
    ///
    /// Default implementation does nothing.
    fn close(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    /// Releases the underlying resource after a failure or cancellation.
    ///
    /// Default implementation calls [`close()`](Sink::close).
    fn abort(&mut self, _reason: &StreamError) -> Result<(), StreamError> {
        self.close()
    }

    /// The most bytes a single [`accept()`](Sink::accept) call may be offered.
    ///
    /// `None` means unbounded.
    fn max_accept(&self) -> Option<usize> {
        None
    }
}

impl<K: Sink + ?Sized> Sink for Box<K> {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        (**self).accept(data)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        (**self).flush()
    }

    fn try_flush(&mut self) -> Result<bool, StreamError> {
        (**self).try_flush()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        (**self).close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        (**self).abort(reason)
    }

    fn max_accept(&self) -> Option<usize> {
        (**self).max_accept()
    }
}

impl<K: Sink + ?Sized> Sink for &mut K {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        (**self).accept(data)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        (**self).flush()
    }

    fn try_flush(&mut self) -> Result<bool, StreamError> {
        (**self).try_flush()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        (**self).close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        (**self).abort(reason)
    }

    fn max_accept(&self) -> Option<usize> {
        (**self).max_accept()
    }
}

/// Offers all of `data` to `sink`, retrying on partial consumption.
///
/// Respects [`Sink::max_accept`]. A sink that consumes nothing is retried
/// after yielding the thread.
///
/// # Errors
///
/// Returns the sink's error, or [`StreamError::CapacityViolation`] if the
/// sink reports consuming more than it was offered.
pub fn accept_all<K: Sink + ?Sized>(sink: &mut K, data: &[u8]) -> Result<(), StreamError> {
    let limit = sink.max_accept().unwrap_or(usize::MAX).max(1);
    let mut offset = 0;
    while offset < data.len() {
        let end = data.len().min(offset.saturating_add(limit));
        let offered = end - offset;
        let n = sink.accept(&data[offset..end])?;
        if n > offered {
            return Err(StreamError::CapacityViolation {
                offered: n,
                capacity: offered,
            });
        }
        if n == 0 {
            std::thread::yield_now();
        }
        offset += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chunky {
        seen: Vec<Vec<u8>>,
        per_call: usize,
        max: Option<usize>,
    }

    impl Sink for Chunky {
        fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
            let n = data.len().min(self.per_call);
            self.seen.push(data[..n].to_vec());
            Ok(n)
        }

        fn max_accept(&self) -> Option<usize> {
            self.max
        }
    }

    struct Greedy;

    impl Sink for Greedy {
        fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
            Ok(data.len() + 1)
        }
    }

    #[test]
    fn test_accept_all_retries_partial() {
        let mut sink = Chunky {
            seen: Vec::new(),
            per_call: 2,
            max: None,
        };
        accept_all(&mut sink, b"abcde").unwrap();
        assert_eq!(sink.seen, vec![b"ab".to_vec(), b"cd".to_vec(), b"e".to_vec()]);
    }

    #[test]
    fn test_accept_all_honors_max_accept() {
        let mut sink = Chunky {
            seen: Vec::new(),
            per_call: usize::MAX,
            max: Some(3),
        };
        accept_all(&mut sink, b"abcdefg").unwrap();
        assert!(sink.seen.iter().all(|chunk| chunk.len() <= 3));
        assert_eq!(sink.seen.concat(), b"abcdefg");
    }

    #[test]
    fn test_accept_all_rejects_overconsumption() {
        let err = accept_all(&mut Greedy, b"abc").unwrap_err();
        assert_eq!(
            err,
            StreamError::CapacityViolation {
                offered: 4,
                capacity: 3
            }
        );
    }

    #[test]
    fn test_boxed_sink_delegates() {
        let mut sink: Box<dyn Sink> = Box::new(Chunky {
            seen: Vec::new(),
            per_call: 10,
            max: Some(7),
        });
        assert_eq!(sink.max_accept(), Some(7));
        assert_eq!(sink.accept(b"abc").unwrap(), 3);
    }

    #[test]
    fn test_sink_is_object_safe_and_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Box<dyn Sink + Send>>();
    }
}
