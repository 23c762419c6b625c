//! Source trait and built-in byte sources.
//!
//! A [`Source`] fills a [`Buffer`] with the next chunk of a stream. The crate
//! provides three root sources:
//!
//! - [`BytesSource`]: Replays an in-memory byte sequence
//! - [`ReaderSource`]: Reads from any [`std::io::Read`], including files
//! - [`ChannelSource`]: Receives chunks from a tokio mpsc channel
//!
//! Read-side transforms in [`crate::transform`] are sources too, so chains
//! like `Prologue(MapBytes(BytesSource))` compose uniformly.

mod channel;
mod memory;
mod reader;

pub use channel::ChannelSource;
pub use memory::BytesSource;
pub use reader::ReaderSource;

use crate::{Buffer, StreamError};

/// Outcome of a successful [`Source::fill`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// This many bytes were appended to the buffer. May be zero.
    Data(usize),
    /// The stream is exhausted. Every later call reports `End` again.
    End,
}

impl Fill {
    /// Returns `true` for [`Fill::End`].
    pub fn is_end(self) -> bool {
        matches!(self, Self::End)
    }
}

/// A producer of bytes.
///
/// # Implementation Notes
///
/// - `fill` appends to the buffer's spare region (see [`Buffer::spare_mut`])
///   and reports how many bytes it appended
/// - Once `fill` has returned [`Fill::End`] or an error it must keep returning
///   the same terminal result
/// - `close` releases the underlying resource; the [`Driver`](crate::Driver)
///   calls it on every exit path
/// - `abort` is called instead of `close` when the pipeline fails or is
///   cancelled, so pipe endpoints can forward the reason to the other side
///
/// # Example
///
/// ```
/// use stream_pipe::{Buffer, Fill, Source, StreamError};
///
/// /// Emits `count` zero bytes.
/// struct Zeros {
///     count: usize,
/// }
///
/// impl Source for Zeros {
///     fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
///         if self.count == 0 {
///             return Ok(Fill::End);
///         }
///         let n = self.count.min(buf.remaining());
///         buf.spare_mut()[..n].fill(0);
///         buf.commit(n)?;
///         self.count -= n;
///         Ok(Fill::Data(n))
///     }
/// }
/// ```
pub trait Source {
    /// Appends the next chunk of the stream to `buf`.
    ///
    /// # Errors
    ///
    /// Returns the source's failure, typically [`StreamError::Upstream`].
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError>;

    /// Releases the underlying resource.
    ///
    /// Default implementation does nothing.
    fn close(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    /// Releases the underlying resource after a failure or cancellation.
    ///
    /// Default implementation calls [`close()`](Source::close).
    fn abort(&mut self, _reason: &StreamError) -> Result<(), StreamError> {
        self.close()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        (**self).fill(buf)
    }

    fn close(&mut self) -> Result<(), StreamError> {
        (**self).close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        (**self).abort(reason)
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        (**self).fill(buf)
    }

    fn close(&mut self) -> Result<(), StreamError> {
        (**self).close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        (**self).abort(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        left: u8,
        closed: bool,
    }

    impl Source for Countdown {
        fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
            if self.left == 0 {
                return Ok(Fill::End);
            }
            let n = buf.extend_from_slice(&[self.left]);
            self.left -= 1;
            Ok(Fill::Data(n))
        }

        fn close(&mut self) -> Result<(), StreamError> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_fill_is_end() {
        assert!(Fill::End.is_end());
        assert!(!Fill::Data(0).is_end());
    }

    #[test]
    fn test_boxed_source_delegates() {
        let mut source: Box<dyn Source> = Box::new(Countdown {
            left: 2,
            closed: false,
        });
        let mut buf = Buffer::with_capacity(4);

        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(1));
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(1));
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
        assert_eq!(buf.as_slice(), &[2, 1]);
    }

    #[test]
    fn test_default_abort_closes() {
        let mut source = Countdown {
            left: 1,
            closed: false,
        };
        source.abort(&StreamError::Cancelled).unwrap();
        assert!(source.closed);
    }
}
