//! One-shot header injection.

use crate::transform::{Shape, Transform};
use crate::{Buffer, Fill, Source, StreamError};

/// A read-side transform that emits a fixed prologue before any upstream byte.
///
/// While the prologue is being delivered upstream is not touched. If the
/// caller's buffer is smaller than the prologue, delivery continues from the
/// same offset on the next call. Once every prologue byte has been handed out,
/// calls go straight to upstream.
///
/// # Example
///
/// ```
/// use stream_pipe::{Buffer, BytesSource, Fill, Prologue, Source};
///
/// let mut csv = Prologue::new(BytesSource::new("1,alice\n"), "id,name\n");
/// let mut buf = Buffer::with_capacity(4);
///
/// assert_eq!(csv.fill(&mut buf).unwrap(), Fill::Data(4));
/// assert_eq!(buf.as_slice(), b"id,n");
/// assert!(!csv.prologue_emitted());
/// ```
#[derive(Debug)]
pub struct Prologue<S> {
    upstream: S,
    prologue: Vec<u8>,
    offset: usize,
}

impl<S: Source> Prologue<S> {
    /// Wraps `upstream`, emitting `prologue` first.
    pub fn new(upstream: S, prologue: impl Into<Vec<u8>>) -> Self {
        Self {
            upstream,
            prologue: prologue.into(),
            offset: 0,
        }
    }

    /// Returns `true` once every prologue byte has been delivered.
    pub fn prologue_emitted(&self) -> bool {
        self.offset == self.prologue.len()
    }
}

impl<S: Source> Source for Prologue<S> {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        if self.prologue_emitted() {
            return self.upstream.fill(buf);
        }
        let n = buf.extend_from_slice(&self.prologue[self.offset..]);
        self.offset += n;
        Ok(Fill::Data(n))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.upstream.close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.upstream.abort(reason)
    }
}

impl<S> Transform for Prologue<S> {
    fn shape(&self) -> Shape {
        Shape::Reshaping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BytesSource;

    const HEADER: &[u8] = b"id,name\n";

    /// Fails the test if the prologue stage reads upstream too early.
    struct Tripwire {
        inner: BytesSource,
        calls: usize,
    }

    impl Source for Tripwire {
        fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
            self.calls += 1;
            self.inner.fill(buf)
        }
    }

    fn drive(buf_size: usize) -> Vec<u8> {
        let upstream = Tripwire {
            inner: BytesSource::new("1,alice\n"),
            calls: 0,
        };
        let mut prologue = Prologue::new(upstream, HEADER);
        let mut out = Vec::new();
        let mut buf = Buffer::with_capacity(buf_size);

        while !prologue.prologue_emitted() {
            buf.clear();
            prologue.fill(&mut buf).unwrap();
            out.extend_from_slice(buf.as_slice());
            assert_eq!(prologue.upstream.calls, 0);
        }
        loop {
            buf.clear();
            if prologue.fill(&mut buf).unwrap().is_end() {
                return out;
            }
            out.extend_from_slice(buf.as_slice());
        }
    }

    #[test]
    fn test_prologue_with_various_buffer_sizes() {
        let len = HEADER.len();
        for size in [1, len - 1, len, len + 1] {
            let out = drive(size);
            assert_eq!(&out[..len], HEADER, "buffer size {size}");
            assert_eq!(&out[len..], b"1,alice\n", "buffer size {size}");
        }
    }

    #[test]
    fn test_prologue_is_emitted_once() {
        let mut source = Prologue::new(BytesSource::new("x"), "h");
        let mut buf = Buffer::with_capacity(8);
        while !source.fill(&mut buf).unwrap().is_end() {}
        assert_eq!(buf.as_slice(), b"hx");
    }

    #[test]
    fn test_empty_prologue_delegates_immediately() {
        let mut source = Prologue::new(BytesSource::new("abc"), "");
        assert!(source.prologue_emitted());
        let mut buf = Buffer::with_capacity(8);
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(3));
    }

    #[test]
    fn test_prologue_over_empty_upstream() {
        let mut source = Prologue::new(BytesSource::new(""), "header");
        let mut buf = Buffer::with_capacity(8);
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(6));
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
    }
}
