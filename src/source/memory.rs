//! In-memory root source.

use crate::{Buffer, Fill, Source, StreamError};

/// A source that replays a fixed byte sequence.
///
/// Useful as the root of a pipeline in tests and for small payloads that are
/// already in memory. [`with_chunk_size()`](BytesSource::with_chunk_size)
/// caps how much each `fill` returns, to exercise downstream stages with
/// small or uneven chunks.
///
/// # Example
///
/// ```
/// use stream_pipe::{Buffer, BytesSource, Fill, Source};
///
/// let mut source = BytesSource::new("value-0\nvalue-1\n").with_chunk_size(4);
/// let mut buf = Buffer::with_capacity(64);
///
/// assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(4));
/// assert_eq!(buf.as_slice(), b"valu");
/// ```
#[derive(Debug, Clone)]
pub struct BytesSource {
    data: Vec<u8>,
    position: usize,
    chunk_size: Option<usize>,
    closed: bool,
}

impl BytesSource {
    /// Creates a source that emits `data` and then ends.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            chunk_size: None,
            closed: false,
        }
    }

    /// Creates a source emitting each record followed by a newline.
    pub fn records<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        let mut data = Vec::new();
        for record in records {
            data.extend_from_slice(record.as_ref());
            data.push(b'\n');
        }
        Self::new(data)
    }

    /// Limits every `fill` to at most `chunk_size` bytes.
    ///
    /// A limit of zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size.max(1));
        self
    }

    /// Returns how many bytes have been emitted so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns how many bytes are left to emit.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` once [`close()`](Source::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Source for BytesSource {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        if self.closed || self.remaining() == 0 {
            return Ok(Fill::End);
        }

        let limit = self.chunk_size.unwrap_or(usize::MAX);
        let end = self.data.len().min(self.position.saturating_add(limit));
        let n = buf.extend_from_slice(&self.data[self.position..end]);
        self.position += n;
        Ok(Fill::Data(n))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.closed = true;
        self.data = Vec::new();
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut BytesSource, buf_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = Buffer::with_capacity(buf_size);
        loop {
            buf.clear();
            match source.fill(&mut buf).unwrap() {
                Fill::Data(_) => out.extend_from_slice(buf.as_slice()),
                Fill::End => return out,
            }
        }
    }

    #[test]
    fn test_bytes_source_emits_everything() {
        let mut source = BytesSource::new("hello world");
        assert_eq!(drain(&mut source, 4), b"hello world");
        assert_eq!(source.position(), 11);
    }

    #[test]
    fn test_bytes_source_respects_chunk_size() {
        let mut source = BytesSource::new("abcdef").with_chunk_size(2);
        let mut buf = Buffer::with_capacity(16);

        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(2));
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(2));
        assert_eq!(buf.as_slice(), b"abcd");
    }

    #[test]
    fn test_bytes_source_end_is_sticky() {
        let mut source = BytesSource::new("x");
        let mut buf = Buffer::with_capacity(4);

        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(1));
        for _ in 0..3 {
            assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
        }
    }

    #[test]
    fn test_bytes_source_full_buffer_yields_zero() {
        let mut source = BytesSource::new("abc");
        let mut buf = Buffer::with_capacity(1);
        buf.extend_from_slice(b"z");

        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(0));
        assert_eq!(source.remaining(), 3);
    }

    #[test]
    fn test_records_adds_newlines() {
        let mut source = BytesSource::records(["value-0", "value-1"]);
        assert_eq!(drain(&mut source, 64), b"value-0\nvalue-1\n");
    }

    #[test]
    fn test_close_ends_stream() {
        let mut source = BytesSource::new("abc");
        source.close().unwrap();
        assert!(source.is_closed());

        let mut buf = Buffer::with_capacity(4);
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
    }
}
