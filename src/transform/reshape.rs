//! Length-changing transform driven by an encoder closure.

use crate::transform::{Shape, Transform};
use crate::{Buffer, Fill, Source, StreamError};

/// Default size of the scratch buffer used to read upstream chunks.
const DEFAULT_SCRATCH_CAPACITY: usize = 4096;

/// A read-side transform whose output length may differ from its input.
///
/// Each upstream chunk is passed to `encode`, which appends its output to a
/// vector. Output that does not fit in the caller's buffer is kept and handed
/// out on later calls, tracked by a byte offset, before upstream is read
/// again.
///
/// # Example
///
/// ```
/// use stream_pipe::{Buffer, BytesSource, Reshape, Source};
///
/// // Hex-encode every byte: output is twice the input.
/// let mut hex = Reshape::new(BytesSource::new("hi"), |input: &[u8], out: &mut Vec<u8>| {
///     for byte in input {
///         out.extend_from_slice(format!("{byte:02x}").as_bytes());
///     }
/// });
///
/// let mut buf = Buffer::with_capacity(64);
/// hex.fill(&mut buf).unwrap();
/// assert_eq!(buf.as_slice(), b"6869");
/// ```
pub struct Reshape<S, F> {
    upstream: S,
    encode: F,
    scratch: Buffer,
    pending: Vec<u8>,
    offset: usize,
    upstream_done: bool,
}

impl<S, F> Reshape<S, F>
where
    S: Source,
    F: FnMut(&[u8], &mut Vec<u8>),
{
    /// Wraps `upstream`, encoding each chunk with `encode`.
    pub fn new(upstream: S, encode: F) -> Self {
        Self::with_scratch_capacity(upstream, encode, DEFAULT_SCRATCH_CAPACITY)
    }

    /// Like [`new()`](Reshape::new) with a custom upstream read size.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_scratch_capacity(upstream: S, encode: F, capacity: usize) -> Self {
        Self {
            upstream,
            encode,
            scratch: Buffer::with_capacity(capacity.max(1)),
            pending: Vec::new(),
            offset: 0,
            upstream_done: false,
        }
    }

    /// Encoded bytes not yet handed to a caller.
    pub fn pending(&self) -> usize {
        self.pending.len() - self.offset
    }
}

impl<S, F> Source for Reshape<S, F>
where
    S: Source,
    F: FnMut(&[u8], &mut Vec<u8>),
{
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        if self.offset == self.pending.len() {
            if self.upstream_done {
                return Ok(Fill::End);
            }
            self.scratch.clear();
            if self.upstream.fill(&mut self.scratch)?.is_end() {
                self.upstream_done = true;
                return Ok(Fill::End);
            }
            self.pending.clear();
            self.offset = 0;
            (self.encode)(self.scratch.as_slice(), &mut self.pending);
        }

        let n = buf.extend_from_slice(&self.pending[self.offset..]);
        self.offset += n;
        Ok(Fill::Data(n))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.pending.clear();
        self.offset = 0;
        self.upstream.close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.pending.clear();
        self.offset = 0;
        self.upstream.abort(reason)
    }
}

impl<S, F> Transform for Reshape<S, F> {
    fn shape(&self) -> Shape {
        Shape::Reshaping
    }
}

impl<S: std::fmt::Debug, F> std::fmt::Debug for Reshape<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reshape")
            .field("upstream", &self.upstream)
            .field("pending", &(self.pending.len() - self.offset))
            .field("upstream_done", &self.upstream_done)
            .finish_non_exhaustive()
    }
}
