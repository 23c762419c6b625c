//! Length-preserving byte mapping.

use crate::transform::{Shape, Transform};
use crate::{Buffer, Fill, Source, StreamError};

/// A read-side transform that maps every byte 1:1.
///
/// Upstream fills the caller's buffer directly and the new bytes are
/// rewritten in place, so no extra copy or allocation is made.
///
/// # Example
///
/// ```
/// use stream_pipe::{Buffer, BytesSource, Fill, MapBytes, Source};
///
/// let mut upper = MapBytes::uppercase(BytesSource::new("value-0\n"));
/// let mut buf = Buffer::with_capacity(64);
/// upper.fill(&mut buf).unwrap();
/// assert_eq!(buf.as_slice(), b"VALUE-0\n");
/// ```
#[derive(Debug)]
pub struct MapBytes<S> {
    upstream: S,
    map: fn(u8) -> u8,
}

impl<S: Source> MapBytes<S> {
    /// Wraps `upstream`, passing each byte through `map`.
    pub fn new(upstream: S, map: fn(u8) -> u8) -> Self {
        Self { upstream, map }
    }

    /// ASCII uppercasing. Non-ASCII bytes pass through unchanged.
    pub fn uppercase(upstream: S) -> Self {
        Self::new(upstream, |b| b.to_ascii_uppercase())
    }

    /// ASCII lowercasing. Non-ASCII bytes pass through unchanged.
    pub fn lowercase(upstream: S) -> Self {
        Self::new(upstream, |b| b.to_ascii_lowercase())
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.upstream
    }
}

impl<S: Source> Source for MapBytes<S> {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        let start = buf.len();
        let fill = self.upstream.fill(buf)?;
        for byte in &mut buf.as_mut_slice()[start..] {
            *byte = (self.map)(*byte);
        }
        Ok(fill)
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.upstream.close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.upstream.abort(reason)
    }
}

impl<S> Transform for MapBytes<S> {
    fn shape(&self) -> Shape {
        Shape::Preserving
    }
}
