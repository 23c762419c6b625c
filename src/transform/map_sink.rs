//! Write-side byte mapping.

use crate::transform::{Shape, Transform};
use crate::{Buffer, Sink, StreamError};

/// Default size of the staging buffer for mapped bytes.
const DEFAULT_STAGING_CAPACITY: usize = 8192;

/// A write-side transform that maps every byte 1:1 before handing it on.
///
/// Mapped bytes are staged in a fixed [`Buffer`], so one call may be offered
/// at most [`max_accept()`](Sink::max_accept) bytes; offering more is a
/// [`StreamError::CapacityViolation`]. Because the mapping is 1:1, the count
/// the downstream sink consumed is the count reported back.
///
/// # Example
///
/// ```
/// use stream_pipe::{CollectSink, MapSink, Sink};
///
/// let mut sink = MapSink::uppercase(CollectSink::new());
/// sink.accept(b"shout").unwrap();
/// assert_eq!(sink.get_ref().bytes(), b"SHOUT");
/// ```
#[derive(Debug)]
pub struct MapSink<K> {
    downstream: K,
    map: fn(u8) -> u8,
    staging: Buffer,
}

impl<K: Sink> MapSink<K> {
    /// Wraps `downstream`, passing each byte through `map`.
    pub fn new(downstream: K, map: fn(u8) -> u8) -> Self {
        Self::with_capacity(downstream, map, DEFAULT_STAGING_CAPACITY)
    }

    /// Like [`new()`](MapSink::new) with a custom staging size.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(downstream: K, map: fn(u8) -> u8, capacity: usize) -> Self {
        Self {
            downstream,
            map,
            staging: Buffer::with_capacity(capacity.max(1)),
        }
    }

    /// ASCII uppercasing on the way out.
    pub fn uppercase(downstream: K) -> Self {
        Self::new(downstream, |b| b.to_ascii_uppercase())
    }

    /// Returns a reference to the wrapped sink.
    pub fn get_ref(&self) -> &K {
        &self.downstream
    }

    /// Unwraps the sink.
    pub fn into_inner(self) -> K {
        self.downstream
    }
}

impl<K: Sink> Sink for MapSink<K> {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        if let Some(limit) = self.max_accept() {
            if data.len() > limit {
                return Err(StreamError::CapacityViolation {
                    offered: data.len(),
                    capacity: limit,
                });
            }
        }

        self.staging.clear();
        self.staging.extend_from_slice(data);
        for byte in self.staging.as_mut_slice() {
            *byte = (self.map)(*byte);
        }

        let offered = self.staging.len();
        let n = self.downstream.accept(self.staging.as_slice())?;
        if n > offered {
            return Err(StreamError::CapacityViolation {
                offered: n,
                capacity: offered,
            });
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        self.downstream.flush()
    }

    fn try_flush(&mut self) -> Result<bool, StreamError> {
        self.downstream.try_flush()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.downstream.close()
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.downstream.abort(reason)
    }

    fn max_accept(&self) -> Option<usize> {
        let staging = self.staging.capacity();
        Some(
            self.downstream
                .max_accept()
                .map_or(staging, |max| max.min(staging)),
        )
    }
}

impl<K> Transform for MapSink<K> {
    fn shape(&self) -> Shape {
        Shape::Preserving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectSink;

    #[test]
    fn test_map_sink_maps_bytes() {
        let mut sink = MapSink::uppercase(CollectSink::new());
        assert_eq!(sink.accept(b"value-1\n").unwrap(), 8);
        assert_eq!(sink.into_inner().into_bytes(), b"VALUE-1\n");
    }

    #[test]
    fn test_map_sink_reports_downstream_partial() {
        let mut sink = MapSink::uppercase(CollectSink::new().with_accept_limit(2));
        assert_eq!(sink.accept(b"abcd").unwrap(), 2);
        assert_eq!(sink.accept(b"cd").unwrap(), 2);
        assert_eq!(sink.get_ref().bytes(), b"ABCD");
    }

    #[test]
    fn test_map_sink_rejects_more_than_staging_capacity() {
        let mut sink = MapSink::with_capacity(CollectSink::new(), |b| b, 3);
        assert_eq!(sink.max_accept(), Some(3));
        assert_eq!(sink.accept(b"abc").unwrap(), 3);
        assert_eq!(
            sink.accept(b"abcdef"),
            Err(StreamError::CapacityViolation {
                offered: 6,
                capacity: 3
            })
        );
        assert_eq!(sink.get_ref().bytes(), b"abc");
    }

    #[test]
    fn test_map_sink_inherits_downstream_limit() {
        let (writer, _reader) = crate::pipe(2).unwrap();
        let mut sink = MapSink::uppercase(writer);
        assert_eq!(sink.max_accept(), Some(2));
        assert!(matches!(
            sink.accept(b"abc"),
            Err(StreamError::CapacityViolation { offered: 3, .. })
        ));
    }

    #[test]
    fn test_map_sink_declares_preserving() {
        let sink = MapSink::uppercase(CollectSink::new());
        assert_eq!(sink.shape(), Shape::Preserving);
    }
}
