//! Fixed-capacity byte window reused between pipeline stages.

use crate::StreamError;

/// A contiguous byte region with a fixed capacity and a valid length.
///
/// `Buffer` is the unit of data handed from a [`Source`](crate::Source) to
/// the [`Driver`](crate::Driver). It is allocated once per stage and reused
/// for every chunk, so a pipeline's memory use does not grow with the size
/// of the stream.
///
/// The first [`len()`](Buffer::len) bytes are meaningful; the rest is spare
/// room a source may fill through [`spare_mut()`](Buffer::spare_mut) followed
/// by [`commit()`](Buffer::commit).
///
/// # Example
///
/// ```
/// use stream_pipe::Buffer;
///
/// let mut buf = Buffer::with_capacity(8);
/// assert_eq!(buf.extend_from_slice(b"header,row"), 8);
/// assert_eq!(buf.as_slice(), b"header,r");
/// assert!(buf.is_full());
///
/// buf.consume(7);
/// assert_eq!(buf.as_slice(), b"r");
/// ```
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Box<[u8]>,
    len: usize,
}

impl Buffer {
    /// Allocates an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes are valid.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if there is no spare room left.
    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// Returns the number of bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    /// The valid bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The valid bytes, mutably. Used by in-place transforms.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// The spare region after the valid bytes.
    ///
    /// Write into it, then call [`commit()`](Buffer::commit) with the number
    /// of bytes written.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Marks `n` bytes of the spare region as valid.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::CapacityViolation`] if `n` exceeds the spare
    /// room. The buffer is left unchanged in that case.
    pub fn commit(&mut self, n: usize) -> Result<(), StreamError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(StreamError::CapacityViolation {
                offered: n,
                capacity: remaining,
            });
        }
        self.len += n;
        Ok(())
    }

    /// Appends as much of `bytes` as fits and returns how many were copied.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.data[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        n
    }

    /// Drops the first `n` valid bytes and moves the rest to the front.
    ///
    /// Consuming more than [`len()`](Buffer::len) empties the buffer.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.data.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Marks every byte as invalid without touching capacity.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf = Buffer::with_capacity(16);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.remaining(), 16);
    }

    #[test]
    fn test_commit_after_spare_write() {
        let mut buf = Buffer::with_capacity(4);
        buf.spare_mut()[..2].copy_from_slice(b"ab");
        buf.commit(2).unwrap();
        assert_eq!(buf.as_slice(), b"ab");
        assert_eq!(buf.spare_mut().len(), 2);
    }

    #[test]
    fn test_commit_past_capacity_is_violation() {
        let mut buf = Buffer::with_capacity(4);
        buf.extend_from_slice(b"abc");

        let err = buf.commit(2).unwrap_err();
        assert_eq!(
            err,
            StreamError::CapacityViolation {
                offered: 2,
                capacity: 1
            }
        );
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_extend_truncates_to_capacity() {
        let mut buf = Buffer::with_capacity(3);
        assert_eq!(buf.extend_from_slice(b"abcdef"), 3);
        assert!(buf.is_full());
        assert_eq!(buf.extend_from_slice(b"g"), 0);
    }

    #[test]
    fn test_consume_compacts() {
        let mut buf = Buffer::with_capacity(8);
        buf.extend_from_slice(b"abcdef");
        buf.consume(4);
        assert_eq!(buf.as_slice(), b"ef");
        assert_eq!(buf.remaining(), 6);

        buf.consume(100);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf = Buffer::with_capacity(8);
        buf.extend_from_slice(b"abc");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn test_zero_capacity_buffer() {
        let mut buf = Buffer::with_capacity(0);
        assert!(buf.is_full());
        assert!(buf.is_empty());
        assert_eq!(buf.extend_from_slice(b"x"), 0);
    }
}
