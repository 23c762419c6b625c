//! Bounded in-memory pipe joining two independently running stages.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

use crate::cancel::Registration;
use crate::{BuildError, Buffer, CancelSignal, FailureKind, Fill, Sink, Source, StreamError};

struct PipeState {
    queue: HeapRb<u8>,
    writer_closed: bool,
    reader_closed: bool,
    error: Option<StreamError>,
}

struct PipeShared {
    state: Mutex<PipeState>,
    readable: Condvar,
    writable: Condvar,
    signal: CancelSignal,
    _wakeup: Registration,
}

impl PipeShared {
    fn wake_all(&self) {
        self.readable.notify_all();
        self.writable.notify_all();
    }

    /// Records the first error only; later ones are dropped.
    fn fail(state: &mut PipeState, reason: &StreamError) {
        if state.error.is_none() {
            state.error = Some(reason.clone());
        }
    }
}

/// Creates a pipe holding at most `capacity` unread bytes.
///
/// The [`PipeWriter`] is a [`Sink`] for the producing stage and the
/// [`PipeReader`] is a [`Source`] for the consuming stage. Each end is meant
/// to be owned by one thread.
///
/// # Errors
///
/// Returns [`BuildError::ZeroCapacity`] if `capacity` is zero.
///
/// # Example
///
/// ```
/// use stream_pipe::{pipe, Buffer, Sink, Source};
///
/// let (mut writer, mut reader) = pipe(16)?;
/// std::thread::spawn(move || {
///     writer.accept(b"hello").unwrap();
///     writer.close().unwrap();
/// });
///
/// let mut buf = Buffer::with_capacity(16);
/// while !reader.fill(&mut buf).unwrap().is_end() {}
/// assert_eq!(buf.as_slice(), b"hello");
/// # Ok::<(), stream_pipe::BuildError>(())
/// ```
pub fn pipe(capacity: usize) -> Result<(PipeWriter, PipeReader), BuildError> {
    pipe_with_signal(capacity, CancelSignal::never())
}

/// Creates a pipe whose blocked reads and writes wake up on cancellation.
///
/// Once `signal` fires, every pending and future operation on either end
/// returns [`StreamError::Cancelled`].
///
/// # Errors
///
/// Returns [`BuildError::ZeroCapacity`] if `capacity` is zero.
pub fn pipe_with_signal(
    capacity: usize,
    signal: CancelSignal,
) -> Result<(PipeWriter, PipeReader), BuildError> {
    if capacity == 0 {
        return Err(BuildError::ZeroCapacity {
            what: "pipe_capacity",
        });
    }

    // The wakeup takes the lock before notifying so a waiter that has just
    // seen the flag clear is already parked on the condvar.
    let shared = Arc::new_cyclic(|weak: &Weak<PipeShared>| {
        let weak = weak.clone();
        let wakeup = signal.on_cancel(move || {
            if let Some(shared) = weak.upgrade() {
                let _state = shared.state.lock();
                shared.wake_all();
            }
        });
        PipeShared {
            state: Mutex::new(PipeState {
                queue: HeapRb::new(capacity),
                writer_closed: false,
                reader_closed: false,
                error: None,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            signal: signal.clone(),
            _wakeup: wakeup,
        }
    });

    Ok((
        PipeWriter {
            shared: Arc::clone(&shared),
            capacity,
        },
        PipeReader { shared, capacity },
    ))
}

/// The producing end of a [`pipe()`].
///
/// `accept` copies as many bytes as there is room for and returns that
/// count. It blocks only while the pipe is completely full. Offering more
/// than [`capacity()`](PipeWriter::capacity) bytes in one call is a
/// [`StreamError::CapacityViolation`].
pub struct PipeWriter {
    shared: Arc<PipeShared>,
    capacity: usize,
}

impl PipeWriter {
    /// Maximum number of unread bytes the pipe holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes written but not yet read.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.occupied_len()
    }

    /// Closes the write side with an error.
    ///
    /// The reader receives the bytes already queued, then this error instead
    /// of end-of-stream.
    pub fn close_with_error(&mut self, reason: &StreamError) {
        let mut state = self.shared.state.lock();
        PipeShared::fail(&mut state, reason);
        state.writer_closed = true;
        self.shared.wake_all();
    }
}

impl Sink for PipeWriter {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        loop {
            shared.signal.check()?;
            if let Some(err) = &state.error {
                return Err(err.clone());
            }
            if state.writer_closed || state.reader_closed {
                return Err(StreamError::Downstream(FailureKind::Closed));
            }
            if data.is_empty() {
                return Ok(0);
            }
            if data.len() > self.capacity {
                return Err(StreamError::CapacityViolation {
                    offered: data.len(),
                    capacity: self.capacity,
                });
            }
            if !state.queue.is_full() {
                let n = state.queue.push_slice(data);
                shared.readable.notify_one();
                return Ok(n);
            }
            shared.writable.wait(&mut state);
        }
    }

    fn close(&mut self) -> Result<(), StreamError> {
        let mut state = self.shared.state.lock();
        state.writer_closed = true;
        self.shared.wake_all();
        Ok(())
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.close_with_error(reason);
        Ok(())
    }

    fn max_accept(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if !state.writer_closed {
            state.writer_closed = true;
            self.shared.wake_all();
        }
    }
}

impl fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeWriter")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// The consuming end of a [`pipe()`].
///
/// `fill` hands out queued bytes in write order. It blocks only while the
/// pipe is empty and the writer is still open.
///
/// Bytes queued before the writer closes are never lost: they are handed out
/// first, whether the writer closed cleanly or with an error. Once the queue
/// is empty the writer's error is returned in place of end-of-stream, and
/// returned again on every later call. An error or close on the reader's own
/// side takes effect immediately.
pub struct PipeReader {
    shared: Arc<PipeShared>,
    capacity: usize,
}

impl PipeReader {
    /// Maximum number of unread bytes the pipe holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes written but not yet read.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.occupied_len()
    }

    /// Closes the read side with an error the writer will see on its next call.
    pub fn close_with_error(&mut self, reason: &StreamError) {
        let mut state = self.shared.state.lock();
        PipeShared::fail(&mut state, reason);
        state.reader_closed = true;
        self.shared.wake_all();
    }
}

impl Source for PipeReader {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        loop {
            shared.signal.check()?;
            if state.reader_closed {
                return match &state.error {
                    Some(err) => Err(err.clone()),
                    None => Ok(Fill::End),
                };
            }
            if !state.queue.is_empty() {
                if buf.remaining() == 0 {
                    return Ok(Fill::Data(0));
                }
                let n = state.queue.pop_slice(buf.spare_mut());
                buf.commit(n)?;
                shared.writable.notify_one();
                return Ok(Fill::Data(n));
            }
            if let Some(err) = &state.error {
                return Err(err.clone());
            }
            if state.writer_closed {
                return Ok(Fill::End);
            }
            shared.readable.wait(&mut state);
        }
    }

    fn close(&mut self) -> Result<(), StreamError> {
        let mut state = self.shared.state.lock();
        state.reader_closed = true;
        self.shared.wake_all();
        Ok(())
    }

    fn abort(&mut self, reason: &StreamError) -> Result<(), StreamError> {
        self.close_with_error(reason);
        Ok(())
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if !state.reader_closed {
            state.reader_closed = true;
            self.shared.wake_all();
        }
    }
}

impl fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeReader")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
