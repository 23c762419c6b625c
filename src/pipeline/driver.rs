//! The copy loop that moves bytes from a source to a sink.

use std::sync::Arc;

use crate::{
    Buffer, CancelSignal, EventCallback, Fill, PipelineEvent, PipelineStats, Sink, Source,
    StageId, StatsSnapshot, StreamError,
};

/// Drives one source into one sink until end-of-stream, cancellation or error.
///
/// Each iteration checks the cancel signal, clears the reusable buffer, fills
/// it from the source, and offers the bytes to the sink. Partial consumption
/// is retried with the remainder before the source is read again. The signal
/// is checked again between retries.
///
/// On every exit path both ends are released: a cancel-checked flush then
/// `close` at end-of-stream, `abort` with the reason on failure or cancellation. The
/// first error wins; a later release failure is only logged.
///
/// # Example
///
/// ```
/// use stream_pipe::{BytesSource, CollectSink, Driver};
///
/// let mut source = BytesSource::new("a,b\n");
/// let mut sink = CollectSink::new();
///
/// let stats = Driver::new("copy", 2).run(&mut source, &mut sink)?;
/// assert_eq!(stats.bytes_written, 4);
/// assert_eq!(sink.bytes(), b"a,b\n");
/// # Ok::<(), stream_pipe::StreamError>(())
/// ```
pub struct Driver {
    id: StageId,
    buffer: Buffer,
    signal: CancelSignal,
    events: Option<EventCallback>,
    stats: Arc<PipelineStats>,
}

impl Driver {
    /// Creates a driver named `id` that reads up to `chunk_size` bytes per
    /// iteration.
    ///
    /// A `chunk_size` of zero is treated as one.
    pub fn new(id: impl Into<StageId>, chunk_size: usize) -> Self {
        Self {
            id: id.into(),
            buffer: Buffer::with_capacity(chunk_size.max(1)),
            signal: CancelSignal::never(),
            events: None,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Stops the driver when `signal` is raised.
    #[must_use]
    pub fn with_signal(mut self, signal: CancelSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Sets the event callback.
    #[must_use]
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.events = Some(callback);
        self
    }

    /// Records counters into `stats` instead of a private instance.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Returns the driver's stage name.
    pub fn id(&self) -> &StageId {
        &self.id
    }

    /// Returns the live counters.
    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    fn emit_event(&self, event: PipelineEvent) {
        if let Some(ref callback) = self.events {
            callback(event);
        }
    }

    /// Copies `source` into `sink` and releases both.
    ///
    /// Returns the counters for this run.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Cancelled`] if the signal was raised, otherwise
    /// the first error reported by either stage or by closing them.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<StatsSnapshot, StreamError>
    where
        S: Source + ?Sized,
        K: Sink + ?Sized,
    {
        tracing::debug!(
            stage = %self.id,
            chunk_size = self.buffer.capacity(),
            "driver started"
        );
        let before = self.stats.snapshot();

        let result = match self.pump(source, sink) {
            Ok(()) => {
                let source_closed = source.close();
                let sink_closed = sink.close();
                source_closed.and(sink_closed)
            }
            Err(err) => {
                self.release_failed(source.abort(&err), "source");
                self.release_failed(sink.abort(&err), "sink");
                Err(err)
            }
        };

        let after = self.stats.snapshot();
        let run = StatsSnapshot {
            bytes_read: after.bytes_read - before.bytes_read,
            bytes_written: after.bytes_written - before.bytes_written,
            chunks: after.chunks - before.chunks,
            backpressure_retries: after.backpressure_retries - before.backpressure_retries,
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    stage = %self.id,
                    bytes_read = run.bytes_read,
                    bytes_written = run.bytes_written,
                    chunks = run.chunks,
                    "driver finished"
                );
                self.emit_event(PipelineEvent::Finished {
                    stage: self.id.clone(),
                    bytes: run.bytes_written,
                });
                Ok(run)
            }
            Err(StreamError::Cancelled) => {
                tracing::info!(
                    stage = %self.id,
                    bytes_written = run.bytes_written,
                    "driver cancelled"
                );
                self.emit_event(PipelineEvent::Cancelled {
                    stage: self.id.clone(),
                });
                Err(StreamError::Cancelled)
            }
            Err(err) => {
                tracing::warn!(stage = %self.id, error = %err, "driver failed");
                self.emit_event(PipelineEvent::Failed {
                    stage: self.id.clone(),
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    fn release_failed(&self, result: Result<(), StreamError>, end: &str) {
        if let Err(err) = result {
            tracing::warn!(stage = %self.id, end, error = %err, "release after failure also failed");
        }
    }

    fn pump<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<(), StreamError>
    where
        S: Source + ?Sized,
        K: Sink + ?Sized,
    {
        loop {
            self.signal.check()?;

            self.buffer.clear();
            match source.fill(&mut self.buffer)? {
                Fill::End => return self.drain(sink),
                Fill::Data(n) => {
                    if n != self.buffer.len() {
                        return Err(StreamError::CapacityViolation {
                            offered: n,
                            capacity: self.buffer.len(),
                        });
                    }
                    if n == 0 {
                        continue;
                    }
                    self.stats.record_read(n);
                    tracing::trace!(stage = %self.id, bytes = n, "chunk read");
                    self.deliver(sink)?;
                }
            }
        }
    }

    /// Flushes `sink` step by step so a stuck downstream still sees the signal.
    fn drain<K: Sink + ?Sized>(&self, sink: &mut K) -> Result<(), StreamError> {
        while !sink.try_flush()? {
            self.stats.record_backpressure();
            tracing::trace!(stage = %self.id, "sink backpressure during flush");
            self.signal.check()?;
            std::thread::yield_now();
        }
        Ok(())
    }

    /// Offers the whole buffer to `sink`, never more than `max_accept` at once.
    fn deliver<K: Sink + ?Sized>(&self, sink: &mut K) -> Result<(), StreamError> {
        let data = self.buffer.as_slice();
        let limit = sink.max_accept().unwrap_or(usize::MAX).max(1);
        let mut offset = 0;

        while offset < data.len() {
            let end = data.len().min(offset.saturating_add(limit));
            let offered = end - offset;
            let accepted = sink.accept(&data[offset..end])?;
            if accepted > offered {
                return Err(StreamError::CapacityViolation {
                    offered: accepted,
                    capacity: offered,
                });
            }
            offset += accepted;
            self.stats.record_written(accepted);

            if accepted < offered {
                self.stats.record_backpressure();
                tracing::trace!(stage = %self.id, offered, accepted, "sink backpressure");
                self.emit_event(PipelineEvent::Backpressure {
                    stage: self.id.clone(),
                    offered,
                    accepted,
                });
                self.signal.check()?;
                if accepted == 0 {
                    std::thread::yield_now();
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("id", &self.id)
            .field("chunk_size", &self.buffer.capacity())
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}
