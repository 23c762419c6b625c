//! Two-thread pipeline session management.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::{Canceller, FailureKind, PipelineStats, StatsSnapshot, StreamError};

type Half = JoinHandle<Result<StatsSnapshot, StreamError>>;

/// Final counters of a completed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Counters of the driver moving the source into the pipe.
    pub producer: StatsSnapshot,
    /// Counters of the driver moving the pipe into the sink.
    pub consumer: StatsSnapshot,
}

impl SessionReport {
    /// Bytes that reached the sink.
    pub fn bytes_delivered(&self) -> u64 {
        self.consumer.bytes_written
    }
}

/// Handle to a running two-thread pipeline.
///
/// The `Session` is returned by [`Pipeline::spawn()`]. A producer thread
/// copies the source into a bounded pipe and a consumer thread copies the
/// pipe into the sink. A failure on either side is handed to the other side
/// through the pipe, so both threads always stop.
///
/// # Lifecycle
///
/// 1. Created by [`Pipeline::spawn()`]
/// 2. Data flows in the background
/// 3. Call [`wait()`](Session::wait) for completion, or
///    [`stop()`](Session::stop) to cancel and wait
/// 4. Dropping a running `Session` cancels it without waiting
///
/// # Example
///
/// ```
/// use stream_pipe::{BytesSource, CollectSink, Pipeline};
///
/// let session = Pipeline::builder()
///     .build()?
///     .spawn(BytesSource::new("background bytes"), CollectSink::new())?;
///
/// let report = session.wait()?;
/// assert_eq!(report.bytes_delivered(), 16);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// [`Pipeline::spawn()`]: crate::Pipeline::spawn
pub struct Session {
    canceller: Canceller,
    producer: Option<Half>,
    consumer: Option<Half>,
    producer_stats: Arc<PipelineStats>,
    consumer_stats: Arc<PipelineStats>,
}

impl Session {
    pub(crate) fn new(
        canceller: Canceller,
        producer: Half,
        consumer: Half,
        producer_stats: Arc<PipelineStats>,
        consumer_stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            canceller,
            producer: Some(producer),
            consumer: Some(consumer),
            producer_stats,
            consumer_stats,
        }
    }

    /// Returns `true` while either thread is still running.
    pub fn is_running(&self) -> bool {
        [&self.producer, &self.consumer]
            .into_iter()
            .flatten()
            .any(|handle| !handle.is_finished())
    }

    /// Returns current counters for both halves.
    pub fn stats(&self) -> SessionReport {
        SessionReport {
            producer: self.producer_stats.snapshot(),
            consumer: self.consumer_stats.snapshot(),
        }
    }

    /// Raises the session's cancel signal.
    ///
    /// Blocked pipe reads and writes wake up immediately; a stage in the
    /// middle of a `fill` or `accept` finishes that call first. Returns
    /// `false` if the session was already cancelled.
    pub fn cancel(&self) -> bool {
        self.canceller.cancel()
    }

    /// Waits for both threads and returns the combined outcome.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure, checking the producer before the
    /// consumer. If neither half failed but one was cancelled, returns
    /// [`StreamError::Cancelled`].
    pub fn wait(mut self) -> Result<SessionReport, StreamError> {
        let producer = join(self.producer.take(), StreamError::Upstream);
        let consumer = join(self.consumer.take(), StreamError::Downstream);

        match (producer, consumer) {
            (Ok(producer), Ok(consumer)) => Ok(SessionReport { producer, consumer }),
            (Err(err), _) if !err.is_cancelled() => Err(err),
            (_, Err(err)) if !err.is_cancelled() => Err(err),
            _ => Err(StreamError::Cancelled),
        }
    }

    /// Cancels the session and waits for both threads.
    ///
    /// # Errors
    ///
    /// Same as [`wait()`](Session::wait); a session that was still running
    /// reports [`StreamError::Cancelled`].
    pub fn stop(self) -> Result<SessionReport, StreamError> {
        self.cancel();
        self.wait()
    }
}

fn join(
    handle: Option<Half>,
    panicked: fn(FailureKind) -> StreamError,
) -> Result<StatsSnapshot, StreamError> {
    let Some(handle) = handle else {
        return Err(StreamError::Cancelled);
    };
    handle.join().unwrap_or_else(|_| {
        Err(panicked(FailureKind::Custom(
            "pipeline thread panicked".to_string(),
        )))
    })
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.producer.is_some() || self.consumer.is_some() {
            // Dropped without wait(); let the threads wind down on their own.
            self.canceller.cancel();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("running", &self.is_running())
            .field("cancelled", &self.canceller.is_cancelled())
            .finish_non_exhaustive()
    }
}
