//! Runtime events for monitoring pipeline health.
//!
//! Events are notifications about driver behavior. They're for logging and
//! metrics; the result of [`Pipeline::run()`](crate::Pipeline::run) or
//! [`Session::wait()`](crate::Session::wait) is still the authoritative
//! outcome.

use std::sync::Arc;

use crate::{StageId, StreamError};

/// Runtime events emitted by a [`Driver`](crate::Driver).
///
/// # Example
///
/// ```
/// use stream_pipe::PipelineEvent;
///
/// fn handle_event(event: PipelineEvent) {
///     match event {
///         PipelineEvent::Backpressure { stage, offered, accepted } => {
///             eprintln!("{stage}: sink took {accepted} of {offered} bytes");
///         }
///         PipelineEvent::Finished { stage, bytes } => {
///             eprintln!("{stage}: done after {bytes} bytes");
///         }
///         PipelineEvent::Cancelled { stage } => {
///             eprintln!("{stage}: cancelled");
///         }
///         PipelineEvent::Failed { stage, error } => {
///             eprintln!("{stage}: {error}");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The sink consumed fewer bytes than it was offered.
    ///
    /// The driver retries with the remainder. Frequent backpressure from a
    /// [`PipeWriter`](crate::PipeWriter) means the consuming half is the
    /// bottleneck.
    Backpressure {
        /// Driver that saw the partial accept.
        stage: StageId,
        /// Bytes offered in the call.
        offered: usize,
        /// Bytes the sink consumed.
        accepted: usize,
    },

    /// The source reached end-of-stream and both ends were closed.
    Finished {
        /// Driver that finished.
        stage: StageId,
        /// Total bytes consumed by the sink.
        bytes: u64,
    },

    /// The driver stopped because the cancellation signal was raised.
    Cancelled {
        /// Driver that was cancelled.
        stage: StageId,
    },

    /// The driver stopped because a stage failed.
    Failed {
        /// Driver that failed.
        stage: StageId,
        /// The first error encountered.
        error: StreamError,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`PipelineBuilder::on_event()`].
///
/// [`PipelineBuilder::on_event()`]: crate::PipelineBuilder::on_event
pub type EventCallback = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use stream_pipe::{event_callback, PipelineEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(PipelineEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_event_debug() {
        let event = PipelineEvent::Backpressure {
            stage: StageId::new("copy"),
            offered: 100,
            accepted: 40,
        };
        let debug = format!("{:?}", event);
        assert!(debug.contains("Backpressure"));
        assert!(debug.contains("40"));
    }

    #[test]
    fn test_pipeline_event_clone() {
        let event = PipelineEvent::Failed {
            stage: StageId::new("export"),
            error: StreamError::downstream("disk full"),
        };
        if let PipelineEvent::Failed { stage, error } = event.clone() {
            assert_eq!(stage.as_str(), "export");
            assert_eq!(error, StreamError::downstream("disk full"));
        } else {
            panic!("Expected Failed variant");
        }
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(PipelineEvent::Cancelled {
            stage: StageId::default(),
        });
        assert!(called.load(Ordering::SeqCst));
    }
}
