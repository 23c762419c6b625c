//! Tokio mpsc channel sink implementation.

use tokio::sync::mpsc;

use crate::{FailureKind, Sink, StreamError};

/// A sink that sends byte chunks to a tokio mpsc channel.
///
/// This is the way to hand pipeline output to async code (a network writer,
/// an upload task, etc.). Every accepted chunk is copied into a `Vec<u8>`;
/// a full channel blocks the pipeline thread, which is the backpressure.
///
/// `accept` blocks the calling thread, so it must not be called from inside
/// an async runtime. Run the pipeline on its own thread.
///
/// # Example
///
/// ```
/// use stream_pipe::ChannelSink;
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<Vec<u8>>(100);
/// let sink = ChannelSink::new(tx);
///
/// // Drive a pipeline into `sink` on a worker thread, then receive chunks:
/// // while let Some(chunk) = rx.recv().await { ... }
/// ```
#[derive(Debug)]
pub struct ChannelSink {
    name: String,
    sender: Option<mpsc::Sender<Vec<u8>>>,
}

impl ChannelSink {
    /// Creates a new channel sink with the given sender.
    pub fn new(sender: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            name: "channel".to_string(),
            sender: Some(sender),
        }
    }

    /// Creates a new channel sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sender: Some(sender),
        }
    }

    /// Human-readable name for logging.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Sink for ChannelSink {
    fn accept(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(StreamError::Downstream(FailureKind::Closed))?;
        if data.is_empty() {
            return Ok(0);
        }
        sender
            .blocking_send(data.to_vec())
            .map_err(|_| StreamError::Downstream(FailureKind::Closed))?;
        Ok(data.len())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if self.sender.take().is_some() {
            tracing::trace!(sink = %self.name, "channel sender dropped");
        }
        Ok(())
    }
}
