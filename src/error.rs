//! Error types for stream-pipe.
//!
//! Errors are split into two categories:
//! - **Build errors** ([`BuildError`]): Prevent a pipeline from starting
//! - **Stream errors** ([`StreamError`]): Terminate a running pipeline
//!
//! End-of-stream is not an error. It is reported through
//! [`Fill::End`](crate::Fill::End).

use std::io;
use std::path::Path;

/// Fatal errors that prevent a pipeline from being constructed.
///
/// These are returned before any data flows, from
/// [`PipelineConfig::validate()`](crate::PipelineConfig::validate),
/// [`pipe()`](crate::pipe) and [`Pipeline::spawn()`](crate::Pipeline::spawn).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A buffer, batch or pipe was configured with zero capacity.
    #[error("{what} must have a non-zero capacity")]
    ZeroCapacity {
        /// Which setting was zero.
        what: &'static str,
    },

    /// The OS refused to start a pipeline thread.
    #[error("failed to spawn {stage} thread: {source}")]
    Spawn {
        /// Name of the stage whose thread failed to start.
        stage: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// The reason a stage failed.
///
/// Carried verbatim by [`StreamError::Upstream`] and
/// [`StreamError::Downstream`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    /// An I/O operation on the underlying resource failed.
    #[error("{message} ({kind:?})")]
    Io {
        /// Kind of the I/O error.
        kind: io::ErrorKind,
        /// Display form of the I/O error.
        message: String,
    },

    /// The endpoint was closed, or the opposite end of a pipe or channel
    /// has gone away.
    #[error("endpoint closed")]
    Closed,

    /// A framed record exceeded the maximum size.
    #[error("record longer than {limit} bytes")]
    TokenTooLong {
        /// Maximum record size in bytes.
        limit: usize,
    },

    /// Custom failure for user-implemented stages.
    #[error("{0}")]
    Custom(String),
}

impl FailureKind {
    /// Creates an I/O failure naming the file it happened on.
    pub fn file(path: impl AsRef<Path>, err: &io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: format!("{}: {err}", path.as_ref().display()),
        }
    }
}

impl From<io::Error> for FailureKind {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Errors that terminate a running pipeline.
///
/// `StreamError` is `Clone` so a [`PipeWriter`](crate::PipeWriter) or
/// [`PipeReader`](crate::PipeReader) can hand the same sticky error to every
/// later caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The cancellation signal was raised. Not a stage failure.
    #[error("pipeline cancelled")]
    Cancelled,

    /// A source failed while producing data.
    #[error("upstream failure: {0}")]
    Upstream(FailureKind),

    /// A sink failed while consuming data.
    #[error("downstream failure: {0}")]
    Downstream(FailureKind),

    /// A stage moved more bytes in one call than the other side had room for.
    ///
    /// This is a programming error in a stage implementation and is always fatal.
    #[error("capacity violation: {offered} bytes against a capacity of {capacity}")]
    CapacityViolation {
        /// Bytes offered, produced, or claimed as consumed.
        offered: usize,
        /// Room the receiving side declared.
        capacity: usize,
    },
}

impl StreamError {
    /// Creates an upstream I/O failure.
    pub fn upstream_io(err: io::Error) -> Self {
        Self::Upstream(err.into())
    }

    /// Creates a downstream I/O failure.
    pub fn downstream_io(err: io::Error) -> Self {
        Self::Downstream(err.into())
    }

    /// Creates a custom upstream failure with the given message.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(FailureKind::Custom(msg.into()))
    }

    /// Creates a custom downstream failure with the given message.
    pub fn downstream(msg: impl Into<String>) -> Self {
        Self::Downstream(FailureKind::Custom(msg.into()))
    }

    /// Returns `true` if this is a cooperative cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
