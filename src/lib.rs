//! # stream-pipe
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Bounded-memory byte pipelines with cooperative cancellation.
//!
//! `stream-pipe` moves arbitrarily large byte streams from a [`Source`]
//! through a chain of transforms into a [`Sink`] without ever holding more
//! than a fixed number of bytes in memory. A slow sink slows the source down
//! instead of growing a queue, and a [`Canceller`] stops everything at the
//! next checkpoint.
//!
//! ## Quick Start
//!
//! ```rust
//! use stream_pipe::{BytesSource, CollectSink, MapBytes, Pipeline, Prologue};
//!
//! let pipeline = Pipeline::builder()
//!     .name("csv-export")
//!     .on_event(|e| tracing::debug!(?e, "pipeline event"))
//!     .build()?;
//!
//! // Uppercase every record, then put a header in front.
//! let records = BytesSource::records(["value-0", "value-1", "value-2"]);
//! let mut source = Prologue::new(MapBytes::uppercase(records), "id,name\n");
//! let mut sink = CollectSink::new();
//!
//! pipeline.run(&mut source, &mut sink)?;
//! assert_eq!(sink.bytes(), b"id,name\nVALUE-0\nVALUE-1\nVALUE-2\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! Two scheduling models share the same stages:
//!
//! - **Inline**: [`Pipeline::run()`] drives the chain on the calling thread
//! - **Split**: [`Pipeline::spawn()`] runs a producer and a consumer thread
//!   joined by a bounded [`pipe()`]; a full pipe blocks the producer and an
//!   empty one blocks the consumer
//!
//! Each [`Driver`] owns one reusable [`Buffer`], retries partial accepts
//! before reading more, and releases both ends on every exit path. Pipe
//! waits are interrupted by the cancel signal, so a blocked thread never
//! outlives a cancelled session.

#![warn(missing_docs)]
// Byte counters are usize in buffers and u64 in stats
#![allow(clippy::cast_possible_truncation)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod buffer;
mod builder;
mod cancel;
mod config;
mod error;
mod event;
mod lines;
mod pipeline;
mod session;
pub mod sink;
pub mod source;
mod stage_id;
mod stats;
pub mod transform;

pub use buffer::Buffer;
pub use builder::{Pipeline, PipelineBuilder};
pub use cancel::{CancelSignal, Canceller};
pub use config::PipelineConfig;
pub use error::{BuildError, FailureKind, StreamError};
pub use event::{event_callback, EventCallback, PipelineEvent};
pub use lines::{Lines, DEFAULT_MAX_LINE_LEN};
pub use pipeline::{pipe, pipe_with_signal, Driver, PipeReader, PipeWriter};
pub use session::{Session, SessionReport};
pub use sink::{accept_all, BufferedSink, ChannelSink, CollectSink, Sink, WriterSink};
pub use source::{BytesSource, ChannelSource, Fill, ReaderSource, Source};
pub use stage_id::StageId;
pub use stats::{PipelineStats, StatsSnapshot};
pub use transform::{MapBytes, MapSink, Prologue, Reshape, Shape, Transform};
