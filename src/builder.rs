//! Builder pattern for `Pipeline`.

use std::sync::Arc;
use std::thread;

use crate::pipeline::{pipe_with_signal, Driver};
use crate::session::Session;
use crate::{
    event_callback, BufferedSink, BuildError, CancelSignal, Canceller, EventCallback,
    PipelineConfig, PipelineEvent, PipelineStats, Sink, Source, StageId, StatsSnapshot,
    StreamError,
};

/// Entry point for building pipelines.
///
/// A `Pipeline` is a validated configuration. It can be run inline on the
/// calling thread with [`run()`](Pipeline::run), or split across a producer
/// and a consumer thread joined by a pipe with [`spawn()`](Pipeline::spawn).
/// One `Pipeline` can be run any number of times.
///
/// # Example
///
/// ```
/// use stream_pipe::{BytesSource, CollectSink, MapBytes, Pipeline, Prologue};
///
/// let pipeline = Pipeline::builder().name("csv-export").build()?;
///
/// let records = BytesSource::records(["value-0", "value-1", "value-2"]);
/// let mut source = Prologue::new(MapBytes::uppercase(records), "id,name\n");
/// let mut sink = CollectSink::new();
///
/// pipeline.run(&mut source, &mut sink)?;
/// assert_eq!(sink.bytes(), b"id,name\nVALUE-0\nVALUE-1\nVALUE-2\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct Pipeline {
    name: StageId,
    config: PipelineConfig,
    events: Option<EventCallback>,
    signal: Option<CancelSignal>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the pipeline's name.
    pub fn name(&self) -> &StageId {
        &self.name
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn driver(&self, id: StageId, signal: Option<CancelSignal>) -> Driver {
        let driver = Driver::new(id, self.config.chunk_size);
        let driver = match signal {
            Some(signal) => driver.with_signal(signal),
            None => driver,
        };
        match &self.events {
            Some(callback) => driver.with_event_callback(Arc::clone(callback)),
            None => driver,
        }
    }

    /// Runs `source` into `sink` on the calling thread.
    ///
    /// Both ends are released before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Cancelled`] if the pipeline's signal was raised,
    /// otherwise the first stage error.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<StatsSnapshot, StreamError>
    where
        S: Source + ?Sized,
        K: Sink + ?Sized,
    {
        let mut driver = self.driver(self.name.clone(), self.signal.clone());
        match self.config.batch_size {
            Some(batch) => driver.run(source, &mut BufferedSink::new(sink, batch)),
            None => driver.run(source, sink),
        }
    }

    /// Starts a producer thread (`source` into a pipe) and a consumer thread
    /// (the pipe into `sink`).
    ///
    /// The session has its own canceller, derived from the pipeline's signal
    /// when one was configured.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Spawn`] if either thread cannot be started. If
    /// the consumer fails to start, the producer is cancelled and joined
    /// first.
    pub fn spawn<S, K>(&self, source: S, sink: K) -> Result<Session, BuildError>
    where
        S: Source + Send + 'static,
        K: Sink + Send + 'static,
    {
        let canceller = match &self.signal {
            Some(parent) => parent.child(),
            None => Canceller::new(),
        };
        let signal = canceller.signal();
        let (writer, reader) = pipe_with_signal(self.config.pipe_capacity, signal.clone())?;

        let producer_stats = Arc::new(PipelineStats::new());
        let consumer_stats = Arc::new(PipelineStats::new());

        let producer_id = self.name.child("producer");
        let mut producer = self
            .driver(producer_id.clone(), Some(signal.clone()))
            .with_stats(Arc::clone(&producer_stats));
        let producer_handle = thread::Builder::new()
            .name(producer_id.to_string())
            .spawn(move || {
                let mut source = source;
                let mut writer = writer;
                producer.run(&mut source, &mut writer)
            })
            .map_err(|source| BuildError::Spawn {
                stage: producer_id.to_string(),
                source,
            })?;

        let consumer_id = self.name.child("consumer");
        let mut consumer = self
            .driver(consumer_id.clone(), Some(signal))
            .with_stats(Arc::clone(&consumer_stats));
        let sink: Box<dyn Sink + Send> = match self.config.batch_size {
            Some(batch) => Box::new(BufferedSink::new(sink, batch)),
            None => Box::new(sink),
        };
        let consumer_handle = thread::Builder::new()
            .name(consumer_id.to_string())
            .spawn(move || {
                let mut reader = reader;
                let mut sink = sink;
                consumer.run(&mut reader, &mut sink)
            });

        let consumer_handle = match consumer_handle {
            Ok(handle) => handle,
            Err(source) => {
                canceller.cancel();
                if producer_handle.join().is_err() {
                    tracing::warn!(stage = %self.name, "producer panicked during shutdown");
                }
                return Err(BuildError::Spawn {
                    stage: consumer_id.to_string(),
                    source,
                });
            }
        };

        tracing::debug!(stage = %self.name, "session started");
        Ok(Session::new(
            canceller,
            producer_handle,
            consumer_handle,
            producer_stats,
            consumer_stats,
        ))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("has_event_callback", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`Pipeline`].
///
/// Use [`Pipeline::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use stream_pipe::{Canceller, Pipeline, PipelineConfig};
///
/// let canceller = Canceller::new();
/// let pipeline = Pipeline::builder()
///     .name("copy")
///     .config(PipelineConfig {
///         chunk_size: 8 * 1024,
///         ..Default::default()
///     })
///     .signal(canceller.signal())
///     .on_event(|event| tracing::debug!(?event, "pipeline event"))
///     .build()?;
/// # drop(pipeline);
/// # Ok::<(), stream_pipe::BuildError>(())
/// ```
#[must_use]
pub struct PipelineBuilder {
    name: StageId,
    config: PipelineConfig,
    events: Option<EventCallback>,
    signal: Option<CancelSignal>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("has_event_callback", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: StageId::default(),
            config: PipelineConfig::default(),
            events: None,
            signal: None,
        }
    }

    /// Names the pipeline in logs, events and thread names.
    ///
    /// Default: `"pipeline"`
    pub fn name(mut self, name: impl Into<StageId>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the buffer configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the per-iteration chunk size.
    ///
    /// Shorthand for overriding [`PipelineConfig::chunk_size`].
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Stops every run of this pipeline when `signal` is raised.
    pub fn signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Sets a callback for runtime events.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        self.events = Some(event_callback(callback));
        self
    }

    /// Validates the configuration and returns the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ZeroCapacity`] if any configured capacity is zero.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        self.config.validate()?;
        Ok(Pipeline {
            name: self.name,
            config: self.config,
            events: self.events,
            signal: self.signal,
        })
    }
}
