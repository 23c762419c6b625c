//! Configuration types for pipelines.

use crate::BuildError;

/// Configuration for pipeline buffers.
///
/// Use [`PipelineConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use stream_pipe::PipelineConfig;
///
/// let config = PipelineConfig {
///     chunk_size: 4096,
///     batch_size: Some(512),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of the buffer each driver reuses for every `fill`.
    ///
    /// Bounds how many bytes one iteration moves.
    /// Default: 32 KiB
    pub chunk_size: usize,

    /// Maximum unread bytes held by the pipe between the two halves of a
    /// [`Session`](crate::Session).
    ///
    /// A full pipe blocks the producer until the consumer catches up.
    /// Default: 64 KiB
    pub pipe_capacity: usize,

    /// When set, the terminal sink is wrapped in a
    /// [`BufferedSink`](crate::BufferedSink) of this capacity.
    ///
    /// Default: `None`
    pub batch_size: Option<usize>,
}

impl PipelineConfig {
    /// Checks that every capacity is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ZeroCapacity`] naming the first offending field.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.chunk_size == 0 {
            return Err(BuildError::ZeroCapacity { what: "chunk_size" });
        }
        if self.pipe_capacity == 0 {
            return Err(BuildError::ZeroCapacity {
                what: "pipe_capacity",
            });
        }
        if self.batch_size == Some(0) {
            return Err(BuildError::ZeroCapacity { what: "batch_size" });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 32 * 1024,
            pipe_capacity: 64 * 1024,
            batch_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunk_size, 32 * 1024);
        assert_eq!(config.pipe_capacity, 64 * 1024);
        assert_eq!(config.batch_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = PipelineConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BuildError::ZeroCapacity { what: "chunk_size" })
        ));
    }

    #[test]
    fn test_zero_pipe_capacity_rejected() {
        let config = PipelineConfig {
            pipe_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BuildError::ZeroCapacity {
                what: "pipe_capacity"
            })
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = PipelineConfig {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BuildError::ZeroCapacity { what: "batch_size" })
        ));
    }
}
