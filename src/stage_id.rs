//! Stage identification type.

use std::sync::Arc;

/// Name of a pipeline stage, used in logs and [`PipelineEvent`]s.
///
/// `StageId` uses `Arc<str>` internally, so a driver can stamp every event it
/// emits without allocating.
///
/// # Example
///
/// ```
/// use stream_pipe::StageId;
///
/// let producer = StageId::new("export/producer");
/// assert_eq!(producer.as_str(), "export/producer");
/// assert_eq!(producer, StageId::from("export/producer"));
/// ```
///
/// [`PipelineEvent`]: crate::PipelineEvent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(Arc<str>);

impl StageId {
    /// Creates a stage ID from a string.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the ID of a sub-stage, such as `"export/consumer"`.
    #[must_use]
    pub fn child(&self, part: &str) -> Self {
        Self::new(format!("{}/{part}", self.0))
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StageId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for StageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_id_equality() {
        assert_eq!(StageId::new("copy"), StageId::new("copy"));
        assert_ne!(StageId::new("copy"), StageId::new("export"));
    }

    #[test]
    fn test_stage_id_display() {
        let id = StageId::new("csv-export");
        assert_eq!(format!("{id}"), "csv-export");
    }

    #[test]
    fn test_stage_id_child() {
        let id = StageId::new("export");
        assert_eq!(id.child("producer").as_str(), "export/producer");
    }

    #[test]
    fn test_stage_id_default() {
        assert_eq!(StageId::default().as_str(), "pipeline");
    }

    #[test]
    fn test_stage_id_from_string() {
        let id: StageId = String::from("copy").into();
        assert_eq!(id.as_ref(), "copy");
    }
}
