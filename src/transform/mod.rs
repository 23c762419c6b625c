//! Composable byte transforms.
//!
//! A transform wraps exactly one stage and presents the same contract as the
//! stage it wraps, so chains compose: `Prologue(MapBytes(Reshape(root)))`.
//!
//! - Read-side ([`MapBytes`], [`Reshape`], [`Prologue`]) wrap a [`Source`](crate::Source)
//! - Write-side ([`MapSink`]) wrap a [`Sink`](crate::Sink)
//!
//! Every transform declares its [`Shape`] through the [`Transform`] trait.
//! Callers must not assume output length equals input length unless the
//! transform declares [`Shape::Preserving`].

mod map;
mod map_sink;
mod prologue;
mod reshape;

pub use map::MapBytes;
pub use map_sink::MapSink;
pub use prologue::Prologue;
pub use reshape::Reshape;

/// How a transform's output length relates to its input length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Every call emits exactly as many bytes as it consumed.
    Preserving,
    /// Output length may differ from input length.
    Reshaping,
}

impl Shape {
    /// Returns `true` for [`Shape::Preserving`].
    pub fn is_preserving(self) -> bool {
        matches!(self, Self::Preserving)
    }
}

/// Declared capabilities of a transform stage.
pub trait Transform {
    /// The transform's length relationship.
    fn shape(&self) -> Shape;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buffer, BytesSource, Fill, Source};

    fn drain<S: Source>(source: &mut S, buf_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = Buffer::with_capacity(buf_size);
        loop {
            buf.clear();
            match source.fill(&mut buf).unwrap() {
                Fill::Data(_) => out.extend_from_slice(buf.as_slice()),
                Fill::End => return out,
            }
        }
    }

    #[test]
    fn test_shape_is_preserving() {
        assert!(Shape::Preserving.is_preserving());
        assert!(!Shape::Reshaping.is_preserving());
    }

    #[test]
    fn test_chained_transforms_compose() {
        let root = BytesSource::records(["value-0", "value-1", "value-2"]).with_chunk_size(5);
        let mut chain = Prologue::new(MapBytes::uppercase(root), "id,name\n");

        assert_eq!(chain.shape(), Shape::Reshaping);
        assert_eq!(
            drain(&mut chain, 3),
            b"id,name\nVALUE-0\nVALUE-1\nVALUE-2\n"
        );
    }

    #[test]
    fn test_declared_shapes() {
        let upper = MapBytes::uppercase(BytesSource::new(""));
        assert_eq!(upper.shape(), Shape::Preserving);

        let hex = Reshape::new(BytesSource::new(""), |input: &[u8], out: &mut Vec<u8>| {
            out.extend_from_slice(input);
        });
        assert_eq!(hex.shape(), Shape::Reshaping);
    }
}
