//! Pipeline components.
//!
//! A pipeline is one or two drivers joined by a pipe:
//!
//! ```text
//! Source chain → Driver → Sink chain                        (single thread)
//! Source chain → Driver → PipeWriter ⇢ PipeReader → Driver → Sink chain
//! ```
//!
//! - **Driver**: The copy loop; checks cancellation, retries partial accepts,
//!   and releases both ends on every exit path
//! - **Pipe**: Bounded byte queue whose full/empty states block the producer
//!   or consumer, and whose waits are interrupted by cancellation

mod driver;
mod pipe;

pub use driver::Driver;
pub use pipe::{pipe, pipe_with_signal, PipeReader, PipeWriter};
