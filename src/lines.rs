//! Line framing over a byte source.

use crate::{Buffer, FailureKind, Fill, Source, StreamError};

/// Default upper bound on the length of a single line.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Splits a [`Source`] into newline-terminated records.
///
/// Each item is one line without its `\n`; a `\r` directly before the `\n`
/// is dropped too. The last line is yielded even if the input does not end
/// with a newline, and empty input yields nothing.
///
/// Memory use is bounded by the maximum line length. A line longer than that
/// yields [`FailureKind::TokenTooLong`] as an upstream error, after which the
/// iterator is exhausted. The source is closed once iteration ends, on every
/// path.
///
/// # Example
///
/// ```
/// use stream_pipe::{BytesSource, Lines};
///
/// let lines: Vec<Vec<u8>> = Lines::new(BytesSource::new("id,name\r\n1,alice\n2,bob"))
///     .collect::<Result<_, _>>()?;
///
/// assert_eq!(lines, vec![b"id,name".to_vec(), b"1,alice".to_vec(), b"2,bob".to_vec()]);
/// # Ok::<(), stream_pipe::StreamError>(())
/// ```
#[derive(Debug)]
pub struct Lines<S: Source> {
    source: S,
    buf: Buffer,
    max_len: usize,
    scanned: usize,
    eof: bool,
    done: bool,
}

impl<S: Source> Lines<S> {
    /// Scans `source` with the default maximum line length.
    pub fn new(source: S) -> Self {
        Self::with_max_line_len(source, DEFAULT_MAX_LINE_LEN)
    }

    /// Scans `source`, rejecting lines longer than `max_len` bytes.
    ///
    /// A limit of zero is treated as one.
    pub fn with_max_line_len(source: S, max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            source,
            // Room for a full line plus its terminator.
            buf: Buffer::with_capacity(max_len + 2),
            max_len,
            scanned: 0,
            eof: false,
            done: false,
        }
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn take_line(&mut self, len: usize, consumed: usize) -> Vec<u8> {
        let mut line = &self.buf.as_slice()[..len];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        let line = line.to_vec();
        self.buf.consume(consumed);
        self.scanned = 0;
        line
    }

    fn finish(&mut self, reason: Option<&StreamError>) {
        self.done = true;
        let released = match reason {
            Some(err) => self.source.abort(err),
            None => self.source.close(),
        };
        if let Err(err) = released {
            tracing::warn!(error = %err, "failed to release line source");
        }
    }

    fn too_long(&self, len: usize) -> bool {
        len > self.max_len
    }
}

impl<S: Source> Iterator for Lines<S> {
    type Item = Result<Vec<u8>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            let window = &self.buf.as_slice()[self.scanned..];
            if let Some(pos) = window.iter().position(|b| *b == b'\n') {
                let len = self.scanned + pos;
                let line_len = if len > 0 && self.buf.as_slice()[len - 1] == b'\r' {
                    len - 1
                } else {
                    len
                };
                if self.too_long(line_len) {
                    break;
                }
                return Some(Ok(self.take_line(len, len + 1)));
            }
            self.scanned = self.buf.len();

            if self.eof {
                if self.buf.is_empty() {
                    self.finish(None);
                    return None;
                }
                let len = self.buf.len();
                let line_len = if self.buf.as_slice()[len - 1] == b'\r' {
                    len - 1
                } else {
                    len
                };
                if self.too_long(line_len) {
                    break;
                }
                let line = self.take_line(len, len);
                self.finish(None);
                return Some(Ok(line));
            }

            if self.buf.is_full() {
                break;
            }

            match self.source.fill(&mut self.buf) {
                Ok(Fill::End) => self.eof = true,
                Ok(Fill::Data(_)) => {}
                Err(err) => {
                    self.finish(Some(&err));
                    return Some(Err(err));
                }
            }
        }

        let err = StreamError::Upstream(FailureKind::TokenTooLong {
            limit: self.max_len,
        });
        self.finish(Some(&err));
        Some(Err(err))
    }
}
