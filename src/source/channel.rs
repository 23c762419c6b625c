//! Tokio mpsc channel source implementation.

use tokio::sync::mpsc;

use crate::{Buffer, Fill, Source, StreamError};

/// A source that receives byte chunks from a tokio mpsc channel.
///
/// This lets an async producer feed a synchronous pipeline. Chunks larger
/// than the caller's buffer are handed out across several `fill` calls. The
/// stream ends once every sender has been dropped and the channel is empty.
///
/// `fill` blocks the calling thread, so it must not be called from inside an
/// async runtime. Run the pipeline on its own thread.
///
/// # Example
///
/// ```
/// use stream_pipe::ChannelSource;
/// use tokio::sync::mpsc;
///
/// let (tx, rx) = mpsc::channel::<Vec<u8>>(16);
/// let source = ChannelSource::new(rx);
/// // Send chunks from async code:
/// // tx.send(b"payload".to_vec()).await?;
/// # drop((tx, source));
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
    ended: bool,
}

impl ChannelSource {
    /// Creates a source draining `receiver`.
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            receiver,
            pending: Vec::new(),
            offset: 0,
            ended: false,
        }
    }
}

impl Source for ChannelSource {
    fn fill(&mut self, buf: &mut Buffer) -> Result<Fill, StreamError> {
        while self.offset == self.pending.len() {
            if self.ended {
                return Ok(Fill::End);
            }
            match self.receiver.blocking_recv() {
                Some(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                None => {
                    self.ended = true;
                    self.pending.clear();
                    self.offset = 0;
                }
            }
        }

        let n = buf.extend_from_slice(&self.pending[self.offset..]);
        self.offset += n;
        Ok(Fill::Data(n))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.receiver.close();
        self.ended = true;
        self.pending.clear();
        self.offset = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_splits_large_chunks() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(4);
        tx.blocking_send(b"abcdef".to_vec()).unwrap();
        drop(tx);

        let mut source = ChannelSource::new(rx);
        let mut buf = Buffer::with_capacity(4);

        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(4));
        assert_eq!(buf.as_slice(), b"abcd");
        buf.clear();
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(2));
        assert_eq!(buf.as_slice(), b"ef");
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::End);
    }

    #[test]
    fn test_channel_source_skips_empty_chunks() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(4);
        tx.blocking_send(Vec::new()).unwrap();
        tx.blocking_send(b"x".to_vec()).unwrap();
        drop(tx);

        let mut source = ChannelSource::new(rx);
        let mut buf = Buffer::with_capacity(4);
        assert_eq!(source.fill(&mut buf).unwrap(), Fill::Data(1));
    }

    #[tokio::test]
    async fn test_channel_source_fed_from_async_task() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(2);
        let reader = std::thread::spawn(move || {
            let mut source = ChannelSource::new(rx);
            let mut buf = Buffer::with_capacity(64);
            while !source.fill(&mut buf).unwrap().is_end() {}
            buf.as_slice().to_vec()
        });

        tx.send(b"from ".to_vec()).await.unwrap();
        tx.send(b"async".to_vec()).await.unwrap();
        drop(tx);

        assert_eq!(reader.join().unwrap(), b"from async");
    }
}
