//! Windowed file-to-socket streaming.
//!
//! A file is sent in fixed-size windows through one reusable buffer. Each
//! window is a [`LinkedPair`]: a positional read into the buffer, then a
//! send of exactly the bytes read. The send is only issued once its read
//! has completed, and the pipeline only advances once the send has drained,
//! so the buffer is never overwritten while a send still needs it.
//!
//! ```text
//!   window 0          window 1                 final window
//!  ┌──────┐┌──────┐  ┌──────┐┌──────┐        ┌───────┐┌───────┐
//!  │ read ├▶ send ├─▶│ read ├▶ send ├─ ... ─▶│ read r├▶ send r│
//!  └──────┘└──────┘  └──────┘└──────┘        └───────┘└───────┘
//! ```

use std::io::SeekFrom;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ServeError, ServeResult};

/// A byte range of the file handled in one pipeline iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub len: usize,
}

/// Iterator over the windows covering a file of `size` bytes.
///
/// Yields full windows while more than `capacity` bytes remain, then one
/// final window holding the remainder. A size that is an exact multiple of
/// the capacity ends on a full window, never on an empty one.
#[derive(Debug, Clone)]
pub struct Windows {
    size: u64,
    capacity: usize,
    offset: u64,
}

pub fn windows(size: u64, capacity: usize) -> Windows {
    assert!(capacity > 0, "window capacity must be non-zero");
    Windows {
        size,
        capacity,
        offset: 0,
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let remaining = self.size - self.offset;
        if remaining == 0 {
            return None;
        }

        let len = if remaining > self.capacity as u64 {
            self.capacity
        } else {
            remaining as usize
        };
        let window = Window {
            offset: self.offset,
            len,
        };
        self.offset += len as u64;
        Some(window)
    }
}

/// A read and the send that depends on it, for one window.
struct LinkedPair {
    window: Window,
}

impl LinkedPair {
    /// Runs the read, then the send over the same slice of `buf`.
    ///
    /// Resolves once both halves completed; a failure of either half fails
    /// the pair and the send is never issued after a failed read.
    async fn run<F, W>(&self, file: &mut F, buf: &mut BytesMut, conn: &mut W) -> ServeResult<usize>
    where
        F: AsyncRead + AsyncSeek + Unpin,
        W: AsyncWrite + Unpin,
    {
        let chunk = &mut buf[..self.window.len];
        self.read(file, chunk).await?;
        self.send(chunk, conn).await?;
        Ok(self.window.len)
    }

    async fn read<F>(&self, file: &mut F, chunk: &mut [u8]) -> ServeResult<()>
    where
        F: AsyncRead + AsyncSeek + Unpin,
    {
        let Window { offset, len } = self.window;
        let fail = |source| ServeError::ReadWindow {
            offset,
            len,
            source,
        };

        file.seek(SeekFrom::Start(offset)).await.map_err(fail)?;
        file.read_exact(chunk).await.map_err(fail)?;
        Ok(())
    }

    async fn send<W>(&self, chunk: &[u8], conn: &mut W) -> ServeResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let Window { offset, len } = self.window;
        conn.write_all(chunk)
            .await
            .map_err(|source| ServeError::SendWindow {
                offset,
                len,
                source,
            })
    }
}

/// Streams files to a connection through a single reusable buffer.
pub struct ChunkPipeline {
    buf: BytesMut,
    window_delay: Option<Duration>,
}

impl ChunkPipeline {
    pub fn new(capacity: usize, window_delay: Option<Duration>) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            buf: BytesMut::zeroed(capacity),
            window_delay,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Sends the first `size` bytes of `file` to `conn`, window by window.
    ///
    /// Returns the number of body bytes sent, which equals `size` unless an
    /// error is returned. Nothing is retried; a failed window fails the
    /// whole transfer.
    pub async fn stream<F, W>(&mut self, file: &mut F, size: u64, conn: &mut W) -> ServeResult<u64>
    where
        F: AsyncRead + AsyncSeek + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut sent = 0u64;
        let mut pending = windows(size, self.capacity()).peekable();

        while let Some(window) = pending.next() {
            sent += LinkedPair { window }.run(file, &mut self.buf, conn).await? as u64;

            if let Some(delay) = self.window_delay {
                if pending.peek().is_some() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        conn.flush().await.map_err(|source| ServeError::SendWindow {
            offset: sent,
            len: 0,
            source,
        })?;

        tracing::trace!(bytes = sent, "transfer complete");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(size: u64, capacity: usize) -> Vec<usize> {
        windows(size, capacity).map(|w| w.len).collect()
    }

    #[test]
    fn exact_multiple_has_no_trailing_window() {
        assert_eq!(lens(2048, 1024), vec![1024, 1024]);
    }

    #[test]
    fn remainder_goes_in_final_window() {
        assert_eq!(lens(2000, 1024), vec![1024, 976]);
        assert_eq!(lens(10, 1024), vec![10]);
    }

    #[test]
    fn empty_file_has_no_windows() {
        assert!(lens(0, 1024).is_empty());
    }

    #[test]
    fn offsets_are_contiguous() {
        let offsets: Vec<u64> = windows(3000, 1000).map(|w| w.offset).collect();
        assert_eq!(offsets, vec![0, 1000, 2000]);
    }
}
