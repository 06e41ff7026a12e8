//! Per-connection failures.
//!
//! Everything below the connection handler returns [`ServeError`]; the
//! handler collapses it into one log line and closes the socket.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Reading the request from the peer failed.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// Sending a status line and headers failed.
    #[error("sending response head failed: {0}")]
    SendHead(#[source] io::Error),

    /// The read half of a window failed (including a short read).
    #[error("reading {len} bytes at offset {offset} failed: {source}")]
    ReadWindow {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// The send half of a window failed.
    #[error("sending {len} bytes from offset {offset} failed: {source}")]
    SendWindow {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
}

pub type ServeResult<T> = Result<T, ServeError>;
