use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{info, warn};

use crate::error::{ServeError, ServeResult};
use crate::files::responder::{FileResponder, Responded};
use crate::http::parser::{parse_request, ParseError};
use crate::http::response::ResponseHead;
use crate::http::writer::write_head;

/// Lifecycle of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Receiving,
    Responding,
    Closed,
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A file was sent in full.
    Served { bytes: u64 },
    NotFound,
    BadRequest,
    /// An I/O failure cut the connection short.
    Failed(String),
}

/// Summary handed back to the acceptor once a connection is closed.
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    pub peer: String,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

/// Owns one connection from receipt of the request until close.
pub struct Connection<S> {
    stream: S,
    peer: String,
    buffer: BytesMut,
    responder: FileResponder,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        responder: FileResponder,
        request_buffer_size: usize,
    ) -> Self {
        Self {
            stream,
            peer: peer.into(),
            buffer: BytesMut::zeroed(request_buffer_size),
            responder,
            state: ConnectionState::Receiving,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serves the connection to completion and closes it.
    ///
    /// Never fails: any error below this point is logged and turned into
    /// [`Outcome::Failed`]. The stream is dropped, and so closed, exactly
    /// once before the report is returned.
    pub async fn serve(mut self, running: usize) -> ConnectionReport {
        let start = Instant::now();
        info!(peer = %self.peer, running, "serving connection");

        let outcome = match self.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "connection failed");
                Outcome::Failed(e.to_string())
            }
        };

        self.state = ConnectionState::Closed;
        let Connection { stream, peer, .. } = self;
        drop(stream);

        let elapsed = start.elapsed();
        info!(peer = %peer, ?elapsed, "connection closed");

        ConnectionReport {
            peer,
            elapsed,
            outcome,
        }
    }

    async fn run(&mut self) -> ServeResult<Outcome> {
        self.state = ConnectionState::Receiving;
        let n = self
            .stream
            .read(&mut self.buffer[..])
            .await
            .map_err(ServeError::Receive)?;

        let request = match parse_request(&self.buffer[..n]) {
            Ok(request) => request,
            Err(ParseError::UnsupportedMethod(method)) => {
                info!(peer = %self.peer, method = %method, "unsupported request");
                self.state = ConnectionState::Responding;
                write_head(&mut self.stream, &ResponseHead::bad_request())
                    .await
                    .map_err(ServeError::SendHead)?;
                return Ok(Outcome::BadRequest);
            }
        };

        info!(peer = %self.peer, path = %request.path, "received request");
        self.state = ConnectionState::Responding;

        let outcome = match self.responder.respond(&request, &mut self.stream).await? {
            Responded::File { bytes } => Outcome::Served { bytes },
            Responded::NotFound => Outcome::NotFound,
        };
        Ok(outcome)
    }
}
