use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::files::responder::FileResponder;
use crate::files::root::RootDir;
use crate::http::connection::{Connection, ConnectionReport, Outcome};

/// Connection totals, returned when the acceptor stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcceptorSummary {
    pub accepted: u64,
    /// Handlers that ran to completion, whatever status they sent.
    pub completed: u64,
    /// Handlers that hit an I/O failure or panicked.
    pub failed: u64,
    /// Handlers still running when the shutdown grace period ran out.
    pub aborted: u64,
}

/// Accepts connections and owns the handler task of each one.
///
/// The number of running connections is the size of the task set: it
/// grows on spawn and shrinks as finished handlers are reaped.
pub struct Acceptor {
    responder: FileResponder,
    request_buffer_size: usize,
    shutdown_grace: Duration,
    tasks: JoinSet<ConnectionReport>,
    summary: AcceptorSummary,
}

impl Acceptor {
    pub fn new(responder: FileResponder, cfg: &Config) -> Self {
        Self {
            responder,
            request_buffer_size: cfg.static_files.request_buffer_size,
            shutdown_grace: cfg.server.shutdown_grace(),
            tasks: JoinSet::new(),
            summary: AcceptorSummary::default(),
        }
    }

    /// Live connections, after reaping handlers that already finished.
    pub fn running(&mut self) -> usize {
        self.reap_finished();
        self.tasks.len()
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.reap(joined);
        }
    }

    /// Accepts until `shutdown` resolves or accepting fails for good.
    ///
    /// Either way, in-flight connections get the grace period to finish
    /// before they are aborted.
    pub async fn run<F>(mut self, listener: TcpListener, shutdown: F) -> anyhow::Result<AcceptorSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                res = listener.accept() => match res {
                    Ok((socket, peer)) => self.spawn(socket, peer),
                    Err(e) if is_transient(&e) => {
                        warn!(error = %e, "accept failed, continuing");
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed, stopping");
                        self.drain().await;
                        return Err(e).context("accepting connection");
                    }
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.reap(joined);
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.drain().await;
        info!(summary = ?self.summary, "acceptor stopped");
        Ok(self.summary)
    }

    fn spawn(&mut self, socket: TcpStream, peer: SocketAddr) {
        self.summary.accepted += 1;
        debug!("Accepted connection from {}", peer);

        let conn = Connection::new(
            socket,
            peer.to_string(),
            self.responder.clone(),
            self.request_buffer_size,
        );
        let running = self.running() + 1;
        self.tasks.spawn(conn.serve(running));
    }

    fn reap(&mut self, joined: Result<ConnectionReport, JoinError>) {
        match joined {
            Ok(report) => {
                match report.outcome {
                    Outcome::Failed(_) => self.summary.failed += 1,
                    _ => self.summary.completed += 1,
                }
                debug!(peer = %report.peer, running = self.tasks.len(), "connection reaped");
            }
            Err(e) if e.is_panic() => {
                self.summary.failed += 1;
                error!(error = %e, "connection handler panicked");
            }
            Err(_) => self.summary.aborted += 1,
        }
    }

    async fn drain(&mut self) {
        if self.tasks.is_empty() {
            return;
        }

        info!(
            running = self.tasks.len(),
            grace = ?self.shutdown_grace,
            "waiting for in-flight connections"
        );

        let deadline = tokio::time::sleep(self.shutdown_grace);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = self.tasks.join_next() => match joined {
                    Some(joined) => self.reap(joined),
                    None => return,
                },
                _ = &mut deadline => break,
            }
        }

        warn!(running = self.tasks.len(), "aborting in-flight connections");
        self.tasks.abort_all();
        while let Some(joined) = self.tasks.join_next().await {
            self.reap(joined);
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// Opens the root, binds the listen address and accepts until `shutdown`.
///
/// Failing to open the root or to bind is fatal.
pub async fn run<F>(cfg: &Config, shutdown: F) -> anyhow::Result<AcceptorSummary>
where
    F: Future<Output = ()>,
{
    let root = RootDir::open(&cfg.static_files.root, cfg.static_files.allow_traversal)?;
    info!("Serving files from {}", root.path().display());

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.listen_addr))?;
    info!("Listening on {}", cfg.server.listen_addr);

    let responder = FileResponder::new(Arc::new(root), &cfg.static_files);
    Acceptor::new(responder, cfg).run(listener, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticFilesConfig;

    fn acceptor(dir: &tempfile::TempDir) -> Acceptor {
        let root = RootDir::open(dir.path(), false).unwrap();
        let responder = FileResponder::new(Arc::new(root), &StaticFilesConfig::default());
        Acceptor::new(responder, &Config::default())
    }

    #[tokio::test]
    async fn running_excludes_finished_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let mut acceptor = acceptor(&dir);

        acceptor.tasks.spawn(async {
            ConnectionReport {
                peer: "done".to_string(),
                elapsed: Duration::ZERO,
                outcome: Outcome::NotFound,
            }
        });
        acceptor.tasks.spawn(std::future::pending::<ConnectionReport>());

        for _ in 0..100 {
            tokio::task::yield_now().await;
            if acceptor.running() == 1 {
                break;
            }
        }

        assert_eq!(acceptor.running(), 1);
        assert_eq!(acceptor.summary.completed, 1);
        acceptor.tasks.abort_all();
    }
}
