use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::config::StaticFilesConfig;
use crate::error::{ServeError, ServeResult};
use crate::files::pipeline::ChunkPipeline;
use crate::files::root::RootDir;
use crate::http::mime::content_type_for;
use crate::http::request::Request;
use crate::http::response::ResponseHead;
use crate::http::writer::write_head;

/// What the responder ended up sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responded {
    /// 200 with a body of this many bytes.
    File { bytes: u64 },
    /// 404 with no body.
    NotFound,
}

/// Serves regular files from beneath a root directory.
#[derive(Debug, Clone)]
pub struct FileResponder {
    root: Arc<RootDir>,
    index: String,
    chunk_size: usize,
    window_delay: Option<Duration>,
}

impl FileResponder {
    pub fn new(root: Arc<RootDir>, cfg: &StaticFilesConfig) -> Self {
        Self {
            root,
            index: cfg.index.clone(),
            chunk_size: cfg.chunk_size,
            window_delay: cfg.window_delay(),
        }
    }

    pub fn root(&self) -> &RootDir {
        &self.root
    }

    /// Answers a GET request on `conn`.
    ///
    /// A missing or non-regular target is answered with a 404 and is not an
    /// error. The response head is fully sent before any body byte.
    pub async fn respond<W>(&self, request: &Request, conn: &mut W) -> ServeResult<Responded>
    where
        W: AsyncWrite + Unpin,
    {
        let rel = if request.is_root() {
            format!("./{}", self.index)
        } else {
            request.path.clone()
        };

        let Some(path) = self.root.resolve(&rel) else {
            warn!(path = %rel, "rejected path outside the root");
            return self.not_found(conn).await;
        };

        let mut file = match self.open(path.clone()).await {
            Ok(file) => file,
            Err(e) => {
                info!(path = %rel, error = %e, "file not found");
                return self.not_found(conn).await;
            }
        };

        let size = match file.metadata().await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                info!(path = %rel, "not a regular file");
                return self.not_found(conn).await;
            }
            Err(e) => {
                info!(path = %rel, error = %e, "file not found");
                return self.not_found(conn).await;
            }
        };

        let content_type = content_type_for(&path);
        debug!(path = %rel, size, content_type, "sending file");

        write_head(conn, &ResponseHead::ok(content_type, size))
            .await
            .map_err(ServeError::SendHead)?;

        let bytes = ChunkPipeline::new(self.chunk_size, self.window_delay)
            .stream(&mut file, size, conn)
            .await?;

        Ok(Responded::File { bytes })
    }

    /// Opens a resolved path beneath the root on the blocking pool.
    async fn open(&self, path: PathBuf) -> io::Result<File> {
        let root = Arc::clone(&self.root);
        let file = tokio::task::spawn_blocking(move || root.open_beneath(&path))
            .await
            .map_err(io::Error::other)??;
        Ok(File::from_std(file))
    }

    async fn not_found<W>(&self, conn: &mut W) -> ServeResult<Responded>
    where
        W: AsyncWrite + Unpin,
    {
        write_head(conn, &ResponseHead::not_found())
            .await
            .map_err(ServeError::SendHead)?;
        Ok(Responded::NotFound)
    }
}
