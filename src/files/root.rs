use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;

/// The directory every request is resolved beneath.
///
/// The directory descriptor is opened once at startup and shared read-only
/// by all connections. Lookups are `openat` calls relative to it, so
/// renaming or replacing the directory afterwards does not change what is
/// served.
#[derive(Debug)]
pub struct RootDir {
    dir: File,
    path: PathBuf,
    allow_traversal: bool,
}

impl RootDir {
    /// Opens `path` as the server root. Fails unless it is a directory.
    pub fn open(path: impl AsRef<Path>, allow_traversal: bool) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let dir = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY | libc::O_CLOEXEC)
            .open(path)
            .with_context(|| format!("opening root directory {}", path.display()))?;

        Ok(Self {
            dir,
            path: path.to_path_buf(),
            allow_traversal,
        })
    }

    /// The path the root was opened from. For logging only.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turns a root-anchored request path (`./a/b.html`) into a path
    /// relative to the root descriptor.
    ///
    /// Returns `None` when the path tries to leave the root and traversal is
    /// not allowed.
    pub fn resolve(&self, rel: &str) -> Option<PathBuf> {
        let mut resolved = PathBuf::new();

        for component in Path::new(rel).components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir if self.allow_traversal => resolved.push(".."),
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return None;
                }
            }
        }

        if resolved.as_os_str().is_empty() {
            resolved.push(".");
        }
        Some(resolved)
    }

    /// Opens `rel` read-only relative to the root descriptor.
    ///
    /// The open never waits on the target: FIFOs and devices return at once
    /// so the caller can inspect and reject them.
    pub fn open_beneath(&self, rel: &Path) -> io::Result<File> {
        let name = CString::new(rel.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let fd = unsafe {
            libc::openat(
                self.dir.as_raw_fd(),
                name.as_ptr(),
                libc::O_RDONLY | libc::O_NONBLOCK | libc::O_CLOEXEC,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // Safety: openat returned a fresh descriptor that nothing else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(File::from(fd))
    }
}
