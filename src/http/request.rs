/// Prefix anchoring every request path beneath the server root.
pub const ROOT_PREFIX: &str = ".";

/// A GET request as seen by the file responder.
///
/// Only the request line is ever looked at; headers and bodies are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The raw request target, e.g. `/index.html`.
    pub target: String,
    /// The target anchored beneath the root, e.g. `./index.html`.
    pub path: String,
}

impl Request {
    pub fn get(target: impl Into<String>) -> Self {
        let target = target.into();
        let path = format!("{}{}", ROOT_PREFIX, target);
        Self { target, path }
    }

    /// True when the request names the root directory itself.
    pub fn is_root(&self) -> bool {
        self.path == "./"
    }
}
