//! Serving files from beneath the server root.
//!
//! - **`root`**: the root directory handle and request path resolution
//! - **`responder`**: picks the response for a GET and sends its head
//! - **`pipeline`**: streams a file body in fixed-size windows

pub mod pipeline;
pub mod responder;
pub mod root;
