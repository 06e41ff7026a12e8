//! Windowcast - static file server
//!
//! Serves files from a root directory over HTTP/1.1, streaming each body
//! in fixed-size windows through a single reusable buffer.

pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod server;
