//! HTTP protocol handling.
//!
//! Deliberately small: one request per connection, GET only, no keep-alive.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection handler and its lifecycle
//! - **`parser`**: extracts the request line from a single read
//! - **`request`**: the parsed GET request
//! - **`response`**: status codes and response heads
//! - **`writer`**: serializes and sends response heads
//! - **`mime`**: content type detection based on file extensions
//!
//! # Connection Lifecycle
//!
//! ```text
//!        ┌─────────────┐
//!        │  Receiving  │ ← One best-effort read of the request
//!        └──────┬──────┘
//!               │ GET → file head + windowed body, or 404
//!               │ other → 400
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │
//!        └──────┬───────────┘
//!               │ Response sent, or any I/O failure
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Socket dropped exactly once
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
