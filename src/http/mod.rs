//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request id, trace, timeout, panic layers)
//!     → matched route
//!     → request.rs (method, uri, headers, params, query, body, files → RequestContext)
//!     → route pipeline
//!     → response.rs (handler value or error envelope → Response)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::HttpServer;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";
