//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registry (startup, consumed once)
//!     → registrar.rs (instantiate controllers, build one pipeline per action)
//!     → RouteTable (verb, full path, pipeline)
//!     → install into axum::Router
//!
//! Request:
//!     axum route match → http::request (RequestContext) → Pipeline → http::response
//! ```
//!
//! # Design Decisions
//! - Routes are compiled at startup and immutable at runtime
//! - Full path is `base_path + action path`, no normalization
//! - Pipeline order is always `[auth?, extra*, dispatcher]`
//! - Invalid route tables fail startup instead of panicking inside axum

pub mod registrar;

pub use registrar::{Registrar, RouteEntry, RouteTable};
