//! kfcore: a metadata-driven HTTP controller framework on axum.
//!
//! # Architecture Overview
//!
//! ```text
//!   startup                                   request time
//!   ───────                                   ────────────
//!   Registry (controllers, actions,           axum route match
//!   auth, params, middleware)                       │
//!        │                                          ▼
//!        ▼                                    http::request → RequestContext
//!   routing::Registrar ── Provider ──┐              │
//!        │  (one instance per        │              ▼
//!        │   controller)             │        Pipeline
//!        ▼                           │          [VerifyToken → CheckSession]?
//!   RouteTable ──install──▶ Router   │          extra middleware*
//!                                    └────────▶ Dispatcher → handler
//!                                                   │
//!                                                   ▼
//!                                             http::response (value | {name, message})
//! ```
//!
//! Cross-cutting: `config` (TOML + env), `observability` (tracing, metrics),
//! `lifecycle` (signals, graceful shutdown), `session` (sliding-expiry store).

// Core
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod registry;

// Request handling
pub mod auth;
pub mod dispatch;
pub mod http;
pub mod routing;
pub mod session;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use auth::TokenService;
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, ErrorEnvelope};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Args, Middleware, Next, RequestContext};
pub use provider::{Controller, Provider};
pub use registry::{ActionSpec, HttpVerb, ParamKind, Registry};
pub use session::{MemorySessionStore, SessionStore};
