//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! axum request
//!     → http::request (build RequestContext)
//!     → Pipeline::run
//!         → [VerifyToken → CheckSession]   (protected routes)
//!         → extra middleware*              (declared order)
//!         → Dispatcher                     (always last)
//!     → Ok(Value) | Err(CoreError)
//! ```
//!
//! # Design Decisions
//! - One middleware contract: `(ctx, next) -> Result<Value, CoreError>`
//! - Chains are built once at startup and never mutated
//! - Handlers receive owned arguments, never the controller's own state

pub mod args;
pub mod context;
pub mod middleware;

pub use args::{Arg, Args};
pub use context::{RequestContext, RequestInfo, UploadedFile};
pub use middleware::{Middleware, Next, Pipeline};
