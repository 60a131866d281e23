//! Bearer token authentication subsystem.
//!
//! # Data Flow
//! ```text
//! protected route
//!     → VerifyToken   (signature + claims, stores claims on the context)
//!     → CheckSession  (token must be live in the session store; slides expiry)
//!     → rest of the chain
//! ```
//!
//! # Design Decisions
//! - A valid signature alone never admits a request
//! - Bad or missing tokens are `InvalidTokenError`, dead sessions are `AuthTimeoutError`
//! - The session check is awaited before the chain continues

pub mod middleware;
pub mod token;

pub use middleware::{CheckSession, VerifyToken};
pub use token::TokenService;
