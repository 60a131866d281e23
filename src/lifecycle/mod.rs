//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains → session sweeper exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel reaches every long-running task
//! - Triggering twice is harmless

pub mod shutdown;
pub mod signals;

pub use shutdown::{signalled, Shutdown};
pub use signals::wait_for_signal;
