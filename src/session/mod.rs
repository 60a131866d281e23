//! Session store subsystem.
//!
//! # Data Flow
//! ```text
//! login handler
//!     → TokenService::add_session  → store.set(token)
//! protected request
//!     → CheckSession middleware    → store.get(token) → store.update_expire(token)
//! logout handler
//!     → TokenService::remove_session → store.remove(token)
//! background sweeper
//!     → store.purge_expired()
//! ```
//!
//! # Design Decisions
//! - The store is the authority on liveness; a valid signature is not enough
//! - Expiry is sliding: each successful check pushes it forward
//! - Backends only need atomic per-key operations

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemorySessionStore;

/// Failure reported by a session store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store holding live session tokens.
///
/// All operations may be called concurrently from many request tasks.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Value stored for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `key` with a fresh expiry.
    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Push the expiry of `key` one full TTL into the future.
    async fn update_expire(&self, key: &str) -> Result<(), StoreError>;

    /// Drop expired entries. Backends with native expiry can keep the default.
    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
