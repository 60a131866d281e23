//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, KFCORE_JWT_SECRET override)
//!     → validation.rs (semantic checks)
//!     → CoreConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, CoreConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, SessionConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
