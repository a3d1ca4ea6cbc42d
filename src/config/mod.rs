//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps admission policy and credentials in one atomic store
//! ```
//!
//! All fields have defaults so minimal configs are accepted.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdmissionConfig, CredentialConfig, GatewayConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, TimeoutConfig, UpstreamConfig,
};
