//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared with the dispatcher, probe and HTTP layers at start-up
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the decoder and manifest section are chosen once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ActionsConfig, ListenerConfig, ObservabilityConfig, ProbeConfig, Runtime, ServerConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
