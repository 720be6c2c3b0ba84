//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to HashServer / Router at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the hashing delay is fixed for the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{HashingConfig, ListenerConfig, ObservabilityConfig, ServiceConfig};
pub use validation::{validate_config, ValidationError};
