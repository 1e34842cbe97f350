//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → resolve.rs (optional field overrides from env or a host source)
//!     → validation.rs (semantic checks)
//!     → SyncConfig (validated, immutable)
//!     → SyncEngine::start
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the engine starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod resolve;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use resolve::{resolve, EnvOverrides, MapOverrides, OverrideSource};
pub use schema::{ObservabilityConfig, SyncConfig};
pub use validation::{validate_config, ValidationError};
