//! Engine error definitions.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;
use crate::taxonomy::PathError;

/// Errors surfaced to the host by the sync engine.
///
/// Everything below the dispatcher is recovered and logged; only start-up
/// problems and explicit lookups reach the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store could not be reached at start-up.
    #[error("store unreachable at startup: {0}")]
    Startup(#[source] StoreError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A configured group name is not one of the known groups.
    #[error("unknown config group: {0}")]
    UnknownGroup(String),

    #[error("invalid path: {0}")]
    Path(#[from] PathError),
}
