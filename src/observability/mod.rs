//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (whatever subscriber the host process installs)
//!     → Metrics recorder installed by the host process (optional)
//! ```
//!
//! # Design Decisions
//! - Every log line carries `group` and `path` fields where they exist
//! - The library never installs a metrics exporter; without a recorder the
//!   counters are no-ops

pub mod logging;
pub mod metrics;
