//! Engine lifecycle.
//!
//! # Data Flow
//! ```text
//! start:  validate config → probe store → snapshot load → spawn event loop
//! close:  trigger shutdown → join event loop → close watches → close store
//! ```
//!
//! # Design Decisions
//! - Startup fails fast; a store that cannot be probed is fatal
//! - Shutdown is a broadcast so every background task sees the same signal
//! - Close is one-shot; later calls are no-ops

pub mod shutdown;

pub use shutdown::Shutdown;
