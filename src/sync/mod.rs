//! Synchronization core.
//!
//! # Data Flow
//! ```text
//! SyncEngine::start
//!     → snapshot.rs (register watch, list, read, dispatch)
//!     → engine.rs event loop (WatchEvent → dispatch)
//!
//! dispatcher.rs
//!     upsert: cache.rs freshness → RecordCodec → LocalView → Fanout::on_subscribe
//!     delete: PathTaxonomy::parse_for_delete → LocalView → Fanout::un_subscribe
//!
//! watch.rs
//!     WatchRegistry (per-path state) ⇄ CoordinationStore watches
//! ```
//!
//! # Design Decisions
//! - The local view is owned here; callers only ever get clones
//! - Nothing below the dispatcher returns an error to the engine
//! - Only start-up failures reach the host as `SyncError`

pub mod cache;
mod state;
pub mod dispatcher;
pub mod engine;
pub mod snapshot;
pub mod types;
pub mod watch;

pub use cache::{CachedNode, Freshness, LocalView};
pub use dispatcher::{ChangeKind, DispatchOutcome, Dispatcher};
pub use engine::SyncEngine;
pub use snapshot::LoadReport;
pub use types::SyncError;
pub use watch::{LeafWatch, Namespace, ParentRole, WatchRegistry, WatchState, CLOSED_RETENTION};
