//! Coordination store capability.
//!
//! # Data Flow
//! ```text
//! etcd / zookeeper / memory.rs
//!     → CoordinationStore (get, list children, register watches)
//!     → WatchSink (store callback → WatchEvent message)
//!     → engine event channel
//! ```
//!
//! # Design Decisions
//! - The engine depends only on this trait; backends are swappable
//! - Watch callbacks are messages, so no store thread ever runs engine code
//! - `watch_close(path)` drops every watch registered on that path

pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use types::{NodeChange, NodeValue, StoreError, StoreResult, WatchEvent, WatchKind, WatchSink};

/// Hierarchical, watch-capable key/value store.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read a node. A missing node is `Ok(None)`.
    async fn get(&self, path: &str) -> StoreResult<Option<NodeValue>>;

    /// Names of the immediate children of `path`, split on `delimiter`.
    async fn get_children_keys(&self, path: &str, delimiter: &str) -> StoreResult<Vec<String>>;

    /// Watch the immediate children of `parent`.
    fn watch_child_change(&self, parent: &str, sink: WatchSink) -> StoreResult<()>;

    /// Watch the value of `path`.
    fn watch_data_change(&self, path: &str, sink: WatchSink) -> StoreResult<()>;

    /// Drop every watch registered on `path`.
    fn watch_close(&self, path: &str);

    /// Release the client. Later calls fail with [`StoreError::Closed`].
    fn close(&self);
}
