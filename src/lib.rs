//! Configuration sync engine for an API gateway.
//!
//! Keeps an in-memory view of plugins, selectors, rules, credentials,
//! metadata, proxy selectors and discovered upstreams in step with a
//! hierarchical, watch-capable coordination store, and pushes every change
//! to in-process subscribers.
//!
//! # Data Flow
//! ```text
//! CoordinationStore (etcd / zookeeper / MemoryStore)
//!     → sync::snapshot (initial load)   → sync::dispatcher → subscriber::Fanout
//!     → WatchEvent channel → sync::engine event loop ↗
//! ```

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod records;
pub mod store;
pub mod subscriber;
pub mod sync;
pub mod taxonomy;

pub use config::{load_config, SyncConfig};
pub use lifecycle::Shutdown;
pub use records::{ConfigRecord, RecordCodec};
pub use store::{CoordinationStore, MemoryStore, StoreError};
pub use subscriber::{DataSubscriber, PluginDataSubscriber, SubscriberError, Subscribers};
pub use sync::{LocalView, SyncEngine, SyncError};
pub use taxonomy::{ConfigGroup, Identity, PathTaxonomy};
