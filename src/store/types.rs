//! Store-facing types and error definitions.

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors reported by a coordination store client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached or the request timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The client has been closed.
    #[error("store client closed")]
    Closed,

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Value of a node together with its modification revision.
///
/// Stores without a revision concept report `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeValue {
    pub value: Vec<u8>,
    pub revision: u64,
}

/// Granularity of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Fires when an immediate child of the watched parent changes.
    Child,
    /// Fires when the watched node itself changes.
    Data,
}

/// A change observed by a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeChange {
    Put {
        path: String,
        value: Vec<u8>,
        revision: u64,
    },
    Delete {
        path: String,
        revision: u64,
    },
}

impl NodeChange {
    pub fn path(&self) -> &str {
        match self {
            NodeChange::Put { path, .. } | NodeChange::Delete { path, .. } => path,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            NodeChange::Put { revision, .. } | NodeChange::Delete { revision, .. } => *revision,
        }
    }
}

/// Notification delivered by a store watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path the watch was registered on.
    pub watched: String,
    pub kind: WatchKind,
    pub change: NodeChange,
}

/// Delivery handle handed to the store when a watch is registered.
///
/// Store callbacks turn into messages on the engine's event channel, so a
/// store implementation never calls engine code directly.
#[derive(Debug, Clone)]
pub struct WatchSink {
    watched: String,
    kind: WatchKind,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl WatchSink {
    pub fn new(watched: impl Into<String>, kind: WatchKind, tx: mpsc::UnboundedSender<WatchEvent>) -> Self {
        Self {
            watched: watched.into(),
            kind,
            tx,
        }
    }

    pub fn watched(&self) -> &str {
        &self.watched
    }

    pub fn kind(&self) -> WatchKind {
        self.kind
    }

    /// Report a created or updated node. Returns `false` once the engine is gone.
    pub fn put(&self, path: impl Into<String>, value: Vec<u8>, revision: u64) -> bool {
        self.send(NodeChange::Put {
            path: path.into(),
            value,
            revision,
        })
    }

    /// Report a removed node. Returns `false` once the engine is gone.
    pub fn delete(&self, path: impl Into<String>, revision: u64) -> bool {
        self.send(NodeChange::Delete {
            path: path.into(),
            revision,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, change: NodeChange) -> bool {
        self.tx
            .send(WatchEvent {
                watched: self.watched.clone(),
                kind: self.kind,
                change,
            })
            .is_ok()
    }
}
