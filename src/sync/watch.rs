//! Watch coordination.
//!
//! # Responsibilities
//! - Track one child watch per namespace parent and one data watch per leaf
//! - Drive the per-leaf state machine `Unwatched → Watching → Closed`
//! - Register and release watches with the store exactly once
//!
//! # Design Decisions
//! - Parent watches live until shutdown; only leaf watches close early
//! - A failed registration is forgotten so the next event can retry it
//! - Only the most recently closed leaves are retained, so a long run of
//!   create/delete cycles keeps the registry bounded

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::observability::metrics;
use crate::store::WatchKind;
use crate::sync::state::SyncCore;
use crate::taxonomy::ConfigGroup;

/// What the children of a watched parent are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentRole {
    /// Plugin nodes; each owns selector and rule namespaces.
    Plugins,
    /// Per-plugin directories of a two-level namespace.
    PluginDirs(ConfigGroup),
    /// Record nodes of one group.
    Records(ConfigGroup),
}

/// A namespace parent to list and watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub parent: String,
    pub role: ParentRole,
}

impl Namespace {
    pub fn new(parent: impl Into<String>, role: ParentRole) -> Self {
        Self {
            parent: parent.into(),
            role,
        }
    }
}

/// Lifecycle of a leaf's data watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    Watching,
    Closed,
}

/// Registry entry of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafWatch {
    pub group: ConfigGroup,
    pub parent: String,
    pub state: WatchState,
}

/// How many closed leaves are remembered before the oldest is forgotten.
pub const CLOSED_RETENTION: usize = 256;

/// Concurrency-safe registry of every watch the engine owns.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    parents: DashMap<String, ParentRole>,
    leaves: DashMap<String, LeafWatch>,
    closed: Mutex<VecDeque<String>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the child watch of `parent`. Returns `false` if already claimed.
    pub fn claim_parent(&self, parent: &str, role: ParentRole) -> bool {
        match self.parents.entry(parent.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(role);
                true
            }
        }
    }

    pub fn forget_parent(&self, parent: &str) {
        self.parents.remove(parent);
    }

    pub fn parent_role(&self, parent: &str) -> Option<ParentRole> {
        self.parents.get(parent).map(|role| *role)
    }

    /// Move a leaf to `Watching`. Returns `false` if it already was.
    pub fn claim_leaf(&self, path: &str, group: ConfigGroup, parent: &str) -> bool {
        match self.leaves.entry(path.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().state == WatchState::Watching {
                    return false;
                }
                let leaf = entry.get_mut();
                leaf.state = WatchState::Watching;
                leaf.group = group;
                leaf.parent = parent.to_string();
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(LeafWatch {
                    group,
                    parent: parent.to_string(),
                    state: WatchState::Watching,
                });
                true
            }
        }
    }

    /// Move a leaf from `Watching` to `Closed`. Returns `false` otherwise.
    ///
    /// Past [`CLOSED_RETENTION`] closed leaves, the oldest is dropped and
    /// reads as `Unwatched` again.
    pub fn close_leaf(&self, path: &str) -> bool {
        match self.leaves.get_mut(path) {
            Some(mut leaf) if leaf.state == WatchState::Watching => {
                leaf.state = WatchState::Closed;
            }
            _ => return false,
        }
        self.retire(path);
        true
    }

    fn retire(&self, path: &str) {
        let mut closed = self.closed.lock().expect("watch registry mutex poisoned");
        closed.push_back(path.to_string());
        while closed.len() > CLOSED_RETENTION {
            if let Some(oldest) = closed.pop_front() {
                // re-created leaves are Watching again and must stay
                self.leaves.remove_if(&oldest, |_, leaf| leaf.state == WatchState::Closed);
            }
        }
    }

    pub fn forget_leaf(&self, path: &str) {
        self.leaves.remove(path);
    }

    pub fn leaf(&self, path: &str) -> Option<LeafWatch> {
        self.leaves.get(path).map(|leaf| leaf.value().clone())
    }

    pub fn state(&self, path: &str) -> WatchState {
        self.leaves
            .get(path)
            .map(|leaf| leaf.state)
            .unwrap_or(WatchState::Unwatched)
    }

    /// Leaves currently held, live or recently closed.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Live watches: every parent plus every `Watching` leaf.
    pub fn active_count(&self) -> usize {
        self.parents.len()
            + self
                .leaves
                .iter()
                .filter(|leaf| leaf.state == WatchState::Watching)
                .count()
    }

    /// Close everything. Returns each path that held a live watch, once.
    pub fn drain(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .leaves
            .iter_mut()
            .filter_map(|mut leaf| {
                if leaf.state == WatchState::Watching {
                    leaf.state = WatchState::Closed;
                    Some(leaf.key().clone())
                } else {
                    None
                }
            })
            .collect();
        let parents: Vec<String> = self.parents.iter().map(|entry| entry.key().clone()).collect();
        self.parents.clear();
        self.closed.lock().expect("watch registry mutex poisoned").clear();
        paths.extend(parents);
        paths
    }
}

impl SyncCore {
    /// Ensure a child watch on `namespace`. Returns `true` if newly registered.
    pub(crate) fn watch_parent(&self, namespace: &Namespace) -> bool {
        if !self.registry.claim_parent(&namespace.parent, namespace.role) {
            return false;
        }
        let sink = self.sink(&namespace.parent, WatchKind::Child);
        match self.store.watch_child_change(&namespace.parent, sink) {
            Ok(()) => {
                tracing::debug!(parent = %namespace.parent, role = ?namespace.role, "Child watch registered");
                metrics::record_active_watches(self.registry.active_count());
                true
            }
            Err(e) => {
                tracing::warn!(parent = %namespace.parent, error = %e, "Failed to register child watch");
                self.registry.forget_parent(&namespace.parent);
                false
            }
        }
    }

    /// Ensure a data watch on a leaf. Returns `true` if newly registered.
    pub(crate) fn watch_leaf(&self, group: ConfigGroup, parent: &str, path: &str) -> bool {
        if !self.registry.claim_leaf(path, group, parent) {
            return false;
        }
        let sink = self.sink(path, WatchKind::Data);
        match self.store.watch_data_change(path, sink) {
            Ok(()) => {
                tracing::trace!(group = %group, path = %path, "Data watch registered");
                metrics::record_active_watches(self.registry.active_count());
                true
            }
            Err(e) => {
                tracing::warn!(group = %group, path = %path, error = %e, "Failed to register data watch");
                self.registry.forget_leaf(path);
                false
            }
        }
    }

    /// Release the data watch of a deleted leaf.
    pub(crate) fn release_leaf(&self, path: &str) {
        if self.registry.close_leaf(path) {
            self.store.watch_close(path);
            metrics::record_active_watches(self.registry.active_count());
            tracing::trace!(path = %path, "Data watch closed");
        }
    }

    /// Close every watch once. Used on shutdown.
    pub(crate) fn release_all(&self) -> usize {
        let paths = self.registry.drain();
        for path in &paths {
            self.store.watch_close(path);
        }
        metrics::record_active_watches(0);
        paths.len()
    }
}
