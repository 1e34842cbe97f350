//! In-memory hierarchical store.
//!
//! # Responsibilities
//! - Hold a zookeeper-style tree where writing a node creates missing ancestors
//! - Stamp every mutation with a global revision
//! - Fire child and data watches in mutation order
//! - Allow listing and read failures to be injected per path

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::store::types::{NodeValue, StoreError, StoreResult, WatchSink};
use crate::store::CoordinationStore;

const DELIMITER: char = '/';

#[derive(Debug, Default)]
struct Tree {
    nodes: BTreeMap<String, NodeValue>,
    revision: u64,
    data_watches: HashMap<String, Vec<WatchSink>>,
    child_watches: HashMap<String, Vec<WatchSink>>,
    failing_listings: HashSet<String>,
    failing_reads: HashSet<String>,
}

impl Tree {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn notify_put(&mut self, path: &str, value: &[u8], revision: u64) {
        if let Some(sinks) = self.data_watches.get_mut(path) {
            sinks.retain(|sink| sink.put(path, value.to_vec(), revision));
        }
        if let Some(sinks) = self.child_watches.get_mut(parent_of(path)) {
            sinks.retain(|sink| sink.put(path, value.to_vec(), revision));
        }
    }

    fn notify_delete(&mut self, path: &str, revision: u64) {
        if let Some(sinks) = self.data_watches.get_mut(path) {
            sinks.retain(|sink| sink.delete(path, revision));
        }
        if let Some(sinks) = self.child_watches.get_mut(parent_of(path)) {
            sinks.retain(|sink| sink.delete(path, revision));
        }
    }

    fn watch_count(&self) -> usize {
        self.data_watches.values().map(Vec::len).sum::<usize>()
            + self.child_watches.values().map(Vec::len).sum::<usize>()
    }
}

/// A thread-safe in-memory coordination store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: Mutex<Tree>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update `path`, creating missing ancestors with empty values.
    ///
    /// Returns the revision of the write.
    pub fn put(&self, path: &str, value: impl Into<Vec<u8>>) -> StoreResult<u64> {
        self.ensure_open()?;
        let value = value.into();
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");

        for ancestor in ancestors_of(path) {
            if !tree.nodes.contains_key(&ancestor) {
                let revision = tree.next_revision();
                tree.nodes.insert(
                    ancestor.clone(),
                    NodeValue {
                        value: Vec::new(),
                        revision,
                    },
                );
                tree.notify_put(&ancestor, &[], revision);
            }
        }

        let revision = tree.next_revision();
        tree.nodes.insert(
            path.to_string(),
            NodeValue {
                value: value.clone(),
                revision,
            },
        );
        tree.notify_put(path, &value, revision);
        tracing::trace!(path = %path, revision, "Memory store put");
        Ok(revision)
    }

    /// Remove `path` and its whole subtree, deepest nodes first.
    ///
    /// Returns `false` when nothing was removed.
    pub fn delete(&self, path: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");

        let prefix = format!("{}{}", path, DELIMITER);
        let mut doomed: Vec<String> = tree
            .nodes
            .keys()
            .filter(|key| key.as_str() == path || key.starts_with(&prefix))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Ok(false);
        }
        doomed.sort_by_key(|key| std::cmp::Reverse(key.matches(DELIMITER).count()));

        for key in doomed {
            tree.nodes.remove(&key);
            let revision = tree.next_revision();
            tree.notify_delete(&key, revision);
            tracing::trace!(path = %key, revision, "Memory store delete");
        }
        Ok(true)
    }

    /// Make `get_children_keys(path)` fail until [`Self::restore_listing`].
    pub fn fail_listing(&self, path: &str) {
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.failing_listings.insert(path.to_string());
    }

    pub fn restore_listing(&self, path: &str) {
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.failing_listings.remove(path);
    }

    /// Make `get(path)` fail until [`Self::restore_get`].
    pub fn fail_get(&self, path: &str) {
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.failing_reads.insert(path.to_string());
    }

    pub fn restore_get(&self, path: &str) {
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.failing_reads.remove(path);
    }

    /// Latest revision issued.
    pub fn revision(&self) -> u64 {
        self.tree.lock().expect("memory store mutex poisoned").revision
    }

    /// Number of live watch registrations.
    pub fn watch_count(&self) -> usize {
        self.tree.lock().expect("memory store mutex poisoned").watch_count()
    }

    /// Whether a data watch is registered on `path`.
    pub fn has_data_watch(&self, path: &str) -> bool {
        let tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.data_watches.get(path).is_some_and(|sinks| !sinks.is_empty())
    }

    /// Whether a child watch is registered on `path`.
    pub fn has_child_watch(&self, path: &str) -> bool {
        let tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.child_watches.get(path).is_some_and(|sinks| !sinks.is_empty())
    }

    /// How many times [`CoordinationStore::close`] has been called.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, path: &str) -> StoreResult<Option<NodeValue>> {
        self.ensure_open()?;
        let tree = self.tree.lock().expect("memory store mutex poisoned");
        if tree.failing_reads.contains(path) {
            return Err(StoreError::Unavailable(format!("read {} failed", path)));
        }
        Ok(tree.nodes.get(path).cloned())
    }

    async fn get_children_keys(&self, path: &str, delimiter: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        let tree = self.tree.lock().expect("memory store mutex poisoned");
        if tree.failing_listings.contains(path) {
            return Err(StoreError::Unavailable(format!("listing {} failed", path)));
        }

        let prefix = format!("{}{}", path, delimiter);
        let children = tree
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains(delimiter)).then(|| rest.to_string())
            })
            .collect();
        Ok(children)
    }

    fn watch_child_change(&self, parent: &str, sink: WatchSink) -> StoreResult<()> {
        self.ensure_open()?;
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.child_watches.entry(parent.to_string()).or_default().push(sink);
        Ok(())
    }

    fn watch_data_change(&self, path: &str, sink: WatchSink) -> StoreResult<()> {
        self.ensure_open()?;
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.data_watches.entry(path.to_string()).or_default().push(sink);
        Ok(())
    }

    fn watch_close(&self, path: &str) {
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.data_watches.remove(path);
        tree.child_watches.remove(path);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut tree = self.tree.lock().expect("memory store mutex poisoned");
        tree.data_watches.clear();
        tree.child_watches.clear();
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind(DELIMITER) {
        Some(index) => &path[..index],
        None => "",
    }
}

// "/a/b/c" -> ["/a", "/a/b"]
fn ancestors_of(path: &str) -> Vec<String> {
    path.match_indices(DELIMITER)
        .map(|(index, _)| &path[..index])
        .filter(|ancestor| !ancestor.is_empty())
        .map(str::to_string)
        .collect()
}
