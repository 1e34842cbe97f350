//! Local view of synchronized records.
//!
//! # Responsibilities
//! - Hold exactly the nodes currently applied, keyed by store path
//! - Decide whether an incoming payload is new, changed, stale or a repeat
//! - Tell deletes apart from ones already overtaken by a newer write
//! - Hand out clones so callers never touch engine-owned state

use dashmap::DashMap;

use crate::records::ConfigRecord;
use crate::taxonomy::ConfigGroup;

/// A record applied to the local view.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedNode {
    pub group: ConfigGroup,
    pub record: ConfigRecord,
    pub revision: u64,
    raw: Vec<u8>,
}

/// How an incoming payload relates to what is already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing cached for the path.
    New,
    /// Newer than the cached value.
    Changed,
    /// Older than or as old as the cached revision.
    Stale,
    /// Byte-identical to the cached payload.
    Unchanged,
}

/// Materialized records, one entry per existing node.
#[derive(Debug, Default)]
pub struct LocalView {
    nodes: DashMap<String, CachedNode>,
}

impl LocalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare an incoming payload with the cached one.
    ///
    /// Revision `0` means the store does not version nodes; only payload
    /// equality is used then.
    pub fn freshness(&self, path: &str, raw: &[u8], revision: u64) -> Freshness {
        match self.nodes.get(path) {
            None => Freshness::New,
            Some(cached) => {
                if cached.revision != 0 && revision != 0 && revision <= cached.revision {
                    Freshness::Stale
                } else if cached.raw == raw {
                    Freshness::Unchanged
                } else {
                    Freshness::Changed
                }
            }
        }
    }

    /// Whether the cached node is strictly newer than `revision`.
    ///
    /// Always `false` when either side is unversioned.
    pub fn supersedes(&self, path: &str, revision: u64) -> bool {
        self.nodes
            .get(path)
            .is_some_and(|cached| cached.revision != 0 && revision != 0 && cached.revision > revision)
    }

    pub(crate) fn insert(&self, path: &str, record: ConfigRecord, raw: &[u8], revision: u64) {
        let node = CachedNode {
            group: record.group(),
            record,
            revision,
            raw: raw.to_vec(),
        };
        self.nodes.insert(path.to_string(), node);
    }

    pub(crate) fn remove(&self, path: &str) -> Option<CachedNode> {
        self.nodes.remove(path).map(|(_, node)| node)
    }

    /// Record applied at `path`, if any.
    pub fn get(&self, path: &str) -> Option<ConfigRecord> {
        self.nodes.get(path).map(|node| node.record.clone())
    }

    pub fn node(&self, path: &str) -> Option<CachedNode> {
        self.nodes.get(path).map(|node| node.value().clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// Every record of `group`, sorted by path.
    pub fn records(&self, group: ConfigGroup) -> Vec<ConfigRecord> {
        let mut entries: Vec<(String, ConfigRecord)> = self
            .nodes
            .iter()
            .filter(|entry| entry.group == group)
            .map(|entry| (entry.key().clone(), entry.record.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, record)| record).collect()
    }

    /// Every applied path, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.nodes.iter().map(|entry| entry.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
