//! Snapshot loader.
//!
//! # Data Flow
//! ```text
//! roots → [watch parent → list children] → per child:
//!     Plugins        → plugin leaf + selector/rule namespaces
//!     PluginDirs(g)  → Records(g) namespace of that plugin
//!     Records(g)     → [watch leaf → get → dispatch upsert]
//! ```
//!
//! # Design Decisions
//! - Every watch is registered before the read it protects, so a change
//!   landing mid-snapshot is buffered as an event instead of lost
//! - Events duplicated by the read are dropped by revision reconciliation
//! - A namespace that fails to list is treated as empty; the watch stays
//! - Worklist instead of recursion, one namespace at a time

use std::collections::VecDeque;

use crate::sync::dispatcher::DispatchOutcome;
use crate::sync::state::SyncCore;
use crate::sync::watch::{Namespace, ParentRole};
use crate::taxonomy::ConfigGroup;

/// Totals of one load pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub namespaces: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed_listings: usize,
}

impl SyncCore {
    /// Load every namespace reachable from `roots` into the local view.
    pub(crate) async fn load(&self, roots: Vec<Namespace>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut pending: VecDeque<Namespace> = roots.into();

        while let Some(namespace) = pending.pop_front() {
            report.namespaces += 1;
            let children = match self.list_namespace(&namespace).await {
                Some(children) => children,
                None => {
                    report.failed_listings += 1;
                    continue;
                }
            };

            for child in children {
                let path = self.taxonomy.child_path(&namespace.parent, &child);
                match namespace.role {
                    ParentRole::Plugins => {
                        if self.is_enabled(ConfigGroup::Plugin) {
                            self.tally(&mut report, self.load_leaf(ConfigGroup::Plugin, &namespace.parent, &path).await);
                        }
                        pending.extend(self.plugin_namespaces(&child));
                    }
                    ParentRole::PluginDirs(group) => {
                        pending.push_back(self.plugin_dir_namespace(group, &child));
                    }
                    ParentRole::Records(group) => {
                        self.tally(&mut report, self.load_leaf(group, &namespace.parent, &path).await);
                    }
                }
            }
        }

        tracing::debug!(
            namespaces = report.namespaces,
            applied = report.applied,
            skipped = report.skipped,
            failed_listings = report.failed_listings,
            "Load pass finished"
        );
        report
    }

    /// Register the child watch, then list. `None` when listing failed.
    async fn list_namespace(&self, namespace: &Namespace) -> Option<Vec<String>> {
        self.watch_parent(namespace);
        match self
            .store
            .get_children_keys(&namespace.parent, self.taxonomy.delimiter())
            .await
        {
            Ok(mut children) => {
                children.sort();
                Some(children)
            }
            Err(e) => {
                tracing::warn!(
                    parent = %namespace.parent,
                    error = %e,
                    "Failed to list namespace, continuing without it"
                );
                None
            }
        }
    }

    /// Register the data watch of a leaf, then read and apply it.
    pub(crate) async fn load_leaf(&self, group: ConfigGroup, parent: &str, path: &str) -> Option<DispatchOutcome> {
        self.watch_leaf(group, parent, path);
        match self.store.get(path).await {
            Ok(Some(node)) => Some(self.dispatcher.upsert(group, path, &node.value, node.revision)),
            Ok(None) => {
                tracing::debug!(group = %group, path = %path, "Node vanished before read");
                None
            }
            Err(e) => {
                tracing::warn!(group = %group, path = %path, error = %e, "Failed to read node");
                None
            }
        }
    }

    fn tally(&self, report: &mut LoadReport, outcome: Option<DispatchOutcome>) {
        match outcome {
            Some(DispatchOutcome::Applied) => report.applied += 1,
            _ => report.skipped += 1,
        }
    }
}
