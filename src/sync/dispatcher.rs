//! Group dispatcher.
//!
//! # Responsibilities
//! - Upsert: reconcile against the local view, decode, apply, fan out
//! - Delete: rebuild identity from the path alone, apply, fan out
//! - Report what happened so the watch coordinator can act on it

use std::sync::Arc;

use crate::observability::metrics;
use crate::records::{ConfigRecord, RecordCodec};
use crate::subscriber::Fanout;
use crate::sync::cache::{Freshness, LocalView};
use crate::taxonomy::{ConfigGroup, PathTaxonomy};

/// Kind of change being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upsert,
    Delete,
}

/// Result of dispatching one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The local view changed and subscribers were notified.
    Applied,
    /// Older than what is already applied. Also reported for a delete
    /// that the view has since seen a newer version of.
    Stale,
    /// Same payload as what is already applied.
    Unchanged,
    /// Payload was empty or malformed; nothing changed.
    Undecodable,
    /// Delete for a node that is not in the local view.
    Absent,
    /// Delete path did not fit the namespace layout; nothing changed.
    PathRejected,
}

/// Routes changes of any group through codec, view and fan-out.
#[derive(Debug)]
pub struct Dispatcher {
    taxonomy: PathTaxonomy,
    codec: RecordCodec,
    view: Arc<LocalView>,
    fanout: Fanout,
}

impl Dispatcher {
    pub fn new(taxonomy: PathTaxonomy, view: Arc<LocalView>, fanout: Fanout) -> Self {
        Self {
            taxonomy,
            codec: RecordCodec::new(),
            view,
            fanout,
        }
    }

    pub fn view(&self) -> &Arc<LocalView> {
        &self.view
    }

    /// Single entry point keyed by change kind.
    ///
    /// `parent` is the namespace whose watch observed the change; it is only
    /// consulted for deletes. `payload` is ignored for deletes.
    pub fn dispatch(
        &self,
        group: ConfigGroup,
        kind: ChangeKind,
        parent: &str,
        path: &str,
        payload: &[u8],
        revision: u64,
    ) -> DispatchOutcome {
        match kind {
            ChangeKind::Upsert => self.upsert(group, path, payload, revision),
            ChangeKind::Delete => self.delete(group, parent, path, revision),
        }
    }

    /// Apply a created or updated node.
    pub fn upsert(&self, group: ConfigGroup, path: &str, payload: &[u8], revision: u64) -> DispatchOutcome {
        match self.view.freshness(path, payload, revision) {
            Freshness::Stale => {
                tracing::debug!(group = %group, path = %path, revision, "Skipping stale event");
                return DispatchOutcome::Stale;
            }
            Freshness::Unchanged => {
                tracing::debug!(group = %group, path = %path, "Skipping unchanged payload");
                return DispatchOutcome::Unchanged;
            }
            Freshness::New | Freshness::Changed => {}
        }

        let Some(record) = self.codec.decode(group, payload) else {
            tracing::warn!(group = %group, path = %path, "Ignoring node with undecodable payload");
            return DispatchOutcome::Undecodable;
        };

        self.view.insert(path, record.clone(), payload, revision);
        self.fanout.on_subscribe(&record);
        metrics::record_event(group, "upsert");
        tracing::debug!(group = %group, path = %path, revision, "Applied upsert");
        DispatchOutcome::Applied
    }

    /// Apply a removed node using only its path.
    pub fn delete(&self, group: ConfigGroup, parent: &str, path: &str, revision: u64) -> DispatchOutcome {
        let identity = match self.taxonomy.parse_for_delete(group, parent, path) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!(
                    group = %group,
                    parent = %parent,
                    path = %path,
                    error = %e,
                    "Cannot recover identity from deleted path, keeping local entry"
                );
                metrics::record_path_error(group);
                return DispatchOutcome::PathRejected;
            }
        };

        if self.view.supersedes(path, revision) {
            tracing::debug!(group = %group, path = %path, revision, "Skipping delete older than applied node");
            return DispatchOutcome::Stale;
        }

        if self.view.remove(path).is_none() {
            tracing::debug!(group = %group, path = %path, "Delete for node not in local view");
            return DispatchOutcome::Absent;
        }

        let tombstone = ConfigRecord::tombstone(identity);
        self.fanout.un_subscribe(&tombstone);
        metrics::record_event(group, "delete");
        tracing::debug!(group = %group, path = %path, "Applied delete");
        DispatchOutcome::Applied
    }
}
