//! Sync engine: start-up, live event handling and shutdown.
//!
//! # Data Flow
//! ```text
//! SyncEngine::start
//!     → probe store root
//!     → snapshot load (watches registered before each read)
//!     → spawn event loop
//!
//! event loop:
//!     WatchEvent (child) → new leaf: watch + upsert | new plugin: load namespaces
//!     WatchEvent (data)  → upsert | delete + release watch
//!     shutdown signal    → exit
//! ```
//!
//! # Design Decisions
//! - A single task applies events, so per-node ordering is the store's ordering
//! - Events that arrive during the snapshot wait in the channel and are
//!   reconciled by revision once the loop starts
//! - Close is serialized; a second caller waits for the first and then no-ops

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::{validate_config, ConfigError, SyncConfig};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::records::ConfigRecord;
use crate::store::{CoordinationStore, NodeChange, WatchEvent, WatchKind};
use crate::subscriber::{Fanout, Subscribers};
use crate::sync::cache::LocalView;
use crate::sync::dispatcher::{DispatchOutcome, Dispatcher};
use crate::sync::state::SyncCore;
use crate::sync::types::SyncError;
use crate::sync::watch::{ParentRole, WatchState};
use crate::taxonomy::{ConfigGroup, Identity, PathTaxonomy};

/// Keeps a local view of the store's configuration in sync and notifies
/// subscribers of every change.
pub struct SyncEngine {
    core: Arc<SyncCore>,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl SyncEngine {
    /// Load the initial snapshot and start watching.
    ///
    /// Returns once every enabled namespace has been loaded and delivered.
    pub async fn start(
        store: Arc<dyn CoordinationStore>,
        subscribers: Subscribers,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        let groups = parse_groups(&config.groups)?;
        validate_config(config).map_err(|errors| SyncError::Config(ConfigError::Validation(errors)))?;

        metrics::set_enabled(config.observability.metrics_enabled);

        let taxonomy = config.taxonomy();
        store
            .get_children_keys(taxonomy.root(), taxonomy.delimiter())
            .await
            .map_err(|e| {
                tracing::error!(root = %taxonomy.root(), error = %e, "Store unreachable at startup");
                SyncError::Startup(e)
            })?;

        let view = Arc::new(LocalView::new());
        let dispatcher = Dispatcher::new(taxonomy.clone(), view, Fanout::new(subscribers));
        let (tx, rx) = mpsc::unbounded_channel();
        let core = Arc::new(SyncCore::new(store, taxonomy, dispatcher, groups, tx));

        let report = core.load(core.roots()).await;
        tracing::info!(
            root = %core.taxonomy.root(),
            records = core.dispatcher.view().len(),
            namespaces = report.namespaces,
            failed_listings = report.failed_listings,
            watches = core.registry.active_count(),
            "Initial snapshot loaded"
        );

        let shutdown = Shutdown::new();
        let task = tokio::spawn(run_event_loop(core.clone(), rx, shutdown.subscribe()));

        Ok(Self {
            core,
            shutdown,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        })
    }

    /// Stop watching and release the store client.
    ///
    /// Idempotent. When this returns, no subscriber will be called again.
    pub async fn close(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };
        self.closed.store(true, Ordering::SeqCst);

        self.shutdown.trigger();
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Event loop ended abnormally");
        }

        let released = self.core.release_all();
        self.core.store.close();
        tracing::info!(released, "Sync engine closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Read-only view of every applied record.
    pub fn view(&self) -> &LocalView {
        self.core.dispatcher.view()
    }

    pub fn taxonomy(&self) -> &PathTaxonomy {
        &self.core.taxonomy
    }

    /// Record currently applied for `identity`.
    pub fn record(&self, identity: &Identity) -> Result<Option<ConfigRecord>, SyncError> {
        let path = self.core.taxonomy.build(identity)?;
        Ok(self.view().get(&path))
    }

    /// Watch state of a leaf node.
    pub fn watch_state(&self, path: &str) -> WatchState {
        self.core.registry.state(path)
    }

    /// Parent and leaf watches currently held.
    pub fn active_watches(&self) -> usize {
        self.core.registry.active_count()
    }

    /// Leaves the registry still tracks, live or recently closed.
    pub fn tracked_leaves(&self) -> usize {
        self.core.registry.leaf_count()
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("root", &self.core.taxonomy.root())
            .field("records", &self.view().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn parse_groups(names: &[String]) -> Result<HashSet<ConfigGroup>, SyncError> {
    names
        .iter()
        .map(|name| {
            name.parse::<ConfigGroup>()
                .map_err(|_| SyncError::UnknownGroup(name.clone()))
        })
        .collect()
}

async fn run_event_loop(
    core: Arc<SyncCore>,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::debug!("Event loop started");
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::debug!("Event loop received shutdown signal");
                break;
            }
            event = events.recv() => match event {
                Some(event) => core.handle_event(event).await,
                None => break,
            },
        }
    }
}

impl SyncCore {
    pub(crate) async fn handle_event(&self, event: WatchEvent) {
        tracing::trace!(
            watched = %event.watched,
            kind = ?event.kind,
            path = %event.change.path(),
            revision = event.change.revision(),
            "Watch event"
        );
        match event.kind {
            WatchKind::Child => self.on_child_change(&event.watched, event.change).await,
            WatchKind::Data => self.on_data_change(&event.watched, event.change),
        }
    }

    async fn on_child_change(&self, parent: &str, change: NodeChange) {
        let Some(role) = self.registry.parent_role(parent) else {
            tracing::trace!(parent = %parent, "Child event for released parent");
            return;
        };
        let Some(name) = self.child_name(parent, change.path()).map(str::to_string) else {
            tracing::debug!(parent = %parent, path = %change.path(), "Ignoring event outside watched namespace");
            return;
        };

        match (role, change) {
            (ParentRole::Plugins, NodeChange::Put { path, value, revision }) => {
                if self.is_enabled(ConfigGroup::Plugin) {
                    self.watch_leaf(ConfigGroup::Plugin, parent, &path);
                    self.dispatcher.upsert(ConfigGroup::Plugin, &path, &value, revision);
                }
                let fresh: Vec<_> = self
                    .plugin_namespaces(&name)
                    .into_iter()
                    .filter(|ns| self.registry.parent_role(&ns.parent).is_none())
                    .collect();
                if !fresh.is_empty() {
                    tracing::info!(plugin = %name, "Watching new plugin");
                    // inline so later events of this subtree cannot overtake the load
                    self.load(fresh).await;
                }
            }
            (ParentRole::PluginDirs(group), NodeChange::Put { .. }) => {
                let namespace = self.plugin_dir_namespace(group, &name);
                if self.registry.parent_role(&namespace.parent).is_none() {
                    tracing::info!(group = %group, plugin = %name, "Watching new plugin directory");
                    self.load(vec![namespace]).await;
                }
            }
            (ParentRole::Records(group), NodeChange::Put { path, value, revision }) => {
                self.watch_leaf(group, parent, &path);
                self.dispatcher.upsert(group, &path, &value, revision);
            }
            (ParentRole::Plugins, NodeChange::Delete { path, revision }) => {
                if self.is_enabled(ConfigGroup::Plugin) {
                    self.delete_leaf(ConfigGroup::Plugin, parent, &path, revision);
                }
            }
            (ParentRole::Records(group), NodeChange::Delete { path, revision }) => {
                self.delete_leaf(group, parent, &path, revision);
            }
            (ParentRole::PluginDirs(group), NodeChange::Delete { path, .. }) => {
                // records under the directory report their own deletes
                tracing::debug!(group = %group, path = %path, "Plugin directory removed");
            }
        }
    }

    fn on_data_change(&self, watched: &str, change: NodeChange) {
        let Some(leaf) = self.registry.leaf(watched) else {
            tracing::trace!(path = %watched, "Data event for unknown leaf");
            return;
        };
        if leaf.state != WatchState::Watching {
            tracing::trace!(path = %watched, state = ?leaf.state, "Data event for inactive leaf");
            return;
        }

        match change {
            NodeChange::Put { path, value, revision } => {
                self.dispatcher.upsert(leaf.group, &path, &value, revision);
            }
            NodeChange::Delete { path, revision } => {
                self.delete_leaf(leaf.group, &leaf.parent, &path, revision);
            }
        }
    }

    fn delete_leaf(&self, group: ConfigGroup, parent: &str, path: &str, revision: u64) {
        match self.dispatcher.delete(group, parent, path, revision) {
            // the node still exists, keep watching it
            DispatchOutcome::PathRejected | DispatchOutcome::Stale => {}
            _ => self.release_leaf(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    #[test]
    fn test_parse_groups() {
        let groups = parse_groups(&["plugin".to_string(), "APP_AUTH".to_string()]).unwrap();
        assert!(groups.contains(&ConfigGroup::Plugin));
        assert!(groups.contains(&ConfigGroup::AppAuth));

        let err = parse_groups(&["plugin".to_string(), "gadget".to_string()]).unwrap_err();
        assert!(matches!(err, SyncError::UnknownGroup(name) if name == "gadget"));
    }

    #[tokio::test]
    async fn test_start_rejects_unknown_group() {
        let config = SyncConfig {
            groups: vec!["gadget".into()],
            ..Default::default()
        };
        let result = SyncEngine::start(Arc::new(MemoryStore::new()), Subscribers::new(), &config).await;
        assert!(matches!(result, Err(SyncError::UnknownGroup(_))));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let config = SyncConfig {
            root: "shenyu".into(),
            ..Default::default()
        };
        let result = SyncEngine::start(Arc::new(MemoryStore::new()), Subscribers::new(), &config).await;
        assert!(matches!(result, Err(SyncError::Config(ConfigError::Validation(_)))));
    }

    #[tokio::test]
    async fn test_start_fails_on_closed_store() {
        let store = Arc::new(MemoryStore::new());
        store.close();
        let result = SyncEngine::start(store, Subscribers::new(), &SyncConfig::default()).await;
        assert!(matches!(result, Err(SyncError::Startup(StoreError::Closed))));
    }

    #[tokio::test]
    async fn test_record_lookup_by_identity() {
        let store = Arc::new(MemoryStore::new());
        store.put("/shenyu/auth/k1", r#"{"appKey":"k1","appSecret":"s"}"#).unwrap();

        let engine = SyncEngine::start(store, Subscribers::new(), &SyncConfig::default())
            .await
            .unwrap();
        let record = engine
            .record(&Identity::AppAuth { app_key: "k1".into() })
            .unwrap();
        assert!(matches!(record, Some(ConfigRecord::AppAuth(auth)) if auth.app_secret.as_deref() == Some("s")));

        let err = engine.record(&Identity::AppAuth { app_key: String::new() }).unwrap_err();
        assert!(matches!(err, SyncError::Path(_)));
        engine.close().await;
    }
}
