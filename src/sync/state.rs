//! Shared engine state.
//!
//! Everything the snapshot loader and the event loop both need: the store
//! client, the taxonomy, the dispatcher, the watch registry and the sender
//! half of the event channel that every registered watch delivers into.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::store::{CoordinationStore, WatchEvent, WatchKind, WatchSink};
use crate::sync::dispatcher::Dispatcher;
use crate::sync::watch::{Namespace, ParentRole, WatchRegistry};
use crate::taxonomy::{ConfigGroup, PathTaxonomy};

pub(crate) struct SyncCore {
    pub(crate) store: Arc<dyn CoordinationStore>,
    pub(crate) taxonomy: PathTaxonomy,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) registry: WatchRegistry,
    groups: HashSet<ConfigGroup>,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl SyncCore {
    pub(crate) fn new(
        store: Arc<dyn CoordinationStore>,
        taxonomy: PathTaxonomy,
        dispatcher: Dispatcher,
        groups: HashSet<ConfigGroup>,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Self {
        Self {
            store,
            taxonomy,
            dispatcher,
            registry: WatchRegistry::new(),
            groups,
            events,
        }
    }

    pub(crate) fn sink(&self, watched: &str, kind: WatchKind) -> WatchSink {
        WatchSink::new(watched, kind, self.events.clone())
    }

    pub(crate) fn is_enabled(&self, group: ConfigGroup) -> bool {
        self.groups.contains(&group)
    }

    /// Top-level namespaces for the enabled groups, in startup order.
    pub(crate) fn roots(&self) -> Vec<Namespace> {
        let mut roots = Vec::new();
        if self.groups.iter().any(ConfigGroup::is_plugin_scoped) {
            roots.push(Namespace::new(self.taxonomy.plugin_parent(), ParentRole::Plugins));
        }
        if self.is_enabled(ConfigGroup::AppAuth) {
            roots.push(Namespace::new(
                self.taxonomy.auth_parent(),
                ParentRole::Records(ConfigGroup::AppAuth),
            ));
        }
        if self.is_enabled(ConfigGroup::MetaData) {
            roots.push(Namespace::new(
                self.taxonomy.meta_parent(),
                ParentRole::Records(ConfigGroup::MetaData),
            ));
        }
        if self.is_enabled(ConfigGroup::DiscoveryUpstream) {
            roots.push(Namespace::new(
                self.taxonomy.discovery_parent(),
                ParentRole::PluginDirs(ConfigGroup::DiscoveryUpstream),
            ));
        }
        if self.is_enabled(ConfigGroup::ProxySelector) {
            roots.push(Namespace::new(
                self.taxonomy.proxy_parent(),
                ParentRole::PluginDirs(ConfigGroup::ProxySelector),
            ));
        }
        roots
    }

    /// Selector and rule namespaces owned by a plugin.
    pub(crate) fn plugin_namespaces(&self, plugin_name: &str) -> Vec<Namespace> {
        let mut namespaces = Vec::with_capacity(2);
        if self.is_enabled(ConfigGroup::Selector) {
            namespaces.push(Namespace::new(
                self.taxonomy.selector_parent(plugin_name),
                ParentRole::Records(ConfigGroup::Selector),
            ));
        }
        if self.is_enabled(ConfigGroup::Rule) {
            namespaces.push(Namespace::new(
                self.taxonomy.rule_parent(plugin_name),
                ParentRole::Records(ConfigGroup::Rule),
            ));
        }
        namespaces
    }

    /// Record namespace of one plugin directory in a two-level group.
    pub(crate) fn plugin_dir_namespace(&self, group: ConfigGroup, plugin_name: &str) -> Namespace {
        let parent = match group {
            ConfigGroup::ProxySelector => self.taxonomy.proxy_plugin_parent(plugin_name),
            _ => self.taxonomy.discovery_plugin_parent(plugin_name),
        };
        Namespace::new(parent, ParentRole::Records(group))
    }

    /// Last segment of `path` if it is an immediate child of `parent`.
    pub(crate) fn child_name<'a>(&self, parent: &str, path: &'a str) -> Option<&'a str> {
        let name = path
            .strip_prefix(parent)?
            .strip_prefix(self.taxonomy.delimiter())?;
        (!name.is_empty() && !name.contains(self.taxonomy.delimiter())).then_some(name)
    }
}
