//! Closed set of configuration groups.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kinds of configuration synchronized from the coordination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigGroup {
    Plugin,
    Selector,
    Rule,
    AppAuth,
    MetaData,
    DiscoveryUpstream,
    ProxySelector,
}

/// A group name that is not part of [`ConfigGroup`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown config group: {0}")]
pub struct UnknownGroup(pub String);

impl ConfigGroup {
    /// Every group, in snapshot loading order.
    pub const ALL: [ConfigGroup; 7] = [
        ConfigGroup::Plugin,
        ConfigGroup::Selector,
        ConfigGroup::Rule,
        ConfigGroup::AppAuth,
        ConfigGroup::MetaData,
        ConfigGroup::DiscoveryUpstream,
        ConfigGroup::ProxySelector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigGroup::Plugin => "plugin",
            ConfigGroup::Selector => "selector",
            ConfigGroup::Rule => "rule",
            ConfigGroup::AppAuth => "app_auth",
            ConfigGroup::MetaData => "meta_data",
            ConfigGroup::DiscoveryUpstream => "discovery_upstream",
            ConfigGroup::ProxySelector => "proxy_selector",
        }
    }

    /// Groups that live under the plugin namespace and share one subscriber.
    pub fn is_plugin_scoped(&self) -> bool {
        matches!(self, ConfigGroup::Plugin | ConfigGroup::Selector | ConfigGroup::Rule)
    }
}

impl fmt::Display for ConfigGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigGroup {
    type Err = UnknownGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let group = match normalized.as_str() {
            "plugin" => ConfigGroup::Plugin,
            "selector" => ConfigGroup::Selector,
            "rule" => ConfigGroup::Rule,
            "app_auth" | "auth" => ConfigGroup::AppAuth,
            "meta_data" | "metadata" => ConfigGroup::MetaData,
            "discovery_upstream" | "discover_upstream" => ConfigGroup::DiscoveryUpstream,
            "proxy_selector" => ConfigGroup::ProxySelector,
            _ => return Err(UnknownGroup(s.to_string())),
        };
        Ok(group)
    }
}
