//! Typed configuration records.
//!
//! Field names follow the camelCase JSON written by the admin side. Every
//! field is defaulted so that older or partial payloads still decode.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{ConfigGroup, Identity};

/// Plugin definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginData {
    pub id: Option<String>,
    pub name: String,
    pub config: Option<String>,
    pub role: Option<String>,
    pub enabled: bool,
    pub sort: Option<i32>,
    pub plugin_jar: Option<String>,
}

/// A single match condition of a selector or rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionData {
    pub param_type: Option<String>,
    pub operator: Option<String>,
    pub param_name: Option<String>,
    pub param_value: Option<String>,
}

/// Selector owned by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectorData {
    pub id: String,
    pub plugin_id: Option<String>,
    pub plugin_name: String,
    pub name: Option<String>,
    pub match_mode: Option<i32>,
    #[serde(rename = "type")]
    pub selector_type: Option<i32>,
    pub sort: Option<i32>,
    pub enabled: Option<bool>,
    pub logged: Option<bool>,
    pub continued: Option<bool>,
    pub handle: Option<String>,
    pub condition_list: Vec<ConditionData>,
    pub match_restful: Option<bool>,
}

/// Rule owned by a selector.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleData {
    pub id: String,
    pub name: Option<String>,
    pub plugin_name: String,
    pub selector_id: String,
    pub match_mode: Option<i32>,
    pub sort: Option<i32>,
    pub enabled: Option<bool>,
    pub loged: Option<bool>,
    pub handle: Option<String>,
    pub condition_data_list: Vec<ConditionData>,
    pub match_restful: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthParamData {
    pub app_name: Option<String>,
    pub app_param: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthPathData {
    pub app_name: Option<String>,
    pub path: Option<String>,
    pub enabled: Option<bool>,
}

/// Application credentials.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppAuthData {
    pub app_key: String,
    pub app_secret: Option<String>,
    pub enabled: Option<bool>,
    pub open: Option<bool>,
    pub param_data_list: Vec<AuthParamData>,
    pub path_data_list: Vec<AuthPathData>,
}

/// Service metadata keyed by request path.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetaData {
    pub id: Option<String>,
    pub app_name: Option<String>,
    pub context_path: Option<String>,
    pub path: String,
    pub rpc_type: Option<String>,
    pub service_name: Option<String>,
    pub method_name: Option<String>,
    pub parameter_types: Option<String>,
    pub rpc_ext: Option<String>,
    pub enabled: Option<bool>,
}

/// One discovered upstream endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoveryUpstreamData {
    pub id: Option<String>,
    pub discovery_handler_id: Option<String>,
    pub protocol: Option<String>,
    pub url: Option<String>,
    pub status: Option<i32>,
    pub weight: Option<i32>,
    pub props: Option<String>,
}

/// Discovered upstreams for one selector.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoverySyncData {
    pub plugin_name: String,
    pub selector_id: String,
    pub selector_name: Option<String>,
    pub upstream_data_list: Vec<DiscoveryUpstreamData>,
}

/// Proxy target bound to a selector.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxySelectorData {
    pub id: String,
    pub name: Option<String>,
    pub plugin_name: String,
    #[serde(rename = "type")]
    pub proxy_type: Option<String>,
    pub forward_port: Option<u16>,
    pub props: Option<serde_json::Value>,
}

/// A decoded record of any group.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigRecord {
    Plugin(PluginData),
    Selector(SelectorData),
    Rule(RuleData),
    AppAuth(AppAuthData),
    MetaData(MetaData),
    DiscoveryUpstream(DiscoverySyncData),
    ProxySelector(ProxySelectorData),
}

impl ConfigRecord {
    pub fn group(&self) -> ConfigGroup {
        match self {
            ConfigRecord::Plugin(_) => ConfigGroup::Plugin,
            ConfigRecord::Selector(_) => ConfigGroup::Selector,
            ConfigRecord::Rule(_) => ConfigGroup::Rule,
            ConfigRecord::AppAuth(_) => ConfigGroup::AppAuth,
            ConfigRecord::MetaData(_) => ConfigGroup::MetaData,
            ConfigRecord::DiscoveryUpstream(_) => ConfigGroup::DiscoveryUpstream,
            ConfigRecord::ProxySelector(_) => ConfigGroup::ProxySelector,
        }
    }

    /// Minimal record carrying only the identity fields, used for deletes.
    pub fn tombstone(identity: Identity) -> Self {
        match identity {
            Identity::Plugin { name } => ConfigRecord::Plugin(PluginData {
                name,
                ..Default::default()
            }),
            Identity::Selector { plugin_name, selector_id } => ConfigRecord::Selector(SelectorData {
                id: selector_id,
                plugin_name,
                ..Default::default()
            }),
            Identity::Rule { plugin_name, selector_id, rule_id } => ConfigRecord::Rule(RuleData {
                id: rule_id,
                plugin_name,
                selector_id,
                ..Default::default()
            }),
            Identity::AppAuth { app_key } => ConfigRecord::AppAuth(AppAuthData {
                app_key,
                ..Default::default()
            }),
            Identity::MetaData { path } => ConfigRecord::MetaData(MetaData {
                path,
                ..Default::default()
            }),
            Identity::DiscoveryUpstream { plugin_name, selector_id } => {
                ConfigRecord::DiscoveryUpstream(DiscoverySyncData {
                    plugin_name,
                    selector_id,
                    ..Default::default()
                })
            }
            Identity::ProxySelector { plugin_name, selector_id } => {
                ConfigRecord::ProxySelector(ProxySelectorData {
                    id: selector_id,
                    plugin_name,
                    ..Default::default()
                })
            }
        }
    }
}
