//! Group-aware record decoding.

use serde::de::DeserializeOwned;

use crate::observability::metrics;
use crate::records::types::{
    AppAuthData, ConfigRecord, DiscoverySyncData, MetaData, PluginData, ProxySelectorData,
    RuleData, SelectorData,
};
use crate::taxonomy::ConfigGroup;

/// Decodes raw node values into typed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl RecordCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode `bytes` as a record of `group`.
    ///
    /// Empty, `null` and malformed payloads return `None`; the failure is
    /// logged and counted here and never reaches the caller as an error.
    pub fn decode(&self, group: ConfigGroup, bytes: &[u8]) -> Option<ConfigRecord> {
        let record = match group {
            ConfigGroup::Plugin => decode_as::<PluginData>(group, bytes).map(ConfigRecord::Plugin),
            ConfigGroup::Selector => decode_as::<SelectorData>(group, bytes).map(ConfigRecord::Selector),
            ConfigGroup::Rule => decode_as::<RuleData>(group, bytes).map(ConfigRecord::Rule),
            ConfigGroup::AppAuth => decode_as::<AppAuthData>(group, bytes).map(ConfigRecord::AppAuth),
            ConfigGroup::MetaData => decode_as::<MetaData>(group, bytes).map(ConfigRecord::MetaData),
            ConfigGroup::DiscoveryUpstream => {
                decode_as::<DiscoverySyncData>(group, bytes).map(ConfigRecord::DiscoveryUpstream)
            }
            ConfigGroup::ProxySelector => {
                decode_as::<ProxySelectorData>(group, bytes).map(ConfigRecord::ProxySelector)
            }
        };
        if record.is_none() {
            metrics::record_decode_failure(group);
        }
        record
    }
}

fn decode_as<T: DeserializeOwned>(group: ConfigGroup, bytes: &[u8]) -> Option<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        tracing::debug!(group = %group, "Empty payload, nothing to apply");
        return None;
    }
    match serde_json::from_slice::<Option<T>>(bytes) {
        Ok(Some(record)) => Some(record),
        Ok(None) => {
            tracing::debug!(group = %group, "Null payload, nothing to apply");
            None
        }
        Err(e) => {
            tracing::warn!(group = %group, error = %e, "Failed to decode record payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_selector() {
        let codec = RecordCodec::new();
        let bytes = br#"{"id":"abc123","pluginName":"rewrite","name":"default"}"#;
        match codec.decode(ConfigGroup::Selector, bytes) {
            Some(ConfigRecord::Selector(selector)) => {
                assert_eq!(selector.id, "abc123");
                assert_eq!(selector.plugin_name, "rewrite");
                assert_eq!(selector.name.as_deref(), Some("default"));
            }
            other => panic!("unexpected decode result {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_null_payloads() {
        let codec = RecordCodec::new();
        assert!(codec.decode(ConfigGroup::Plugin, b"").is_none());
        assert!(codec.decode(ConfigGroup::Plugin, b"  \n").is_none());
        assert!(codec.decode(ConfigGroup::Plugin, b"null").is_none());
    }

    #[test]
    fn test_malformed_payload() {
        let codec = RecordCodec::new();
        assert!(codec.decode(ConfigGroup::Rule, b"{\"id\":").is_none());
        assert!(codec.decode(ConfigGroup::AppAuth, b"[1,2,3]").is_none());
        assert!(codec.decode(ConfigGroup::MetaData, &[0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_decode_keeps_group() {
        let codec = RecordCodec::new();
        let record = codec
            .decode(ConfigGroup::DiscoveryUpstream, br#"{"pluginName":"divide","selectorId":"1"}"#)
            .unwrap();
        assert_eq!(record.group(), ConfigGroup::DiscoveryUpstream);
    }
}
