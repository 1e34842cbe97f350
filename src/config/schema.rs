//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every field
//! has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{ConfigGroup, PathTaxonomy};

/// Root configuration of the sync engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Namespace root every group lives under (e.g., "/shenyu").
    pub root: String,

    /// Path segment delimiter of the store.
    pub delimiter: String,

    /// Token joining selector id and rule id in a rule leaf.
    pub rule_separator: String,

    /// Groups to synchronize, by name.
    pub groups: Vec<String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: "/shenyu".to_string(),
            delimiter: "/".to_string(),
            rule_separator: "-".to_string(),
            groups: ConfigGroup::ALL.iter().map(|g| g.as_str().to_string()).collect(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn taxonomy(&self) -> PathTaxonomy {
        PathTaxonomy::new(
            self.root.clone(),
            self.delimiter.clone(),
            self.rule_separator.clone(),
        )
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            root = "/gateway"
            groups = ["plugin", "selector"]

            [observability]
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.root, "/gateway");
        assert_eq!(config.delimiter, "/");
        assert_eq!(config.rule_separator, "-");
        assert_eq!(config.groups, vec!["plugin".to_string(), "selector".to_string()]);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.taxonomy().plugin_parent(), "/gateway/plugin");
    }

    #[test]
    fn test_default_syncs_every_group() {
        let config = SyncConfig::default();
        assert_eq!(config.groups.len(), ConfigGroup::ALL.len());
    }
}
