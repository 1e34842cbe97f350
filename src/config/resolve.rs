//! Field overrides.
//!
//! A configuration field resolves to an override from an external key/value
//! source when one is present, else to its default. Defaults may embed
//! `{key}` or `{key:fallback}` placeholders that are expanded from the same
//! source.
//!
//! # Example
//! ```text
//! default  "{ZK_ROOT:/shenyu}"   source {}                → "/shenyu"
//! default  "{ZK_ROOT:/shenyu}"   source {ZK_ROOT: "/gw"}  → "/gw"
//! field    "root"                source {root: "/x"}      → "/x"
//! ```

use std::collections::HashMap;

use crate::config::schema::SyncConfig;

/// External key/value source consulted at resolution time.
pub trait OverrideSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads `PREFIX_KEY` environment variables.
///
/// Keys are upper-cased and `.` becomes `_`, so `observability.log_level`
/// with prefix `CONFIG_SYNC` reads `CONFIG_SYNC_OBSERVABILITY_LOG_LEVEL`.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    prefix: String,
}

impl EnvOverrides {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn var_name(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_ascii_uppercase();
        if self.prefix.is_empty() {
            key
        } else {
            format!("{}_{}", self.prefix, key)
        }
    }
}

impl OverrideSource for EnvOverrides {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// In-memory source, mostly for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct MapOverrides {
    values: HashMap<String, String>,
}

impl MapOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl OverrideSource for MapOverrides {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Resolve one field against an override source.
pub fn resolve(field: &str, default: &str, source: &dyn OverrideSource) -> String {
    match source.lookup(field) {
        Some(value) if !value.is_empty() => value,
        _ => expand_placeholders(default, source),
    }
}

/// Replace each `{key}` / `{key:fallback}` in `template`.
///
/// A missing key without a fallback expands to the empty string. An
/// unterminated `{` is kept literally.
pub fn expand_placeholders(template: &str, source: &dyn OverrideSource) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let placeholder = &after[..close];
        let (key, fallback) = match placeholder.split_once(':') {
            Some((key, fallback)) => (key, fallback),
            None => (placeholder, ""),
        };
        match source.lookup(key) {
            Some(value) if !value.is_empty() => out.push_str(&value),
            _ => out.push_str(fallback),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

impl SyncConfig {
    /// Apply `source` to every scalar field, and to `groups` as a
    /// comma-separated list.
    pub fn with_overrides(mut self, source: &dyn OverrideSource) -> Self {
        self.root = resolve("root", &self.root, source);
        self.delimiter = resolve("delimiter", &self.delimiter, source);
        self.rule_separator = resolve("rule_separator", &self.rule_separator, source);
        self.observability.log_level =
            resolve("observability.log_level", &self.observability.log_level, source);

        let metrics_enabled = resolve(
            "observability.metrics_enabled",
            &self.observability.metrics_enabled.to_string(),
            source,
        );
        match metrics_enabled.parse::<bool>() {
            Ok(enabled) => self.observability.metrics_enabled = enabled,
            Err(_) => tracing::warn!(value = %metrics_enabled, "Ignoring non-boolean metrics_enabled override"),
        }

        if let Some(groups) = source.lookup("groups").filter(|v| !v.trim().is_empty()) {
            self.groups = groups
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
        }
        self
    }
}
