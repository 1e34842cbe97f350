//! Namespace layout and identity recovery.
//!
//! # Responsibilities
//! - Build the store path for any record identity
//! - Recover identity fields from a bare path (deletes carry no payload)
//! - Reject paths that do not fit the layout instead of guessing
//!
//! # Layout
//! ```text
//! <root>/plugin/<pluginName>
//! <root>/plugin/<pluginName>/selector/<selectorId>
//! <root>/plugin/<pluginName>/rule/<selectorId><SEP><ruleId>
//! <root>/auth/<appKey>
//! <root>/metaData/<urlEncodedRequestPath>
//! <root>/discovery/<pluginName>/<selectorId>
//! <root>/proxy/<pluginName>/<selectorId>
//! ```

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::form_urlencoded;

use crate::taxonomy::group::ConfigGroup;

const PLUGIN_SEGMENT: &str = "plugin";
const SELECTOR_SEGMENT: &str = "selector";
const RULE_SEGMENT: &str = "rule";
const AUTH_SEGMENT: &str = "auth";
const META_SEGMENT: &str = "metaData";
const DISCOVERY_SEGMENT: &str = "discovery";
const PROXY_SEGMENT: &str = "proxy";

/// Identity of a record, as encoded in its store path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Plugin {
        name: String,
    },
    Selector {
        plugin_name: String,
        selector_id: String,
    },
    Rule {
        plugin_name: String,
        selector_id: String,
        rule_id: String,
    },
    AppAuth {
        app_key: String,
    },
    MetaData {
        path: String,
    },
    DiscoveryUpstream {
        plugin_name: String,
        selector_id: String,
    },
    ProxySelector {
        plugin_name: String,
        selector_id: String,
    },
}

impl Identity {
    pub fn group(&self) -> ConfigGroup {
        match self {
            Identity::Plugin { .. } => ConfigGroup::Plugin,
            Identity::Selector { .. } => ConfigGroup::Selector,
            Identity::Rule { .. } => ConfigGroup::Rule,
            Identity::AppAuth { .. } => ConfigGroup::AppAuth,
            Identity::MetaData { .. } => ConfigGroup::MetaData,
            Identity::DiscoveryUpstream { .. } => ConfigGroup::DiscoveryUpstream,
            Identity::ProxySelector { .. } => ConfigGroup::ProxySelector,
        }
    }
}

/// Errors raised while building or parsing store paths.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// An identity field or path segment is empty.
    #[error("empty segment in {0}")]
    EmptySegment(String),

    /// A segment contains the delimiter or the rule separator.
    #[error("segment '{segment}' contains reserved token '{token}'")]
    ReservedCharacter { segment: String, token: String },

    /// The path is not located under the expected parent.
    #[error("path '{path}' is not under '{parent}'")]
    NotUnderParent { path: String, parent: String },

    /// The notification targets the namespace parent itself.
    #[error("path '{0}' is a namespace parent, not a record node")]
    ParentItself(String),

    /// A fixed namespace segment does not match.
    #[error("expected segment '{expected}' but found '{found}' in {path}")]
    UnexpectedSegment {
        expected: String,
        found: String,
        path: String,
    },

    /// Wrong number of segments or composite parts.
    #[error("expected {expected} parts but found {found} in '{path}'")]
    SegmentCount {
        expected: usize,
        found: usize,
        path: String,
    },

    /// The segment is not valid url-encoded text.
    #[error("segment '{0}' is not url-decodable")]
    Undecodable(String),
}

/// Maps identities to store paths and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTaxonomy {
    root: String,
    delimiter: String,
    rule_separator: String,
}

impl Default for PathTaxonomy {
    fn default() -> Self {
        Self::new("/shenyu", "/", "-")
    }
}

impl PathTaxonomy {
    pub fn new(
        root: impl Into<String>,
        delimiter: impl Into<String>,
        rule_separator: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            delimiter: delimiter.into(),
            rule_separator: rule_separator.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn rule_separator(&self) -> &str {
        &self.rule_separator
    }

    /// Join a parent path and a child name.
    pub fn child_path(&self, parent: &str, child: &str) -> String {
        format!("{}{}{}", parent, self.delimiter, child)
    }

    pub fn plugin_parent(&self) -> String {
        self.child_path(&self.root, PLUGIN_SEGMENT)
    }

    pub fn selector_parent(&self, plugin_name: &str) -> String {
        let plugin = self.child_path(&self.plugin_parent(), plugin_name);
        self.child_path(&plugin, SELECTOR_SEGMENT)
    }

    pub fn rule_parent(&self, plugin_name: &str) -> String {
        let plugin = self.child_path(&self.plugin_parent(), plugin_name);
        self.child_path(&plugin, RULE_SEGMENT)
    }

    pub fn auth_parent(&self) -> String {
        self.child_path(&self.root, AUTH_SEGMENT)
    }

    pub fn meta_parent(&self) -> String {
        self.child_path(&self.root, META_SEGMENT)
    }

    pub fn discovery_parent(&self) -> String {
        self.child_path(&self.root, DISCOVERY_SEGMENT)
    }

    pub fn discovery_plugin_parent(&self, plugin_name: &str) -> String {
        self.child_path(&self.discovery_parent(), plugin_name)
    }

    pub fn proxy_parent(&self) -> String {
        self.child_path(&self.root, PROXY_SEGMENT)
    }

    pub fn proxy_plugin_parent(&self, plugin_name: &str) -> String {
        self.child_path(&self.proxy_parent(), plugin_name)
    }

    /// Namespace root that every path of `group` lives under.
    pub fn group_root(&self, group: ConfigGroup) -> String {
        match group {
            ConfigGroup::Plugin | ConfigGroup::Selector | ConfigGroup::Rule => self.plugin_parent(),
            ConfigGroup::AppAuth => self.auth_parent(),
            ConfigGroup::MetaData => self.meta_parent(),
            ConfigGroup::DiscoveryUpstream => self.discovery_parent(),
            ConfigGroup::ProxySelector => self.proxy_parent(),
        }
    }

    /// Encode a request path into a single namespace segment.
    pub fn encode_meta_path(path: &str) -> String {
        form_urlencoded::byte_serialize(path.as_bytes()).collect()
    }

    /// Decode a namespace segment produced by [`Self::encode_meta_path`].
    ///
    /// Escapes that do not decode to UTF-8 are rejected rather than replaced,
    /// so two segments never map to the same path.
    pub fn decode_meta_path(segment: &str) -> Result<String, PathError> {
        if segment.is_empty() {
            return Err(PathError::EmptySegment(segment.to_string()));
        }
        if segment.contains('&') || segment.contains('=') || !has_valid_escapes(segment) {
            return Err(PathError::Undecodable(segment.to_string()));
        }
        percent_decode_str(&segment.replace('+', " "))
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .map_err(|_| PathError::Undecodable(segment.to_string()))
    }

    /// Build the store path of a record.
    pub fn build(&self, identity: &Identity) -> Result<String, PathError> {
        match identity {
            Identity::Plugin { name } => {
                self.check_segment(name)?;
                Ok(self.child_path(&self.plugin_parent(), name))
            }
            Identity::Selector { plugin_name, selector_id } => {
                self.check_segment(plugin_name)?;
                self.check_segment(selector_id)?;
                Ok(self.child_path(&self.selector_parent(plugin_name), selector_id))
            }
            Identity::Rule { plugin_name, selector_id, rule_id } => {
                self.check_segment(plugin_name)?;
                self.check_rule_part(selector_id)?;
                self.check_rule_part(rule_id)?;
                let leaf = format!("{}{}{}", selector_id, self.rule_separator, rule_id);
                Ok(self.child_path(&self.rule_parent(plugin_name), &leaf))
            }
            Identity::AppAuth { app_key } => {
                self.check_segment(app_key)?;
                Ok(self.child_path(&self.auth_parent(), app_key))
            }
            Identity::MetaData { path } => {
                if path.is_empty() {
                    return Err(PathError::EmptySegment(self.meta_parent()));
                }
                let encoded = Self::encode_meta_path(path);
                self.check_segment(&encoded)?;
                Ok(self.child_path(&self.meta_parent(), &encoded))
            }
            Identity::DiscoveryUpstream { plugin_name, selector_id } => {
                self.check_segment(plugin_name)?;
                self.check_segment(selector_id)?;
                Ok(self.child_path(&self.discovery_plugin_parent(plugin_name), selector_id))
            }
            Identity::ProxySelector { plugin_name, selector_id } => {
                self.check_segment(plugin_name)?;
                self.check_segment(selector_id)?;
                Ok(self.child_path(&self.proxy_plugin_parent(plugin_name), selector_id))
            }
        }
    }

    /// Recover the identity of a node of `group` from its full path.
    pub fn parse(&self, group: ConfigGroup, full_path: &str) -> Result<Identity, PathError> {
        let group_root = self.group_root(group);
        let segments = self.relative_segments(&group_root, full_path)?;

        match group {
            ConfigGroup::Plugin => {
                let [name] = expect_segments::<1>(&segments, full_path)?;
                Ok(Identity::Plugin { name: name.to_string() })
            }
            ConfigGroup::Selector => {
                let [plugin_name, literal, selector_id] = expect_segments::<3>(&segments, full_path)?;
                expect_literal(SELECTOR_SEGMENT, literal, full_path)?;
                Ok(Identity::Selector {
                    plugin_name: plugin_name.to_string(),
                    selector_id: selector_id.to_string(),
                })
            }
            ConfigGroup::Rule => {
                let [plugin_name, literal, leaf] = expect_segments::<3>(&segments, full_path)?;
                expect_literal(RULE_SEGMENT, literal, full_path)?;
                let (selector_id, rule_id) = self.split_rule_leaf(leaf)?;
                Ok(Identity::Rule {
                    plugin_name: plugin_name.to_string(),
                    selector_id,
                    rule_id,
                })
            }
            ConfigGroup::AppAuth => {
                let [app_key] = expect_segments::<1>(&segments, full_path)?;
                Ok(Identity::AppAuth { app_key: app_key.to_string() })
            }
            ConfigGroup::MetaData => {
                let [encoded] = expect_segments::<1>(&segments, full_path)?;
                Ok(Identity::MetaData { path: Self::decode_meta_path(encoded)? })
            }
            ConfigGroup::DiscoveryUpstream => {
                let [plugin_name, selector_id] = expect_segments::<2>(&segments, full_path)?;
                Ok(Identity::DiscoveryUpstream {
                    plugin_name: plugin_name.to_string(),
                    selector_id: selector_id.to_string(),
                })
            }
            ConfigGroup::ProxySelector => {
                let [plugin_name, selector_id] = expect_segments::<2>(&segments, full_path)?;
                Ok(Identity::ProxySelector {
                    plugin_name: plugin_name.to_string(),
                    selector_id: selector_id.to_string(),
                })
            }
        }
    }

    /// Recover identity for a delete notification reported under `parent`.
    ///
    /// `parent` is the namespace node whose watch observed the removal. A
    /// notification for the parent itself is rejected.
    pub fn parse_for_delete(
        &self,
        group: ConfigGroup,
        parent: &str,
        full_path: &str,
    ) -> Result<Identity, PathError> {
        if full_path == parent {
            return Err(PathError::ParentItself(full_path.to_string()));
        }
        let prefix = format!("{}{}", parent, self.delimiter);
        if !full_path.starts_with(&prefix) {
            return Err(PathError::NotUnderParent {
                path: full_path.to_string(),
                parent: parent.to_string(),
            });
        }
        self.parse(group, full_path)
    }

    fn relative_segments<'a>(&self, parent: &str, full_path: &'a str) -> Result<Vec<&'a str>, PathError> {
        if full_path == parent {
            return Err(PathError::ParentItself(full_path.to_string()));
        }
        let remainder = full_path
            .strip_prefix(parent)
            .and_then(|rest| rest.strip_prefix(self.delimiter.as_str()))
            .ok_or_else(|| PathError::NotUnderParent {
                path: full_path.to_string(),
                parent: parent.to_string(),
            })?;

        let segments: Vec<&str> = remainder.split(self.delimiter.as_str()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment(full_path.to_string()));
        }
        Ok(segments)
    }

    fn split_rule_leaf(&self, leaf: &str) -> Result<(String, String), PathError> {
        let parts: Vec<&str> = leaf.split(self.rule_separator.as_str()).collect();
        match parts.as_slice() {
            [selector_id, rule_id] if !selector_id.is_empty() && !rule_id.is_empty() => {
                Ok((selector_id.to_string(), rule_id.to_string()))
            }
            [_, _] => Err(PathError::EmptySegment(leaf.to_string())),
            _ => Err(PathError::SegmentCount {
                expected: 2,
                found: parts.len(),
                path: leaf.to_string(),
            }),
        }
    }

    fn check_segment(&self, segment: &str) -> Result<(), PathError> {
        if segment.is_empty() {
            return Err(PathError::EmptySegment(segment.to_string()));
        }
        if segment.contains(self.delimiter.as_str()) {
            return Err(PathError::ReservedCharacter {
                segment: segment.to_string(),
                token: self.delimiter.clone(),
            });
        }
        Ok(())
    }

    fn check_rule_part(&self, part: &str) -> Result<(), PathError> {
        self.check_segment(part)?;
        if part.contains(self.rule_separator.as_str()) {
            return Err(PathError::ReservedCharacter {
                segment: part.to_string(),
                token: self.rule_separator.clone(),
            });
        }
        Ok(())
    }
}

fn expect_segments<'a, const N: usize>(
    segments: &[&'a str],
    full_path: &str,
) -> Result<[&'a str; N], PathError> {
    <[&str; N]>::try_from(segments).map_err(|_| PathError::SegmentCount {
        expected: N,
        found: segments.len(),
        path: full_path.to_string(),
    })
}

fn expect_literal(expected: &str, found: &str, full_path: &str) -> Result<(), PathError> {
    if expected == found {
        Ok(())
    } else {
        Err(PathError::UnexpectedSegment {
            expected: expected.to_string(),
            found: found.to_string(),
            path: full_path.to_string(),
        })
    }
}

// `%` must be followed by two hex digits.
fn has_valid_escapes(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
