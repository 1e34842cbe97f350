//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the namespace layout can be built and parsed unambiguously
//! - Check every configured group name is known
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: SyncConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::SyncConfig;
use crate::taxonomy::ConfigGroup;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("delimiter must not be empty")]
    EmptyDelimiter,

    #[error("root {root:?} must start with the delimiter {delimiter:?}")]
    RootNotAbsolute { root: String, delimiter: String },

    #[error("root {root:?} must not end with the delimiter {delimiter:?}")]
    RootTrailingDelimiter { root: String, delimiter: String },

    #[error("rule separator must not be empty")]
    EmptyRuleSeparator,

    #[error("rule separator {0:?} must differ from the delimiter")]
    SeparatorIsDelimiter(String),

    #[error("no groups configured")]
    NoGroups,

    #[error("unknown config group: {0}")]
    UnknownGroup(String),

    #[error("group {0} listed more than once")]
    DuplicateGroup(String),

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.delimiter.is_empty() {
        errors.push(ValidationError::EmptyDelimiter);
    } else {
        if !config.root.starts_with(&config.delimiter) {
            errors.push(ValidationError::RootNotAbsolute {
                root: config.root.clone(),
                delimiter: config.delimiter.clone(),
            });
        }
        if config.root.len() > config.delimiter.len() && config.root.ends_with(&config.delimiter) {
            errors.push(ValidationError::RootTrailingDelimiter {
                root: config.root.clone(),
                delimiter: config.delimiter.clone(),
            });
        }
    }

    if config.rule_separator.is_empty() {
        errors.push(ValidationError::EmptyRuleSeparator);
    } else if config.rule_separator == config.delimiter {
        errors.push(ValidationError::SeparatorIsDelimiter(config.rule_separator.clone()));
    }

    if config.groups.is_empty() {
        errors.push(ValidationError::NoGroups);
    }
    let mut seen = HashSet::new();
    for name in &config.groups {
        match name.parse::<ConfigGroup>() {
            Ok(group) => {
                if !seen.insert(group) {
                    errors.push(ValidationError::DuplicateGroup(group.as_str().to_string()));
                }
            }
            Err(_) => errors.push(ValidationError::UnknownGroup(name.clone())),
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SyncConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = SyncConfig {
            root: "shenyu/".to_string(),
            rule_separator: "/".to_string(),
            groups: vec!["plugin".into(), "plugins".into(), "PLUGIN".into()],
            ..Default::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::RootNotAbsolute {
                    root: "shenyu/".into(),
                    delimiter: "/".into()
                },
                ValidationError::RootTrailingDelimiter {
                    root: "shenyu/".into(),
                    delimiter: "/".into()
                },
                ValidationError::SeparatorIsDelimiter("/".into()),
                ValidationError::UnknownGroup("plugins".into()),
                ValidationError::DuplicateGroup("plugin".into()),
            ]
        );
    }

    #[test]
    fn test_rejects_empty_groups_and_bad_level() {
        let mut config = SyncConfig::default();
        config.groups.clear();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::NoGroups));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
    }
}
