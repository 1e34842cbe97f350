//! Metrics collection.
//!
//! # Metrics
//! - `config_sync_events_total` (counter): applied events by group, action
//! - `config_sync_decode_failures_total` (counter): dropped payloads by group
//! - `config_sync_subscriber_failures_total` (counter): failed deliveries by group
//! - `config_sync_path_errors_total` (counter): unparseable delete paths by group
//! - `config_sync_watches_active` (gauge): registered watches

use std::sync::atomic::{AtomicBool, Ordering};

use ::metrics::{counter, gauge};

use crate::taxonomy::ConfigGroup;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn emission on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record an event applied to the local view and fanned out.
pub fn record_event(group: ConfigGroup, action: &'static str) {
    if !is_enabled() {
        return;
    }
    counter!("config_sync_events_total", "group" => group.as_str(), "action" => action)
        .increment(1);
}

/// Record a payload that could not be decoded.
pub fn record_decode_failure(group: ConfigGroup) {
    if !is_enabled() {
        return;
    }
    counter!("config_sync_decode_failures_total", "group" => group.as_str()).increment(1);
}

/// Record a subscriber that returned an error or panicked.
pub fn record_subscriber_failure(group: ConfigGroup) {
    if !is_enabled() {
        return;
    }
    counter!("config_sync_subscriber_failures_total", "group" => group.as_str()).increment(1);
}

/// Record a delete notification whose path could not be parsed.
pub fn record_path_error(group: ConfigGroup) {
    if !is_enabled() {
        return;
    }
    counter!("config_sync_path_errors_total", "group" => group.as_str()).increment(1);
}

/// Set the number of active watches.
pub fn record_active_watches(count: usize) {
    if !is_enabled() {
        return;
    }
    gauge!("config_sync_watches_active").set(count as f64);
}
