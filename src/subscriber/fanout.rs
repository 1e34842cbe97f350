//! Event delivery to subscribers.
//!
//! # Responsibilities
//! - Route each record to the subscribers of its group
//! - Contain subscriber errors and panics so siblings still get the event

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::observability::metrics;
use crate::records::ConfigRecord;
use crate::subscriber::{DataSubscriber, SubscriberResult, Subscribers};
use crate::taxonomy::ConfigGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Subscribe,
    Unsubscribe,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Subscribe => "subscribe",
            Action::Unsubscribe => "unsubscribe",
        }
    }
}

/// Delivers records to registered subscribers.
#[derive(Debug, Clone, Default)]
pub struct Fanout {
    subscribers: Subscribers,
}

impl Fanout {
    pub fn new(subscribers: Subscribers) -> Self {
        Self { subscribers }
    }

    /// Deliver an upsert. Returns how many subscribers accepted it.
    pub fn on_subscribe(&self, record: &ConfigRecord) -> usize {
        self.deliver(record, Action::Subscribe)
    }

    /// Deliver a delete. Returns how many subscribers accepted it.
    pub fn un_subscribe(&self, record: &ConfigRecord) -> usize {
        self.deliver(record, Action::Unsubscribe)
    }

    fn deliver(&self, record: &ConfigRecord, action: Action) -> usize {
        let group = record.group();
        match record {
            ConfigRecord::Plugin(data) => self.deliver_plugin(group, action, |s| match action {
                Action::Subscribe => s.on_subscribe(data),
                Action::Unsubscribe => s.un_subscribe(data),
            }),
            ConfigRecord::Selector(data) => self.deliver_plugin(group, action, |s| match action {
                Action::Subscribe => s.on_selector_subscribe(data),
                Action::Unsubscribe => s.un_selector_subscribe(data),
            }),
            ConfigRecord::Rule(data) => self.deliver_plugin(group, action, |s| match action {
                Action::Subscribe => s.on_rule_subscribe(data),
                Action::Unsubscribe => s.un_rule_subscribe(data),
            }),
            ConfigRecord::AppAuth(data) => broadcast(group, action, &self.subscribers.auth, data),
            ConfigRecord::MetaData(data) => broadcast(group, action, &self.subscribers.meta, data),
            ConfigRecord::DiscoveryUpstream(data) => {
                broadcast(group, action, &self.subscribers.discovery_upstream, data)
            }
            ConfigRecord::ProxySelector(data) => {
                broadcast(group, action, &self.subscribers.proxy_selector, data)
            }
        }
    }

    fn deliver_plugin<F>(&self, group: ConfigGroup, action: Action, call: F) -> usize
    where
        F: FnOnce(&dyn crate::subscriber::PluginDataSubscriber) -> SubscriberResult,
    {
        match &self.subscribers.plugin {
            Some(subscriber) => usize::from(guarded(group, action, 0, || call(subscriber.as_ref()))),
            None => {
                tracing::trace!(group = %group, "No plugin data subscriber registered");
                0
            }
        }
    }
}

fn broadcast<T>(
    group: ConfigGroup,
    action: Action,
    subscribers: &[Arc<dyn DataSubscriber<T>>],
    data: &T,
) -> usize {
    let mut delivered = 0;
    for (index, subscriber) in subscribers.iter().enumerate() {
        let ok = guarded(group, action, index, || match action {
            Action::Subscribe => subscriber.on_subscribe(data),
            Action::Unsubscribe => subscriber.un_subscribe(data),
        });
        if ok {
            delivered += 1;
        }
    }
    delivered
}

fn guarded<F>(group: ConfigGroup, action: Action, index: usize, call: F) -> bool
where
    F: FnOnce() -> SubscriberResult,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(
                group = %group,
                action = action.as_str(),
                subscriber = index,
                error = %e,
                "Subscriber rejected event"
            );
            metrics::record_subscriber_failure(group);
            false
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(
                group = %group,
                action = action.as_str(),
                subscriber = index,
                panic = %reason,
                "Subscriber panicked while handling event"
            );
            metrics::record_subscriber_failure(group);
            false
        }
    }
}
