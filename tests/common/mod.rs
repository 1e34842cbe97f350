//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use config_sync::records::{
    AppAuthData, ConfigRecord, DiscoverySyncData, MetaData, PluginData, ProxySelectorData, RuleData,
    SelectorData,
};
use config_sync::subscriber::{DataSubscriber, PluginDataSubscriber, SubscriberError, SubscriberResult, Subscribers};
use config_sync::MemoryStore;

/// One subscriber invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub record: ConfigRecord,
}

/// Records every call it receives, for every group.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &'static str, record: ConfigRecord) -> SubscriberResult {
        self.calls.lock().unwrap().push(Call { method, record });
        Ok(())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.method == method).count()
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Most recent record delivered through `method`.
    pub fn last(&self, method: &str) -> Option<ConfigRecord> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.method == method)
            .map(|c| c.record.clone())
    }

    /// Register this recorder for every group.
    pub fn subscribe_all(self: &Arc<Self>) -> Subscribers {
        Subscribers::new()
            .with_plugin(self.clone())
            .with_auth(self.clone())
            .with_meta(self.clone())
            .with_proxy_selector(self.clone())
            .with_discovery_upstream(self.clone())
    }
}

impl PluginDataSubscriber for Recorder {
    fn on_subscribe(&self, plugin: &PluginData) -> SubscriberResult {
        self.push("on_plugin", ConfigRecord::Plugin(plugin.clone()))
    }

    fn un_subscribe(&self, plugin: &PluginData) -> SubscriberResult {
        self.push("un_plugin", ConfigRecord::Plugin(plugin.clone()))
    }

    fn on_selector_subscribe(&self, selector: &SelectorData) -> SubscriberResult {
        self.push("on_selector", ConfigRecord::Selector(selector.clone()))
    }

    fn un_selector_subscribe(&self, selector: &SelectorData) -> SubscriberResult {
        self.push("un_selector", ConfigRecord::Selector(selector.clone()))
    }

    fn on_rule_subscribe(&self, rule: &RuleData) -> SubscriberResult {
        self.push("on_rule", ConfigRecord::Rule(rule.clone()))
    }

    fn un_rule_subscribe(&self, rule: &RuleData) -> SubscriberResult {
        self.push("un_rule", ConfigRecord::Rule(rule.clone()))
    }
}

impl DataSubscriber<AppAuthData> for Recorder {
    fn on_subscribe(&self, data: &AppAuthData) -> SubscriberResult {
        self.push("on_auth", ConfigRecord::AppAuth(data.clone()))
    }

    fn un_subscribe(&self, data: &AppAuthData) -> SubscriberResult {
        self.push("un_auth", ConfigRecord::AppAuth(data.clone()))
    }
}

impl DataSubscriber<MetaData> for Recorder {
    fn on_subscribe(&self, data: &MetaData) -> SubscriberResult {
        self.push("on_meta", ConfigRecord::MetaData(data.clone()))
    }

    fn un_subscribe(&self, data: &MetaData) -> SubscriberResult {
        self.push("un_meta", ConfigRecord::MetaData(data.clone()))
    }
}

impl DataSubscriber<ProxySelectorData> for Recorder {
    fn on_subscribe(&self, data: &ProxySelectorData) -> SubscriberResult {
        self.push("on_proxy", ConfigRecord::ProxySelector(data.clone()))
    }

    fn un_subscribe(&self, data: &ProxySelectorData) -> SubscriberResult {
        self.push("un_proxy", ConfigRecord::ProxySelector(data.clone()))
    }
}

impl DataSubscriber<DiscoverySyncData> for Recorder {
    fn on_subscribe(&self, data: &DiscoverySyncData) -> SubscriberResult {
        self.push("on_discovery", ConfigRecord::DiscoveryUpstream(data.clone()))
    }

    fn un_subscribe(&self, data: &DiscoverySyncData) -> SubscriberResult {
        self.push("un_discovery", ConfigRecord::DiscoveryUpstream(data.clone()))
    }
}

/// Auth subscriber that fails (or panics) on every call, counting attempts.
#[derive(Debug, Default)]
pub struct FailingAuth {
    pub attempts: AtomicUsize,
    pub panics: bool,
}

impl FailingAuth {
    pub fn erroring() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            panics: true,
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> SubscriberResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("auth subscriber blew up");
        }
        Err(SubscriberError::new("auth cache unavailable"))
    }
}

impl DataSubscriber<AppAuthData> for FailingAuth {
    fn on_subscribe(&self, _data: &AppAuthData) -> SubscriberResult {
        self.fail()
    }

    fn un_subscribe(&self, _data: &AppAuthData) -> SubscriberResult {
        self.fail()
    }
}

/// A memory store holding `nodes` (path, JSON payload).
pub fn seeded_store(nodes: &[(&str, &str)]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (path, value) in nodes {
        store.put(path, *value).unwrap();
    }
    store
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Run `fut` with a default test deadline.
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("test step timed out")
}

pub const WAIT: Duration = Duration::from_secs(2);
