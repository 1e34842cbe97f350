//! Subscriber contracts for gateway-runtime consumers.
//!
//! # Data Flow
//! ```text
//! dispatcher
//!     → fanout.rs
//!         PLUGIN / SELECTOR / RULE → single PluginDataSubscriber
//!         APP_AUTH, META_DATA,
//!         DISCOVERY_UPSTREAM,
//!         PROXY_SELECTOR            → every registered DataSubscriber<T>
//! ```
//!
//! # Design Decisions
//! - Subscribers receive shared references to engine-owned records
//! - A subscriber reports failure through `SubscriberError`; panics are
//!   contained the same way

pub mod fanout;

use std::sync::Arc;
use thiserror::Error;

use crate::records::{
    AppAuthData, DiscoverySyncData, MetaData, PluginData, ProxySelectorData, RuleData, SelectorData,
};

pub use fanout::Fanout;

/// Failure reported by a subscriber while handling an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("subscriber failed: {0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub type SubscriberResult = Result<(), SubscriberError>;

/// Consumer of plugin, selector and rule changes.
///
/// All methods default to no-ops so consumers implement what they need.
pub trait PluginDataSubscriber: Send + Sync {
    fn on_subscribe(&self, _plugin: &PluginData) -> SubscriberResult {
        Ok(())
    }

    fn un_subscribe(&self, _plugin: &PluginData) -> SubscriberResult {
        Ok(())
    }

    fn on_selector_subscribe(&self, _selector: &SelectorData) -> SubscriberResult {
        Ok(())
    }

    fn un_selector_subscribe(&self, _selector: &SelectorData) -> SubscriberResult {
        Ok(())
    }

    fn on_rule_subscribe(&self, _rule: &RuleData) -> SubscriberResult {
        Ok(())
    }

    fn un_rule_subscribe(&self, _rule: &RuleData) -> SubscriberResult {
        Ok(())
    }
}

/// Consumer of one list-registered group.
pub trait DataSubscriber<T>: Send + Sync {
    fn on_subscribe(&self, data: &T) -> SubscriberResult;

    fn un_subscribe(&self, data: &T) -> SubscriberResult;
}

pub type AuthDataSubscriber = dyn DataSubscriber<AppAuthData>;
pub type MetaDataSubscriber = dyn DataSubscriber<MetaData>;
pub type ProxySelectorDataSubscriber = dyn DataSubscriber<ProxySelectorData>;
pub type DiscoveryUpstreamDataSubscriber = dyn DataSubscriber<DiscoverySyncData>;

/// Every consumer registered with the engine.
#[derive(Clone, Default)]
pub struct Subscribers {
    pub plugin: Option<Arc<dyn PluginDataSubscriber>>,
    pub auth: Vec<Arc<AuthDataSubscriber>>,
    pub meta: Vec<Arc<MetaDataSubscriber>>,
    pub proxy_selector: Vec<Arc<ProxySelectorDataSubscriber>>,
    pub discovery_upstream: Vec<Arc<DiscoveryUpstreamDataSubscriber>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, subscriber: Arc<dyn PluginDataSubscriber>) -> Self {
        self.plugin = Some(subscriber);
        self
    }

    pub fn with_auth(mut self, subscriber: Arc<AuthDataSubscriber>) -> Self {
        self.auth.push(subscriber);
        self
    }

    pub fn with_meta(mut self, subscriber: Arc<MetaDataSubscriber>) -> Self {
        self.meta.push(subscriber);
        self
    }

    pub fn with_proxy_selector(mut self, subscriber: Arc<ProxySelectorDataSubscriber>) -> Self {
        self.proxy_selector.push(subscriber);
        self
    }

    pub fn with_discovery_upstream(mut self, subscriber: Arc<DiscoveryUpstreamDataSubscriber>) -> Self {
        self.discovery_upstream.push(subscriber);
        self
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("plugin", &self.plugin.is_some())
            .field("auth", &self.auth.len())
            .field("meta", &self.meta.len())
            .field("proxy_selector", &self.proxy_selector.len())
            .field("discovery_upstream", &self.discovery_upstream.len())
            .finish()
    }
}
