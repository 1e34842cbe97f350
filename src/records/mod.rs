//! Configuration records subsystem.
//!
//! # Data Flow
//! ```text
//! raw node bytes
//!     → codec.rs (group-specific JSON decode)
//!     → ConfigRecord (typed, owned)
//!     → dispatcher / subscribers
//! ```
//!
//! # Design Decisions
//! - Decoding never fails loudly: a bad node yields no record
//! - Deletes use tombstones built from the path identity, never a payload

pub mod codec;
pub mod types;

pub use codec::RecordCodec;
pub use types::{
    AppAuthData, AuthParamData, AuthPathData, ConditionData, ConfigRecord, DiscoverySyncData,
    DiscoveryUpstreamData, MetaData, PluginData, ProxySelectorData, RuleData, SelectorData,
};
