//! Path taxonomy subsystem.
//!
//! # Data Flow
//! ```text
//! (group, identity)
//!     → path.rs build()          → "/shenyu/plugin/divide/rule/SEL1-RULE1"
//!
//! (group, parent, full path)     (delete notification, no payload)
//!     → path.rs parse_for_delete() → Identity
//! ```
//!
//! # Design Decisions
//! - One module owns every namespace string; nothing else slices paths
//! - build() and parse() are exact inverses
//! - Composite segments fail loudly instead of being guessed

pub mod group;
pub mod path;

pub use group::{ConfigGroup, UnknownGroup};
pub use path::{Identity, PathError, PathTaxonomy};
