//! Element engine - definitions and the scope registry.
//!
//! The engine keeps the per-document bookkeeping that sits beside the node tree:
//! - Definitions: tag name → static descriptor of a custom element kind
//! - ScopeRegistry: index allocation for connected elements and the
//!   parent scope each one binds `data-*` attributes against
//!
//! # Architecture
//!
//! Connected elements are indices into the registry, and each index records its
//! nearest family ancestor at attach time:
//!
//! ```text
//! Index 0: <junk-food-list>   (parent=none)
//! Index 1: <grocery-list>     (parent=0)
//! Index 2: <grocery-list>     (parent=0)
//! ```

mod definitions;
mod registry;

pub use definitions::*;
pub use registry::*;
