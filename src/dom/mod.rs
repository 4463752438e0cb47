//! Host environment - a small in-memory document model.
//!
//! - [`Document`]: node arena, attributes, shadow roots, lifecycle propagation
//! - [`parser`] / [`serialize`]: lenient fragment parsing and markup output
//! - [`sanitize`]: the filter every render passes through
//! - [`Selector`]: simple selectors for queries and listener binding
//! - [`events`]: per-node handlers with bubbling dispatch

mod document;
pub mod events;
mod node;
pub mod parser;
pub mod sanitize;
mod selector;
pub mod serialize;

pub(crate) use document::DocumentInner;
pub use document::Document;
pub use events::{Event, EventHandler, HandlerId};
pub use node::NodeId;
pub use sanitize::{sanitize, SanitizeOptions};
pub use selector::Selector;
