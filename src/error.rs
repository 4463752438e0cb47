//! Error type shared by every layer of the crate.
//!
//! Most operations in min-element are infallible by construction. The ones that
//! are not (tag registration, DOM lookups, typed mutations on observables, and
//! rendering) report through [`Error`] and propagate with `?` all the way back to
//! whoever triggered the work: an attribute write, a property write, a nested
//! mutation, or a connect.

use thiserror::Error;

use crate::dom::NodeId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by min-element.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A tag name was registered twice on the same document.
    #[error("custom element already defined: {0}")]
    AlreadyDefined(String),

    /// Custom element tag names must be lowercase, start with a letter and contain `-`.
    #[error("invalid custom element tag name: {0}")]
    InvalidTagName(String),

    /// A node id does not belong to the document it was used with.
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// The operation needs an element node (or shadow root) but got something else.
    #[error("node {0:?} cannot hold children")]
    NotAContainer(NodeId),

    /// The node cannot be inserted at the requested position (document root,
    /// shadow root, or an ancestor of the new parent).
    #[error("node {0:?} cannot be inserted here")]
    HierarchyRequest(NodeId),

    /// The element outlived the document that created it.
    #[error("element <{0}> is no longer attached to a document")]
    DocumentDropped(String),

    /// A typed mutation was attempted on a value of the wrong kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Kind the operation needs.
        expected: &'static str,
        /// Kind actually held.
        found: &'static str,
    },

    /// Array position outside of the current bounds.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested position.
        index: usize,
        /// Length at the time of the call.
        len: usize,
    },

    /// A component's `render()` failed.
    #[error("render of <{tag}> failed: {reason}")]
    Render {
        /// Tag of the element that failed to render.
        tag: String,
        /// Component supplied reason.
        reason: String,
    },

    /// `state_listener` / `state_dispatch` called on an element without a store.
    #[error("element <{0}> has no state store")]
    MissingStateStore(String),

    /// Dispatch of an action the store does not know.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

impl Error {
    /// Build a render failure. Components return this from `render()`; the
    /// pipeline fills in the tag when it is left empty.
    pub fn render(reason: impl Into<String>) -> Self {
        Error::Render {
            tag: String::new(),
            reason: reason.into(),
        }
    }
}
