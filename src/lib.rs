//! # min-element
//!
//! Minimal reactive custom-element base.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for the
//! reactive collections it exposes to deriveds and effects.
//!
//! ## Architecture
//!
//! Element kinds are declared statically ([`CustomElement`]) and registered on a
//! [`Document`]. Each instance keeps its observed properties wrapped in an
//! [`Observable`], so any change, however deeply nested, re-renders the element:
//!
//! ```text
//! attribute write ─┐
//! property write ──┼─▶ do_render: data props → stylesheet + render() → sanitize
//! nested mutation ─┘             → write into target → re-bind listeners → on_render
//! ```
//!
//! Children bind `data-*` attributes to properties of their nearest family
//! ancestor, resolved through the document's scope registry.
//!
//! ## Modules
//!
//! - [`types`] - Property values, lifecycle flags, name conversion
//! - [`reactive`] - Deep change notification
//! - [`engine`] - Definitions and the scope registry
//! - [`dom`] - The host document: nodes, markup, sanitizer, events
//! - [`element`] - The element base: sync, binding, render, lifecycle
//! - [`state`] - Application store

pub mod dom;
pub mod element;
pub mod engine;
pub mod error;
pub mod reactive;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};

pub use reactive::{wrap, ChangeCallback, Observable};

pub use engine::{
    validate_tag_name, Component, CustomElement, DefinitionRegistry, ElementDefinition,
    ScopeRegistry, ELEMENT_FAMILY,
};

pub use dom::{
    sanitize, Document, Event, EventHandler, HandlerId, NodeId, SanitizeOptions, Selector,
};

pub use element::{template_map, Element, LifecycleState, WeakElement};

pub use state::{AppState, ListenerId, StateCallback, StateStore};
