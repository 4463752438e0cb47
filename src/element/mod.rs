//! Element - the reactive custom element base.
//!
//! An [`Element`] is the instance behind a node whose tag was defined with
//! [`Document::define`]. Its behavior is split by concern:
//! - [`sync`]: property storage and attribute → property mirroring
//! - [`binder`]: parent-scope resolution and `data-*` binding
//! - [`render`]: the render pipeline (stylesheet, sanitize, write, rebind)
//! - [`lifecycle`]: connect / disconnect and the state-store passthrough
//! - [`listeners`]: selector-based DOM listeners re-bound after each render
//!
//! # Lifecycle
//!
//! ```text
//! Unattached ──connect──▶ Attaching ──first render──▶ Connected
//!                              ▲                          │
//!                              └──────connect──── Detached ◀──disconnect
//! ```
//!
//! Renders only happen in `Connected`. Property writes in every other state
//! just store the value.

mod binder;
mod lifecycle;
mod listeners;
mod render;
mod sync;

use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::dom::{Document, DocumentInner, NodeId};
use crate::error::{Error, Result};
use crate::reactive::Observable;
use crate::state::{ListenerId, StateStore};
use crate::types::{ElementFlags, Value};

pub use crate::engine::{Component, CustomElement, ElementDefinition};
pub use render::template_map;

use listeners::EventListenerRegistry;

/// Where an element is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, never connected.
    Unattached,
    /// Connected, observed properties being installed; no renders yet.
    Attaching,
    /// Initialized; every observed change renders.
    Connected,
    /// Removed after having been connected. Inert until connected again.
    Detached,
}

pub(crate) struct ElementInner {
    node: NodeId,
    document: Weak<DocumentInner>,
    definition: Rc<ElementDefinition>,
    component: Rc<dyn Component>,
    component_any: Rc<dyn Any>,
    store: Option<Rc<dyn StateStore>>,
    flags: Cell<ElementFlags>,
    scope_index: Cell<Option<usize>>,
    render_count: Cell<usize>,
    /// Observed properties, each wrapped so nested mutations render.
    reactive: RefCell<IndexMap<String, Observable>>,
    /// Every other property.
    plain: RefCell<IndexMap<String, Value>>,
    state_listeners: RefCell<Vec<ListenerId>>,
    /// Cached once an ancestor scope has been found.
    parent_scope: RefCell<Option<WeakElement>>,
    css_block: OnceCell<String>,
    listeners: RefCell<EventListenerRegistry>,
}

/// Handle to a custom element instance. Clones share the instance.
#[derive(Clone)]
pub struct Element(pub(crate) Rc<ElementInner>);

/// Non-owning [`Element`] handle.
#[derive(Clone)]
pub struct WeakElement(Weak<ElementInner>);

impl WeakElement {
    pub fn upgrade(&self) -> Option<Element> {
        self.0.upgrade().map(Element)
    }
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakElement")
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag_name())
            .field("node", &self.0.node)
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}

impl Element {
    pub(crate) fn new(
        document: Weak<DocumentInner>,
        node: NodeId,
        definition: Rc<ElementDefinition>,
        store: Option<Rc<dyn StateStore>>,
    ) -> Self {
        let (component, component_any) = definition.instantiate();
        let plain = component
            .defaults()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        Element(Rc::new(ElementInner {
            node,
            document,
            definition,
            component,
            component_any,
            store,
            flags: Cell::new(ElementFlags::NONE),
            scope_index: Cell::new(None),
            render_count: Cell::new(0),
            reactive: RefCell::new(IndexMap::new()),
            plain: RefCell::new(plain),
            state_listeners: RefCell::new(Vec::new()),
            parent_scope: RefCell::new(None),
            css_block: OnceCell::new(),
            listeners: RefCell::new(EventListenerRegistry::new()),
        }))
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn node(&self) -> NodeId {
        self.0.node
    }

    pub fn tag_name(&self) -> &'static str {
        self.0.definition.tag_name
    }

    pub fn definition(&self) -> &ElementDefinition {
        &self.0.definition
    }

    /// The owning document. Fails once the document has been dropped.
    pub fn document(&self) -> Result<Document> {
        self.0
            .document
            .upgrade()
            .map(Document::from_inner)
            .ok_or_else(|| Error::DocumentDropped(self.tag_name().to_string()))
    }

    /// The concrete component, when it is a `T`.
    pub fn component<T: Component>(&self) -> Option<Rc<T>> {
        self.0.component_any.clone().downcast::<T>().ok()
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn flags(&self) -> ElementFlags {
        self.0.flags.get()
    }

    pub(crate) fn insert_flags(&self, flags: ElementFlags) {
        self.0.flags.set(self.0.flags.get() | flags);
    }

    pub(crate) fn remove_flags(&self, flags: ElementFlags) {
        self.0.flags.set(self.0.flags.get() - flags);
    }

    pub fn is_connected(&self) -> bool {
        self.flags().contains(ElementFlags::CONNECTED)
    }

    pub fn is_initialized(&self) -> bool {
        self.flags().contains(ElementFlags::INITIALIZED)
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        let flags = self.flags();
        if flags.contains(ElementFlags::INITIALIZED) {
            LifecycleState::Connected
        } else if flags.contains(ElementFlags::CONNECTED) {
            LifecycleState::Attaching
        } else if flags.contains(ElementFlags::DETACHED) {
            LifecycleState::Detached
        } else {
            LifecycleState::Unattached
        }
    }

    /// Scope index while connected.
    pub fn scope_index(&self) -> Option<usize> {
        self.0.scope_index.get()
    }

    /// Number of times `render()` has been invoked on the component.
    pub fn render_count(&self) -> usize {
        self.0.render_count.get()
    }

    // =========================================================================
    // DOM Shortcuts
    // =========================================================================

    /// Markup of the element's light-DOM children.
    pub fn inner_html(&self) -> Result<String> {
        Ok(self.document()?.inner_html(self.0.node))
    }

    pub fn shadow_root(&self) -> Result<Option<NodeId>> {
        Ok(self.document()?.shadow_root(self.0.node))
    }

    pub fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.document()?.get_attribute(self.0.node, name))
    }

    /// Set an attribute on the element's node (observed ones mirror into properties).
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.document()?.set_attribute(self.0.node, name, value)
    }

    pub fn remove_attribute(&self, name: &str) -> Result<()> {
        self.document()?.remove_attribute(self.0.node, name)
    }
}
