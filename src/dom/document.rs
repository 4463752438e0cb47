//! Document - the host environment elements live in.
//!
//! A node arena with a `<body>`, attribute storage, shadow roots, markup
//! parsing/serialization and event dispatch. It drives the element lifecycle:
//! - creating a node with a defined tag upgrades it to an [`Element`]
//! - attribute writes on observed attributes reach `attribute_changed_callback`
//! - inserting under the connected tree connects elements (tree order)
//! - removing a connected subtree disconnects them
//!
//! Internal borrows are always released before element callbacks run, so
//! callbacks may call back into the document freely.
//!
//! # Example
//!
//! ```ignore
//! let doc = Document::new();
//! doc.define::<GroceryList>()?;
//!
//! let node = doc.create_element("grocery-list")?;
//! doc.append_child(doc.body(), node)?;
//! doc.set_attribute(node, "store-name", "Kroger")?;
//!
//! let el = doc.element(node).unwrap();
//! assert_eq!(el.get("storeName"), Value::from("Kroger"));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace};

use super::events::{Event, EventHandler, HandlerId, HandlerRegistry};
use super::node::{ElementData, Node, NodeId, NodeKind};
use super::parser::{parse_fragment, ParsedNode};
use super::selector::Selector;
use super::serialize::{escape_text, is_raw_text_container, write_comment, write_end_tag, write_start_tag};
use crate::element::Element;
use crate::engine::{CustomElement, DefinitionRegistry, ElementDefinition, ScopeRegistry};
use crate::error::{Error, Result};
use crate::state::StateStore;
use crate::types::{dataset_key, Value};

// =============================================================================
// Node Tree
// =============================================================================

struct Tree {
    nodes: Vec<Node>,
    /// Upgraded custom elements by node.
    elements: HashMap<NodeId, Element>,
    root: NodeId,
    body: NodeId,
}

impl Tree {
    fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            elements: HashMap::new(),
            root: NodeId(0),
            body: NodeId(0),
        };
        let root = tree.add(NodeKind::Document);
        let body = tree.add(NodeKind::Element(ElementData::new("body".into(), Vec::new())));
        tree.nodes[body.0].parent = Some(root);
        tree.nodes[root.0].children.push(body);
        tree.root = root;
        tree.body = body;
        tree
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id))
    }

    fn element_data(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id.0).and_then(Node::element)
    }

    /// Parent, or the host when `id` is a shadow root.
    fn parent_or_host(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id.0)?;
        match node.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => node.parent,
        }
    }

    fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent_or_host(node);
        }
        false
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent_or_host(node);
        }
        false
    }

    /// Upgraded elements in the subtree of `id` (inclusive), in tree order,
    /// descending into shadow trees.
    fn elements_in(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.get(node_id.0) else { continue };
            if self.elements.contains_key(&node_id) {
                found.push(node_id);
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
            if let Some(shadow) = node.shadow_root {
                stack.push(shadow);
            }
        }
        found
    }

    /// Element descendants of `id` (exclusive), in tree order, not crossing
    /// into shadow trees.
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(id.0) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return found,
        };
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.get(node_id.0) else { continue };
            if node.element().is_some() {
                found.push(node_id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Materialize `parsed` under `parent`, collecting defined tags to upgrade.
    fn build(
        &mut self,
        parsed: ParsedNode,
        parent: NodeId,
        definitions: &DefinitionRegistry,
        upgrades: &mut Vec<(NodeId, String)>,
    ) -> NodeId {
        let (kind, children) = match parsed {
            ParsedNode::Element { tag, attrs, children } => {
                (NodeKind::Element(ElementData::new(tag, attrs)), children)
            }
            ParsedNode::Text(text) => (NodeKind::Text(text), Vec::new()),
            ParsedNode::Comment(body) => (NodeKind::Comment(body), Vec::new()),
        };
        let id = self.add(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);

        if let Some(tag) = self.element_data(id).map(|data| data.tag.clone()) {
            if definitions.is_defined(&tag) {
                upgrades.push((id, tag));
            }
        }
        for child in children {
            self.build(child, id, definitions, upgrades);
        }
        id
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else { return };
        let raw = node.element().is_some_and(|data| is_raw_text_container(&data.tag));
        for &child in &node.children {
            self.write_node(child, raw, out);
        }
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else { return };
        match &node.kind {
            NodeKind::Element(data) => {
                write_start_tag(&data.tag, &data.attrs, out);
                self.write_children(id, out);
                write_end_tag(&data.tag, out);
            }
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => escape_text(text, out),
            NodeKind::Comment(body) => write_comment(body, out),
            NodeKind::Document | NodeKind::ShadowRoot { .. } => self.write_children(id, out),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            _ => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
        }
    }
}

// =============================================================================
// Document
// =============================================================================

pub(crate) struct DocumentInner {
    tree: RefCell<Tree>,
    definitions: RefCell<DefinitionRegistry>,
    scopes: RefCell<ScopeRegistry>,
    handlers: RefCell<HandlerRegistry>,
    store: Option<Rc<dyn StateStore>>,
}

/// Handle to a document. Clones share the same tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.tree.borrow().nodes.len())
            .field("defined", &self.inner.definitions.borrow().tags())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A document whose elements share `store` for
    /// [`state_listener`](Element::state_listener) / [`state_dispatch`](Element::state_dispatch).
    pub fn with_store(store: Rc<dyn StateStore>) -> Self {
        Self::build(Some(store))
    }

    fn build(store: Option<Rc<dyn StateStore>>) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                tree: RefCell::new(Tree::new()),
                definitions: RefCell::new(DefinitionRegistry::new()),
                scopes: RefCell::new(ScopeRegistry::new()),
                handlers: RefCell::new(HandlerRegistry::new()),
                store,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<DocumentInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<DocumentInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn store(&self) -> Option<Rc<dyn StateStore>> {
        self.inner.store.clone()
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Register a custom element kind. Nodes created afterwards with its tag
    /// (directly or through markup) are upgraded.
    pub fn define<T: CustomElement>(&self) -> Result<()> {
        let definition = self
            .inner
            .definitions
            .borrow_mut()
            .define(ElementDefinition::of::<T>())?;
        debug!(tag = definition.tag_name, "defined custom element");
        Ok(())
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.inner.definitions.borrow().is_defined(tag)
    }

    pub fn definition(&self, tag: &str) -> Option<Rc<ElementDefinition>> {
        self.inner.definitions.borrow().get(tag)
    }

    // =========================================================================
    // Node Creation
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.inner.tree.borrow().root
    }

    pub fn body(&self) -> NodeId {
        self.inner.tree.borrow().body
    }

    /// Create a detached element. Defined tags are upgraded immediately.
    pub fn create_element(&self, tag: &str) -> Result<NodeId> {
        let tag = tag.to_ascii_lowercase();
        let node = self
            .inner
            .tree
            .borrow_mut()
            .add(NodeKind::Element(ElementData::new(tag.clone(), Vec::new())));
        self.upgrade(node, &tag)?;
        Ok(node)
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner.tree.borrow_mut().add(NodeKind::Text(text.to_string()))
    }

    /// Build the instance for a defined tag and replay its observed attributes.
    fn upgrade(&self, node: NodeId, tag: &str) -> Result<()> {
        let Some(definition) = self.definition(tag) else {
            return Ok(());
        };
        let element = Element::new(self.downgrade(), node, definition.clone(), self.inner.store.clone());
        let attrs = {
            let mut tree = self.inner.tree.borrow_mut();
            tree.elements.insert(node, element.clone());
            tree.element_data(node).map(|data| data.attrs.clone()).unwrap_or_default()
        };
        trace!(tag, node = node.0, "upgraded element");

        for (name, value) in attrs {
            if definition.observes(&name) {
                element.attribute_changed_callback(&name, None, Some(&value))?;
            }
        }
        Ok(())
    }

    /// The element instance for `node`, if its tag is defined.
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.inner.tree.borrow().elements.get(&node).cloned()
    }

    // =========================================================================
    // Tree Mutation
    // =========================================================================

    /// Append `child` to `parent`, moving it if it already has a parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        {
            let tree = self.inner.tree.borrow();
            if !tree.node(parent)?.is_container() {
                return Err(Error::NotAContainer(parent));
            }
            let movable = !matches!(tree.node(child)?.kind, NodeKind::Document | NodeKind::ShadowRoot { .. });
            if !movable || tree.is_inclusive_ancestor(child, parent) {
                return Err(Error::HierarchyRequest(child));
            }
        }

        self.detach(child)?;
        {
            let mut tree = self.inner.tree.borrow_mut();
            tree.node_mut(child)?.parent = Some(parent);
            tree.node_mut(parent)?.children.push(child);
        }

        if self.is_connected(parent) {
            self.connect_subtree(child)?;
        }
        Ok(())
    }

    /// Remove `child` from `parent`. Fails when `child` is not a child of `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.inner.tree.borrow().node(child)?.parent != Some(parent) {
            return Err(Error::HierarchyRequest(child));
        }
        self.detach(child)
    }

    /// Detach `node` from its parent. Detached nodes are left as they are.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        self.detach(node)
    }

    fn detach(&self, node: NodeId) -> Result<()> {
        let was_connected = self.is_connected(node);
        {
            let mut tree = self.inner.tree.borrow_mut();
            let Some(parent) = tree.node(node)?.parent else {
                return Ok(());
            };
            tree.node_mut(parent)?.children.retain(|&c| c != node);
            tree.node_mut(node)?.parent = None;
        }
        if was_connected {
            self.disconnect_subtree(node);
        }
        Ok(())
    }

    /// Replace the children of `target` with the parsed `html`.
    pub fn set_inner_html(&self, target: NodeId, html: &str) -> Result<()> {
        let fragment = parse_fragment(html);
        let (removed, added, upgrades) = {
            let mut tree = self.inner.tree.borrow_mut();
            if !tree.node(target)?.is_container() {
                return Err(Error::NotAContainer(target));
            }
            let removed = std::mem::take(&mut tree.node_mut(target)?.children);
            for &child in &removed {
                tree.node_mut(child)?.parent = None;
            }

            let definitions = self.inner.definitions.borrow();
            let mut upgrades = Vec::new();
            let added: Vec<NodeId> = fragment
                .into_iter()
                .map(|parsed| tree.build(parsed, target, &definitions, &mut upgrades))
                .collect();
            (removed, added, upgrades)
        };

        let mut first_error = None;
        for (node, tag) in upgrades {
            keep_first(&mut first_error, self.upgrade(node, &tag));
        }
        if self.is_connected(target) {
            for node in removed {
                self.disconnect_subtree(node);
            }
            for node in added {
                keep_first(&mut first_error, self.connect_subtree(node));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // =========================================================================
    // Lifecycle Propagation
    // =========================================================================

    /// Connect every element under `root`. A failing element does not stop the
    /// rest; the first error is returned once all have been connected.
    fn connect_subtree(&self, root: NodeId) -> Result<()> {
        let candidates = self.inner.tree.borrow().elements_in(root);
        let mut first_error = None;
        for node in candidates {
            let Some(element) = self.element(node) else { continue };
            // Already connected by an earlier render, or detached by one
            if element.is_connected() || !self.is_connected(node) {
                continue;
            }
            let parent = self.nearest_family_scope(node);
            let index = self.inner.scopes.borrow_mut().allocate(node, &element, parent);
            trace!(tag = element.tag_name(), index, ?parent, "allocated scope");
            if let Err(err) = element.connected_callback(index) {
                error!(%err, tag = element.tag_name(), "connect failed");
                keep_first(&mut first_error, Err(err));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn disconnect_subtree(&self, root: NodeId) {
        let candidates = self.inner.tree.borrow().elements_in(root);
        for node in candidates {
            let Some(element) = self.element(node) else { continue };
            if !element.is_connected() {
                continue;
            }
            self.inner.scopes.borrow_mut().release_node(node);
            element.disconnected_callback();
        }
    }

    /// Scope index of the nearest connected family ancestor of `node`.
    fn nearest_family_scope(&self, node: NodeId) -> Option<usize> {
        let tree = self.inner.tree.borrow();
        let scopes = self.inner.scopes.borrow();
        let mut current = tree.parent_or_host(node);
        while let Some(ancestor) = current {
            let family = tree
                .elements
                .get(&ancestor)
                .is_some_and(|el| el.definition().is_family());
            if family {
                if let Some(index) = scopes.index_of(ancestor) {
                    return Some(index);
                }
            }
            current = tree.parent_or_host(ancestor);
        }
        None
    }

    /// Element recorded as the parent scope of scope `index`.
    pub(crate) fn scope_parent(&self, index: usize) -> Option<Element> {
        let scopes = self.inner.scopes.borrow();
        scopes.parent_of(index).and_then(|parent| scopes.element_at(parent))
    }

    /// Number of connected elements.
    pub fn connected_count(&self) -> usize {
        self.inner.scopes.borrow().allocated_count()
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Set an attribute. Observed attributes of upgraded elements reach
    /// `attribute_changed_callback`, connected or not.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let data = tree.node_mut(node)?.element_mut().ok_or(Error::NotAContainer(node))?;
            data.set_attr(&name, value)
        };
        self.notify_attribute(node, &name, old.as_deref(), Some(value))
    }

    /// Remove an attribute. Observed attributes see a `None` new value.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let data = tree.node_mut(node)?.element_mut().ok_or(Error::NotAContainer(node))?;
            data.remove_attr(&name)
        };
        match old {
            Some(old) => self.notify_attribute(node, &name, Some(&old), None),
            None => Ok(()),
        }
    }

    fn notify_attribute(&self, node: NodeId, name: &str, old: Option<&str>, new: Option<&str>) -> Result<()> {
        match self.element(node) {
            Some(element) if element.definition().observes(name) => {
                element.attribute_changed_callback(name, old, new)
            }
            _ => Ok(()),
        }
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.inner.tree.borrow();
        tree.element_data(node)?
            .attr(&name.to_ascii_lowercase())
            .map(str::to_string)
    }

    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.inner
            .tree
            .borrow()
            .element_data(node)
            .map(|data| data.attrs.clone())
            .unwrap_or_default()
    }

    /// `data-*` attributes as `(camelCaseKey, value)` pairs, in attribute order.
    pub fn dataset(&self, node: NodeId) -> Vec<(String, String)> {
        self.attributes(node)
            .into_iter()
            .filter_map(|(name, value)| dataset_key(&name).map(|key| (key, value)))
            .collect()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .element_data(node)
            .map(|data| data.tag.clone())
    }

    // =========================================================================
    // Shadow Roots
    // =========================================================================

    /// Attach a shadow root to `host`, or return the one it already has.
    pub fn attach_shadow(&self, host: NodeId) -> Result<NodeId> {
        let mut tree = self.inner.tree.borrow_mut();
        let node = tree.node(host)?;
        if node.element().is_none() {
            return Err(Error::NotAContainer(host));
        }
        if let Some(shadow) = node.shadow_root {
            return Ok(shadow);
        }
        let shadow = tree.add(NodeKind::ShadowRoot { host });
        tree.node_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().nodes.get(host.0)?.shadow_root
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .tree
            .borrow()
            .nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().nodes.get(node.0)?.children.first().copied()
    }

    /// Whether `node` is reachable from the document root (through shadow hosts).
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().is_connected(node)
    }

    /// Element descendants of `root` matching `selector`, in tree order.
    /// Shadow trees are not searched; query the shadow root itself for those.
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        self.select(root, &Selector::parse(selector))
    }

    pub fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        self.query_selector_all(root, selector).into_iter().next()
    }

    pub(crate) fn select(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.descendants(root)
            .into_iter()
            .filter(|&id| {
                tree.element_data(id)
                    .is_some_and(|data| selector.matches(&data.tag, &data.attrs))
            })
            .collect()
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Markup of the children of `node`. Shadow content is not included.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.tree.borrow().write_children(node, &mut out);
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.tree.borrow().write_node(node, false, &mut out);
        out
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.tree.borrow().collect_text(node, &mut out);
        out
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn add_event_listener(&self, node: NodeId, event_type: &str, handler: EventHandler) -> HandlerId {
        self.inner.handlers.borrow_mut().add(node, event_type, handler)
    }

    pub fn remove_event_listener(&self, id: HandlerId) -> bool {
        self.inner.handlers.borrow_mut().remove(id)
    }

    /// Drop every handler registered directly on `node`.
    pub fn cleanup_listeners(&self, node: NodeId) {
        self.inner.handlers.borrow_mut().cleanup_node(node);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.handlers.borrow().count()
    }

    /// Dispatch an event at `target`, bubbling through ancestors and shadow
    /// hosts. Returns true if a handler consumed it. Handler errors are logged
    /// and do not stop propagation.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str, detail: impl Into<Value>) -> Result<bool> {
        let path = {
            let tree = self.inner.tree.borrow();
            tree.node(target)?;
            let mut path = vec![target];
            let mut current = tree.parent_or_host(target);
            while let Some(node) = current {
                path.push(node);
                current = tree.parent_or_host(node);
            }
            path
        };

        let detail = detail.into();
        for current_target in path {
            let handlers = self.inner.handlers.borrow().handlers_for(current_target, event_type);
            if handlers.is_empty() {
                continue;
            }
            let event = Event {
                event_type: event_type.to_string(),
                target,
                current_target,
                detail: detail.clone(),
            };
            for handler in handlers {
                match handler(&event) {
                    Ok(true) => return Ok(true),
                    Ok(false) => {}
                    Err(err) => error!(%err, event_type, "event handler failed"),
                }
            }
        }
        Ok(false)
    }
}

/// Record the error of `result` unless an earlier one is already held.
fn keep_first(slot: &mut Option<Error>, result: Result<()>) {
    if let Err(err) = result {
        slot.get_or_insert(err);
    }
}

// =============================================================================
// Tests
// =============================================================================
