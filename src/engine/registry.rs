//! Scope Registry - Index allocation for connected elements.
//!
//! Every connected custom element gets a scope index. The registry keeps:
//! - NodeId ↔ index bidirectional mapping
//! - Free index pool for O(1) reuse
//! - ReactiveSet of allocated indices (deriveds react to connect/disconnect)
//! - The parent scope of each index: the nearest family ancestor that was
//!   connected when the element attached
//!
//! Parent-scope lookup for data binding is a map read here instead of a DOM walk.

use std::collections::HashMap;
use spark_signals::ReactiveSet;

use crate::dom::NodeId;
use crate::element::{Element, WeakElement};

// =============================================================================
// Registry State
// =============================================================================

/// Index allocator and parent map for connected elements. One per document.
pub struct ScopeRegistry {
    /// Map node to scope index.
    node_to_index: HashMap<NodeId, usize>,

    /// Map scope index to node.
    index_to_node: HashMap<usize, NodeId>,

    /// Child index → parent scope index.
    parents: HashMap<usize, usize>,

    /// Element handle per index. Weak: the document tree owns elements.
    elements: HashMap<usize, WeakElement>,

    /// Set of currently allocated indices.
    allocated: ReactiveSet<usize>,

    /// Pool of freed indices for reuse.
    free: Vec<usize>,

    /// Next index to allocate if pool is empty.
    next: usize,
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self {
            node_to_index: HashMap::new(),
            index_to_node: HashMap::new(),
            parents: HashMap::new(),
            elements: HashMap::new(),
            allocated: ReactiveSet::new(),
            free: Vec::new(),
            next: 0,
        }
    }

    // =========================================================================
    // Index Allocation
    // =========================================================================

    /// Allocate an index for `node`, recording `parent` as its scope.
    ///
    /// Allocating a node that already has an index returns that index.
    pub fn allocate(&mut self, node: NodeId, element: &Element, parent: Option<usize>) -> usize {
        if let Some(&index) = self.node_to_index.get(&node) {
            return index;
        }

        // Reuse free index or allocate new
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.next;
                self.next += 1;
                index
            }
        };

        self.node_to_index.insert(node, index);
        self.index_to_node.insert(index, node);
        self.elements.insert(index, element.downgrade());
        if let Some(parent) = parent {
            self.parents.insert(index, parent);
        }
        self.allocated.insert(index);

        index
    }

    /// Release an index back to the pool.
    ///
    /// Children scoped under it are released first (recursive).
    pub fn release(&mut self, index: usize) {
        if !self.index_to_node.contains_key(&index) {
            return;
        }

        let children = self.children_of(index);
        for child in children {
            self.release(child);
        }

        if let Some(node) = self.index_to_node.remove(&index) {
            self.node_to_index.remove(&node);
        }
        self.parents.remove(&index);
        self.elements.remove(&index);
        self.allocated.remove(&index);
        self.free.push(index);

        // Nothing left: start numbering from zero again
        if self.allocated.is_empty() {
            self.free.clear();
            self.next = 0;
        }
    }

    /// Release whatever index `node` holds. No-op for unallocated nodes.
    pub fn release_node(&mut self, node: NodeId) {
        if let Some(&index) = self.node_to_index.get(&node) {
            self.release(index);
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Index held by `node`.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.node_to_index.get(&node).copied()
    }

    /// Node holding `index`.
    pub fn node_of(&self, index: usize) -> Option<NodeId> {
        self.index_to_node.get(&index).copied()
    }

    /// Parent scope index of `index`.
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.parents.get(&index).copied()
    }

    /// Element at `index`, if it is still alive.
    pub fn element_at(&self, index: usize) -> Option<Element> {
        self.elements.get(&index).and_then(WeakElement::upgrade)
    }

    /// Indices whose parent scope is `index`, ascending.
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        let mut children: Vec<usize> = self
            .allocated
            .iter()
            .copied()
            .filter(|child| self.parents.get(child) == Some(&index))
            .collect();
        children.sort_unstable();
        children
    }

    /// All allocated indices, ascending.
    ///
    /// Note: This creates a reactive dependency when called from a derived/effect.
    pub fn allocated_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.allocated.iter().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn is_allocated(&self, index: usize) -> bool {
        self.allocated.contains(&index)
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    /// Highest index that would be allocated next when the pool is empty.
    pub fn capacity(&self) -> usize {
        self.next
    }

    // =========================================================================
    // Reset (for testing)
    // =========================================================================

    pub fn reset(&mut self) {
        self.node_to_index.clear();
        self.index_to_node.clear();
        self.parents.clear();
        self.elements.clear();
        self.allocated.clear();
        self.free.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::element::{Component, CustomElement};
    use crate::error::Result;

    #[derive(Default)]
    struct Probe;

    impl Component for Probe {
        fn render(&self, _el: &Element) -> Result<String> {
            Ok(String::new())
        }
    }

    impl CustomElement for Probe {
        const TAG_NAME: &'static str = "scope-probe";
    }

    fn detached_elements(count: usize) -> (Document, Vec<(NodeId, Element)>) {
        let doc = Document::new();
        doc.define::<Probe>().unwrap();
        let elements = (0..count)
            .map(|_| {
                let node = doc.create_element("scope-probe").unwrap();
                (node, doc.element(node).unwrap())
            })
            .collect();
        (doc, elements)
    }

    #[test]
    fn test_allocate_index() {
        let (_doc, els) = detached_elements(3);
        let mut registry = ScopeRegistry::new();

        let idx1 = registry.allocate(els[0].0, &els[0].1, None);
        let idx2 = registry.allocate(els[1].0, &els[1].1, Some(idx1));
        let idx3 = registry.allocate(els[2].0, &els[2].1, Some(idx1));

        assert_eq!((idx1, idx2, idx3), (0, 1, 2));
        assert!(registry.is_allocated(2));
        assert!(!registry.is_allocated(3));
        assert_eq!(registry.allocated_count(), 3);

        // Same node, same index
        assert_eq!(registry.allocate(els[0].0, &els[0].1, None), idx1);
        assert_eq!(registry.allocated_count(), 3);
    }

    #[test]
    fn test_release_and_reuse() {
        let (_doc, els) = detached_elements(3);
        let mut registry = ScopeRegistry::new();

        let idx1 = registry.allocate(els[0].0, &els[0].1, None);
        let idx2 = registry.allocate(els[1].0, &els[1].1, None);

        registry.release(idx1);
        assert!(!registry.is_allocated(idx1));
        assert!(registry.is_allocated(idx2));
        assert_eq!(registry.index_of(els[0].0), None);

        // Should reuse the freed index
        let idx3 = registry.allocate(els[2].0, &els[2].1, None);
        assert_eq!(idx3, idx1);
    }

    #[test]
    fn test_parent_lookup() {
        let (_doc, els) = detached_elements(2);
        let mut registry = ScopeRegistry::new();

        let parent = registry.allocate(els[0].0, &els[0].1, None);
        let child = registry.allocate(els[1].0, &els[1].1, Some(parent));

        assert_eq!(registry.parent_of(child), Some(parent));
        assert_eq!(registry.parent_of(parent), None);
        assert!(registry.element_at(parent).unwrap().ptr_eq(&els[0].1));
        assert_eq!(registry.children_of(parent), vec![child]);
        assert_eq!(registry.node_of(child), Some(els[1].0));
    }

    #[test]
    fn test_index_listings_are_sorted() {
        let (_doc, els) = detached_elements(4);
        let mut registry = ScopeRegistry::new();

        let root = registry.allocate(els[0].0, &els[0].1, None);
        let a = registry.allocate(els[1].0, &els[1].1, Some(root));
        let b = registry.allocate(els[2].0, &els[2].1, Some(root));
        let other = registry.allocate(els[3].0, &els[3].1, None);

        assert_eq!(registry.allocated_indices(), vec![root, a, b, other]);
        assert_eq!(registry.children_of(root), vec![a, b]);
        assert!(registry.children_of(other).is_empty());
    }

    #[test]
    fn test_release_is_recursive() {
        let (_doc, els) = detached_elements(3);
        let mut registry = ScopeRegistry::new();

        let root = registry.allocate(els[0].0, &els[0].1, None);
        let mid = registry.allocate(els[1].0, &els[1].1, Some(root));
        let leaf = registry.allocate(els[2].0, &els[2].1, Some(mid));

        registry.release(mid);

        assert!(registry.is_allocated(root));
        assert!(!registry.is_allocated(mid));
        assert!(!registry.is_allocated(leaf));
    }

    #[test]
    fn test_release_all_resets_numbering() {
        let (_doc, els) = detached_elements(2);
        let mut registry = ScopeRegistry::new();

        let a = registry.allocate(els[0].0, &els[0].1, None);
        registry.allocate(els[1].0, &els[1].1, Some(a));
        registry.release_node(els[0].0);

        assert_eq!(registry.allocated_count(), 0);
        assert_eq!(registry.capacity(), 0);
    }
}
