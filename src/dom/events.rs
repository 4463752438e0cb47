//! DOM events - per-node handler registry.
//!
//! Handlers are registered on a node for an event type and return `Ok(true)`
//! to consume the event (stops propagation). Dispatch itself lives on
//! [`Document::dispatch_event`](super::Document::dispatch_event), which walks
//! from the target up through ancestors and shadow hosts.

use std::collections::HashMap;
use std::rc::Rc;

use super::NodeId;
use crate::error::Result;
use crate::types::Value;

// =============================================================================
// TYPES
// =============================================================================

/// An event travelling through the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Node whose handler is currently running.
    pub current_target: NodeId,
    pub detail: Value,
}

/// Event handler. Returns `Ok(true)` to consume the event.
pub type EventHandler = Rc<dyn Fn(&Event) -> Result<bool>>;

/// Handle returned by registration, used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

pub(crate) struct HandlerRegistry {
    handlers: HashMap<NodeId, Vec<(HandlerId, String, EventHandler)>>,
    next_id: usize,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> HandlerId {
        let id = self.next_id;
        self.next_id += 1;
        HandlerId(id)
    }

    pub fn add(&mut self, node: NodeId, event_type: &str, handler: EventHandler) -> HandlerId {
        let id = self.next_id();
        self.handlers
            .entry(node)
            .or_default()
            .push((id, event_type.to_string(), handler));
        id
    }

    /// Returns whether a handler was removed.
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let mut removed = false;
        for list in self.handlers.values_mut() {
            let before = list.len();
            list.retain(|(hid, _, _)| *hid != id);
            removed |= list.len() != before;
        }
        self.handlers.retain(|_, list| !list.is_empty());
        removed
    }

    /// Handlers of `node` for `event_type`, in registration order.
    pub fn handlers_for(&self, node: NodeId, event_type: &str) -> Vec<EventHandler> {
        self.handlers
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|(_, t, _)| t == event_type)
                    .map(|(_, _, h)| h.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every handler registered on `node`.
    pub fn cleanup_node(&mut self, node: NodeId) {
        self.handlers.remove(&node);
    }

    pub fn count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting(count: &Rc<Cell<usize>>, consume: bool) -> EventHandler {
        let count = count.clone();
        Rc::new(move |_: &Event| -> Result<bool> {
            count.set(count.get() + 1);
            Ok(consume)
        })
    }

    #[test]
    fn test_handlers_filtered_by_type() {
        let mut registry = HandlerRegistry::new();
        let count = Rc::new(Cell::new(0));

        registry.add(NodeId(1), "click", counting(&count, false));
        registry.add(NodeId(1), "input", counting(&count, false));
        registry.add(NodeId(2), "click", counting(&count, false));

        assert_eq!(registry.handlers_for(NodeId(1), "click").len(), 1);
        assert_eq!(registry.handlers_for(NodeId(3), "click").len(), 0);
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn test_remove_by_id() {
        let mut registry = HandlerRegistry::new();
        let count = Rc::new(Cell::new(0));

        let id = registry.add(NodeId(1), "click", counting(&count, true));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_cleanup_node() {
        let mut registry = HandlerRegistry::new();
        let count = Rc::new(Cell::new(0));

        registry.add(NodeId(1), "click", counting(&count, false));
        registry.add(NodeId(1), "keydown", counting(&count, false));
        registry.cleanup_node(NodeId(1));

        assert_eq!(registry.count(), 0);
    }
}
