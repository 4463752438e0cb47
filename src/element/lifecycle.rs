//! Connect / disconnect, and the state-store passthrough.
//!
//! Connect installs the observed properties, marks the element initialized,
//! renders once and then fires `on_init`. Disconnect removes store listeners
//! and bound DOM listeners, makes the element inert, and fires
//! `on_disconnect`. Connecting again repeats the connect steps.

use tracing::debug;

use super::Element;
use crate::error::{Error, Result};
use crate::state::{ListenerId, StateCallback};
use crate::types::{ElementFlags, Value};

impl Element {
    /// Called by the document when the element becomes connected.
    pub(crate) fn connected_callback(&self, scope_index: usize) -> Result<()> {
        let doc = self.document()?;
        debug!(tag = self.tag_name(), scope_index, "connected");

        self.0.scope_index.set(Some(scope_index));
        self.remove_flags(ElementFlags::DETACHED);
        self.insert_flags(ElementFlags::CONNECTED);

        if self.0.definition.shadow_dom {
            doc.attach_shadow(self.node())?;
        }
        for attr_name in self.0.definition.observed_attributes {
            self.init_observed_attribute(attr_name)?;
        }

        self.insert_flags(ElementFlags::INITIALIZED);
        self.do_render()?;
        self.0.component.on_init(self);
        Ok(())
    }

    /// Called by the document after the element left the connected tree.
    pub(crate) fn disconnected_callback(&self) {
        debug!(tag = self.tag_name(), "disconnected");

        let listener_ids = std::mem::take(&mut *self.0.state_listeners.borrow_mut());
        if let Some(store) = &self.0.store {
            for id in listener_ids {
                store.remove_listener(id);
            }
        }
        if let Ok(doc) = self.document() {
            self.0.listeners.borrow_mut().removed(&doc);
        }

        self.remove_flags(ElementFlags::CONNECTED | ElementFlags::INITIALIZED);
        self.insert_flags(ElementFlags::DETACHED);
        self.0.scope_index.set(None);
        *self.0.parent_scope.borrow_mut() = None;

        self.0.component.on_disconnect(self);
    }

    // =========================================================================
    // State Store
    // =========================================================================

    /// Subscribe to `selector` on the document's store. The subscription is
    /// removed automatically on disconnect.
    pub fn state_listener<F>(&self, selector: &str, callback: F) -> Result<ListenerId>
    where
        F: Fn(&Value) + 'static,
    {
        let store = self
            .0
            .store
            .as_ref()
            .ok_or_else(|| Error::MissingStateStore(self.tag_name().to_string()))?;
        let callback: StateCallback = std::rc::Rc::new(callback);
        let id = store.listen(selector, callback);
        self.0.state_listeners.borrow_mut().push(id);
        Ok(id)
    }

    /// Dispatch `action` on the document's store.
    pub fn state_dispatch(&self, action: &str, payload: impl Into<Value>) -> Result<()> {
        let store = self
            .0
            .store
            .clone()
            .ok_or_else(|| Error::MissingStateStore(self.tag_name().to_string()))?;
        store.dispatch(action, payload.into())
    }

    /// Store subscriptions held by this element.
    pub fn state_listener_count(&self) -> usize {
        self.0.state_listeners.borrow().len()
    }
}
