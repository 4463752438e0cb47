//! Parent-scope data binding.
//!
//! A child declares `data-<name>="<sourceProp>"`; before each render it copies
//! `sourceProp` from its parent scope into its own property `<name>`
//! (camel-cased). The parent scope is the nearest ancestor of the same family
//! that was connected when this element attached, recorded in the scope
//! registry. Once found it is cached until disconnect.
//!
//! Copies share storage with the parent's value, and only truthy values or
//! numeric zero are copied. Everything else leaves the property as it was.

use tracing::trace;

use super::Element;
use crate::error::Result;
use crate::types::{ElementFlags, Value};

impl Element {
    /// Nearest family ancestor scope, if any.
    pub fn parent_scope(&self) -> Option<Element> {
        if let Some(cached) = self.0.parent_scope.borrow().as_ref().and_then(|weak| weak.upgrade()) {
            return Some(cached);
        }

        let found = self.resolve_parent_scope()?;
        *self.0.parent_scope.borrow_mut() = Some(found.downgrade());
        Some(found)
    }

    fn resolve_parent_scope(&self) -> Option<Element> {
        let index = self.scope_index()?;
        self.document().ok()?.scope_parent(index)
    }

    /// Property `name` of the parent scope (`undefined` without one).
    pub fn parent_scope_value(&self, name: &str) -> Value {
        self.parent_scope()
            .map(|parent| parent.get(name))
            .unwrap_or_default()
    }

    /// Copy every `data-*` binding from the parent scope. Writes made here
    /// do not trigger renders.
    pub fn refresh_data_props(&self) -> Result<()> {
        let dataset = self.document()?.dataset(self.node());
        if dataset.is_empty() {
            return Ok(());
        }

        self.insert_flags(ElementFlags::REFRESHING_DATA_PROPS);
        let result = self.copy_bindings(&dataset);
        self.remove_flags(ElementFlags::REFRESHING_DATA_PROPS);
        result
    }

    fn copy_bindings(&self, dataset: &[(String, String)]) -> Result<()> {
        for (key, source) in dataset {
            let value = self.parent_scope_value(source);
            if value.is_truthy() || value.is_zero() {
                self.set(key, value)?;
            } else {
                trace!(tag = self.tag_name(), key = %key, source = %source, "binding skipped");
            }
        }
        Ok(())
    }
}
