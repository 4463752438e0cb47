//! Property storage and attribute → property mirroring.
//!
//! Observed properties are installed at connect time. From then on every
//! assignment wraps the new value in a fresh [`Observable`] whose change
//! callback re-renders the element, and (outside of the data-prop refresh)
//! renders immediately. There is no equality check: assigning the same value
//! twice renders twice.
//!
//! Properties that are not observed, and observed ones before the first
//! connect, are plain values: writes store them and nothing else.

use std::rc::Rc;

use tracing::trace;

use super::Element;
use crate::error::Result;
use crate::reactive::{wrap, ChangeCallback, Observable};
use crate::types::{attr_name_to_prop_name, ElementFlags, Value};

impl Element {
    /// Current value of property `name` (`undefined` when unset).
    ///
    /// Arrays and objects share storage with the property, so in-place edits
    /// made through the returned value bypass change detection. Use
    /// [`prop`](Self::prop) for edits that should render.
    pub fn get(&self, name: &str) -> Value {
        if let Some(observable) = self.0.reactive.borrow().get(name) {
            return observable.get();
        }
        self.0.plain.borrow().get(name).cloned().unwrap_or_default()
    }

    /// Observable handle of an installed observed property.
    pub fn prop(&self, name: &str) -> Option<Observable> {
        self.0.reactive.borrow().get(name).cloned()
    }

    /// Whether `name` is an installed observed property.
    pub fn is_observed_prop(&self, name: &str) -> bool {
        self.0.reactive.borrow().contains_key(name)
    }

    /// Assign property `name`.
    ///
    /// Observed properties render afterwards unless the data-prop refresh is
    /// in progress. Render failures come back here.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();

        if !self.is_observed_prop(name) {
            self.0.plain.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }

        let observable = wrap(value, self.render_callback());
        self.0
            .reactive
            .borrow_mut()
            .insert(name.to_string(), observable);

        if self.flags().contains(ElementFlags::REFRESHING_DATA_PROPS) {
            return Ok(());
        }
        self.do_render()
    }

    /// Mirror an attribute change into its property. A removed attribute
    /// (`None`) becomes `null`.
    pub fn attribute_changed_callback(
        &self,
        name: &str,
        _old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        let prop = attr_name_to_prop_name(name);
        trace!(tag = self.tag_name(), attr = name, prop = %prop, "attribute changed");
        self.set(&prop, new_value)
    }

    /// Install observed attribute `attr_name` as a reactive property, carrying
    /// over whatever value it held before.
    pub(crate) fn init_observed_attribute(&self, attr_name: &str) -> Result<()> {
        let prop = attr_name_to_prop_name(attr_name);
        let current = self.get(&prop);

        self.0.plain.borrow_mut().shift_remove(&prop);
        self.0
            .reactive
            .borrow_mut()
            .entry(prop.clone())
            .or_insert_with(|| wrap(Value::Undefined, Rc::new(|| Ok(()))));

        self.set(&prop, current)
    }

    /// Change callback for values assigned to observed properties.
    fn render_callback(&self) -> ChangeCallback {
        let weak = Rc::downgrade(&self.0);
        Rc::new(move || match weak.upgrade() {
            Some(inner) => Element(inner).do_render(),
            None => Ok(()),
        })
    }
}
