//! Observable - deep change notification for property values.
//!
//! An [`Observable`] pairs a [`Value`] with a change callback. Every mutating
//! operation, at the top level or through a nested handle obtained with
//! [`Observable::at`] / [`Observable::field`], fires the callback exactly once,
//! synchronously, after the mutation has been applied and every internal borrow
//! has been released. The callback may therefore read (or even mutate) the same
//! value again. Re-entrant notifications are not deduplicated.
//!
//! Reads never notify.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use min_element::{wrap, Value};
//!
//! let items = wrap(
//!     Value::array([Value::object([("name", "Milk"), ("complete", false)])]),
//!     Rc::new(|| { println!("changed"); Ok(()) }),
//! );
//!
//! items.at(0)?.set_field("complete", true)?; // prints "changed" once
//! items.push(Value::object([("name", "Eggs")]))?; // prints "changed" once
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::types::{ArrayRef, ObjectRef, Value};

/// Callback fired after each mutation. Its result is handed back to the mutating caller.
pub type ChangeCallback = Rc<dyn Fn() -> Result<()>>;

/// Wrap `value` so that any later mutation made through the returned handle
/// invokes `on_change`.
pub fn wrap(value: Value, on_change: ChangeCallback) -> Observable {
    Observable { value, on_change }
}

/// A value plus the callback its mutations notify.
///
/// Cloning an `Observable` shares both the underlying storage and the callback.
#[derive(Clone)]
pub struct Observable {
    value: Value,
    on_change: ChangeCallback,
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl Observable {
    // =========================================================================
    // Reads
    // =========================================================================

    /// The wrapped value. Arrays and objects share storage with the wrapper.
    pub fn get(&self) -> Value {
        self.value.clone()
    }

    /// Borrow the wrapped value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Nested handle for array element `index`, notifying the same callback.
    pub fn at(&self, index: usize) -> Result<Observable> {
        let items = self.array()?;
        let child = {
            let items = items.borrow();
            items
                .get(index)
                .cloned()
                .ok_or(Error::IndexOutOfBounds { index, len: items.len() })?
        };
        Ok(self.child(child))
    }

    /// Nested handle for object field `key`, notifying the same callback.
    ///
    /// A missing field yields a handle over `undefined`.
    pub fn field(&self, key: &str) -> Result<Observable> {
        let entries = self.object()?;
        let child = entries.borrow().get(key).cloned().unwrap_or_default();
        Ok(self.child(child))
    }

    /// Array length (0 for non-arrays).
    pub fn len(&self) -> usize {
        match &self.value {
            Value::Array(items) => items.borrow().len(),
            _ => 0,
        }
    }

    /// True when [`len`](Self::len) is 0.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Array mutations
    // =========================================================================

    /// Assign `items[index]`. Writing past the end pads with `undefined`.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let items = self.array()?;
        {
            let mut items = items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value.into();
        }
        self.notify()
    }

    /// Append to the end.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let items = self.array()?;
        items.borrow_mut().push(value.into());
        self.notify()
    }

    /// Remove and return the last element. Popping an empty array still notifies.
    pub fn pop(&self) -> Result<Option<Value>> {
        let items = self.array()?;
        let popped = items.borrow_mut().pop();
        self.notify()?;
        Ok(popped)
    }

    /// Insert at `index` (`index == len` appends).
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let items = self.array()?;
        {
            let mut items = items.borrow_mut();
            if index > items.len() {
                return Err(Error::IndexOutOfBounds { index, len: items.len() });
            }
            items.insert(index, value.into());
        }
        self.notify()
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: usize) -> Result<Value> {
        let items = self.array()?;
        let removed = {
            let mut items = items.borrow_mut();
            if index >= items.len() {
                return Err(Error::IndexOutOfBounds { index, len: items.len() });
            }
            items.remove(index)
        };
        self.notify()?;
        Ok(removed)
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Out-of-range arguments are clamped. Returns the removed
    /// elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>> {
        let array = self.array()?;
        let removed = {
            let mut array = array.borrow_mut();
            let start = start.min(array.len());
            let end = start.saturating_add(delete_count).min(array.len());
            let removed: Vec<Value> = array.splice(start..end, items).collect();
            removed
        };
        self.notify()?;
        Ok(removed)
    }

    /// Remove every element.
    pub fn clear(&self) -> Result<()> {
        let items = self.array()?;
        items.borrow_mut().clear();
        self.notify()
    }

    // =========================================================================
    // Object mutations
    // =========================================================================

    /// Assign `object[key]`.
    pub fn set_field(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let entries = self.object()?;
        entries.borrow_mut().insert(key.to_string(), value.into());
        self.notify()
    }

    /// Delete `object[key]`, returning the previous value.
    pub fn remove_field(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.object()?;
        let removed = entries.borrow_mut().shift_remove(key);
        self.notify()?;
        Ok(removed)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn child(&self, value: Value) -> Observable {
        Observable {
            value,
            on_change: self.on_change.clone(),
        }
    }

    fn array(&self) -> Result<ArrayRef> {
        match &self.value {
            Value::Array(items) => Ok(items.clone()),
            other => Err(Error::TypeMismatch {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }

    fn object(&self) -> Result<ObjectRef> {
        match &self.value {
            Value::Object(entries) => Ok(entries.clone()),
            other => Err(Error::TypeMismatch {
                expected: "object",
                found: other.type_name(),
            }),
        }
    }

    fn notify(&self) -> Result<()> {
        (self.on_change)()
    }
}

// =============================================================================
// Tests
// =============================================================================
