//! Application state store.
//!
//! Elements talk to a store only through the [`StateStore`] trait: subscribe a
//! callback to a named selector, and dispatch named actions. [`AppState`] is the
//! bundled implementation: a single state [`Value`], registered actions that
//! mutate it, and registered selectors that read it.
//!
//! After every dispatch each listener's selector is re-evaluated and the
//! callback runs only when the selected value changed (deep comparison against
//! a snapshot taken at the previous notification).
//!
//! # Example
//!
//! ```ignore
//! let store = Rc::new(AppState::new(Value::object([("items", Value::array(Vec::<Value>::new()))])));
//! store.action("addItem", |state, payload| state.field("items")?.push(payload.clone()));
//! store.selector("itemCount", |state| state.get_field("items").and_then(|v| v.len()).unwrap_or(0).into());
//!
//! let doc = Document::with_store(store.clone());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use spark_signals::{signal, Signal};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::reactive::{wrap, Observable};
use crate::types::Value;

// =============================================================================
// TYPES
// =============================================================================

/// Callback receiving the newly selected value.
pub type StateCallback = Rc<dyn Fn(&Value)>;

/// Action body: mutates the state through the observable handle.
pub type ActionFn = Rc<dyn Fn(&Observable, &Value) -> Result<()>>;

/// Selector body: derives a value from the state.
pub type SelectorFn = Rc<dyn Fn(&Value) -> Value>;

/// Handle returned by [`StateStore::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// What elements need from a store.
pub trait StateStore {
    /// Subscribe `callback` to changes of `selector`.
    fn listen(&self, selector: &str, callback: StateCallback) -> ListenerId;

    /// Unsubscribe. Returns whether the listener existed.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Run `action` with `payload`, then notify listeners whose selection changed.
    fn dispatch(&self, action: &str, payload: Value) -> Result<()>;
}

// =============================================================================
// APP STATE
// =============================================================================

struct Listener {
    id: ListenerId,
    selector: String,
    callback: StateCallback,
    last: Value,
}

struct StoreInner {
    state: Value,
    actions: HashMap<String, ActionFn>,
    selectors: HashMap<String, SelectorFn>,
    listeners: Vec<Listener>,
    next_id: usize,
}

/// Default [`StateStore`] implementation.
pub struct AppState {
    inner: RefCell<StoreInner>,
    last_action: Signal<Option<String>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("AppState")
            .field("state", &inner.state)
            .field("listeners", &inner.listeners.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(initial: Value) -> Self {
        Self {
            inner: RefCell::new(StoreInner {
                state: initial,
                actions: HashMap::new(),
                selectors: HashMap::new(),
                listeners: Vec::new(),
                next_id: 0,
            }),
            last_action: signal(None),
        }
    }

    /// Register (or replace) an action.
    pub fn action<F>(&self, name: &str, action: F)
    where
        F: Fn(&Observable, &Value) -> Result<()> + 'static,
    {
        self.inner
            .borrow_mut()
            .actions
            .insert(name.to_string(), Rc::new(action));
    }

    /// Register (or replace) a selector.
    pub fn selector<F>(&self, name: &str, selector: F)
    where
        F: Fn(&Value) -> Value + 'static,
    {
        self.inner
            .borrow_mut()
            .selectors
            .insert(name.to_string(), Rc::new(selector));
    }

    /// The state value (shares storage).
    pub fn state(&self) -> Value {
        self.inner.borrow().state.clone()
    }

    /// Value of a registered selector, or the top-level state field of that
    /// name. Selector bodies run with no store borrow held, so they may read
    /// the store themselves.
    pub fn select(&self, selector: &str) -> Value {
        let (select, state) = {
            let inner = self.inner.borrow();
            (inner.selectors.get(selector).cloned(), inner.state.clone())
        };
        match select {
            Some(select) => select(&state),
            None => state.get_field(selector).unwrap_or_default(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Name of the most recently dispatched action.
    ///
    /// Note: This creates a reactive dependency when called from a derived/effect.
    pub fn last_action(&self) -> Option<String> {
        self.last_action.get()
    }
}

impl StateStore for AppState {
    fn listen(&self, selector: &str, callback: StateCallback) -> ListenerId {
        let last = self.select(selector).deep_clone();
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            selector: selector.to_string(),
            callback,
            last,
        });
        trace!(selector, "state listener added");
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|listener| listener.id != id);
        inner.listeners.len() != before
    }

    fn dispatch(&self, action: &str, payload: Value) -> Result<()> {
        let (body, state) = {
            let inner = self.inner.borrow();
            let body = inner
                .actions
                .get(action)
                .cloned()
                .ok_or_else(|| Error::UnknownAction(action.to_string()))?;
            (body, inner.state.clone())
        };

        debug!(action, "dispatching action");
        body(&wrap(state, Rc::new(|| Ok(()))), &payload)?;
        self.last_action.set(Some(action.to_string()));

        // Listeners added by a callback wait for the next dispatch
        let watched: Vec<(ListenerId, String)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|listener| (listener.id, listener.selector.clone()))
            .collect();

        for (id, selector) in watched {
            let selected = self.select(&selector);
            let callback = {
                let mut inner = self.inner.borrow_mut();
                // Removed by an earlier callback of this dispatch
                let Some(listener) = inner.listeners.iter_mut().find(|l| l.id == id) else {
                    trace!(selector = %selector, "listener removed during dispatch");
                    continue;
                };
                if selected == listener.last {
                    continue;
                }
                listener.last = selected.deep_clone();
                listener.callback.clone()
            };
            callback(&selected);
        }
        Ok(())
    }
}
