//! State - the application store elements subscribe to and dispatch into.

mod store;

pub use store::{ActionFn, AppState, ListenerId, SelectorFn, StateCallback, StateStore};
