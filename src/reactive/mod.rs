//! Reactive values.
//!
//! - [`observable`] - explicit deep change notification ([`wrap`], [`Observable`])

pub mod observable;

pub use observable::{wrap, ChangeCallback, Observable};
