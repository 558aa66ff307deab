//! Field store module.
//!
//! Per-instance field values with debounced persistence, and the binding
//! that ties UI controls to them.

pub mod binding;
pub mod store;

pub use binding::*;
pub use store::*;
