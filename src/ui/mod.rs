//! UI abstraction module.
//!
//! The builder capability the renderer targets, and an in-memory tree that
//! implements it.

pub mod builder;
pub mod tree;

pub use builder::*;
pub use tree::*;
