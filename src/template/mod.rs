//! Template schema module.
//!
//! Declarative form descriptions and the per-variant catalog that serves
//! them to the renderer.

pub mod catalog;
pub mod schema;

pub use catalog::*;
pub use schema::*;
