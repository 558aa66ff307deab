//! Form interpreter module.
//!
//! Turns a template into a live UI tree whose controls are bound to the
//! field store under unique resolved ids, with per-location media stores
//! behind the photo sections.

pub mod form;
pub mod ids;
pub mod photos;
pub mod renderer;

pub use form::*;
pub use ids::*;
pub use photos::*;
pub use renderer::*;
