//! Session module.
//!
//! Ties the catalog, stores, validator and renderer together for one
//! project.

pub mod context;
pub mod inspection;

pub use context::*;
pub use inspection::*;
