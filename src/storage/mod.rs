//! Storage module.
//!
//! Local key-value backend, persisted models and key builders.

pub mod backend;
pub mod keys;
pub mod models;

pub use backend::*;
pub use keys::*;
pub use models::*;
