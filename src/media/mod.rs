//! Media store module.
//!
//! Photo evidence per inspection location.

pub mod store;

pub use store::*;
