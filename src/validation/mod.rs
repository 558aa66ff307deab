//! Validation engine module.
//!
//! Provides advisory validation for form values:
//! - Field rules (requiredness, dates, id-based format heuristics)
//! - Context-driven suggestions
//! - Cross-field consistency checks

pub mod engine;
pub mod rules;

pub use engine::*;
pub use rules::*;
