//! Injected collaborators.
//!
//! Everything time- or user-facing that the stores depend on:
//! - Scheduler for debounced flushes
//! - Clock for timestamps and date rules
//! - Notifier for user-facing warnings

pub mod clock;
pub mod notifier;
pub mod scheduler;
pub mod services;

pub use clock::*;
pub use notifier::*;
pub use scheduler::*;
pub use services::*;
