//! Inspection Core - Template interpreter and field-binding engine
//!
//! This crate renders editable, multi-section inspection forms from
//! per-variant templates, binds every generated control to a local
//! persistent store, and layers photo evidence and advisory validation on
//! top. The implementation prioritizes:
//!
//! 1. **Addressability** - Every leaf control persists under a unique,
//!    path-derived field id
//! 2. **Logging** - Every decision point logged with project context
//! 3. **Testability** - Storage, timers, time and the UI surface are
//!    injected collaborators
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `template` - Template schema types and the per-variant catalog
//! - `render` - The form interpreter (resolved ids, controls, tables,
//!   component groups, locations, photo sections)
//! - `fields` - Debounced field store and control binding
//! - `media` - Per-location photo store
//! - `validation` - Field rules, suggestions, cross-field consistency
//! - `session` - One project's editing session (render, save, submit, export)
//! - `ui` - UI tree builder capability and an in-memory tree
//! - `runtime` - Scheduler, clock and user-notice collaborators
//! - `storage` - Key-value storage, key builders and persisted models
//! - `logging` - Structured logging with project context

pub mod config;
pub mod error;
pub mod fields;
pub mod logging;
pub mod media;
pub mod render;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod template;
pub mod ui;
pub mod validation;

pub use config::FormConfig;
pub use error::{FormError, Result};
pub use fields::{bind_container, bind_control, FieldStore};
pub use media::{MediaStore, PhotoFile};
pub use render::{FormRenderer, RenderContext, RenderedForm};
pub use runtime::{Clock, FixedClock, Notifier, Scheduler, Services, SystemClock, TimerQueue};
pub use session::{InspectionSession, SessionContext};
pub use storage::{FormSnapshot, KeyValueStorage, MemoryStorage, PhotoRecord};
pub use template::{Template, TemplateCatalog};
pub use ui::{UiBuilder, UiTree};
pub use validation::{ValidationContext, ValidationResult, Validator};

/// Initialize the process-wide logger.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}
