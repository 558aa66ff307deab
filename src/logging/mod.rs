//! Structured logging with form-instance context.
//!
//! `LogContext` renders the project id (and photo location, where relevant)
//! as the prefix of every `log` line: `"{ctx} EVENT key=value ..."`.

pub mod structured;

pub use structured::*;
