//! Structured logging utilities.
//!
//! Provides context-aware logging with the project id (and location, for
//! photo stores) included in every log message.

use std::fmt;

/// Logging context for one form instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub project_id: String,
    pub location: Option<String>,
}

impl LogContext {
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: None,
        }
    }

    pub fn with_location(&self, location: &str) -> Self {
        Self {
            project_id: self.project_id.clone(),
            location: Some(location.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "[project={}] [location={}]", self.project_id, loc),
            None => write!(f, "[project={}]", self.project_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_display() {
        let ctx = LogContext::new("proj-123");
        assert_eq!(format!("{}", ctx), "[project=proj-123]");

        let ctx_with_location = ctx.with_location("left_wing");
        assert_eq!(
            format!("{}", ctx_with_location),
            "[project=proj-123] [location=left_wing]"
        );
    }
}
