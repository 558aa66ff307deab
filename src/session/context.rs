//! Session context.
//!
//! Everything a form session knows about its form instance, passed
//! explicitly instead of living in globals.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;
use crate::render::form::RenderContext;
use crate::template::schema::ComponentCounts;
use crate::validation::engine::ValidationContext;

/// Context for one editing session of one form instance.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub project_id: String,
    /// Template variant, e.g. `ATR` or `A320`.
    pub variant: String,
    pub components: Option<ComponentCounts>,
    pub operators: Vec<String>,
    pub expected_msn: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(project_id: &str, variant: &str) -> Self {
        Self {
            session_id: format!("session-{}", &Uuid::new_v4().to_string()[..8]),
            project_id: project_id.to_string(),
            variant: variant.to_string(),
            components: None,
            operators: Vec::new(),
            expected_msn: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_components(mut self, components: ComponentCounts) -> Self {
        self.components = Some(components);
        self
    }

    pub fn with_operators(mut self, operators: &[&str]) -> Self {
        self.operators = operators.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn with_expected_msn(mut self, msn: &str) -> Self {
        self.expected_msn = Some(msn.to_string());
        self
    }

    /// The variant doubles as the aircraft family for suggestions.
    pub fn validation_context(&self) -> ValidationContext {
        ValidationContext {
            aircraft_type: Some(self.variant.clone()),
            operators: self.operators.clone(),
            expected_msn: self.expected_msn.clone(),
            components: self.components.clone(),
        }
    }

    pub fn render_context(&self, annotate: bool) -> RenderContext {
        RenderContext {
            components: self.components.clone(),
            validation: annotate.then(|| self.validation_context()),
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.project_id)
    }
}
