//! Validation engine.
//!
//! Stateless per call: results are recomputed from the field definition, the
//! value and the caller-supplied context, and never written back to a store.
//! Only errors gate `valid`; warnings and suggestions are advisory.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::runtime::clock::{Clock, SystemClock};
use crate::template::schema::{ComponentCounts, FieldDef, FieldType};
use crate::ui::builder::{NodeId, UiBuilder, ATTR_VALUE};

use super::rules::{
    check_date, check_id_heuristics, check_required, common_models, parse_date, Severity,
    ValidationMessage,
};

/// Set on an annotated control: `error`, `warning` or `valid`.
pub const ATTR_VALIDATION_STATE: &str = "data-validation";
pub const CLASS_VALIDATION_ERROR: &str = "validation-error";
pub const CLASS_VALIDATION_WARNING: &str = "validation-warning";
pub const CLASS_VALIDATION_SUGGESTION: &str = "validation-suggestion";

/// Facts about the form instance, supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub aircraft_type: Option<String>,
    pub operators: Vec<String>,
    pub expected_msn: Option<String>,
    pub components: Option<ComponentCounts>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aircraft_type(mut self, aircraft_type: &str) -> Self {
        self.aircraft_type = Some(aircraft_type.to_string());
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

    pub fn with_components(mut self, components: ComponentCounts) -> Self {
        self.components = Some(components);
        self
    }
}

/// A hint with the candidate values it proposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub message: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationMessage>,
    pub warnings: Vec<ValidationMessage>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Warning,
    Info,
}

/// A cross-field finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyIssue {
    pub level: IssueLevel,
    pub field: String,
    pub message: String,
}

/// Whole-form outcome. Warning-level issues clear `valid`; info-level
/// issues are carried as suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormValidation {
    pub valid: bool,
    pub warnings: Vec<ConsistencyIssue>,
    pub suggestions: Vec<ConsistencyIssue>,
}

#[derive(Clone)]
pub struct Validator {
    clock: Arc<dyn Clock>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Rule pipeline: requiredness, type rule, id heuristics. Suggestions
    /// are computed regardless of the outcome.
    pub fn validate_field(&self, field: &FieldDef, value: &str, ctx: &ValidationContext) -> ValidationResult {
        let mut findings = Vec::new();

        if field.required {
            findings.extend(check_required(value));
        }

        if !value.trim().is_empty() {
            if field.field_type == FieldType::Date {
                findings.extend(check_date(value, self.clock.today()));
            }
            findings.extend(check_id_heuristics(&field.id, value));
        }

        let (warnings, errors): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|m| m.severity == Severity::Warning);

        let result = ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
            suggestions: self.suggestions(field, value, ctx),
        };

        log::debug!(
            "FIELD_VALIDATED field_id={} valid={} errors={} warnings={} suggestions={}",
            field.id,
            result.valid,
            result.errors.len(),
            result.warnings.len(),
            result.suggestions.len()
        );
        result
    }

    fn suggestions(&self, field: &FieldDef, value: &str, ctx: &ValidationContext) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        if field.id == "aircraft_type" || field.id == "model" {
            if let Some(aircraft_type) = ctx.aircraft_type.as_deref() {
                if let Some(models) = common_models(aircraft_type) {
                    if !models.contains(&value) {
                        suggestions.push(Suggestion {
                            message: format!("Common {} models: {}", aircraft_type, models.join(", ")),
                            values: models.iter().map(|m| m.to_string()).collect(),
                        });
                    }
                }
            }
        }

        if field.field_type == FieldType::Date && value.is_empty() {
            let today = self.clock.today().format("%Y-%m-%d").to_string();
            suggestions.push(Suggestion {
                message: format!("Today's date: {}", today),
                values: vec![today],
            });
        }

        if field.id == "operator" && !value.is_empty() && !ctx.operators.iter().any(|o| o == value) {
            let needle = value.to_lowercase();
            let matches: Vec<String> = ctx
                .operators
                .iter()
                .filter(|op| op.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            if let Some(first) = matches.first() {
                suggestions.push(Suggestion {
                    message: format!("Did you mean: {}?", first),
                    values: matches.iter().take(3).cloned().collect(),
                });
            }
        }

        suggestions
    }

    /// Cross-field checks over a field store snapshot.
    pub fn check_consistency(&self, data: &Map<String, Value>, ctx: &ValidationContext) -> Vec<ConsistencyIssue> {
        let mut issues = Vec::new();

        let report = first_text(data, &["report_date", "inspection_report_date"]);
        let physical = first_text(data, &["physical_date", "physical_inspection_date"]);
        if let (Some(report), Some(physical)) = (report, physical) {
            if let (Some(report), Some(physical)) = (parse_date(report), parse_date(physical)) {
                if physical > report {
                    issues.push(ConsistencyIssue {
                        level: IssueLevel::Warning,
                        field: "physical_date".to_string(),
                        message: "Physical inspection date is after report date. Please verify.".to_string(),
                    });
                }
            }
        }

        if let (Some(msn), Some(expected)) = (first_text(data, &["msn"]), ctx.expected_msn.as_deref()) {
            if msn != expected {
                issues.push(ConsistencyIssue {
                    level: IssueLevel::Warning,
                    field: "msn".to_string(),
                    message: format!("MSN mismatch. Expected: {}, Entered: {}", expected, msn),
                });
            }
        }

        if let (Some(_), Some(components)) = (&ctx.aircraft_type, &ctx.components) {
            let expected = components.count("engines");
            let found = data
                .iter()
                .filter(|(key, value)| {
                    key.contains("engine") && key.contains("serial") && value_is_present(value)
                })
                .count();
            if found != expected {
                issues.push(ConsistencyIssue {
                    level: IssueLevel::Info,
                    field: "engines".to_string(),
                    message: format!(
                        "Expected {} engine(s). Found {} engine serial number(s).",
                        expected, found
                    ),
                });
            }
        }

        if !issues.is_empty() {
            log::info!("CONSISTENCY_ISSUES count={}", issues.len());
        }
        issues
    }

    pub fn validate_form(&self, data: &Map<String, Value>, ctx: &ValidationContext) -> FormValidation {
        let (warnings, suggestions): (Vec<_>, Vec<_>) = self
            .check_consistency(data, ctx)
            .into_iter()
            .partition(|issue| issue.level == IssueLevel::Warning);

        FormValidation {
            valid: warnings.is_empty(),
            warnings,
            suggestions,
        }
    }

    /// Validate the control's current value and annotate it.
    ///
    /// `feedback` is the container the messages are drawn into; its previous
    /// contents are replaced.
    pub fn apply_validation(
        &self,
        ui: &dyn UiBuilder,
        control: NodeId,
        feedback: NodeId,
        field: &FieldDef,
        ctx: &ValidationContext,
    ) -> ValidationResult {
        let value = ui.attribute(control, ATTR_VALUE).unwrap_or_default();
        let result = self.validate_field(field, &value, ctx);

        ui.clear_children(feedback);

        let state = if !result.errors.is_empty() {
            "error"
        } else if !result.warnings.is_empty() {
            "warning"
        } else {
            "valid"
        };
        ui.set_attribute(control, ATTR_VALIDATION_STATE, state);

        if let Some(error) = result.errors.first() {
            let node = ui.append_text(feedback, "div", &error.message);
            ui.set_attribute(node, crate::ui::builder::ATTR_CLASS, CLASS_VALIDATION_ERROR);
        }
        if let Some(warning) = result.warnings.first() {
            let node = ui.append_text(feedback, "div", &warning.message);
            ui.set_attribute(node, crate::ui::builder::ATTR_CLASS, CLASS_VALIDATION_WARNING);
        }
        if let Some(suggestion) = result.suggestions.first() {
            let node = ui.append_text(feedback, "div", &suggestion.message);
            ui.set_attribute(node, crate::ui::builder::ATTR_CLASS, CLASS_VALIDATION_SUGGESTION);
        }

        result
    }
}

fn first_text<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| data.get(*k).and_then(Value::as_str))
        .find(|v| !v.is_empty())
}

fn value_is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
