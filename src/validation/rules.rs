//! Field rules.
//!
//! Format rules are selected two ways: by field type (dates) and by
//! substring heuristics on the field id (MSN, serial, phone, hours/cycles,
//! email). An empty value never fails a format rule.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    /// Manufacturer serial number: letters and digits only
    static ref MSN_PATTERN: Regex = Regex::new(r"(?i)^[A-Z0-9]+$").unwrap();

    /// Component serial numbers allow dashes
    static ref SERIAL_PATTERN: Regex = Regex::new(r"(?i)^[A-Z0-9\-]+$").unwrap();

    static ref PHONE_PATTERN: Regex = Regex::new(r"^[\d\s\-\+\(\)]+$").unwrap();

    /// "12345" or "12345 / 6789"
    static ref HOURS_CYCLES_PATTERN: Regex = Regex::new(r"^[\d\s/]+$").unwrap();

    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_DATE_MESSAGE: &str = "Invalid date format";
pub const FUTURE_DATE_MESSAGE: &str = "Date cannot be in the future";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl ValidationMessage {
    fn error(rule: &'static str, message: &str) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            message: message.to_string(),
        }
    }

    fn warning(rule: &'static str, message: &str) -> Self {
        Self {
            rule,
            severity: Severity::Warning,
            message: message.to_string(),
        }
    }
}

pub fn check_required(value: &str) -> Option<ValidationMessage> {
    if value.trim().is_empty() {
        Some(ValidationMessage::error("required", REQUIRED_MESSAGE))
    } else {
        None
    }
}

/// Unparseable dates are errors; dates after `today` are only warnings.
pub fn check_date(value: &str, today: NaiveDate) -> Option<ValidationMessage> {
    match parse_date(value) {
        None => Some(ValidationMessage::error("date", INVALID_DATE_MESSAGE)),
        Some(date) if date > today => Some(ValidationMessage::warning("date", FUTURE_DATE_MESSAGE)),
        Some(_) => None,
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` and RFC 3339.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

struct IdRule {
    name: &'static str,
    needles: &'static [&'static str],
    pattern: &'static Regex,
    message: &'static str,
}

/// Id heuristics in evaluation order.
fn id_rules() -> [IdRule; 5] {
    [
        IdRule {
            name: "msn",
            needles: &["msn", "MSN"],
            pattern: &MSN_PATTERN,
            message: "MSN should contain only letters and numbers",
        },
        IdRule {
            name: "serial",
            needles: &["serial", "Serial"],
            pattern: &SERIAL_PATTERN,
            message: "Serial number format invalid",
        },
        IdRule {
            name: "phone",
            needles: &["phone", "Phone"],
            pattern: &PHONE_PATTERN,
            message: "Invalid phone number format",
        },
        IdRule {
            name: "hours_cycles",
            needles: &["hours", "cycles", "Hrs", "Cycs"],
            pattern: &HOURS_CYCLES_PATTERN,
            message: "Invalid hours/cycles format",
        },
        IdRule {
            name: "email",
            needles: &["email", "Email"],
            pattern: &EMAIL_PATTERN,
            message: "Invalid email format",
        },
    ]
}

/// Run every id heuristic whose needle occurs in `field_id`.
pub fn check_id_heuristics(field_id: &str, value: &str) -> Vec<ValidationMessage> {
    id_rules()
        .iter()
        .filter(|rule| rule.needles.iter().any(|n| field_id.contains(n)))
        .filter(|rule| !rule.pattern.is_match(value))
        .map(|rule| ValidationMessage::error(rule.name, rule.message))
        .collect()
}

const ATR_MODELS: &[&str] = &["ATR-72-600", "ATR-72-500", "ATR-42"];
const A320_MODELS: &[&str] = &["A320-200", "A320neo", "A320-214"];
const A330_MODELS: &[&str] = &["A330-200", "A330-300", "A330-900neo"];

/// Common models per aircraft family.
pub fn common_models(aircraft_type: &str) -> Option<&'static [&'static str]> {
    match aircraft_type {
        "ATR" => Some(ATR_MODELS),
        "A320" => Some(A320_MODELS),
        "A330" => Some(A330_MODELS),
        _ => None,
    }
}
