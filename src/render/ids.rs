//! Resolved field identifiers.
//!
//! A leaf's resolved id is the path of enclosing component-group instances
//! (`<groupId>_<index>`) joined with the leaf's own id by `_`. Checkbox
//! members append their option value; table cells are addressed by
//! position.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// `<prefix>_<id>`, or `id` at top level.
pub fn resolve_field_id(prefix: Option<&str>, id: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, id),
        _ => id.to_string(),
    }
}

/// Prefix for instance `index` of a component group.
pub fn instance_prefix(resolved_group_id: &str, index: usize) -> String {
    format!("{}_{}", resolved_group_id, index)
}

/// Binding key for one checkbox option.
pub fn checkbox_option_id(resolved_id: &str, option: &str) -> String {
    format!("{}_{}", resolved_id, option)
}

/// Table id: the title lowercased with whitespace runs as `_`, else the
/// node key.
pub fn table_id(title: Option<&str>, node_key: &str) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => WHITESPACE_RUN.replace_all(&title.to_lowercase(), "_").into_owned(),
        None => node_key.to_string(),
    }
}

/// DOM id of a location block.
pub fn location_dom_id(title: &str) -> String {
    format!(
        "location-{}",
        WHITESPACE_RUN.replace_all(&title.trim().to_lowercase(), "-")
    )
}

/// Label for one unit of a component group.
///
/// `labels[index]` when present ("LH Engine"), otherwise the ordinal form
/// ("Engine 3").
pub fn instance_label(component: &str, labels: &[String], index: usize) -> String {
    let unit = unit_name(component);
    match labels.get(index) {
        Some(label) => format!("{} {}", label, unit),
        None => format!("{} {}", unit, index + 1),
    }
}

/// `engines` -> `Engine`.
fn unit_name(component: &str) -> String {
    let singular = if component.len() > 1 {
        component.strip_suffix('s').unwrap_or(component)
    } else {
        component
    };
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Resolved ids seen during one render, in registration order.
#[derive(Debug, Default)]
pub struct IdRegistry {
    seen: HashSet<String>,
    ordered: Vec<String>,
    collisions: Vec<String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`. Returns false if it was already registered.
    pub fn register(&mut self, id: &str) -> bool {
        if self.seen.insert(id.to_string()) {
            self.ordered.push(id.to_string());
            true
        } else {
            self.collisions.push(id.to_string());
            false
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ordered
    }

    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.ordered, self.collisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve() {
        assert_eq!(resolve_field_id(None, "msn"), "msn");
        assert_eq!(resolve_field_id(Some("engine_0"), "serial"), "engine_0_serial");
        assert_eq!(instance_prefix("engine", 1), "engine_1");
        assert_eq!(checkbox_option_id("findings", "A"), "findings_A");
    }

    #[test]
    fn test_table_and_location_ids() {
        assert_eq!(table_id(Some("Landing Gear  History"), "lg"), "landing_gear_history");
        assert_eq!(table_id(None, "records"), "records");
        assert_eq!(table_id(Some("  "), "records"), "records");
        assert_eq!(location_dom_id("Nose Landing Gear"), "location-nose-landing-gear");
    }

    #[test]
    fn test_instance_labels() {
        let labels = vec!["LH".to_string(), "RH".to_string()];
        assert_eq!(instance_label("engines", &labels, 0), "LH Engine");
        assert_eq!(instance_label("engines", &labels, 2), "Engine 3");
        assert_eq!(instance_label("apu", &[], 0), "Apu 1");
    }

    #[test]
    fn test_registry_reports_collisions() {
        let mut registry = IdRegistry::new();
        assert!(registry.register("msn"));
        assert!(!registry.register("msn"));
        assert_eq!(registry.ids(), ["msn".to_string()]);
        assert_eq!(registry.collisions(), ["msn".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_instance_ids_distinct(
            groups in proptest::collection::hash_set("[a-z]{1,6}", 1..4),
            fields in proptest::collection::hash_set("[a-z]{1,6}", 1..4),
            count in 1usize..5,
        ) {
            let mut registry = IdRegistry::new();
            for group in &groups {
                for i in 0..count {
                    let prefix = instance_prefix(group, i);
                    for field in &fields {
                        registry.register(&resolve_field_id(Some(&prefix), field));
                    }
                }
            }
            prop_assert!(registry.collisions().is_empty());
            prop_assert_eq!(registry.ids().len(), groups.len() * count * fields.len());
        }
    }
}
