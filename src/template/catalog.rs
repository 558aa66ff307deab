//! Per-variant template catalog.
//!
//! Templates arrive as one JSON document keyed by variant name
//! (`{"ATR": {...}, "A320": {...}}`). Each variant is parsed on its own, so
//! a malformed variant is dropped without taking the others with it.
//! Lookups of a missing variant fail; nothing is ever partially rendered
//! from a guessed template.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{FormError, Result};

use super::schema::Template;

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: IndexMap<String, Template>,
    loaded: bool,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.load_json(json)?;
        Ok(catalog)
    }

    /// Replace the catalog with the variants in `json`.
    ///
    /// A document that is not an object keyed by variant leaves the catalog
    /// unchanged. Variants that fail to parse are logged and skipped.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let document: IndexMap<String, Value> = serde_json::from_str(json).map_err(|e| {
            log::warn!("TEMPLATE_LOAD_FAILED error={}", e);
            FormError::InvalidTemplate(e)
        })?;

        let mut templates = IndexMap::with_capacity(document.len());
        for (variant, raw) in document {
            match serde_json::from_value::<Template>(raw) {
                Ok(template) => {
                    templates.insert(variant, template);
                }
                Err(e) => log::warn!("TEMPLATE_VARIANT_SKIPPED variant={} error={}", variant, e),
            }
        }

        self.templates = templates;
        self.loaded = true;

        log::info!(
            "TEMPLATE_CATALOG_LOADED variants={:?} section_counts={:?}",
            self.variants(),
            self.templates
                .iter()
                .map(|(v, t)| (v.as_str(), t.sections.len()))
                .collect::<Vec<_>>()
        );
        Ok(())
    }

    pub fn insert(&mut self, variant: &str, template: Template) {
        self.templates.insert(variant.to_string(), template);
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn variants(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn template(&self, variant: &str) -> Result<&Template> {
        if !self.loaded {
            log::warn!("TEMPLATE_CATALOG_NOT_LOADED variant={}", variant);
            return Err(FormError::TemplatesNotLoaded);
        }

        self.templates.get(variant).ok_or_else(|| {
            log::warn!(
                "TEMPLATE_NOT_FOUND variant={} known={:?}",
                variant,
                self.variants()
            );
            FormError::SchemaNotFound {
                variant: variant.to_string(),
            }
        })
    }

    pub fn clear(&mut self) {
        self.templates.clear();
        self.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "ATR": {"sections": {"header": {"fields": [{"id": "msn", "type": "text"}]}}},
        "A320": {"sections": {}}
    }"#;

    #[test]
    fn test_lookup() {
        let catalog = TemplateCatalog::from_json(DOC).unwrap();
        assert_eq!(catalog.variants(), vec!["ATR", "A320"]);
        assert!(catalog.template("ATR").unwrap().section("header").is_some());
    }

    #[test]
    fn test_missing_variant() {
        let catalog = TemplateCatalog::from_json(DOC).unwrap();
        let err = catalog.template("B737").unwrap_err();
        assert!(matches!(err, FormError::SchemaNotFound { ref variant } if variant == "B737"));
    }

    #[test]
    fn test_not_loaded() {
        let catalog = TemplateCatalog::new();
        assert!(matches!(
            catalog.template("ATR"),
            Err(FormError::TemplatesNotLoaded)
        ));
    }

    #[test]
    fn test_bad_document_keeps_previous() {
        let mut catalog = TemplateCatalog::from_json(DOC).unwrap();
        assert!(catalog.load_json("{not json").is_err());
        assert!(catalog.template("ATR").is_ok());
    }

    #[test]
    fn test_malformed_variant_keeps_the_others() {
        let catalog = TemplateCatalog::from_json(
            r#"{
                "ATR": {"sections": "not a map"},
                "A320": {"sections": {"header": {"fields": [{"id": "msn", "type": "text"}]}}}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.variants(), vec!["A320"]);
        assert!(matches!(
            catalog.template("ATR"),
            Err(FormError::SchemaNotFound { .. })
        ));
    }

    #[test]
    fn test_location_component_name_and_untyped_field_load() {
        let catalog = TemplateCatalog::from_json(
            r#"{
                "ATR": {"sections": {"section4": {"locations": {
                    "engines_area": {
                        "title": "Engines",
                        "component": "engines",
                        "fields": [{"id": "serial", "type": "text"}, {"id": "note", "label": "Note"}]
                    }
                }}}},
                "A320": {"sections": {}}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.variants(), vec!["ATR", "A320"]);

        let location = &catalog.template("ATR").unwrap().sections["section4"].locations["engines_area"];
        let group = location.component_group("engines_area").unwrap();
        assert_eq!(group.component, "engines");
        assert_eq!(group.fields.len(), 2);
    }
}
