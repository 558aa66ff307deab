//! Render inputs and outputs.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::fields::store::FieldStore;
use crate::media::store::{MediaStore, PhotoFile};
use crate::storage::models::{PhotoRecord, RequirementStatus};
use crate::template::schema::{ComponentCounts, FieldDef, FieldType};
use crate::ui::builder::{NodeId, UiBuilder};
use crate::validation::engine::{ValidationContext, ValidationResult, Validator};

use super::ids::checkbox_option_id;
use super::photos::{refresh_photo_slot, PhotoSlot};

/// Per-instance facts threaded through one render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Unit counts for component groups. Falls back to the template's own.
    pub components: Option<ComponentCounts>,
    /// When set, single-value controls are annotated on render and on change.
    pub validation: Option<ValidationContext>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_components(mut self, components: ComponentCounts) -> Self {
        self.components = Some(components);
        self
    }

    pub fn with_validation(mut self, validation: ValidationContext) -> Self {
        self.validation = Some(validation);
        self
    }
}

/// One rendered leaf field.
#[derive(Debug, Clone)]
pub struct RenderedField {
    pub resolved_id: String,
    pub def: FieldDef,
    pub controls: Vec<NodeId>,
    pub feedback: Option<NodeId>,
}

impl RenderedField {
    /// The value the validator sees. Checked checkbox options are joined
    /// with `,`.
    pub fn current_value(&self, store: &FieldStore) -> String {
        match self.def.field_type {
            FieldType::Checkbox => self
                .def
                .options
                .iter()
                .map(|option| store.get_str(&checkbox_option_id(&self.resolved_id, option)))
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(","),
            _ => store.get_str(&self.resolved_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidation {
    pub field_id: String,
    pub result: ValidationResult,
}

/// A live form: the UI subtree plus every binding and media store it made.
pub struct RenderedForm {
    pub(crate) root: NodeId,
    pub(crate) ui: Arc<dyn UiBuilder>,
    pub(crate) store: FieldStore,
    pub(crate) field_ids: Vec<String>,
    pub(crate) collisions: Vec<String>,
    pub(crate) bindings: IndexMap<String, Vec<NodeId>>,
    pub(crate) fields: Vec<RenderedField>,
    pub(crate) media: IndexMap<String, MediaStore>,
    pub(crate) slots: IndexMap<String, PhotoSlot>,
}

impl std::fmt::Debug for RenderedForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedForm")
            .field("root", &self.root)
            .field("fields", &self.field_ids.len())
            .field("collisions", &self.collisions)
            .field("media", &self.media.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RenderedForm {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Every bound field id in render order.
    pub fn field_ids(&self) -> &[String] {
        &self.field_ids
    }

    pub fn has_field(&self, field_id: &str) -> bool {
        self.bindings.contains_key(field_id)
    }

    /// Ids registered more than once during the render.
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    /// Controls bound to `field_id`. Radio groups return every member.
    pub fn controls(&self, field_id: &str) -> &[NodeId] {
        self.bindings.get(field_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First control bound to `field_id`.
    pub fn control(&self, field_id: &str) -> Option<NodeId> {
        self.controls(field_id).first().copied()
    }

    pub fn fields(&self) -> &[RenderedField] {
        &self.fields
    }

    pub fn media(&self, location_id: &str) -> Option<&MediaStore> {
        self.media.get(location_id)
    }

    pub fn media_stores(&self) -> &IndexMap<String, MediaStore> {
        &self.media
    }

    pub fn photo_slot(&self, location_id: &str) -> Option<&PhotoSlot> {
        self.slots.get(location_id)
    }

    /// Ingest files picked at a location's capture input and redraw its grid.
    pub fn add_photos(&self, location_id: &str, files: Vec<PhotoFile>) -> Vec<PhotoRecord> {
        let Some(store) = self.media.get(location_id) else {
            log::warn!("PHOTO_LOCATION_UNKNOWN location={}", location_id);
            return Vec::new();
        };
        let added = store.add_photos(files);
        self.refresh_photo_grid(location_id);
        added
    }

    pub fn delete_photo(&self, location_id: &str, photo_id: &str) -> bool {
        let deleted = self
            .media
            .get(location_id)
            .map(|store| store.delete_photo(photo_id))
            .unwrap_or(false);
        if deleted {
            self.refresh_photo_grid(location_id);
        }
        deleted
    }

    /// Redraw a location's grid and reminder from its media store.
    pub fn refresh_photo_grid(&self, location_id: &str) -> bool {
        match (self.slots.get(location_id), self.media.get(location_id)) {
            (Some(slot), Some(store)) => {
                refresh_photo_slot(&self.ui, slot, store);
                true
            }
            _ => false,
        }
    }

    /// Requirement status of every location whose photos are required.
    pub fn photo_requirements(&self) -> Vec<(String, RequirementStatus)> {
        self.slots
            .iter()
            .filter_map(|(location, slot)| {
                let reminder = slot.reminder?;
                let store = self.media.get(location)?;
                Some((location.clone(), store.check_requirements(reminder.required)))
            })
            .collect()
    }

    /// Validate every rendered leaf against the current store values.
    pub fn validate_fields(&self, validator: &Validator, ctx: &ValidationContext) -> Vec<FieldValidation> {
        self.fields
            .iter()
            .map(|field| {
                let mut def = field.def.clone();
                def.id = field.resolved_id.clone();
                FieldValidation {
                    field_id: field.resolved_id.clone(),
                    result: validator.validate_field(&def, &field.current_value(&self.store), ctx),
                }
            })
            .collect()
    }
}
