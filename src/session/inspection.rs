//! Inspection session.
//!
//! Owns the field store, the renderer and (after a render) the live form of
//! one project. Validation never blocks saving or submission.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::FormConfig;
use crate::error::Result;
use crate::fields::binding::bind_container;
use crate::fields::store::FieldStore;
use crate::render::form::{FieldValidation, RenderedForm};
use crate::render::renderer::FormRenderer;
use crate::runtime::services::Services;
use crate::storage::models::{FormSnapshot, SaveStatus};
use crate::template::catalog::TemplateCatalog;
use crate::ui::builder::{NodeId, UiBuilder};
use crate::validation::engine::{FormValidation, Validator};

use super::context::SessionContext;

pub const STATUS_FIELD: &str = "status";
pub const SUBMITTED_AT_FIELD: &str = "submittedAt";
pub const STATUS_SUBMITTED: &str = "SUBMITTED";

/// Outcome of a submission. The validation is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub submitted_at: DateTime<Utc>,
    pub validation: FormValidation,
}

pub struct InspectionSession {
    context: SessionContext,
    services: Services,
    store: FieldStore,
    renderer: FormRenderer,
    validator: Validator,
    form: Option<RenderedForm>,
}

impl std::fmt::Debug for InspectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectionSession")
            .field("context", &self.context)
            .field("rendered", &self.form.is_some())
            .finish_non_exhaustive()
    }
}

impl InspectionSession {
    pub fn open(context: SessionContext, config: FormConfig, services: Services, ui: Arc<dyn UiBuilder>) -> Self {
        let store = FieldStore::open(&context.project_id, &config, services.clone());
        let validator = Validator::new(services.clock.clone());
        let renderer = FormRenderer::new(ui, store.clone(), config).with_validator(validator.clone());

        log::info!(
            "{} SESSION_OPENED session_id={} variant={} fields={}",
            context.log_context(),
            context.session_id,
            context.variant,
            store.len()
        );

        Self {
            context,
            services,
            store,
            renderer,
            validator,
            form: None,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn form(&self) -> Option<&RenderedForm> {
        self.form.as_ref()
    }

    /// Render the session's variant. A previous render is replaced; a
    /// missing variant leaves it in place.
    pub fn render(&mut self, catalog: &TemplateCatalog) -> Result<&RenderedForm> {
        self.render_inner(catalog, false)
    }

    /// Render with every single-value control annotated by the validator.
    pub fn render_with_validation(&mut self, catalog: &TemplateCatalog) -> Result<&RenderedForm> {
        self.render_inner(catalog, true)
    }

    fn render_inner(&mut self, catalog: &TemplateCatalog, annotate: bool) -> Result<&RenderedForm> {
        let ctx = self.context.render_context(annotate);
        let form = self.renderer.render_variant(catalog, &self.context.variant, &ctx)?;
        Ok(&*self.form.insert(form))
    }

    /// Persist controls the host added under `root` outside the template.
    /// Returns how many were newly bound.
    pub fn bind_container(&self, root: NodeId) -> usize {
        bind_container(&self.store, self.renderer.ui(), root)
    }

    /// Explicit save: flush now instead of waiting for the debounce.
    pub fn save_now(&self) -> Result<SaveStatus> {
        self.store.flush()?;
        log::info!("{} SESSION_SAVED session_id={}", self.context.log_context(), self.context.session_id);
        Ok(self.store.save_status())
    }

    /// Whole-form consistency over the current values.
    pub fn validate(&self) -> FormValidation {
        self.validator
            .validate_form(&self.store.get_all(), &self.context.validation_context())
    }

    /// Field rules for every rendered leaf. Empty before a render.
    pub fn validate_fields(&self) -> Vec<FieldValidation> {
        match &self.form {
            Some(form) => form.validate_fields(&self.validator, &self.context.validation_context()),
            None => Vec::new(),
        }
    }

    /// Mark the report submitted and persist immediately.
    pub fn submit(&self) -> Result<SubmitReceipt> {
        let validation = self.validate();
        let submitted_at = self.services.clock.now();

        self.store.set_multiple([
            (STATUS_FIELD, STATUS_SUBMITTED.to_string()),
            (
                SUBMITTED_AT_FIELD,
                submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ]);
        self.store.flush()?;

        log::info!(
            "{} REPORT_SUBMITTED session_id={} advisory_valid={} warnings={}",
            self.context.log_context(),
            self.context.session_id,
            validation.valid,
            validation.warnings.len()
        );

        Ok(SubmitReceipt {
            submitted_at,
            validation,
        })
    }

    pub fn is_submitted(&self) -> bool {
        self.store.get_str(STATUS_FIELD) == STATUS_SUBMITTED
    }

    /// Field values plus the photos of every rendered location.
    pub fn export_snapshot(&self) -> FormSnapshot {
        let photos: BTreeMap<_, _> = self
            .form
            .iter()
            .flat_map(|form| form.media_stores().iter())
            .map(|(location, store)| (location.clone(), store.get_all()))
            .collect();

        log::info!(
            "{} SNAPSHOT_EXPORTED fields={} locations={}",
            self.context.log_context(),
            self.store.len(),
            photos.len()
        );

        FormSnapshot {
            project_id: self.context.project_id.clone(),
            variant: self.context.variant.clone(),
            fields: self.store.get_all(),
            photos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormError;
    use crate::media::store::PhotoFile;
    use crate::runtime::clock::FixedClock;
    use crate::runtime::scheduler::TimerQueue;
    use crate::storage::backend::{KeyValueStorage, MemoryStorage};
    use crate::template::schema::ComponentCounts;
    use crate::ui::tree::UiTree;
    use chrono::NaiveDate;

    const CATALOG: &str = r#"{
        "ATR": {
            "sections": {
                "header": {"fields": [
                    {"id": "msn", "label": "MSN", "type": "text", "required": true},
                    {"id": "inspection_report_date", "type": "date"}
                ]},
                "section4": {
                    "metadata": {"fields": [{"id": "physical_inspection_date", "type": "date"}]},
                    "locations": {"nose": {"title": "Nose", "photos": {"required": true, "count": 1},
                        "component": {"id": "engine", "component": "engines",
                                      "fields": [{"id": "serial", "type": "text"}]}}}
                }
            }
        }
    }"#;

    fn session(storage: Arc<MemoryStorage>) -> (InspectionSession, Arc<UiTree>) {
        let clock = FixedClock::on_date(NaiveDate::from_ymd_opt(2026, 5, 10).unwrap());
        let services = Services::new(storage, Arc::new(TimerQueue::new())).with_clock(Arc::new(clock));
        let tree = Arc::new(UiTree::new());
        let ctx = SessionContext::new("P-9", "ATR")
            .with_expected_msn("1234")
            .with_components(ComponentCounts::new().with_count("engines", 2));
        (InspectionSession::open(ctx, FormConfig::default(), services, tree.clone()), tree)
    }

    #[test]
    fn test_render_and_snapshot() {
        let (mut session, tree) = session(Arc::new(MemoryStorage::new()));
        let catalog = TemplateCatalog::from_json(CATALOG).unwrap();
        let form = session.render(&catalog).unwrap();
        tree.type_text(form.control("engine_1_serial").unwrap(), "PCE-2");
        form.add_photos("nose", vec![PhotoFile::new("n.jpg", "image/jpeg", vec![7])]);

        let snapshot = session.export_snapshot();
        assert_eq!(snapshot.variant, "ATR");
        assert_eq!(snapshot.fields["engine_1_serial"], "PCE-2");
        assert_eq!(snapshot.photos["nose"].len(), 1);
    }

    #[test]
    fn test_missing_variant_keeps_session_unrendered() {
        let (mut session, tree) = session(Arc::new(MemoryStorage::new()));
        let catalog = TemplateCatalog::from_json(r#"{"A320": {"sections": {}}}"#).unwrap();
        let err = session.render(&catalog).unwrap_err();
        assert!(matches!(err, FormError::SchemaNotFound { .. }));
        assert!(session.form().is_none());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn test_submit_never_blocked_by_validation() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, _) = session(storage.clone());
        session.store().set("msn", "9999");

        let receipt = session.submit().unwrap();
        assert!(!receipt.validation.valid);
        assert!(session.is_submitted());
        assert_eq!(session.store().get_str(SUBMITTED_AT_FIELD), "2026-05-10T00:00:00.000Z");

        let raw = storage.get_item("dae_inspection_data_P-9").unwrap();
        assert!(raw.contains("SUBMITTED"));
    }

    #[test]
    fn test_host_controls_persist_after_bind_container() {
        let (mut session, tree) = session(Arc::new(MemoryStorage::new()));
        let catalog = TemplateCatalog::from_json(CATALOG).unwrap();
        let root = session.render(&catalog).unwrap().root();

        let extra = tree.create_node("input");
        tree.set_attribute(extra, "id", "inspector_notes");
        tree.append_child(root, extra);

        assert_eq!(session.bind_container(root), 1);
        tree.type_text(extra, "hangar 3");
        assert_eq!(session.store().get_str("inspector_notes"), "hangar 3");
    }

    #[test]
    fn test_save_now_flushes_pending_edits() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, _) = session(storage.clone());
        session.store().set("msn", "1234");
        assert!(session.store().has_pending_flush());

        let status = session.save_now().unwrap();
        assert!(status.has_data);
        assert!(status.last_saved.is_some());
        assert!(!session.store().has_pending_flush());
        assert!(storage.get_item("dae_inspection_data_P-9").is_some());
    }

    #[test]
    fn test_validate_fields_after_render() {
        let (mut session, _) = session(Arc::new(MemoryStorage::new()));
        assert!(session.validate_fields().is_empty());

        let catalog = TemplateCatalog::from_json(CATALOG).unwrap();
        session.render_with_validation(&catalog).unwrap();
        let results = session.validate_fields();
        let msn = results.iter().find(|r| r.field_id == "msn").unwrap();
        assert!(!msn.result.valid);
    }
}
