//! Form interpreter.
//!
//! Walks a template depth first and, for every leaf, creates the control,
//! derives its resolved id and binds it to the field store. Section order:
//! title, description, direct fields, metadata, subsections, locations,
//! section table, section photos.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::FormConfig;
use crate::error::Result;
use crate::fields::binding::bind_control;
use crate::fields::store::FieldStore;
use crate::logging::structured::LogContext;
use crate::media::store::MediaStore;
use crate::storage::keys::table_cell_key;
use crate::template::catalog::TemplateCatalog;
use crate::template::schema::{
    ComponentCounts, ComponentGroupDef, FieldDef, FieldType, Location, Section, Subsection, TableDef,
    Template,
};
use crate::ui::builder::{
    ControlEvent, EventKind, NodeId, UiBuilder, ATTR_CLASS, ATTR_ID, ATTR_NAME, ATTR_TYPE,
    ATTR_VALUE,
};
use crate::validation::engine::{ValidationContext, Validator};

use super::form::{RenderContext, RenderedField, RenderedForm};
use super::ids::{
    checkbox_option_id, instance_label, instance_prefix, location_dom_id, resolve_field_id,
    table_id, IdRegistry,
};
use super::photos::{render_photo_section, render_reminder, PhotoSlot};

pub const DEFAULT_TEXTAREA_ROWS: u32 = 3;
pub const ATTR_COMPONENT: &str = "data-component";
pub const ATTR_INSTANCE_PREFIX: &str = "data-instance-prefix";
pub const ATTR_LOCATION: &str = "data-location";
pub const ATTR_TABLE_ID: &str = "data-table-id";
pub const CLASS_REQUIRED_MARKER: &str = "required-marker";

/// Renders templates into a UI tree bound to one field store.
#[derive(Clone)]
pub struct FormRenderer {
    ui: Arc<dyn UiBuilder>,
    store: FieldStore,
    config: FormConfig,
    validator: Validator,
}

impl std::fmt::Debug for FormRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRenderer")
            .field("project_id", &self.store.project_id())
            .finish_non_exhaustive()
    }
}

impl FormRenderer {
    pub fn new(ui: Arc<dyn UiBuilder>, store: FieldStore, config: FormConfig) -> Self {
        let validator = Validator::new(store.services().clock.clone());
        Self {
            ui,
            store,
            config,
            validator,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn ui(&self) -> &Arc<dyn UiBuilder> {
        &self.ui
    }

    /// Look up `variant` and render it. A missing variant creates no nodes.
    pub fn render_variant(&self, catalog: &TemplateCatalog, variant: &str, ctx: &RenderContext) -> Result<RenderedForm> {
        let log_ctx = LogContext::new(self.store.project_id());
        let template = catalog.template(variant).map_err(|e| {
            log::warn!("{} RENDER_ABORTED variant={} error={}", log_ctx, variant, e);
            e
        })?;
        Ok(self.render(template, ctx))
    }

    pub fn render(&self, template: &Template, ctx: &RenderContext) -> RenderedForm {
        let counts = ctx
            .components
            .clone()
            .or_else(|| template.components.clone())
            .unwrap_or_default();

        let mut pass = RenderPass {
            renderer: self,
            validation: ctx.validation.clone(),
            counts,
            registry: IdRegistry::new(),
            bindings: IndexMap::new(),
            fields: Vec::new(),
            media: IndexMap::new(),
            slots: IndexMap::new(),
            log_ctx: LogContext::new(self.store.project_id()),
        };

        let root = self.ui.create_node("div");
        self.ui.set_attribute(root, ATTR_CLASS, "inspection-form");
        for (key, section) in &template.sections {
            pass.render_section(root, key, section);
        }
        pass.finish(root)
    }
}

/// State of one render.
struct RenderPass<'a> {
    renderer: &'a FormRenderer,
    validation: Option<ValidationContext>,
    counts: ComponentCounts,
    registry: IdRegistry,
    bindings: IndexMap<String, Vec<NodeId>>,
    fields: Vec<RenderedField>,
    media: IndexMap<String, MediaStore>,
    slots: IndexMap<String, PhotoSlot>,
    log_ctx: LogContext,
}

impl<'a> RenderPass<'a> {
    fn ui(&self) -> &'a Arc<dyn UiBuilder> {
        &self.renderer.ui
    }

    fn finish(self, root: NodeId) -> RenderedForm {
        let (field_ids, collisions) = self.registry.into_parts();
        log::info!(
            "{} FORM_RENDERED fields={} locations={} collisions={}",
            self.log_ctx,
            field_ids.len(),
            self.slots.len(),
            collisions.len()
        );
        RenderedForm {
            root,
            ui: self.renderer.ui.clone(),
            store: self.renderer.store.clone(),
            field_ids,
            collisions,
            bindings: self.bindings,
            fields: self.fields,
            media: self.media,
            slots: self.slots,
        }
    }

    fn render_section(&mut self, parent: NodeId, key: &str, section: &Section) {
        let ui = self.ui();
        let node = ui.create_node("section");
        ui.set_attribute(node, ATTR_ID, &format!("section-{}", key));
        ui.set_attribute(node, ATTR_CLASS, "form-section");

        if let Some(title) = &section.title {
            ui.append_text(node, "h3", title);
        }
        if let Some(description) = &section.description {
            ui.append_text(node, "p", description);
        }

        if !section.fields.is_empty() {
            let container = self.container(node, "section-fields");
            self.render_fields(container, &section.fields, None);
        }

        if let Some(metadata) = &section.metadata {
            let container = self.container(node, "section-metadata");
            self.render_fields(container, &metadata.fields, None);
        }

        for (sub_key, subsection) in &section.subsections {
            self.render_subsection(node, sub_key, subsection);
        }

        for (location_key, location) in &section.locations {
            self.render_location(node, key, location_key, location);
        }

        if let Some(table) = section.table() {
            let id = table_id(section.title.as_deref(), key);
            self.render_table(node, &table, &id);
        }

        if let Some(photos) = &section.photos {
            let media_key = self.claim_photo_key(key, key);
            let store = self.media_store(&media_key);
            let mut slot = PhotoSlot::new(&media_key);
            if photos.required {
                slot.reminder = Some(render_reminder(ui.as_ref(), node, photos, &store));
            }
            render_photo_section(ui, node, &mut slot, &store);
            self.slots.insert(media_key, slot);
        }

        ui.append_child(parent, node);
    }

    fn render_subsection(&mut self, parent: NodeId, key: &str, subsection: &Subsection) {
        let ui = self.ui();
        let node = ui.create_node("div");
        ui.set_attribute(node, ATTR_CLASS, "subsection");

        if let Some(title) = &subsection.title {
            ui.append_text(node, "h4", title);
        }
        if let Some(description) = &subsection.description {
            ui.append_text(node, "p", description);
        }

        if !subsection.fields.is_empty() {
            let container = self.container(node, "subsection-fields");
            self.render_fields(container, &subsection.fields, None);
        }

        if let Some(table) = subsection.table() {
            let id = table_id(subsection.title.as_deref(), key);
            self.render_table(node, &table, &id);
        }

        ui.append_child(parent, node);
    }

    fn render_location(&mut self, parent: NodeId, section_key: &str, key: &str, location: &Location) {
        let ui = self.ui();
        let title = if location.title.is_empty() {
            key
        } else {
            location.title.as_str()
        };

        let node = ui.create_node("div");
        ui.set_attribute(node, ATTR_ID, &location_dom_id(title));
        ui.set_attribute(node, ATTR_CLASS, "location");
        ui.append_text(node, "h4", title);
        if let Some(description) = &location.description {
            ui.append_text(node, "p", description);
        }

        let media_key = match location.photos {
            Some(_) => self.claim_photo_key(section_key, key),
            None => key.to_string(),
        };
        ui.set_attribute(node, ATTR_LOCATION, &media_key);

        let photos = location
            .photos
            .as_ref()
            .map(|requirement| (requirement, self.media_store(&media_key)));
        let mut slot = PhotoSlot::new(&media_key);

        if let Some((requirement, store)) = &photos {
            if requirement.required {
                slot.reminder = Some(render_reminder(ui.as_ref(), node, requirement, store));
            }
        }

        let direct = location.direct_fields();
        if !direct.is_empty() {
            let container = self.container(node, "location-fields");
            self.render_fields(container, direct, None);
        }

        if let Some(group) = location.component_group(key) {
            self.render_component_group(node, &group, None);
        }

        if let Some((_, store)) = &photos {
            render_photo_section(ui, node, &mut slot, store);
            self.slots.insert(media_key, slot);
        }

        ui.append_child(parent, node);
    }

    /// Media key for a photo-bearing node. The first node to use a key keeps
    /// it; later ones are qualified by their section so stores never merge.
    fn claim_photo_key(&self, section_key: &str, key: &str) -> String {
        if !self.media.contains_key(key) {
            return key.to_string();
        }

        let mut claimed = format!("{}_{}", section_key, key);
        let mut suffix = 1;
        while self.media.contains_key(&claimed) {
            suffix += 1;
            claimed = format!("{}_{}_{}", section_key, key, suffix);
        }
        log::warn!(
            "{} PHOTO_LOCATION_COLLISION location={} section={} stored_as={}",
            self.log_ctx,
            key,
            section_key,
            claimed
        );
        claimed
    }

    fn media_store(&mut self, location_id: &str) -> MediaStore {
        let renderer = self.renderer;
        self.media
            .entry(location_id.to_string())
            .or_insert_with(|| {
                MediaStore::open(
                    renderer.store.project_id(),
                    location_id,
                    &renderer.config,
                    renderer.store.services().clone(),
                )
            })
            .clone()
    }

    fn container(&self, parent: NodeId, class: &str) -> NodeId {
        let ui = self.ui();
        let node = ui.create_node("div");
        ui.set_attribute(node, ATTR_CLASS, class);
        ui.append_child(parent, node);
        node
    }

    fn render_fields(&mut self, parent: NodeId, fields: &[FieldDef], prefix: Option<&str>) {
        for field in fields {
            self.render_field(parent, field, prefix);
        }
    }

    fn render_field(&mut self, parent: NodeId, field: &FieldDef, prefix: Option<&str>) {
        match field.field_type {
            FieldType::ComponentGroup => match field.as_component_group() {
                Some(group) => self.render_component_group(parent, &group, prefix),
                None => log::warn!(
                    "{} COMPONENT_GROUP_INVALID field_id={} reason=missing_component",
                    self.log_ctx,
                    field.id
                ),
            },
            FieldType::Unsupported => {
                log::debug!("{} FIELD_TYPE_UNSUPPORTED field_id={}", self.log_ctx, field.id);
            }
            _ => self.render_control(parent, field, prefix),
        }
    }

    /// Repeat `group.fields` once per unit, each under `<groupId>_<i>`.
    fn render_component_group(&mut self, parent: NodeId, group: &ComponentGroupDef, prefix: Option<&str>) {
        let ui = self.ui();
        let group_id = resolve_field_id(prefix, &group.id);
        let count = self.counts.count(&group.component);
        let labels = self.counts.labels(&group.component).to_vec();

        let node = ui.create_node("div");
        ui.set_attribute(node, ATTR_CLASS, "component-group");
        ui.set_attribute(node, ATTR_COMPONENT, &group.component);
        if let Some(label) = &group.label {
            ui.append_text(node, "div", label);
        }

        if count == 0 {
            log::debug!(
                "{} COMPONENT_GROUP_EMPTY group_id={} component={}",
                self.log_ctx,
                group_id,
                group.component
            );
        }

        for index in 0..count {
            let instance = ui.create_node("div");
            let prefix = instance_prefix(&group_id, index);
            ui.set_attribute(instance, ATTR_CLASS, "component-instance");
            ui.set_attribute(instance, ATTR_INSTANCE_PREFIX, &prefix);
            ui.append_text(instance, "div", &instance_label(&group.component, &labels, index));
            self.render_fields(instance, &group.fields, Some(&prefix));
            ui.append_child(node, instance);
        }

        ui.append_child(parent, node);
    }

    fn render_table(&mut self, parent: NodeId, table: &TableDef, id: &str) {
        let ui = self.ui();
        let wrapper = ui.create_node("div");
        ui.set_attribute(wrapper, ATTR_CLASS, "table-wrapper");
        ui.set_attribute(wrapper, ATTR_TABLE_ID, id);

        let grid = ui.create_node("table");
        let head = ui.create_node("thead");
        let header_row = ui.create_node("tr");
        for column in &table.columns {
            ui.append_text(header_row, "th", column);
        }
        ui.append_child(head, header_row);
        ui.append_child(grid, head);

        let body = ui.create_node("tbody");
        for row in 0..table.rows {
            let tr = ui.create_node("tr");
            for col in 0..table.columns.len() {
                let cell_id = table_cell_key(id, row, col);
                let td = ui.create_node("td");
                let input = ui.create_node("input");
                ui.set_attribute(input, ATTR_TYPE, "text");
                ui.set_attribute(input, ATTR_ID, &cell_id);
                ui.set_attribute(input, ATTR_NAME, &cell_id);
                ui.append_child(td, input);
                ui.append_child(tr, td);
                self.bind(input, &cell_id);
            }
            ui.append_child(body, tr);
        }
        ui.append_child(grid, body);
        ui.append_child(wrapper, grid);
        ui.append_child(parent, wrapper);
    }

    /// Label plus the control(s) for one leaf.
    fn render_control(&mut self, parent: NodeId, field: &FieldDef, prefix: Option<&str>) {
        let ui = self.ui();
        let resolved_id = resolve_field_id(prefix, &field.id);

        let wrapper = ui.create_node("div");
        ui.set_attribute(wrapper, ATTR_CLASS, "field");
        if let Some(label) = &field.label {
            let label_node = ui.append_text(wrapper, "label", label);
            ui.set_attribute(label_node, "for", &resolved_id);
            if field.required {
                let marker = ui.append_text(label_node, "span", "*");
                ui.set_attribute(marker, ATTR_CLASS, CLASS_REQUIRED_MARKER);
            }
        }

        let mut rendered = RenderedField {
            resolved_id: resolved_id.clone(),
            def: field.clone(),
            controls: Vec::new(),
            feedback: None,
        };

        match field.field_type {
            FieldType::Radio => {
                let group = self.container(wrapper, "radio-group");
                self.registry_add(&resolved_id);
                for option in &field.options {
                    let input = self.choice(group, "radio", option);
                    ui.set_attribute(input, ATTR_NAME, &resolved_id);
                    self.bind_unregistered(input, &resolved_id);
                    rendered.controls.push(input);
                }
            }
            FieldType::Checkbox => {
                let group = self.container(wrapper, "checkbox-group");
                for option in &field.options {
                    let option_id = checkbox_option_id(&resolved_id, option);
                    let input = self.choice(group, "checkbox", option);
                    ui.set_attribute(input, ATTR_ID, &option_id);
                    self.bind(input, &option_id);
                    rendered.controls.push(input);
                }
            }
            _ => {
                let input = self.single_control(field);
                ui.set_attribute(input, ATTR_ID, &resolved_id);
                ui.set_attribute(input, ATTR_NAME, &resolved_id);
                if field.required {
                    ui.set_attribute(input, "required", "true");
                }
                ui.append_child(wrapper, input);
                self.bind(input, &resolved_id);
                rendered.controls.push(input);

                if let Some(validation) = self.validation.clone() {
                    let feedback = self.container(wrapper, "field-feedback");
                    self.annotate(input, feedback, field, &resolved_id, validation);
                    rendered.feedback = Some(feedback);
                }
            }
        }

        ui.append_child(parent, wrapper);
        self.fields.push(rendered);
    }

    /// Text, date, textarea or number control.
    fn single_control(&self, field: &FieldDef) -> NodeId {
        let ui = self.ui();
        let node = match field.field_type {
            FieldType::Textarea => {
                let node = ui.create_node("textarea");
                let rows = field.rows.unwrap_or(DEFAULT_TEXTAREA_ROWS);
                ui.set_attribute(node, "rows", &rows.to_string());
                node
            }
            FieldType::Number => {
                let node = ui.create_node("input");
                ui.set_attribute(node, ATTR_TYPE, "number");
                if let Some(min) = field.min {
                    ui.set_attribute(node, "min", &min.to_string());
                }
                if let Some(max) = field.max {
                    ui.set_attribute(node, "max", &max.to_string());
                }
                node
            }
            other => {
                let node = ui.create_node("input");
                ui.set_attribute(node, ATTR_TYPE, other.as_str());
                node
            }
        };
        if let Some(placeholder) = &field.placeholder {
            if field.field_type != FieldType::Number {
                ui.set_attribute(node, "placeholder", placeholder);
            }
        }
        node
    }

    /// One labelled radio or checkbox member inside `group`.
    fn choice(&self, group: NodeId, control_type: &str, option: &str) -> NodeId {
        let ui = self.ui();
        let label = ui.create_node("label");
        let input = ui.create_node("input");
        ui.set_attribute(input, ATTR_TYPE, control_type);
        ui.set_attribute(input, ATTR_VALUE, option);
        ui.append_child(label, input);
        ui.append_text(label, "span", option);
        ui.append_child(group, label);
        input
    }

    fn registry_add(&mut self, field_id: &str) {
        if !self.registry.register(field_id) {
            log::warn!("{} FIELD_ID_COLLISION field_id={}", self.log_ctx, field_id);
        }
    }

    fn bind(&mut self, control: NodeId, field_id: &str) {
        self.registry_add(field_id);
        self.bind_unregistered(control, field_id);
    }

    fn bind_unregistered(&mut self, control: NodeId, field_id: &str) {
        if bind_control(&self.renderer.store, self.ui(), control, field_id) {
            self.bindings
                .entry(field_id.to_string())
                .or_default()
                .push(control);
        }
    }

    /// Validate now and again on every change.
    fn annotate(
        &self,
        control: NodeId,
        feedback: NodeId,
        field: &FieldDef,
        resolved_id: &str,
        validation: ValidationContext,
    ) {
        let ui = self.ui();
        let mut def = field.clone();
        def.id = resolved_id.to_string();
        let validator = self.renderer.validator.clone();
        validator.apply_validation(ui.as_ref(), control, feedback, &def, &validation);

        let weak = Arc::downgrade(ui);
        ui.add_listener(
            control,
            EventKind::Change,
            Box::new(move |_: &ControlEvent| {
                if let Some(ui) = weak.upgrade() {
                    validator.apply_validation(ui.as_ref(), control, feedback, &def, &validation);
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormError;
    use crate::media::store::PhotoFile;
    use crate::runtime::clock::FixedClock;
    use crate::runtime::scheduler::TimerQueue;
    use crate::runtime::services::Services;
    use crate::storage::backend::MemoryStorage;
    use crate::ui::builder::ATTR_CHECKED;
    use crate::ui::tree::UiTree;
    use chrono::NaiveDate;
    use serde_json::json;

    struct Fixture {
        tree: Arc<UiTree>,
        store: FieldStore,
        renderer: FormRenderer,
        timers: TimerQueue,
    }

    fn fixture_with(storage: Arc<MemoryStorage>) -> Fixture {
        let timers = TimerQueue::new();
        let clock = FixedClock::on_date(NaiveDate::from_ymd_opt(2026, 5, 10).unwrap());
        let services = Services::new(storage, Arc::new(timers.clone())).with_clock(Arc::new(clock));
        let config = FormConfig::default();
        let store = FieldStore::open("P-7", &config, services);
        let tree = Arc::new(UiTree::new());
        let ui: Arc<dyn UiBuilder> = tree.clone();
        let renderer = FormRenderer::new(ui, store.clone(), config);
        Fixture {
            tree,
            store,
            renderer,
            timers,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryStorage::new()))
    }

    fn template(value: serde_json::Value) -> Template {
        serde_json::from_value(value).unwrap()
    }

    fn engines_template() -> Template {
        template(json!({
            "sections": {
                "section2": {
                    "title": "Engines",
                    "subsections": {
                        "engines": {
                            "title": "Engine Data",
                            "fields": [
                                {"id": "engine", "type": "component_group", "component": "engines",
                                 "fields": [{"id": "serial", "label": "Serial", "type": "text"}]}
                            ]
                        }
                    }
                }
            }
        }))
    }

    #[test]
    fn test_component_group_ids_per_instance() {
        let f = fixture();
        let ctx = RenderContext::new().with_components(ComponentCounts::new().with_count("engines", 2));
        let form = f.renderer.render(&engines_template(), &ctx);

        assert_eq!(form.field_ids(), ["engine_0_serial".to_string(), "engine_1_serial".to_string()]);
        let first = form.control("engine_0_serial").unwrap();
        let second = form.control("engine_1_serial").unwrap();
        f.tree.type_text(first, "PCE-1");
        f.tree.type_text(second, "PCE-2");
        assert_eq!(f.store.get_str("engine_0_serial"), "PCE-1");
        assert_eq!(f.store.get_str("engine_1_serial"), "PCE-2");
    }

    #[test]
    fn test_component_labels_fall_back_to_ordinal() {
        let f = fixture();
        let counts = ComponentCounts::new()
            .with_count("engines", 3)
            .with_labels("engines", &["LH", "RH"]);
        let form = f.renderer.render(&engines_template(), &RenderContext::new().with_components(counts));
        let text = f.tree.text_content(form.root());
        assert!(text.contains("LH Engine"));
        assert!(text.contains("RH Engine"));
        assert!(text.contains("Engine 3"));
    }

    #[test]
    fn test_template_components_used_without_context() {
        let f = fixture();
        let mut tpl = engines_template();
        tpl.components = Some(ComponentCounts::new().with_count("engines", 1));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        assert_eq!(form.field_ids(), ["engine_0_serial".to_string()]);
    }

    #[test]
    fn test_checkbox_options_bound_independently() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"s": {"fields": [
                {"id": "findings", "label": "Findings", "type": "checkbox", "options": ["A", "B", "C"]}
            ]}}
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        f.tree.click(form.control("findings_A").unwrap());
        f.tree.click(form.control("findings_C").unwrap());
        f.timers.run_all();

        let all = f.store.get_all();
        assert_eq!(all.get("findings_A"), Some(&json!("A")));
        assert_eq!(all.get("findings_C"), Some(&json!("C")));
        assert!(!all.contains_key("findings_B"));
    }

    #[test]
    fn test_radio_group_single_binding_key() {
        let f = fixture();
        f.store.set("airworthy", "No");
        let tpl = template(json!({
            "sections": {"s": {"fields": [
                {"id": "airworthy", "type": "radio", "options": ["Yes", "No"], "required": true}
            ]}}
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());

        assert_eq!(form.field_ids(), ["airworthy".to_string()]);
        let members = form.controls("airworthy");
        assert_eq!(members.len(), 2);
        assert!(f.tree.attribute(members[1], ATTR_CHECKED).is_some());

        f.tree.click(members[0]);
        assert_eq!(f.store.get_str("airworthy"), "Yes");
        assert!(!f.tree.is_checked(members[1]));
    }

    #[test]
    fn test_control_attributes() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"header": {"fields": [
                {"id": "msn", "label": "MSN", "type": "text", "required": true, "placeholder": "e.g. 1234"},
                {"id": "remarks", "type": "textarea"},
                {"id": "cycles", "type": "number", "min": 0, "max": 99999},
                {"id": "signature", "type": "signature"}
            ]}}
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        let t = &f.tree;

        let msn = form.control("msn").unwrap();
        assert_eq!(t.attribute(msn, "placeholder").as_deref(), Some("e.g. 1234"));
        assert_eq!(t.attribute(msn, "required").as_deref(), Some("true"));
        assert!(t.find(form.root(), ATTR_CLASS, CLASS_REQUIRED_MARKER).is_some());

        let remarks = form.control("remarks").unwrap();
        assert_eq!(t.tag(remarks).as_deref(), Some("textarea"));
        assert_eq!(t.attribute(remarks, "rows").as_deref(), Some("3"));

        let cycles = form.control("cycles").unwrap();
        assert_eq!(t.attribute(cycles, "min").as_deref(), Some("0"));
        assert_eq!(t.attribute(cycles, "max").as_deref(), Some("99999"));

        assert!(!form.has_field("signature"));
        assert_eq!(form.field_ids().len(), 3);
    }

    #[test]
    fn test_table_cells_bound_by_position() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"opr": {"subsections": {"lg": {
                "title": "Landing Gear History", "type": "table",
                "columns": ["Part", "Serial"], "rows": 2
            }}}}
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        assert_eq!(form.field_ids().len(), 4);

        let cell = form.control("landing_gear_history_row1_col0").unwrap();
        f.tree.type_text(cell, "Main gear");
        assert_eq!(f.store.get_str("landing_gear_history_row1_col0"), "Main gear");
        assert!(f.tree.text_content(form.root()).contains("Part Serial"));
    }

    #[test]
    fn test_sections_alias_for_subsections() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"s1": {"sections": {"a": {"fields": [{"id": "operator", "type": "text"}]}}}}
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        assert!(form.has_field("operator"));
    }

    #[test]
    fn test_location_parts_in_order() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"section4": {
                "metadata": {"fields": [{"id": "physical_inspection_date", "type": "date"}]},
                "locations": {"nose": {
                    "title": "Nose Area",
                    "photos": {"required": true, "count": 2},
                    "fields": [{"id": "nose_condition", "type": "text"}],
                    "component": {"id": "gear", "component": "gears",
                                  "fields": [{"id": "serial", "type": "text"}]}
                }}
            }}
        }));
        let ctx = RenderContext::new().with_components(ComponentCounts::new().with_count("gears", 1));
        let form = f.renderer.render(&tpl, &ctx);
        let t = &f.tree;

        let location = t.find_by_id(form.root(), "location-nose-area").unwrap();
        let children = t.children(location);
        let classes: Vec<String> = children
            .iter()
            .filter_map(|c| t.attribute(*c, ATTR_CLASS))
            .collect();
        assert_eq!(
            classes,
            vec!["photo-reminder", "location-fields", "component-group", "photo-section"]
        );
        assert!(form.has_field("gear_0_serial"));
        assert!(t.find_by_id(form.root(), "photo-grid-nose").is_some());
        assert!(t.text_content(location).contains("Current: 0 / 2 required"));
        assert!(form.media("nose").is_some());
        assert_eq!(
            form.field_ids()[0],
            "physical_inspection_date",
            "metadata renders before locations"
        );
    }

    #[test]
    fn test_optional_photos_skip_reminder() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"s": {"locations": {"tail": {"title": "Tail", "photos": {"required": false}}}}}
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        let slot = form.photo_slot("tail").unwrap();
        assert!(slot.reminder.is_none());
        assert!(slot.grid.is_some());
        assert!(form.photo_requirements().is_empty());
    }

    #[test]
    fn test_location_component_name_repeats_location_fields() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"section4": {"locations": {"engines_area": {
                "title": "Engines",
                "component": "engines",
                "fields": [{"id": "serial", "type": "text"}, {"id": "note", "label": "Note"}]
            }}}}
        }));
        let ctx = RenderContext::new().with_components(ComponentCounts::new().with_count("engines", 2));
        let form = f.renderer.render(&tpl, &ctx);

        assert_eq!(
            form.field_ids(),
            ["engines_area_0_serial".to_string(), "engines_area_1_serial".to_string()]
        );
        assert!(!form.has_field("serial"));
        f.tree.type_text(form.control("engines_area_1_serial").unwrap(), "PCE-9");
        assert_eq!(f.store.get_str("engines_area_1_serial"), "PCE-9");
    }

    #[test]
    fn test_reused_location_key_gets_its_own_store() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {
                "s1": {"locations": {"nose": {"title": "Nose Area", "photos": {"required": true, "count": 1}}}},
                "s2": {"locations": {"nose": {"title": "Nose Bay", "photos": {"required": true, "count": 1}}}},
                "nose": {"title": "Nose Extras", "photos": {"required": false}}
            }
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());

        let keys: Vec<_> = form.media_stores().keys().cloned().collect();
        assert_eq!(keys, vec!["nose", "s2_nose", "nose_nose"]);
        assert_ne!(
            form.media("nose").unwrap().storage_key(),
            form.media("s2_nose").unwrap().storage_key()
        );

        let photo = PhotoFile::new("n.jpg", "image/jpeg", vec![1]);
        assert_eq!(form.add_photos("nose", vec![photo]).len(), 1);

        let t = &f.tree;
        let first = t.find_by_id(form.root(), "location-nose-area").unwrap();
        let second = t.find_by_id(form.root(), "location-nose-bay").unwrap();
        assert!(t.text_content(first).contains("Current: 1 / 1 required"));
        assert!(t.text_content(second).contains("Current: 0 / 1 required"));
        assert_eq!(t.attribute(second, ATTR_LOCATION).as_deref(), Some("s2_nose"));

        let requirements = form.photo_requirements();
        assert_eq!(requirements.len(), 2);
        assert!(requirements.iter().any(|(id, s)| id == "nose" && s.met));
        assert!(requirements.iter().any(|(id, s)| id == "s2_nose" && !s.met));
    }

    #[test]
    fn test_unknown_variant_renders_nothing() {
        let f = fixture();
        let catalog = TemplateCatalog::from_json(r#"{"ATR": {"sections": {}}}"#).unwrap();
        let before = f.tree.node_count();

        let err = f
            .renderer
            .render_variant(&catalog, "A350", &RenderContext::new())
            .unwrap_err();
        assert!(matches!(err, FormError::SchemaNotFound { .. }));
        assert_eq!(f.tree.node_count(), before);
    }

    #[test]
    fn test_rerender_hydrates_from_store() {
        let storage = Arc::new(MemoryStorage::new());
        let f = fixture_with(storage.clone());
        let form = f.renderer.render(&engines_template(), &RenderContext::new().with_components(
            ComponentCounts::new().with_count("engines", 1),
        ));
        f.tree.type_text(form.control("engine_0_serial").unwrap(), "PCE-9");
        f.store.flush().unwrap();

        let g = fixture_with(storage);
        let again = g.renderer.render(&engines_template(), &RenderContext::new().with_components(
            ComponentCounts::new().with_count("engines", 1),
        ));
        assert_eq!(g.tree.value(again.control("engine_0_serial").unwrap()), "PCE-9");
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {
                "a": {"fields": [{"id": "msn", "type": "text"}]},
                "b": {"fields": [{"id": "msn", "type": "text"}]}
            }
        }));
        let form = f.renderer.render(&tpl, &RenderContext::new());
        assert_eq!(form.collisions(), ["msn".to_string()]);
        assert_eq!(form.controls("msn").len(), 2);
    }

    #[test]
    fn test_validation_annotation_follows_changes() {
        let f = fixture();
        let tpl = template(json!({
            "sections": {"s": {"fields": [{"id": "msn", "type": "text", "required": true}]}}
        }));
        let ctx = RenderContext::new().with_validation(ValidationContext::new());
        let form = f.renderer.render(&tpl, &ctx);
        let msn = form.control("msn").unwrap();
        let feedback = form.fields()[0].feedback.unwrap();

        assert_eq!(f.tree.attribute(msn, "data-validation").as_deref(), Some("error"));
        assert_eq!(f.tree.text_content(feedback), "This field is required");

        f.tree.change_value(msn, "1234");
        assert_eq!(f.tree.attribute(msn, "data-validation").as_deref(), Some("valid"));
        assert_eq!(f.store.get_str("msn"), "1234");
    }
}
