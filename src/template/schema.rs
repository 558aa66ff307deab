//! Template schema types.
//!
//! A template is passive data: sections hold subsections (tables or field
//! blocks) and locations; locations add a photo requirement and an optional
//! component group. Maps are order-preserving so forms render in document
//! order.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Grid row count when a table omits `rows`.
pub const DEFAULT_TABLE_ROWS: usize = 2;

/// One equipment variant's form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub sections: IndexMap<String, Section>,
    /// Fallback component counts when the form instance supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentCounts>,
}

impl Template {
    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.get(key)
    }
}

/// Marker for table-shaped nodes (`"type": "table"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub columns: Vec<String>,
    pub rows: usize,
}

fn table_of(kind: Option<NodeKind>, columns: &[String], rows: Option<usize>) -> Option<TableDef> {
    match kind {
        Some(NodeKind::Table) => Some(TableDef {
            columns: columns.to_vec(),
            rows: rows.unwrap_or(DEFAULT_TABLE_ROWS),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Fields placed directly on the section (header-style sections).
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Fields rendered ahead of the locations.
    #[serde(default)]
    pub metadata: Option<FieldBlock>,
    #[serde(default, alias = "sections")]
    pub subsections: IndexMap<String, Subsection>,
    #[serde(default)]
    pub locations: IndexMap<String, Location>,
    #[serde(default, rename = "type")]
    pub kind: Option<NodeKind>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Option<usize>,
    /// General photo evidence for the whole section, stored under the
    /// section key.
    #[serde(default)]
    pub photos: Option<PhotoRequirement>,
}

impl Section {
    pub fn table(&self) -> Option<TableDef> {
        table_of(self.kind, &self.columns, self.rows)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldBlock {
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default, rename = "type")]
    pub kind: Option<NodeKind>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Option<usize>,
}

impl Subsection {
    pub fn table(&self) -> Option<TableDef> {
        table_of(self.kind, &self.columns, self.rows)
    }
}

/// One physical inspection area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub component: Option<LocationComponent>,
    #[serde(default)]
    pub photos: Option<PhotoRequirement>,
}

impl Location {
    /// The component group repeated inside this location, if any.
    ///
    /// With the bare-name form the location's own fields are the per-unit
    /// template and the location key is the group id.
    pub fn component_group(&self, key: &str) -> Option<ComponentGroupDef> {
        match self.component.as_ref()? {
            LocationComponent::Group(group) => Some(group.clone()),
            LocationComponent::Name(component) => Some(ComponentGroupDef {
                id: key.to_string(),
                label: None,
                component: component.clone(),
                fields: self.fields.clone(),
            }),
        }
    }

    /// Fields rendered once, outside any component unit.
    pub fn direct_fields(&self) -> &[FieldDef] {
        match self.component {
            Some(LocationComponent::Name(_)) => &[],
            _ => self.fields.as_slice(),
        }
    }
}

/// A location's component: either a component name (`"engines"`) or a full
/// group object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationComponent {
    Name(String),
    Group(ComponentGroupDef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRequirement {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Date,
    Textarea,
    Number,
    Radio,
    Checkbox,
    ComponentGroup,
    /// Any tag this engine does not render.
    #[serde(other)]
    Unsupported,
}

fn unsupported_type() -> FieldType {
    FieldType::Unsupported
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::ComponentGroup => "component_group",
            FieldType::Unsupported => "unsupported",
        }
    }
}

/// A leaf field, or (with `type: component_group`) an inline component group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// A missing `type` reads as unsupported and the field is skipped.
    #[serde(rename = "type", default = "unsupported_type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
}

impl FieldDef {
    pub fn new(id: &str, field_type: FieldType) -> Self {
        Self {
            id: id.to_string(),
            label: None,
            field_type,
            required: false,
            options: Vec::new(),
            min: None,
            max: None,
            rows: None,
            placeholder: None,
            component: None,
            fields: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    /// The component group this node describes, if it is one.
    pub fn as_component_group(&self) -> Option<ComponentGroupDef> {
        if self.field_type != FieldType::ComponentGroup {
            return None;
        }
        let component = self.component.clone()?;
        Some(ComponentGroupDef {
            id: self.id.clone(),
            label: self.label.clone(),
            component,
            fields: self.fields.clone(),
        })
    }
}

/// A sub-template repeated once per physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentGroupDef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Key into the instance's component counts, e.g. `engines`.
    pub component: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Per-instance component counts and unit labels.
///
/// Wire shape is a flat object: `{"engines": 2, "enginesTypes": ["LH", "RH"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ComponentCounts {
    counts: BTreeMap<String, usize>,
    labels: BTreeMap<String, Vec<String>>,
}

const LABELS_SUFFIX: &str = "Types";

impl ComponentCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, component: &str, count: usize) -> Self {
        self.counts.insert(component.to_string(), count);
        self
    }

    pub fn with_labels(mut self, component: &str, labels: &[&str]) -> Self {
        self.labels.insert(
            component.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// Units of `component`; zero when absent.
    pub fn count(&self, component: &str) -> usize {
        self.counts.get(component).copied().unwrap_or(0)
    }

    pub fn labels(&self, component: &str) -> &[String] {
        self.labels.get(component).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.labels.is_empty()
    }
}

impl From<Map<String, Value>> for ComponentCounts {
    fn from(map: Map<String, Value>) -> Self {
        let mut counts = ComponentCounts::default();
        for (key, value) in map {
            match value {
                Value::Number(n) => {
                    if let Some(count) = n.as_u64() {
                        counts.counts.insert(key, count as usize);
                    }
                }
                Value::Array(items) if key.ends_with(LABELS_SUFFIX) => {
                    let component = key[..key.len() - LABELS_SUFFIX.len()].to_string();
                    let labels = items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect();
                    counts.labels.insert(component, labels);
                }
                _ => {}
            }
        }
        counts
    }
}

impl From<ComponentCounts> for Map<String, Value> {
    fn from(counts: ComponentCounts) -> Self {
        let mut map = Map::new();
        for (component, count) in counts.counts {
            map.insert(component, Value::from(count));
        }
        for (component, labels) in counts.labels {
            map.insert(format!("{}{}", component, LABELS_SUFFIX), Value::from(labels));
        }
        map
    }
}
