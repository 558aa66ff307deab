//! Control binding.
//!
//! Connects one UI control to one field id: hydrate on construction, write
//! back on input, change and paste. File inputs are never bound here; their
//! contents belong to a media store. [`bind_container`] sweeps a whole
//! subtree so controls a host adds outside the template persist too.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::ui::builder::{
    ControlEvent, EventKind, Listener, NodeId, UiBuilder, ATTR_ID, ATTR_NAME, ATTR_TYPE,
    ATTR_VALUE,
};

use super::store::FieldStore;

/// Set on a control once it is bound.
pub const ATTR_AUTO_SAVE: &str = "data-auto-save";
pub const ATTR_FIELD_ID: &str = "data-field-id";
/// Present while the "saved" flash is showing.
pub const ATTR_SAVED: &str = "data-saved";

pub const SAVE_FEEDBACK_DURATION: Duration = Duration::from_millis(1500);

const CONTROL_TAGS: [&str; 3] = ["input", "textarea", "select"];

/// Bind `control` to `field_id` in `store`.
///
/// Returns false (and does nothing) for file inputs and for controls that
/// are already bound.
pub fn bind_control(
    store: &FieldStore,
    ui: &Arc<dyn UiBuilder>,
    control: NodeId,
    field_id: &str,
) -> bool {
    let control_type = ui.attribute(control, ATTR_TYPE).unwrap_or_default();

    if control_type == "file" {
        log::debug!("BIND_SKIPPED field_id={} reason=file_input", field_id);
        return false;
    }
    if ui.attribute(control, ATTR_AUTO_SAVE).is_some() {
        log::debug!("BIND_SKIPPED field_id={} reason=already_bound", field_id);
        return false;
    }

    hydrate(store, ui.as_ref(), control, &control_type, field_id);

    ui.add_listener(control, EventKind::Input, save_handler(store, ui, control, field_id));
    ui.add_listener(control, EventKind::Change, save_handler(store, ui, control, field_id));
    ui.add_listener(control, EventKind::Paste, paste_handler(store, ui, control, field_id));

    ui.set_attribute(control, ATTR_AUTO_SAVE, "true");
    ui.set_attribute(control, ATTR_FIELD_ID, field_id);
    true
}

/// Bind every unbound control under `root`, in document order.
///
/// The field id is the control's `id`, else its `name`, else
/// `field_<index>` where index counts controls seen so far. Returns the
/// number of controls newly bound.
pub fn bind_container(store: &FieldStore, ui: &Arc<dyn UiBuilder>, root: NodeId) -> usize {
    let mut stack = vec![root];
    let mut index = 0;
    let mut bound = 0;

    while let Some(node) = stack.pop() {
        let mut children = ui.children(node);
        children.reverse();
        stack.extend(children);

        let is_control = ui
            .tag(node)
            .map(|tag| CONTROL_TAGS.contains(&tag.as_str()))
            .unwrap_or(false);
        if !is_control {
            continue;
        }

        let position = index;
        index += 1;
        if ui.attribute(node, ATTR_AUTO_SAVE).is_some() {
            continue;
        }

        let field_id = ui
            .attribute(node, ATTR_ID)
            .filter(|id| !id.is_empty())
            .or_else(|| ui.attribute(node, ATTR_NAME).filter(|name| !name.is_empty()))
            .unwrap_or_else(|| format!("field_{}", position));
        if bind_control(store, ui, node, &field_id) {
            bound += 1;
        }
    }

    log::debug!(
        "{} CONTAINER_BOUND controls={} newly_bound={}",
        store.log_context(),
        index,
        bound
    );
    bound
}

fn hydrate(store: &FieldStore, ui: &dyn UiBuilder, control: NodeId, control_type: &str, field_id: &str) {
    let existing = store.get_str(field_id);
    if existing.is_empty() {
        return;
    }

    match control_type {
        "checkbox" | "radio" => {
            let own_value = ui.attribute(control, ATTR_VALUE).unwrap_or_default();
            if own_value == existing {
                ui.set_checked(control, true);
            }
        }
        _ => ui.set_attribute(control, ATTR_VALUE, &existing),
    }
    log::debug!("FIELD_HYDRATED field_id={} type={}", field_id, control_type);
}

/// Value a control event writes, or `None` when it must not write.
fn event_value(event: &ControlEvent) -> Option<String> {
    match event.control_type.as_deref() {
        Some("checkbox") => Some(if event.checked {
            event.value.clone()
        } else {
            String::new()
        }),
        // Only the newly checked member of a radio group writes.
        Some("radio") if !event.checked => None,
        Some("file") => None,
        _ => Some(event.value.clone()),
    }
}

fn save_handler(store: &FieldStore, ui: &Arc<dyn UiBuilder>, control: NodeId, field_id: &str) -> Listener {
    let store = store.clone();
    let ui = Arc::downgrade(ui);
    let field_id = field_id.to_string();
    Box::new(move |event: &ControlEvent| {
        if let Some(value) = event_value(event) {
            store.set(&field_id, value);
            show_save_feedback(&store, &ui, control);
        }
    })
}

fn paste_handler(store: &FieldStore, ui: &Arc<dyn UiBuilder>, control: NodeId, field_id: &str) -> Listener {
    let store = store.clone();
    let ui = Arc::downgrade(ui);
    let field_id = field_id.to_string();
    Box::new(move |event: &ControlEvent| {
        store.set(&field_id, event.value.clone());
        show_save_feedback(&store, &ui, control);
    })
}

fn show_save_feedback(store: &FieldStore, ui: &Weak<dyn UiBuilder>, control: NodeId) {
    let Some(builder) = ui.upgrade() else {
        return;
    };
    builder.set_attribute(control, ATTR_SAVED, "true");

    let ui = ui.clone();
    store.services().scheduler.schedule(
        SAVE_FEEDBACK_DURATION,
        Box::new(move || {
            if let Some(builder) = ui.upgrade() {
                builder.remove_attribute(control, ATTR_SAVED);
            }
        }),
    );
}
