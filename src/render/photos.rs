//! Photo requirement reminder, capture section and photo grid.

use std::sync::Arc;

use crate::media::store::MediaStore;
use crate::template::schema::PhotoRequirement;
use crate::ui::builder::{
    ControlEvent, EventKind, NodeId, UiBuilder, ATTR_CLASS, ATTR_ID, ATTR_TYPE,
};

pub const EMPTY_GRID_TEXT: &str = "No photos yet";
pub const ATTR_PHOTO_ID: &str = "data-photo-id";
/// On the capture button: id of the file input it opens.
pub const ATTR_CAPTURE_TARGET: &str = "data-capture-target";

/// Reminder nodes that change as photos are added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderNodes {
    pub root: NodeId,
    pub progress: NodeId,
    pub required: usize,
}

/// UI handles of one photo-bearing location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSlot {
    pub location_id: String,
    pub reminder: Option<ReminderNodes>,
    pub section: Option<NodeId>,
    pub input: Option<NodeId>,
    pub capture_button: Option<NodeId>,
    pub grid: Option<NodeId>,
}

impl PhotoSlot {
    pub fn new(location_id: &str) -> Self {
        Self {
            location_id: location_id.to_string(),
            reminder: None,
            section: None,
            input: None,
            capture_button: None,
            grid: None,
        }
    }
}

pub fn photo_input_id(location_id: &str) -> String {
    format!("photo-input-{}", location_id)
}

pub fn photo_grid_id(location_id: &str) -> String {
    format!("photo-grid-{}", location_id)
}

fn progress_text(count: usize, required: usize) -> String {
    format!("Current: {} / {} required", count, required)
}

/// "Photo Required" banner. Only drawn for required photos.
pub fn render_reminder(
    ui: &dyn UiBuilder,
    parent: NodeId,
    requirement: &PhotoRequirement,
    store: &MediaStore,
) -> ReminderNodes {
    let root = ui.create_node("div");
    ui.set_attribute(root, ATTR_CLASS, "photo-reminder");
    ui.append_text(root, "div", "Photo Required");

    let description = requirement.description.clone().unwrap_or_else(|| {
        format!("Please take {} photo(s) for this location", requirement.count)
    });
    ui.append_text(root, "div", &description);

    let progress = ui.append_text(root, "div", &progress_text(store.get_count(), requirement.count));
    ui.append_child(parent, root);

    ReminderNodes {
        root,
        progress,
        required: requirement.count,
    }
}

/// Title, hidden capture input, capture button and grid.
pub fn render_photo_section(ui: &Arc<dyn UiBuilder>, parent: NodeId, slot: &mut PhotoSlot, store: &MediaStore) {
    let section = ui.create_node("div");
    ui.set_attribute(section, ATTR_CLASS, "photo-section");
    ui.append_text(section, "h5", "Photos");

    let controls = ui.create_node("div");
    let input = ui.create_node("input");
    let input_id = photo_input_id(&slot.location_id);
    ui.set_attribute(input, ATTR_TYPE, "file");
    ui.set_attribute(input, ATTR_ID, &input_id);
    ui.set_attribute(input, "accept", "image/*");
    ui.set_attribute(input, "multiple", "true");
    ui.set_attribute(input, "capture", "environment");
    ui.set_attribute(input, "hidden", "true");
    ui.append_child(controls, input);

    let button = ui.append_text(controls, "button", "Take Photos");
    ui.set_attribute(button, ATTR_TYPE, "button");
    ui.set_attribute(button, ATTR_CAPTURE_TARGET, &input_id);
    ui.append_child(section, controls);

    let grid = ui.create_node("div");
    ui.set_attribute(grid, ATTR_ID, &photo_grid_id(&slot.location_id));
    ui.set_attribute(grid, ATTR_CLASS, "photo-grid");
    ui.append_child(section, grid);
    ui.append_child(parent, section);

    slot.section = Some(section);
    slot.input = Some(input);
    slot.capture_button = Some(button);
    slot.grid = Some(grid);

    refresh_photo_slot(ui, slot, store);
}

/// Redraw the grid and the reminder's progress line from the store.
pub fn refresh_photo_slot(ui: &Arc<dyn UiBuilder>, slot: &PhotoSlot, store: &MediaStore) {
    if let Some(reminder) = slot.reminder {
        ui.set_text(reminder.progress, &progress_text(store.get_count(), reminder.required));
    }

    let Some(grid) = slot.grid else {
        return;
    };
    ui.clear_children(grid);

    let photos = store.get_all();
    if photos.is_empty() {
        let empty = ui.append_text(grid, "div", EMPTY_GRID_TEXT);
        ui.set_attribute(empty, ATTR_CLASS, "photo-grid-empty");
        return;
    }

    for (index, photo) in photos.iter().enumerate() {
        let card = ui.create_node("div");
        ui.set_attribute(card, ATTR_CLASS, "photo-card");
        ui.set_attribute(card, ATTR_PHOTO_ID, &photo.id);

        let img = ui.create_node("img");
        ui.set_attribute(img, "src", &photo.data);
        ui.set_attribute(img, "alt", &format!("Photo {}", index + 1));
        ui.append_child(card, img);

        let delete = ui.append_text(card, "button", "Delete");
        ui.set_attribute(delete, ATTR_TYPE, "button");
        ui.set_attribute(delete, ATTR_CLASS, "photo-delete");
        ui.add_listener(delete, EventKind::Click, delete_handler(ui, slot, store, &photo.id));

        ui.append_text(card, "div", &format!("#{}", index + 1));
        ui.append_child(grid, card);
    }
}

fn delete_handler(
    ui: &Arc<dyn UiBuilder>,
    slot: &PhotoSlot,
    store: &MediaStore,
    photo_id: &str,
) -> crate::ui::builder::Listener {
    let ui = Arc::downgrade(ui);
    let slot = slot.clone();
    let store = store.clone();
    let photo_id = photo_id.to_string();
    Box::new(move |_: &ControlEvent| {
        if store.delete_photo(&photo_id) {
            if let Some(ui) = ui.upgrade() {
                refresh_photo_slot(&ui, &slot, &store);
            }
        }
    })
}
