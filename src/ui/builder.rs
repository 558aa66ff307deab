//! UI tree builder capability.
//!
//! The renderer only ever creates nodes, sets text and attributes, appends
//! children and registers listeners. Any rendering surface that can do those
//! things can host a form.
//!
//! Control state travels through plain attributes: `type` names the control
//! kind, `value` holds the current value and a present `checked` attribute
//! marks a checked checkbox or radio.

use std::fmt;

pub const ATTR_ID: &str = "id";
pub const ATTR_NAME: &str = "name";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_CHECKED: &str = "checked";
pub const ATTR_CLASS: &str = "class";

/// Handle to a node owned by a [`UiBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Typing
    Input,
    /// Commit (blur, selection, check toggle)
    Change,
    Paste,
    Click,
}

/// Control state delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEvent {
    pub kind: EventKind,
    pub control_type: Option<String>,
    pub value: String,
    pub checked: bool,
}

pub type Listener = Box<dyn FnMut(&ControlEvent) + Send>;

pub trait UiBuilder: Send + Sync {
    fn create_node(&self, tag: &str) -> NodeId;

    fn set_text(&self, node: NodeId, text: &str);

    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&self, node: NodeId, name: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn append_child(&self, parent: NodeId, child: NodeId);

    fn tag(&self, node: NodeId) -> Option<String>;

    /// Direct children of `node`, in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Detach every child of `node` (used to redraw photo grids and
    /// validation feedback).
    fn clear_children(&self, node: NodeId);

    fn add_listener(&self, node: NodeId, kind: EventKind, listener: Listener);

    /// Create a node carrying `text` and append it to `parent`.
    fn append_text(&self, parent: NodeId, tag: &str, text: &str) -> NodeId {
        let node = self.create_node(tag);
        self.set_text(node, text);
        self.append_child(parent, node);
        node
    }

    fn set_checked(&self, node: NodeId, checked: bool) {
        if checked {
            self.set_attribute(node, ATTR_CHECKED, "true");
        } else {
            self.remove_attribute(node, ATTR_CHECKED);
        }
    }

    fn is_checked(&self, node: NodeId) -> bool {
        self.attribute(node, ATTR_CHECKED).is_some()
    }
}
