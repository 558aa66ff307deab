//! In-memory node arena implementing [`UiBuilder`].
//!
//! Used for headless rendering and tests. Besides the builder capability it
//! can simulate the user: typing, pasting, clicking checkboxes and radios.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::builder::{
    ControlEvent, EventKind, Listener, NodeId, UiBuilder, ATTR_CHECKED, ATTR_ID, ATTR_NAME,
    ATTR_TYPE, ATTR_VALUE,
};

struct Node {
    tag: String,
    text: Option<String>,
    attributes: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    listeners: Vec<(EventKind, Listener)>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            listeners: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct UiTree {
    nodes: Mutex<Vec<Node>>,
}

impl std::fmt::Debug for UiTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiTree")
            .field("nodes", &self.nodes.lock().len())
            .finish()
    }
}

impl UiTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.nodes.lock().get(node.0).and_then(|n| n.text.clone())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.lock().get(node.0).and_then(|n| n.parent)
    }

    /// Text of `node` and all its descendants, depth first, space separated.
    pub fn text_content(&self, node: NodeId) -> String {
        let nodes = self.nodes.lock();
        let mut parts = Vec::new();
        collect_text(&nodes, node, &mut parts);
        parts.join(" ")
    }

    /// `node` and its descendants in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.lock();
        let mut out = Vec::new();
        collect_descendants(&nodes, node, &mut out);
        out
    }

    /// All nodes under `root` whose attribute `name` equals `value`.
    pub fn find_all(&self, root: NodeId, name: &str, value: &str) -> Vec<NodeId> {
        let ids = self.descendants(root);
        let nodes = self.nodes.lock();
        ids.into_iter()
            .filter(|id| {
                nodes[id.0]
                    .attributes
                    .get(name)
                    .map(|v| v == value)
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn find(&self, root: NodeId, name: &str, value: &str) -> Option<NodeId> {
        self.find_all(root, name, value).into_iter().next()
    }

    /// Node under `root` with the given `id` attribute.
    pub fn find_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        self.find(root, ATTR_ID, id)
    }

    pub fn value(&self, node: NodeId) -> String {
        self.attribute(node, ATTR_VALUE).unwrap_or_default()
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.nodes
            .lock()
            .get(node.0)
            .map(|n| n.listeners.len())
            .unwrap_or(0)
    }

    /// Run the listeners registered on `node` for `kind`. Returns how many ran.
    pub fn dispatch(&self, node: NodeId, kind: EventKind) -> usize {
        let (event, mut listeners) = {
            let mut nodes = self.nodes.lock();
            let Some(target) = nodes.get_mut(node.0) else {
                return 0;
            };
            let event = ControlEvent {
                kind,
                control_type: target.attributes.get(ATTR_TYPE).cloned(),
                value: target.attributes.get(ATTR_VALUE).cloned().unwrap_or_default(),
                checked: target.attributes.contains_key(ATTR_CHECKED),
            };
            (event, std::mem::take(&mut target.listeners))
        };

        // Listeners run unlocked: they may read or mutate the tree.
        let mut ran = 0;
        for (listener_kind, listener) in listeners.iter_mut() {
            if *listener_kind == kind {
                listener(&event);
                ran += 1;
            }
        }

        let mut nodes = self.nodes.lock();
        let target = &mut nodes[node.0];
        let added = std::mem::take(&mut target.listeners);
        listeners.extend(added);
        target.listeners = listeners;
        ran
    }

    /// Simulate typing: set the value, fire `input`.
    pub fn type_text(&self, node: NodeId, text: &str) -> usize {
        self.set_attribute(node, ATTR_VALUE, text);
        self.dispatch(node, EventKind::Input)
    }

    /// Simulate a committed edit: set the value, fire `change`.
    pub fn change_value(&self, node: NodeId, text: &str) -> usize {
        self.set_attribute(node, ATTR_VALUE, text);
        self.dispatch(node, EventKind::Change)
    }

    /// Simulate a paste replacing the control's contents.
    pub fn paste_text(&self, node: NodeId, text: &str) -> usize {
        self.set_attribute(node, ATTR_VALUE, text);
        self.dispatch(node, EventKind::Paste)
    }

    /// Simulate a click. Checkboxes toggle, radios check and uncheck their
    /// same-named siblings; both then fire `change`. Anything else fires
    /// `click`.
    pub fn click(&self, node: NodeId) -> usize {
        match self.attribute(node, ATTR_TYPE).as_deref() {
            Some("checkbox") => {
                let checked = self.is_checked(node);
                self.set_checked(node, !checked);
                self.dispatch(node, EventKind::Change)
            }
            Some("radio") => {
                if let Some(name) = self.attribute(node, ATTR_NAME) {
                    let mut nodes = self.nodes.lock();
                    for other in nodes.iter_mut() {
                        let same_group = other.attributes.get(ATTR_TYPE).map(String::as_str)
                            == Some("radio")
                            && other.attributes.get(ATTR_NAME) == Some(&name);
                        if same_group {
                            other.attributes.remove(ATTR_CHECKED);
                        }
                    }
                }
                self.set_checked(node, true);
                self.dispatch(node, EventKind::Change)
            }
            _ => self.dispatch(node, EventKind::Click),
        }
    }
}

fn collect_text(nodes: &[Node], node: NodeId, parts: &mut Vec<String>) {
    let Some(n) = nodes.get(node.0) else {
        return;
    };
    if let Some(text) = &n.text {
        parts.push(text.clone());
    }
    for child in &n.children {
        collect_text(nodes, *child, parts);
    }
}

fn collect_descendants(nodes: &[Node], node: NodeId, out: &mut Vec<NodeId>) {
    let Some(n) = nodes.get(node.0) else {
        return;
    };
    out.push(node);
    for child in &n.children {
        collect_descendants(nodes, *child, out);
    }
}

impl UiBuilder for UiTree {
    fn create_node(&self, tag: &str) -> NodeId {
        let mut nodes = self.nodes.lock();
        nodes.push(Node::new(tag));
        NodeId(nodes.len() - 1)
    }

    fn set_text(&self, node: NodeId, text: &str) {
        if let Some(n) = self.nodes.lock().get_mut(node.0) {
            n.text = Some(text.to_string());
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.lock().get_mut(node.0) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        if let Some(n) = self.nodes.lock().get_mut(node.0) {
            n.attributes.remove(name);
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .lock()
            .get(node.0)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut nodes = self.nodes.lock();
        if parent.0 >= nodes.len() || child.0 >= nodes.len() || parent == child {
            return;
        }
        if let Some(old_parent) = nodes[child.0].parent {
            nodes[old_parent.0].children.retain(|c| *c != child);
        }
        nodes[child.0].parent = Some(parent);
        nodes[parent.0].children.push(child);
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.lock().get(node.0).map(|n| n.tag.clone())
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .lock()
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn clear_children(&self, node: NodeId) {
        let mut nodes = self.nodes.lock();
        let Some(n) = nodes.get_mut(node.0) else {
            return;
        };
        let children = std::mem::take(&mut n.children);
        for child in children {
            nodes[child.0].parent = None;
        }
    }

    fn add_listener(&self, node: NodeId, kind: EventKind, listener: Listener) {
        if let Some(n) = self.nodes.lock().get_mut(node.0) {
            n.listeners.push((kind, listener));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_build_and_query() {
        let tree = UiTree::new();
        let root = tree.create_node("div");
        let label = tree.append_text(root, "label", "MSN");
        let input = tree.create_node("input");
        tree.set_attribute(input, ATTR_ID, "msn");
        tree.append_child(root, input);

        assert_eq!(tree.children(root), vec![label, input]);
        assert_eq!(tree.find_by_id(root, "msn"), Some(input));
        assert_eq!(tree.text_content(root), "MSN");
        assert_eq!(tree.parent(input), Some(root));
    }

    #[test]
    fn test_dispatch_passes_control_state() {
        let tree = UiTree::new();
        let input = tree.create_node("input");
        tree.set_attribute(input, ATTR_TYPE, "text");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tree.add_listener(
            input,
            EventKind::Input,
            Box::new(move |e: &ControlEvent| sink.lock().push(e.value.clone())),
        );

        assert_eq!(tree.type_text(input, "1234"), 1);
        assert_eq!(tree.change_value(input, "5678"), 0);
        assert_eq!(*seen.lock(), vec!["1234".to_string()]);
        assert_eq!(tree.listener_count(input), 1);
    }

    #[test]
    fn test_radio_click_unchecks_group() {
        let tree = UiTree::new();
        let a = tree.create_node("input");
        let b = tree.create_node("input");
        for (node, value) in [(a, "Yes"), (b, "No")] {
            tree.set_attribute(node, ATTR_TYPE, "radio");
            tree.set_attribute(node, ATTR_NAME, "airworthy");
            tree.set_attribute(node, ATTR_VALUE, value);
        }

        tree.click(a);
        assert!(tree.is_checked(a));
        tree.click(b);
        assert!(!tree.is_checked(a));
        assert!(tree.is_checked(b));
    }

    #[test]
    fn test_checkbox_toggles() {
        let tree = UiTree::new();
        let cb = tree.create_node("input");
        tree.set_attribute(cb, ATTR_TYPE, "checkbox");
        tree.click(cb);
        assert!(tree.is_checked(cb));
        tree.click(cb);
        assert!(!tree.is_checked(cb));
    }

    #[test]
    fn test_clear_children() {
        let tree = UiTree::new();
        let grid = tree.create_node("div");
        let card = tree.append_text(grid, "div", "#1");
        tree.clear_children(grid);
        assert!(tree.children(grid).is_empty());
        assert_eq!(tree.parent(card), None);
    }
}
