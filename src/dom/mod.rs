//! In-memory document the runtime renders into.
//!
//! A generational node arena standing in for the browser DOM: element and
//! text nodes, attributes, inline styles, selector queries, event dispatch
//! and native timed animations (see [`animation`]).
//!
//! Node slots freed by [`Document::clear_children`] / [`Document::remove_node`]
//! are reused; their generation is bumped so stale [`NodeId`]s never alias a
//! newer node.

pub mod animation;
pub mod selector;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, UiError};

pub use animation::{
    AnimationId, AnimationOptions, FillMode, FinishHandler, Keyframe, NativeAnimation, PlayState,
};

// =============================================================================
// Node identity
// =============================================================================

/// Handle to a node in a [`Document`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

// =============================================================================
// Node storage
// =============================================================================

/// Payload of an element node.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag_name: String,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

// =============================================================================
// Events
// =============================================================================

/// Event delivered to listeners registered with [`Document::add_event_listener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
}

/// Native event callback (Rc so dispatch can snapshot listeners).
pub type EventCallback = Rc<dyn Fn(&DomEvent)>;

/// Handle of a native event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeListenerId(u64);

struct ListenerEntry {
    id: NativeListenerId,
    node: NodeId,
    event_type: String,
    callback: EventCallback,
}

// =============================================================================
// Document
// =============================================================================

/// The document: node arena, listeners and running native animations.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,
    animations: animation::AnimationStore,
}

impl Document {
    /// Create an empty document containing only its root node.
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    parent: None,
                    children: Vec::new(),
                    kind: NodeKind::Document,
                }),
            }],
            free: Vec::new(),
            root,
            listeners: Vec::new(),
            next_listener_id: 0,
            animations: animation::AnimationStore::default(),
        }
    }

    /// The document root. Top-level content is appended here.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // =========================================================================
    // Slot management
    // =========================================================================

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn element_data(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_data_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match self.node_mut(id) {
            None => Err(UiError::StaleNode { node: id }),
            Some(Node {
                kind: NodeKind::Element(data),
                ..
            }) => Ok(data),
            Some(_) => Err(UiError::NotAnElement { node: id }),
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            kind,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Free a detached subtree, invalidating every id in it.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            self.listeners.retain(|entry| entry.node != current);
        }
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    // =========================================================================
    // Node creation & tree mutation
    // =========================================================================

    /// Create a detached element. Tag names are ASCII-lowercased.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            ..Default::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.node(parent).ok_or(UiError::StaleNode { node: parent })?;
        if matches!(parent_node.kind, NodeKind::Text(_)) {
            return Err(UiError::NotAnElement { node: parent });
        }
        if !self.contains(child) {
            return Err(UiError::StaleNode { node: child });
        }
        if child == self.root || self.is_inclusive_ancestor(child, parent) {
            return Err(UiError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|node| node.parent) else {
            return;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Insert `child` as the first child of `parent`, moving it if attached.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.insert(0, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Remove and free every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) -> Result<()> {
        let children = match self.node_mut(node) {
            Some(n) => std::mem::take(&mut n.children),
            None => return Err(UiError::StaleNode { node }),
        };
        for child in children {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Remove `node` (and its subtree) from the document.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(UiError::HierarchyRequest {
                parent: self.root,
                child: node,
            });
        }
        if !self.contains(node) {
            return Err(UiError::StaleNode { node });
        }
        self.detach(node);
        self.free_subtree(node);
        Ok(())
    }

    // =========================================================================
    // Tree queries
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Child nodes in order (empty for stale ids).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// Element children in order, text nodes skipped.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element_data(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Text(_)))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element_data(id).map(|data| data.tag_name.as_str())
    }

    /// Concatenated text of `id` and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        if let NodeKind::Text(text) = &node.kind {
            out.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Every element under `scope` (exclusive) in document order.
    pub fn descendant_elements(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element_data(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// All attributes of an element, ordered by name.
    pub fn attributes(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.element_data(id)
            .map(|data| {
                data.attrs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_data_mut(id)?
            .attrs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        Ok(self.element_data_mut(id)?.attrs.remove(name).is_some())
    }

    /// Whether the element's `class` attribute contains `class_name`.
    pub fn has_class(&self, id: NodeId, class_name: &str) -> bool {
        self.attribute(id, "class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }

    // =========================================================================
    // Inline style
    // =========================================================================

    /// Inline style value of a property.
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element_data(id)?
            .style
            .get(&normalize_property(property))
            .map(String::as_str)
    }

    /// All inline style entries, ordered by property name.
    pub fn styles(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.element_data(id)
            .map(|data| {
                data.style
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set an inline style property. An empty value removes the property.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let property = normalize_property(property);
        let style = &mut self.element_data_mut(id)?.style;
        if value.is_empty() {
            style.remove(&property);
        } else {
            style.insert(property, value.to_string());
        }
        Ok(())
    }

    // =========================================================================
    // Selector queries
    // =========================================================================

    /// All elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = selector::parse_selector_list(selector)?;
        Ok(selector::filter_matching(
            self,
            &list,
            self.descendant_elements(self.root),
        ))
    }

    /// First element matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Whether `node` matches `selector`.
    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        let list = selector::parse_selector_list(selector)?;
        Ok(!selector::filter_matching(self, &list, [node]).is_empty())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register a native listener for `event_type` on `node`.
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: EventCallback,
    ) -> Result<NativeListenerId> {
        if !self.contains(node) {
            return Err(UiError::StaleNode { node });
        }
        let id = NativeListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(ListenerEntry {
            id,
            node,
            event_type: event_type.to_string(),
            callback,
        });
        Ok(id)
    }

    /// Remove a native listener. Returns whether it existed.
    pub fn remove_event_listener(&mut self, id: NativeListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    /// Number of native listeners for `event_type` on `node`.
    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners
            .iter()
            .filter(|entry| entry.node == node && entry.event_type == event_type)
            .count()
    }

    /// Deliver an event to the listeners of its target, in registration order.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> usize {
        let callbacks: Vec<EventCallback> = self
            .listeners
            .iter()
            .filter(|entry| entry.node == target && entry.event_type == event_type)
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        let event = DomEvent {
            event_type: event_type.to_string(),
            target,
        };
        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Markup of a node and its subtree (attributes and styles in name order).
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Markup of a node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_html(text)),
            NodeKind::Document => {
                for &child in &node.children {
                    self.write_html(child, out);
                }
            }
            NodeKind::Element(data) => {
                out.push('<');
                out.push_str(&data.tag_name);
                for (name, value) in &data.attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
                }
                if !data.style.is_empty() {
                    let style: Vec<String> = data
                        .style
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .collect();
                    out.push_str(&format!(" style=\"{}\"", escape_html(&style.join("; "))));
                }
                out.push('>');
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{}>", data.tag_name));
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("listeners", &self.listeners.len())
            .field("animations", &self.animations.len())
            .finish()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Normalise a CSS property name: `backgroundImage` -> `background-image`.
///
/// Custom properties (`--x`) and already-kebab names pass through.
pub fn normalize_property(property: &str) -> String {
    if property.starts_with("--") || !property.chars().any(|c| c.is_ascii_uppercase()) {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn div_with_text(doc: &mut Document, text: &str) -> NodeId {
        let div = doc.create_element("div");
        let t = doc.create_text(text);
        doc.append_child(div, t).unwrap();
        div
    }

    #[test]
    fn test_create_and_append() {
        let mut doc = Document::new();
        let div = div_with_text(&mut doc, "hello");
        doc.append_child(doc.root(), div).unwrap();

        assert_eq!(doc.children(doc.root()), &[div]);
        assert_eq!(doc.parent(div), Some(doc.root()));
        assert_eq!(doc.text_content(div), "hello");
        assert_eq!(doc.tag_name(div), Some("div"));
    }

    #[test]
    fn test_tag_names_lowercased() {
        let mut doc = Document::new();
        let el = doc.create_element("DIV");
        assert_eq!(doc.tag_name(el), Some("div"));
    }

    #[test]
    fn test_prepend_child() {
        let mut doc = Document::new();
        let parent = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(parent, a).unwrap();
        doc.prepend_child(parent, b).unwrap();
        assert_eq!(doc.children(parent), &[b, a]);
    }

    #[test]
    fn test_append_moves_node() {
        let mut doc = Document::new();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(first, child).unwrap();
        doc.append_child(second, child).unwrap();
        assert!(doc.children(first).is_empty());
        assert_eq!(doc.children(second), &[child]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        let err = doc.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, UiError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_clear_children_invalidates_ids() {
        let mut doc = Document::new();
        let parent = doc.create_element("div");
        let child = div_with_text(&mut doc, "x");
        doc.append_child(parent, child).unwrap();

        doc.clear_children(parent).unwrap();
        assert!(doc.children(parent).is_empty());
        assert!(!doc.contains(child));

        // Slot reuse must not resurrect the stale id
        let fresh = doc.create_element("p");
        assert!(doc.contains(fresh));
        assert!(!doc.contains(child));
        assert!(matches!(
            doc.set_attribute(child, "a", "b"),
            Err(UiError::StaleNode { .. })
        ));
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_attribute(el, "data-id", "3").unwrap();
        assert_eq!(doc.attribute(el, "data-id"), Some("3"));
        assert!(doc.remove_attribute(el, "data-id").unwrap());
        assert!(!doc.remove_attribute(el, "data-id").unwrap());
        assert!(!doc.has_attribute(el, "data-id"));
    }

    #[test]
    fn test_attributes_on_text_rejected() {
        let mut doc = Document::new();
        let t = doc.create_text("x");
        assert!(matches!(
            doc.set_attribute(t, "a", "b"),
            Err(UiError::NotAnElement { .. })
        ));
    }

    #[test]
    fn test_style_normalization_and_removal() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_style(el, "backgroundImage", "url(a.png)").unwrap();
        assert_eq!(doc.style(el, "background-image"), Some("url(a.png)"));
        doc.set_style(el, "background-image", "").unwrap();
        assert_eq!(doc.style(el, "backgroundImage"), None);
    }

    #[test]
    fn test_normalize_property() {
        assert_eq!(normalize_property("backgroundImage"), "background-image");
        assert_eq!(normalize_property("color"), "color");
        assert_eq!(normalize_property("--myVar"), "--myVar");
    }

    #[test]
    fn test_dispatch_event_in_registration_order() {
        let mut doc = Document::new();
        let el = doc.create_element("button");
        let calls = Rc::new(Cell::new(0));

        let c1 = Rc::clone(&calls);
        doc.add_event_listener(el, "click", Rc::new(move |_| c1.set(c1.get() * 10 + 1)))
            .unwrap();
        let c2 = Rc::clone(&calls);
        let second = doc
            .add_event_listener(el, "click", Rc::new(move |_| c2.set(c2.get() * 10 + 2)))
            .unwrap();

        assert_eq!(doc.dispatch_event(el, "click"), 2);
        assert_eq!(calls.get(), 12);

        assert!(doc.remove_event_listener(second));
        assert_eq!(doc.dispatch_event(el, "click"), 1);
        assert_eq!(doc.dispatch_event(el, "mouseenter"), 0);
    }

    #[test]
    fn test_listeners_dropped_with_node() {
        let mut doc = Document::new();
        let parent = doc.create_element("div");
        let el = doc.create_element("span");
        doc.append_child(parent, el).unwrap();
        doc.add_event_listener(el, "click", Rc::new(|_| {})).unwrap();
        doc.clear_children(parent).unwrap();
        assert_eq!(doc.listener_count(el, "click"), 0);
    }

    #[test]
    fn test_outer_html() {
        let mut doc = Document::new();
        let el = div_with_text(&mut doc, "a<b");
        doc.set_attribute(el, "class", "x").unwrap();
        doc.set_style(el, "color", "red").unwrap();
        assert_eq!(
            doc.outer_html(el),
            "<div class=\"x\" style=\"color: red\">a&lt;b</div>"
        );
    }
}
