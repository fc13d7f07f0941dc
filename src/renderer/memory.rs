//! In-memory host renderer.
//!
//! Nodes live in an arena indexed by [`NodeId`]; released slots stay empty so
//! ids are never reused while a renderer lives. Every host call is recorded
//! as a [`HostOp`], which makes the exact work a cycle did observable.
//!
//! # Example
//!
//! ```ignore
//! let handle = mount(app, MemoryRenderer::new())?;
//! let markup = handle.with_host(|host| host.to_markup());
//! assert_eq!(markup, r#"<div id="app">hello</div>"#);
//! ```

use std::collections::BTreeMap;

use crate::element::{EventHandler, Primitive, PropValue};
use crate::engine::{NodeKind, PropChange, SnapshotNode};

use super::HostRenderer;

/// Index of a node in a [`MemoryRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One call the renderer received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    Create { id: NodeId, kind: String },
    Insert { parent: NodeId, id: NodeId, before: Option<NodeId> },
    Detach { id: NodeId },
    UpdateText { id: NodeId, text: String },
    SetProp { id: NodeId, name: String },
    RemoveProp { id: NodeId, name: String },
}

#[derive(Debug)]
enum NodeData {
    Text(String),
    /// A primitive that renders nothing.
    Empty,
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        listeners: BTreeMap<String, EventHandler>,
    },
}

#[derive(Debug)]
struct MemoryNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

const CONTAINER: NodeId = NodeId(0);

/// Arena-backed renderer for tests and headless embedding.
#[derive(Debug)]
pub struct MemoryRenderer {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
}

impl Default for MemoryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRenderer {
    pub fn new() -> Self {
        let container = MemoryNode {
            data: NodeData::Element {
                tag: "#container".to_string(),
                attrs: BTreeMap::new(),
                listeners: BTreeMap::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![Some(container)],
            ops: Vec::new(),
        }
    }

    fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(MemoryNode {
            data,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    fn unlink(&mut self, id: NodeId) {
        let parent = self.node_mut(id).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|child| *child != id);
        }
    }

    fn release(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.release(child);
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Markup of everything inside the container.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for child in self.children(CONTAINER) {
            self.write_markup(*child, &mut out);
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.data {
            NodeData::Text(text) => out.push_str(&escape(text)),
            NodeData::Empty => {}
            NodeData::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {name}=\"{}\"", escape(value)));
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    pub fn container_id(&self) -> NodeId {
        CONTAINER
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes, the container excluded.
    pub fn live_count(&self) -> usize {
        self.nodes.iter().flatten().count() - 1
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn handler(&self, id: NodeId, name: &str) -> Option<EventHandler> {
        match &self.node(id)?.data {
            NodeData::Element { listeners, .. } => listeners.get(name).cloned(),
            _ => None,
        }
    }

    /// First attached element with `tag`, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(CONTAINER, &|renderer, id| renderer.tag(id) == Some(tag))
    }

    /// First attached element whose attribute `name` equals `value`.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        self.find(CONTAINER, &|renderer, id| renderer.attribute(id, name) == Some(value))
    }

    fn find(&self, from: NodeId, matches: &dyn Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        for child in self.children(from) {
            if matches(self, *child) {
                return Some(*child);
            }
            if let Some(found) = self.find(*child, matches) {
                return Some(found);
            }
        }
        None
    }

    /// Invoke the `name` handler of `id` with `payload`.
    ///
    /// Returns false if the node has no such handler. The handler is cloned
    /// out first, so it may freely trigger re-renders that touch this renderer.
    pub fn dispatch_event(&self, id: NodeId, name: &str, payload: &PropValue) -> bool {
        match self.handler(id, name) {
            Some(handler) => {
                handler.call(payload);
                true
            }
            None => false,
        }
    }

    /// Take the operations recorded since the last call.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('"', "&quot;")
}

fn set_prop(data: &mut NodeData, name: &str, value: &PropValue) {
    let NodeData::Element { attrs, listeners, .. } = data else {
        return;
    };
    match value {
        PropValue::Handler(handler) => {
            attrs.remove(name);
            listeners.insert(name.to_string(), handler.clone());
        }
        other => {
            listeners.remove(name);
            if let Some(text) = other.as_attribute() {
                attrs.insert(name.to_string(), text);
            }
        }
    }
}

// =============================================================================
// HostRenderer
// =============================================================================

impl HostRenderer for MemoryRenderer {
    type Handle = NodeId;

    fn container(&self) -> NodeId {
        CONTAINER
    }

    fn materialize(&mut self, node: &SnapshotNode) -> NodeId {
        let (data, kind) = match &node.resolve().kind {
            NodeKind::Primitive(value) => match value.display_text() {
                Some(text) => (NodeData::Text(text), "#text".to_string()),
                None => (NodeData::Empty, "#empty".to_string()),
            },
            NodeKind::Host { tag, props } => {
                let mut data = NodeData::Element {
                    tag: tag.clone(),
                    attrs: BTreeMap::new(),
                    listeners: BTreeMap::new(),
                };
                for (name, value) in props.iter() {
                    set_prop(&mut data, name, value);
                }
                (data, tag.clone())
            }
            // Unreachable through resolve(); a wrapper without output renders nothing
            NodeKind::Component(_) => (NodeData::Empty, "#empty".to_string()),
        };
        let id = self.alloc(data);
        self.ops.push(HostOp::Create { id, kind });
        id
    }

    fn detach(&mut self, handle: &NodeId) {
        if *handle == CONTAINER || !self.is_live(*handle) {
            return;
        }
        self.unlink(*handle);
        self.release(*handle);
        self.ops.push(HostOp::Detach { id: *handle });
    }

    fn update_text(&mut self, handle: &NodeId, value: &Primitive) {
        let id = *handle;
        let Some(node) = self.node_mut(id) else { return };
        let text = value.display_text();
        node.data = match &text {
            Some(text) => NodeData::Text(text.clone()),
            None => NodeData::Empty,
        };
        self.ops.push(HostOp::UpdateText {
            id,
            text: text.unwrap_or_default(),
        });
    }

    fn apply_prop_change(&mut self, handle: &NodeId, name: &str, change: &PropChange) {
        let id = *handle;
        let Some(node) = self.node_mut(id) else { return };
        match change {
            PropChange::Updated { new, .. } => {
                set_prop(&mut node.data, name, new);
                self.ops.push(HostOp::SetProp {
                    id,
                    name: name.to_string(),
                });
            }
            PropChange::Removed { .. } => {
                if let NodeData::Element { attrs, listeners, .. } = &mut node.data {
                    attrs.remove(name);
                    listeners.remove(name);
                }
                self.ops.push(HostOp::RemoveProp {
                    id,
                    name: name.to_string(),
                });
            }
        }
    }

    fn insert_before(&mut self, parent: &NodeId, handle: &NodeId, reference: Option<&NodeId>) {
        let (parent, id) = (*parent, *handle);
        if !self.is_live(parent) || !self.is_live(id) {
            tracing::warn!(?parent, ?id, "insert_before on a released node");
            return;
        }
        self.unlink(id);

        let before = reference.copied();
        if let Some(node) = self.node_mut(parent) {
            let position = before
                .and_then(|r| node.children.iter().position(|child| *child == r))
                .unwrap_or(node.children.len());
            node.children.insert(position, id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(parent);
        }
        self.ops.push(HostOp::Insert { parent, id, before });
    }
}

// =============================================================================
// Tests
// =============================================================================
