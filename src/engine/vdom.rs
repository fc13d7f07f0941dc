//! Snapshot trees - the expanded output of a render pass.
//!
//! A [`SnapshotNode`] tree is immutable once built. [`Vdom`] holds the tree
//! the host currently shows (`previous`) and the tree of the running pass
//! (`current`), and swaps them when the pass commits.
//!
//! Component invocations stay in the tree as transparent wrappers with one
//! child (their output, at `path + [0]`). The wrapper records which component
//! owned the path so the next pass can tell a re-render from a first render.
//! Host-facing code goes through [`SnapshotNode::resolve`], which skips them.

use std::rc::Rc;

use crate::element::{ComponentType, Primitive, Props};
use crate::error::{Error, Result};
use crate::path::Path;

// =============================================================================
// Node Kind
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Primitive(Primitive),
    Host { tag: String, props: Props },
    Component(ComponentType),
}

/// The part of a node that decides whether two renders are the same node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Primitive,
    Host(String),
    Component(ComponentType),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Primitive(_) => NodeType::Primitive,
            NodeKind::Host { tag, .. } => NodeType::Host(tag.clone()),
            NodeKind::Component(ty) => NodeType::Component(*ty),
        }
    }
}

// =============================================================================
// Snapshot Node
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotNode {
    pub path: Path,
    pub kind: NodeKind,
    pub children: Vec<Rc<SnapshotNode>>,
}

impl SnapshotNode {
    pub fn primitive(path: Path, value: Primitive) -> Self {
        Self {
            path,
            kind: NodeKind::Primitive(value),
            children: Vec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, NodeKind::Primitive(_))
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, NodeKind::Host { .. })
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind, NodeKind::Component(_))
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Host { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn props(&self) -> Option<&Props> {
        match &self.kind {
            NodeKind::Host { props, .. } => Some(props),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&Primitive> {
        match &self.kind {
            NodeKind::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Skip component wrappers down to the node the host sees.
    pub fn resolve(&self) -> &SnapshotNode {
        let mut node = self;
        while node.is_component() {
            match node.children.first() {
                Some(output) => node = output,
                None => break,
            }
        }
        node
    }

    /// Paths of the component wrappers above the resolved node, outermost first.
    pub fn wrapper_paths(&self) -> Vec<&Path> {
        let mut paths = Vec::new();
        let mut node = self;
        while node.is_component() {
            paths.push(&node.path);
            match node.children.first() {
                Some(output) => node = output,
                None => break,
            }
        }
        paths
    }

    /// Children as the host sees them.
    pub fn rendered_children(&self) -> impl Iterator<Item = &SnapshotNode> {
        self.resolve().children.iter().map(|child| child.resolve())
    }

    /// Find the node at an absolute `path`, walking child indices from `self`.
    ///
    /// `self` must be the root of its tree.
    pub fn find(&self, path: &Path) -> Option<&SnapshotNode> {
        let mut node = self;
        for &index in path.indices() {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    /// Like [`find`](Self::find), for paths that must exist.
    pub fn lookup(&self, path: &Path, tree: &'static str) -> Result<&SnapshotNode> {
        self.find(path).ok_or_else(|| Error::MissingNode {
            path: path.clone(),
            tree,
        })
    }
}

// =============================================================================
// VDOM
// =============================================================================

/// The committed tree and the tree of the running pass.
#[derive(Debug, Default)]
pub struct Vdom {
    previous: Option<Rc<SnapshotNode>>,
    current: Option<Rc<SnapshotNode>>,
}

impl Vdom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree the host currently shows.
    pub fn previous(&self) -> Option<&Rc<SnapshotNode>> {
        self.previous.as_ref()
    }

    /// Tree of the running pass, before it commits.
    pub fn current(&self) -> Option<&Rc<SnapshotNode>> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, root: Rc<SnapshotNode>) {
        self.current = Some(root);
    }

    /// Drop the running pass, keeping `previous` untouched.
    pub fn discard_current(&mut self) {
        self.current = None;
    }

    /// Make `current` the committed tree.
    pub fn commit(&mut self) {
        if let Some(current) = self.current.take() {
            self.previous = Some(current);
        }
    }

    /// Previous node at `path`, if any.
    pub fn previous_at(&self, path: &Path) -> Option<&SnapshotNode> {
        self.previous.as_deref().and_then(|root| root.find(path))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ComponentElement, Element};
    use crate::hooks::Hooks;

    fn wrapper(_: &(), _: &mut Hooks<'_>) -> Element {
        Element::null()
    }

    fn host_node(path: Path, tag: &str, children: Vec<Rc<SnapshotNode>>) -> Rc<SnapshotNode> {
        Rc::new(SnapshotNode {
            path,
            kind: NodeKind::Host {
                tag: tag.to_string(),
                props: Props::new(),
            },
            children,
        })
    }

    fn sample() -> Rc<SnapshotNode> {
        let ty = ComponentElement::new(wrapper, ()).component_type();
        let span = host_node(Path::from([1, 0]), "span", vec![]);
        let comp = Rc::new(SnapshotNode {
            path: Path::from([1]),
            kind: NodeKind::Component(ty),
            children: vec![span],
        });
        let text = Rc::new(SnapshotNode::primitive(Path::from([0]), Primitive::Text("a".into())));
        host_node(Path::root(), "div", vec![text, comp])
    }

    #[test]
    fn test_find_walks_indices() {
        let root = sample();
        assert_eq!(root.find(&Path::root()).map(|n| n.path.clone()), Some(Path::root()));
        assert!(root.find(&Path::from([1])).is_some_and(SnapshotNode::is_component));
        assert_eq!(root.find(&Path::from([1, 0])).and_then(SnapshotNode::tag), Some("span"));
        assert!(root.find(&Path::from([2])).is_none());
        assert!(root.find(&Path::from([0, 0])).is_none());
    }

    #[test]
    fn test_lookup_missing_is_error() {
        let root = sample();
        let err = root.lookup(&Path::from([5]), "previous").unwrap_err();
        assert_eq!(
            err,
            Error::MissingNode {
                path: Path::from([5]),
                tree: "previous"
            }
        );
    }

    #[test]
    fn test_resolve_skips_wrappers() {
        let root = sample();
        let comp = root.find(&Path::from([1])).unwrap();
        assert_eq!(comp.resolve().tag(), Some("span"));
        assert_eq!(comp.wrapper_paths(), vec![&Path::from([1])]);

        let tags: Vec<Option<&str>> = root.rendered_children().map(SnapshotNode::tag).collect();
        assert_eq!(tags, vec![None, Some("span")]);
    }

    #[test]
    fn test_vdom_commit_swaps() {
        let mut vdom = Vdom::new();
        assert!(vdom.previous().is_none());

        vdom.set_current(sample());
        assert!(vdom.previous().is_none());
        vdom.commit();
        assert!(vdom.current().is_none());
        assert!(vdom.previous_at(&Path::from([1, 0])).is_some());

        vdom.set_current(host_node(Path::root(), "p", vec![]));
        vdom.discard_current();
        assert_eq!(vdom.previous_at(&Path::root()).and_then(SnapshotNode::tag), Some("div"));
    }
}
