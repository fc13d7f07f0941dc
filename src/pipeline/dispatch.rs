//! Patch dispatch - applies ordered patches to a host renderer.
//!
//! The dispatcher owns the mapping from paths to host handles. Component
//! wrappers have no host node of their own, so every wrapper path in a chain
//! maps to the handle of the node the chain resolves to:
//!
//! ```text
//! /1      Counter ─┐
//! /1/0    Label   ─┼──► handle of <span>
//! /1/0/0  span    ─┘
//! ```
//!
//! It also keeps the host-level child list of every handle, so a replacement
//! can be inserted before the old node's next sibling.

use std::collections::{HashMap, HashSet};

use crate::engine::{Patch, PatchOp, SnapshotNode};
use crate::error::{Error, Result};
use crate::path::Path;
use crate::renderer::HostRenderer;

/// Index of a handle in the dispatcher's slab.
type Slot = usize;

pub struct Dispatcher<R: HostRenderer> {
    handles: Vec<Option<R::Handle>>,
    free: Vec<Slot>,
    by_path: HashMap<Path, Slot>,
    /// Host-level children. `None` is the container.
    children: HashMap<Option<Slot>, Vec<Slot>>,
    parent_of: HashMap<Slot, Option<Slot>>,
}

impl<R: HostRenderer> Default for Dispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: HostRenderer> Dispatcher<R> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            free: Vec::new(),
            by_path: HashMap::new(),
            children: HashMap::new(),
            parent_of: HashMap::new(),
        }
    }

    /// Handle of the host node at `path`, wrapper paths included.
    pub fn handle_at(&self, path: &Path) -> Option<&R::Handle> {
        let slot = *self.by_path.get(path)?;
        self.handles.get(slot)?.as_ref()
    }

    /// Number of live host nodes.
    pub fn len(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Full Mount
    // =========================================================================

    /// Materialize `root` as a whole and attach it to the container.
    ///
    /// Anything mounted before is detached first.
    pub fn mount_tree(&mut self, host: &mut R, root: &SnapshotNode) {
        self.unmount(host);
        let slot = self.materialize(host, root, None);
        let container = host.container();
        if let Some(handle) = self.handle(slot) {
            host.insert_before(&container, &handle, None);
        }
        self.children.entry(None).or_default().push(slot);
    }

    /// Detach everything attached to the container and forget all handles.
    pub fn unmount(&mut self, host: &mut R) {
        let roots = self.children.get(&None).cloned().unwrap_or_default();
        for slot in roots {
            if let Some(handle) = self.handle(slot) {
                host.detach(&handle);
            }
        }
        self.handles.clear();
        self.free.clear();
        self.by_path.clear();
        self.children.clear();
        self.parent_of.clear();
    }

    // =========================================================================
    // Patch Application
    // =========================================================================

    /// Apply `patches` in the given order.
    ///
    /// Removal and update patches whose target has no host node are skipped.
    /// An addition whose parent has no host node fails with
    /// [`Error::MissingNode`] before any patch reaches the host.
    pub fn apply(&mut self, host: &mut R, patches: &[Patch]) -> Result<()> {
        self.check_parents(patches)?;
        for patch in patches {
            tracing::trace!(%patch, "dispatch");
            match &patch.op {
                PatchOp::NodeRemoved => self.remove(host, &patch.path),
                PatchOp::NodeAdded { node, parent_path } => {
                    let parent = self.parent_slot(parent_path.as_ref())?;
                    self.append(host, node, parent);
                }
                PatchOp::NodeReplaced { new_node, parent_path } => {
                    self.replace(host, &patch.path, new_node, parent_path.as_ref())?;
                }
                PatchOp::PrimitiveUpdated { new_value } => match self.handle_at(&patch.path) {
                    Some(handle) => host.update_text(handle, new_value),
                    None => tracing::debug!(path = %patch.path, "no host node to update"),
                },
                PatchOp::PropsChanged { changes } => match self.handle_at(&patch.path) {
                    Some(handle) => {
                        for (name, change) in changes {
                            host.apply_prop_change(handle, name, change);
                        }
                    }
                    None => tracing::debug!(path = %patch.path, "no host node to update"),
                },
            }
        }
        Ok(())
    }

    /// Every node a batch adds must land under a node the host already has.
    fn check_parents(&self, patches: &[Patch]) -> Result<()> {
        for patch in patches {
            match &patch.op {
                PatchOp::NodeAdded { parent_path, .. } => {
                    self.parent_slot(parent_path.as_ref())?;
                }
                PatchOp::NodeReplaced { parent_path, .. } if !self.by_path.contains_key(&patch.path) => {
                    self.parent_slot(parent_path.as_ref())?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn remove(&mut self, host: &mut R, path: &Path) {
        let Some(slot) = self.by_path.get(path).copied() else {
            tracing::debug!(%path, "no host node to remove");
            return;
        };
        if let Some(handle) = self.handle(slot) {
            host.detach(&handle);
        }
        self.unlink(slot);
        self.release(slot);
    }

    fn append(&mut self, host: &mut R, node: &SnapshotNode, parent: Option<Slot>) {
        let slot = self.materialize(host, node, parent);
        if let (Some(parent_handle), Some(handle)) = (self.parent_handle(host, parent), self.handle(slot)) {
            host.insert_before(&parent_handle, &handle, None);
        }
        self.children.entry(parent).or_default().push(slot);
    }

    fn replace(&mut self, host: &mut R, path: &Path, node: &SnapshotNode, parent_path: Option<&Path>) -> Result<()> {
        let Some(old) = self.by_path.get(path).copied() else {
            tracing::debug!(%path, "no host node to replace; adding instead");
            let parent = self.parent_slot(parent_path)?;
            self.append(host, node, parent);
            return Ok(());
        };

        let parent = self.parent_of.get(&old).copied().flatten();
        let siblings = self.children.get(&parent).cloned().unwrap_or_default();
        let position = siblings.iter().position(|s| *s == old);
        let reference = position
            .and_then(|i| siblings.get(i + 1))
            .and_then(|s| self.handle(*s));

        // Outer wrappers of the replaced node keep pointing at its successor
        let outer: Vec<Path> = self
            .by_path
            .iter()
            .filter(|(p, s)| **s == old && !path.is_ancestor_or_equal(p))
            .map(|(p, _)| p.clone())
            .collect();

        if let Some(handle) = self.handle(old) {
            host.detach(&handle);
        }
        self.release(old);

        let slot = self.materialize(host, node, parent);
        for p in outer {
            self.by_path.insert(p, slot);
        }
        if let (Some(parent_handle), Some(handle)) = (self.parent_handle(host, parent), self.handle(slot)) {
            host.insert_before(&parent_handle, &handle, reference.as_ref());
        }
        let list = self.children.entry(parent).or_default();
        match position {
            Some(i) => list[i] = slot,
            None => list.push(slot),
        }
        Ok(())
    }

    // =========================================================================
    // Slab
    // =========================================================================

    fn handle(&self, slot: Slot) -> Option<R::Handle> {
        self.handles.get(slot).cloned().flatten()
    }

    fn parent_slot(&self, parent_path: Option<&Path>) -> Result<Option<Slot>> {
        match parent_path {
            None => Ok(None),
            Some(path) => self
                .by_path
                .get(path)
                .copied()
                .map(Some)
                .ok_or_else(|| Error::MissingNode {
                    path: path.clone(),
                    tree: "host",
                }),
        }
    }

    fn parent_handle(&self, host: &R, parent: Option<Slot>) -> Option<R::Handle> {
        match parent {
            None => Some(host.container()),
            Some(slot) => self.handle(slot),
        }
    }

    fn alloc(&mut self, handle: R::Handle) -> Slot {
        match self.free.pop() {
            Some(slot) => {
                self.handles[slot] = Some(handle);
                slot
            }
            None => {
                self.handles.push(Some(handle));
                self.handles.len() - 1
            }
        }
    }

    /// Build the host subtree for `node`. The returned slot is not yet
    /// inserted into `parent`.
    fn materialize(&mut self, host: &mut R, node: &SnapshotNode, parent: Option<Slot>) -> Slot {
        let resolved = node.resolve();
        let handle = host.materialize(resolved);
        let slot = self.alloc(handle.clone());

        for path in node.wrapper_paths() {
            self.by_path.insert(path.clone(), slot);
        }
        self.by_path.insert(resolved.path.clone(), slot);
        self.parent_of.insert(slot, parent);

        let mut kids = Vec::with_capacity(resolved.children.len());
        for child in &resolved.children {
            let child_slot = self.materialize(host, child, Some(slot));
            if let Some(child_handle) = self.handle(child_slot) {
                host.insert_before(&handle, &child_handle, None);
            }
            kids.push(child_slot);
        }
        self.children.insert(Some(slot), kids);
        slot
    }

    fn unlink(&mut self, slot: Slot) {
        let parent = self.parent_of.get(&slot).copied().flatten();
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|s| *s != slot);
        }
    }

    /// Forget `slot` and its subtree. The host side must already be detached.
    fn release(&mut self, slot: Slot) {
        let mut freed = HashSet::new();
        let mut stack = vec![slot];
        while let Some(next) = stack.pop() {
            if let Some(kids) = self.children.remove(&Some(next)) {
                stack.extend(kids);
            }
            self.parent_of.remove(&next);
            if let Some(entry) = self.handles.get_mut(next) {
                *entry = None;
            }
            self.free.push(next);
            freed.insert(next);
        }
        self.by_path.retain(|_, s| !freed.contains(s));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Primitive, Props};
    use crate::engine::{NodeKind, PropChange};
    use crate::renderer::{HostOp, MemoryRenderer};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn text(path: Path, s: &str) -> Rc<SnapshotNode> {
        Rc::new(SnapshotNode::primitive(path, Primitive::Text(s.into())))
    }

    fn el(path: Path, tag: &str, children: Vec<Rc<SnapshotNode>>) -> Rc<SnapshotNode> {
        Rc::new(SnapshotNode {
            path,
            kind: NodeKind::Host {
                tag: tag.to_string(),
                props: Props::new(),
            },
            children,
        })
    }

    fn mounted(root: &SnapshotNode) -> (Dispatcher<MemoryRenderer>, MemoryRenderer) {
        let mut host = MemoryRenderer::new();
        let mut dispatcher = Dispatcher::new();
        dispatcher.mount_tree(&mut host, root);
        host.take_ops();
        (dispatcher, host)
    }

    #[test]
    fn test_mount_tree() {
        let root = el(Path::root(), "ul", vec![text(Path::from([0]), "a"), text(Path::from([1]), "b")]);
        let (dispatcher, host) = mounted(&root);
        assert_eq!(host.to_markup(), "<ul>ab</ul>");
        assert_eq!(dispatcher.len(), 3);
        assert!(dispatcher.handle_at(&Path::from([1])).is_some());
    }

    #[test]
    fn test_remove_then_add() {
        let root = el(Path::root(), "ul", vec![text(Path::from([0]), "a"), text(Path::from([1]), "b")]);
        let (mut dispatcher, mut host) = mounted(&root);

        let patches = vec![
            Patch::new(Path::from([1]), PatchOp::NodeRemoved),
            Patch::new(
                Path::from([1]),
                PatchOp::NodeAdded {
                    node: el(Path::from([1]), "li", vec![text(Path::from([1, 0]), "c")]),
                    parent_path: Some(Path::root()),
                },
            ),
        ];
        dispatcher.apply(&mut host, &patches).unwrap();
        assert_eq!(host.to_markup(), "<ul>a<li>c</li></ul>");
        assert!(dispatcher.handle_at(&Path::from([1, 0])).is_some());
    }

    #[test]
    fn test_replace_keeps_position() {
        let root = el(
            Path::root(),
            "div",
            vec![text(Path::from([0]), "a"), text(Path::from([1]), "b"), text(Path::from([2]), "c")],
        );
        let (mut dispatcher, mut host) = mounted(&root);

        let patch = Patch::new(
            Path::from([1]),
            PatchOp::NodeReplaced {
                new_node: el(Path::from([1]), "hr", vec![]),
                parent_path: Some(Path::root()),
            },
        );
        dispatcher.apply(&mut host, &[patch]).unwrap();
        assert_eq!(host.to_markup(), "<div>a<hr></hr>c</div>");
    }

    #[test]
    fn test_replace_root() {
        let (mut dispatcher, mut host) = mounted(&el(Path::root(), "div", vec![]));
        let patch = Patch::new(
            Path::root(),
            PatchOp::NodeReplaced {
                new_node: el(Path::root(), "span", vec![]),
                parent_path: None,
            },
        );
        dispatcher.apply(&mut host, &[patch]).unwrap();
        assert_eq!(host.to_markup(), "<span></span>");
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_updates_reach_handles() {
        let root = el(Path::root(), "p", vec![text(Path::from([0]), "1")]);
        let (mut dispatcher, mut host) = mounted(&root);

        let mut changes = BTreeMap::new();
        changes.insert(
            "class".to_string(),
            PropChange::Updated {
                old: None,
                new: "big".into(),
            },
        );
        let patches = vec![
            Patch::new(Path::from([0]), PatchOp::PrimitiveUpdated { new_value: Primitive::Number(2.0) }),
            Patch::new(Path::root(), PatchOp::PropsChanged { changes }),
        ];
        dispatcher.apply(&mut host, &patches).unwrap();
        assert_eq!(host.to_markup(), r#"<p class="big">2</p>"#);
        assert_eq!(host.take_ops().len(), 2);
    }

    #[test]
    fn test_missing_targets() {
        let (mut dispatcher, mut host) = mounted(&el(Path::root(), "div", vec![]));

        let skipped = vec![
            Patch::new(Path::from([4]), PatchOp::NodeRemoved),
            Patch::new(Path::from([4]), PatchOp::PrimitiveUpdated { new_value: Primitive::Null }),
        ];
        assert!(dispatcher.apply(&mut host, &skipped).is_ok());
        assert!(host.take_ops().is_empty());

        let orphan = Patch::new(
            Path::from([4, 0]),
            PatchOp::NodeAdded {
                node: text(Path::from([4, 0]), "x"),
                parent_path: Some(Path::from([4])),
            },
        );
        let err = dispatcher.apply(&mut host, &[orphan]).unwrap_err();
        assert_eq!(
            err,
            Error::MissingNode {
                path: Path::from([4]),
                tree: "host"
            }
        );
    }

    #[test]
    fn test_failed_batch_leaves_host_untouched() {
        let root = el(Path::root(), "ul", vec![text(Path::from([0]), "a"), text(Path::from([1]), "b")]);
        let (mut dispatcher, mut host) = mounted(&root);

        let patches = vec![
            Patch::new(Path::from([1]), PatchOp::NodeRemoved),
            Patch::new(Path::from([0]), PatchOp::PrimitiveUpdated { new_value: Primitive::Text("z".into()) }),
            Patch::new(
                Path::from([7, 0]),
                PatchOp::NodeAdded {
                    node: text(Path::from([7, 0]), "x"),
                    parent_path: Some(Path::from([7])),
                },
            ),
        ];
        assert!(dispatcher.apply(&mut host, &patches).is_err());
        assert!(host.take_ops().is_empty());
        assert_eq!(host.to_markup(), "<ul>ab</ul>");
        assert_eq!(dispatcher.len(), 3);
    }

    #[test]
    fn test_unmount_detaches_root() {
        let (mut dispatcher, mut host) = mounted(&el(Path::root(), "div", vec![text(Path::from([0]), "x")]));
        dispatcher.unmount(&mut host);
        assert_eq!(host.to_markup(), "");
        assert_eq!(host.live_count(), 0);
        assert!(dispatcher.is_empty());
        assert!(matches!(host.take_ops().as_slice(), [HostOp::Detach { .. }]));
    }
}
