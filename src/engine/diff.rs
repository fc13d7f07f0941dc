//! Diff Engine - compares two snapshot trees node by node.
//!
//! Rules, in priority order, for the node at a path:
//! 1. Nothing at that path before: `NodeAdded` (no recursion)
//! 2. Different node type: `NodeReplaced` (no recursion)
//! 3. Both primitives: `PrimitiveUpdated` if the values differ
//! 4. Same host tag: one `PropsChanged` for all changed props, then children
//!    by position; previous children past the current count are `NodeRemoved`
//!
//! Component wrappers of the same type are transparent: the diff continues
//! with their output. Children are matched by index only, so a reordered list
//! shows up as a change at every shifted position.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::element::{Props, CHILDREN_KEY};
use crate::path::Path;

use super::patch::{Patch, PatchOp, PropChange};
use super::vdom::{NodeKind, SnapshotNode, Vdom};

/// Diff `current` against `vdom.previous`, in tree pre-order.
pub fn diff(current: &Rc<SnapshotNode>, vdom: &Vdom) -> Vec<Patch> {
    let mut patches = Vec::new();
    let parent = current.path.parent();
    diff_node(current, parent.as_ref(), vdom, &mut patches);
    patches
}

fn diff_node(current: &Rc<SnapshotNode>, host_parent: Option<&Path>, vdom: &Vdom, out: &mut Vec<Patch>) {
    let Some(previous) = vdom.previous_at(&current.path) else {
        out.push(Patch::new(
            current.path.clone(),
            PatchOp::NodeAdded {
                node: current.clone(),
                parent_path: host_parent.cloned(),
            },
        ));
        return;
    };

    if previous.node_type() != current.node_type() {
        out.push(Patch::new(
            current.path.clone(),
            PatchOp::NodeReplaced {
                new_node: current.clone(),
                parent_path: host_parent.cloned(),
            },
        ));
        return;
    }

    match (&previous.kind, &current.kind) {
        (NodeKind::Primitive(old), NodeKind::Primitive(new)) => {
            if old != new {
                out.push(Patch::new(
                    current.path.clone(),
                    PatchOp::PrimitiveUpdated { new_value: new.clone() },
                ));
            }
        }
        (NodeKind::Host { props: old, .. }, NodeKind::Host { props: new, .. }) => {
            let changes = diff_props(old, new);
            if !changes.is_empty() {
                out.push(Patch::new(current.path.clone(), PatchOp::PropsChanged { changes }));
            }
            diff_children(previous, current, Some(&current.path), vdom, out);
        }
        (NodeKind::Component(_), NodeKind::Component(_)) => {
            diff_children(previous, current, host_parent, vdom, out);
        }
        // Equal node types imply equal kinds
        _ => {}
    }
}

fn diff_children(
    previous: &SnapshotNode,
    current: &SnapshotNode,
    host_parent: Option<&Path>,
    vdom: &Vdom,
    out: &mut Vec<Patch>,
) {
    let len = previous.children.len().max(current.children.len());
    for index in 0..len {
        match current.children.get(index) {
            Some(child) => diff_node(child, host_parent, vdom, out),
            None => {
                if let Some(stale) = previous.children.get(index) {
                    out.push(Patch::new(stale.path.clone(), PatchOp::NodeRemoved));
                }
            }
        }
    }
}

/// Changed props between two renders of the same host node.
pub fn diff_props(old: &Props, new: &Props) -> BTreeMap<String, PropChange> {
    let mut changes = BTreeMap::new();

    for (name, old_value) in old.iter() {
        if name == CHILDREN_KEY {
            continue;
        }
        match new.get(name) {
            None => {
                changes.insert(name.to_string(), PropChange::Removed { old: old_value.clone() });
            }
            Some(new_value) if new_value != old_value => {
                changes.insert(
                    name.to_string(),
                    PropChange::Updated {
                        old: Some(old_value.clone()),
                        new: new_value.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    for (name, new_value) in new.iter() {
        if name == CHILDREN_KEY || old.contains(name) {
            continue;
        }
        changes.insert(
            name.to_string(),
            PropChange::Updated {
                old: None,
                new: new_value.clone(),
            },
        );
    }

    changes
}

// =============================================================================
// Tests
// =============================================================================
