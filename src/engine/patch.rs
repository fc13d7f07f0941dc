//! Patch operations and their application order.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::element::{Primitive, PropValue};
use crate::path::Path;

use super::vdom::SnapshotNode;

/// Change of one host prop.
#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
    /// Value differs from the previous render. `old` is `None` for a new prop.
    Updated {
        old: Option<PropValue>,
        new: PropValue,
    },
    /// Prop no longer present.
    Removed { old: PropValue },
}

/// What a patch does to the node at its path.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// A node with no previous counterpart. `parent_path` is the host parent
    /// (`None` for the root). The subtree is added as a whole.
    NodeAdded {
        node: Rc<SnapshotNode>,
        parent_path: Option<Path>,
    },
    NodeRemoved,
    /// The node changed type; the old subtree goes, the new one comes in.
    NodeReplaced {
        new_node: Rc<SnapshotNode>,
        parent_path: Option<Path>,
    },
    PrimitiveUpdated { new_value: Primitive },
    PropsChanged { changes: BTreeMap<String, PropChange> },
}

impl PatchOp {
    /// Application priority: removals, additions, replacements, primitive
    /// updates, prop updates.
    pub fn priority(&self) -> u8 {
        match self {
            PatchOp::NodeRemoved => 0,
            PatchOp::NodeAdded { .. } => 1,
            PatchOp::NodeReplaced { .. } => 2,
            PatchOp::PrimitiveUpdated { .. } => 3,
            PatchOp::PropsChanged { .. } => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::NodeAdded { .. } => "NodeAdded",
            PatchOp::NodeRemoved => "NodeRemoved",
            PatchOp::NodeReplaced { .. } => "NodeReplaced",
            PatchOp::PrimitiveUpdated { .. } => "PrimitiveUpdated",
            PatchOp::PropsChanged { .. } => "PropsChanged",
        }
    }
}

/// A change addressed by path.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub path: Path,
    pub op: PatchOp,
}

impl Patch {
    pub fn new(path: Path, op: PatchOp) -> Self {
        Self { path, op }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.name(), self.path)
    }
}

/// Sort a cycle's patches into application order.
///
/// The sort is stable, so patches of equal priority keep their pre-order
/// position. Removals come first so a parent drops stale children before it
/// receives new ones.
pub fn order_patches(mut patches: Vec<Patch>) -> Vec<Patch> {
    patches.sort_by_key(|patch| patch.op.priority());
    patches
}

// =============================================================================
// Tests
// =============================================================================
