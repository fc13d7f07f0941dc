//! Host renderers - where committed trees become real nodes.
//!
//! The engine never builds host nodes itself. It drives a [`HostRenderer`]
//! through the dispatcher, one node at a time:
//!
//! ```text
//! Patch list → Dispatcher → materialize / insert_before / detach
//!                           update_text / apply_prop_change
//! ```
//!
//! Two renderers ship with the crate:
//! - [`MemoryRenderer`] - an in-memory node arena with markup output
//! - [`NoopRenderer`] - discards everything, for commit-only subscribers

mod memory;

pub use memory::{HostOp, MemoryRenderer, NodeId};

use crate::element::Primitive;
use crate::engine::{PropChange, SnapshotNode};

/// Interface a host must provide to display a mounted tree.
///
/// Handles are opaque to the engine. It only stores them, clones them and
/// hands them back.
pub trait HostRenderer {
    type Handle: Clone;

    /// The node the root of the tree is inserted into.
    fn container(&self) -> Self::Handle;

    /// Create the host node for `node` alone (text, placeholder or tagged
    /// element with its props), detached and without children.
    ///
    /// `node` is always resolved: it is never a component wrapper.
    fn materialize(&mut self, node: &SnapshotNode) -> Self::Handle;

    /// Remove `handle` from its parent and release it with its subtree.
    fn detach(&mut self, handle: &Self::Handle);

    /// Replace the content of a primitive node.
    fn update_text(&mut self, handle: &Self::Handle, value: &Primitive);

    fn apply_prop_change(&mut self, handle: &Self::Handle, name: &str, change: &PropChange);

    /// Insert `handle` under `parent` before `reference`, or last when
    /// `reference` is `None`.
    fn insert_before(&mut self, parent: &Self::Handle, handle: &Self::Handle, reference: Option<&Self::Handle>);
}

/// Renderer that keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl HostRenderer for NoopRenderer {
    type Handle = ();

    fn container(&self) {}

    fn materialize(&mut self, _node: &SnapshotNode) {}

    fn detach(&mut self, _handle: &()) {}

    fn update_text(&mut self, _handle: &(), _value: &Primitive) {}

    fn apply_prop_change(&mut self, _handle: &(), _name: &str, _change: &PropChange) {}

    fn insert_before(&mut self, _parent: &(), _handle: &(), _reference: Option<&()>) {}
}
