//! Render Engine - snapshot trees, reconciliation and diffing.
//!
//! The engine turns an element tree into patches:
//! - Reconcile: expands elements into an immutable [`SnapshotNode`] tree,
//!   running components against their hook records
//! - Diff: compares the new tree against the committed one by path
//! - Patch: orders the resulting patches for application
//!
//! # Architecture
//!
//! Nodes are addressed by their [`Path`](crate::Path), the child indices from
//! the root. A component's output sits one level below the component:
//!
//! ```text
//! /        div
//! /0       Counter (component wrapper)
//! /0/0     button
//! /0/0/0   "3"
//! /1       "footer"
//! ```
//!
//! The engine never touches the host. It only produces trees and patches;
//! the pipeline decides when to run it and where patches go.

pub mod diff;
pub mod patch;
pub mod reconcile;
pub mod vdom;

pub use diff::{diff, diff_props};
pub use patch::{order_patches, Patch, PatchOp, PropChange};
pub use reconcile::{render, RenderOutput, RenderPass};
pub use vdom::{NodeKind, NodeType, SnapshotNode, Vdom};
