//! # spark-vdom
//!
//! Declarative UI engine for Rust: element trees in, host patches out.
//!
//! Built on [spark-signals](https://crates.io/crates/spark-signals) for the
//! render trigger.
//!
//! ## Architecture
//!
//! A mounted root re-renders from the top whenever one of its components
//! changes state. Each render produces an immutable snapshot tree addressed by
//! path; the snapshot is diffed against the previous one and only the
//! resulting patches reach the host:
//! ```text
//! Element tree → render (hooks) → SnapshotNode tree → diff → ordered patches → HostRenderer
//! ```
//!
//! ## Modules
//!
//! - [`path`] - Node addressing by child indices
//! - [`element`] - Element model (primitives, host elements, components)
//! - [`hooks`] - `use_state` / `use_effect` and the per-path hook table
//! - [`engine`] - Reconciliation, diffing and patch ordering
//! - [`pipeline`] - Mounting, scheduling and patch dispatch
//! - [`renderer`] - Host renderer interface and the in-memory host

pub mod element;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod path;
pub mod pipeline;
pub mod renderer;

// Re-export commonly used items
pub use element::{
    host, ComponentElement, ComponentType, Element, EventHandler, HostElement, Primitive, PropValue, Props,
    CHILDREN_KEY,
};

pub use error::{Error, Result};

pub use path::Path;

pub use hooks::{Cleanup, HookTable, Hooks, IntoCleanup, StateSetter};

pub use engine::{diff, order_patches, NodeKind, NodeType, Patch, PatchOp, PropChange, SnapshotNode, Vdom};

pub use pipeline::{mount, mount_with, subscribe, CommitCallback, CyclePhase, MountHandle, RuntimeConfig, Subscription};

pub use renderer::{HostOp, HostRenderer, MemoryRenderer, NodeId, NoopRenderer};
