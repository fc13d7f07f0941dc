//! Error types for render cycles.

use thiserror::Error;

use crate::path::Path;

/// Errors surfaced by a render cycle.
///
/// Every variant is fatal for the cycle that produced it: the committed
/// snapshot stays the one of the last completed cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A primitive the host has no representation for.
    #[error("cannot render {value} at {path}: value has no host representation")]
    UnrenderableValue { path: Path, value: String },

    /// A component called its hooks in a different order or count than on
    /// its first render at this path.
    #[error("hook order violation in {component} at {path}: {detail}")]
    HookOrder {
        path: Path,
        component: &'static str,
        detail: String,
    },

    /// A path that must resolve in a tree did not.
    #[error("no node at {path} in the {tree} tree")]
    MissingNode { path: Path, tree: &'static str },

    /// State kept changing after every cycle.
    #[error("render loop: state still changing after {limit} consecutive cycles")]
    RenderLoop { limit: usize },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
