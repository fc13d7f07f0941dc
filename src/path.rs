//! Path addressing.
//!
//! A [`Path`] is the position of a node in the tree, written as the child
//! index taken at every level starting from the root. The empty path is the
//! root. Paths are the only identity a node has: there are no keys, so moving
//! a child to another index gives it a different identity.
//!
//! ```text
//! div            []
//! ├── "a"        [0]
//! └── Counter    [1]
//!     └── span   [1, 0]   (component output sits one level down)
//! ```

use std::fmt;

/// Position of a node in an element tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<usize>);

impl Path {
    /// The root path (empty sequence).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// The child indices, root first.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of levels below the root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Index of this node within its parent (`None` for the root).
    pub fn last_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the child at `index`.
    pub fn append(&self, index: usize) -> Path {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Path(indices)
    }

    /// Path of the parent node.
    ///
    /// The root has no parent; asking for it is a caller bug and yields `None`.
    pub fn parent(&self) -> Option<Path> {
        let (_, init) = self.0.split_last()?;
        Some(Path(init.to_vec()))
    }

    /// True if `self` is `path` or one of its ancestors.
    ///
    /// The root is an ancestor of every path.
    pub fn is_ancestor_or_equal(&self, path: &Path) -> bool {
        path.0.starts_with(&self.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

// =============================================================================
// Tests
// =============================================================================
