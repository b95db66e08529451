use std::fmt;

use crate::diff::apply_patches;
use crate::error::PatchError;
use crate::node::Node;

/// Structural path of a node: child ordinals from the root. The root itself is the empty path.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<usize>);

impl Key {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 1);
        path.extend_from_slice(&self.0);
        path.push(index);
        Self(path)
    }

    pub fn path(&self) -> &[usize] {
        &self.0
    }

    /// Parent key and the ordinal of this key under it. `None` for the root.
    pub fn split_last(&self) -> Option<(Key, usize)> {
        let (&last, parent) = self.0.split_last()?;
        Some((Key(parent.to_vec()), last))
    }
}

impl From<Vec<usize>> for Key {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl From<&[usize]> for Key {
    fn from(path: &[usize]) -> Self {
        Self(path.to_vec())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (i, ordinal) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{ordinal}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    Insert { parent: Key, index: usize, node: Node },
    Remove { key: Key },
    Replace { key: Key, node: Node },
    UpdateText { key: Key, text: String },
}

impl PatchOp {
    pub fn key(&self) -> Key {
        match self {
            PatchOp::Insert { parent, index, .. } => parent.child(*index),
            PatchOp::Remove { key } | PatchOp::Replace { key, .. } | PatchOp::UpdateText { key, .. } => {
                key.clone()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Ordered patches turning the previously emitted tree into the current one.
    pub patches: Vec<PatchOp>,
    /// Safe boundary (byte offset into the normalized buffer) the current tree was parsed from.
    pub boundary: usize,
    /// If true, consumers must drop all previously rendered state and apply `patches` to an
    /// empty tree.
    pub reset: bool,
}

impl Update {
    pub fn empty(boundary: usize) -> Self {
        Self {
            patches: Vec::new(),
            boundary,
            reset: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && !self.reset
    }

    /// Apply this update to a consumer-side tree.
    pub fn apply_to(&self, tree: &mut Vec<Node>) -> Result<(), PatchError> {
        if self.reset {
            tree.clear();
        }
        apply_patches(tree, &self.patches)
    }
}
