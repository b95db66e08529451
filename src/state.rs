use crate::error::PatchError;
use crate::node::Node;
use crate::types::{Key, Update};

/// A renderer-side copy of the tree, kept in sync by applying every [`Update`] in order.
///
/// It does not own the engine, so it can live on the other side of a channel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    boundary: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Safe boundary of the last applied update.
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<&Node> {
        let (first, rest) = key.path().split_first()?;
        let mut node = self.nodes.get(*first)?;
        for &ordinal in rest {
            node = node.children.get(ordinal)?;
        }
        Some(node)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.boundary = 0;
    }

    /// Apply one update. On error the document is left partially patched and should be rebuilt
    /// from a `reset` update.
    pub fn apply(&mut self, update: &Update) -> Result<(), PatchError> {
        update.apply_to(&mut self.nodes)?;
        self.boundary = update.boundary;
        Ok(())
    }
}
