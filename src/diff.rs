use crate::error::PatchError;
use crate::node::Node;
use crate::types::{Key, PatchOp};

/// Diff two forests into the ordered patch list that turns `previous` into `next`.
///
/// Children are compared in lockstep by ordinal. Patches come out in pre-order: a node's own
/// patch precedes the patches of its children, and trailing removals run from the highest
/// ordinal down so every key still resolves when its patch is applied.
pub fn diff(previous: &[Node], next: &[Node]) -> Vec<PatchOp> {
    diff_from(previous, next, 0)
}

/// Like [`diff`], for the top-level suffixes starting at ordinal `base` of two forests that
/// share their first `base` nodes.
pub(crate) fn diff_from(previous: &[Node], next: &[Node], base: usize) -> Vec<PatchOp> {
    let mut out = Vec::new();
    diff_children(&Key::root(), previous, next, base, &mut out);
    out
}

fn diff_children(
    parent: &Key,
    previous: &[Node],
    next: &[Node],
    base: usize,
    out: &mut Vec<PatchOp>,
) {
    let common = previous.len().min(next.len());
    for i in 0..common {
        diff_node(&parent.child(base + i), &previous[i], &next[i], out);
    }
    for (i, node) in next.iter().enumerate().skip(common) {
        out.push(PatchOp::Insert {
            parent: parent.clone(),
            index: base + i,
            node: node.clone(),
        });
    }
    for i in (common..previous.len()).rev() {
        out.push(PatchOp::Remove {
            key: parent.child(base + i),
        });
    }
}

fn diff_node(key: &Key, previous: &Node, next: &Node, out: &mut Vec<PatchOp>) {
    if previous == next {
        return;
    }
    if !previous.kind.same_shape(&next.kind) {
        out.push(PatchOp::Replace {
            key: key.clone(),
            node: next.clone(),
        });
        return;
    }
    if previous.kind.text() != next.kind.text() {
        out.push(PatchOp::UpdateText {
            key: key.clone(),
            text: next.kind.text().unwrap_or_default().to_string(),
        });
    }
    diff_children(key, &previous.children, &next.children, 0, out);
}

/// Apply patches in order. Stops at the first patch whose key does not resolve.
pub fn apply_patches(tree: &mut Vec<Node>, patches: &[PatchOp]) -> Result<(), PatchError> {
    for patch in patches {
        apply_patch(tree, patch)?;
    }
    Ok(())
}

pub fn apply_patch(tree: &mut Vec<Node>, patch: &PatchOp) -> Result<(), PatchError> {
    match patch {
        PatchOp::Insert {
            parent,
            index,
            node,
        } => {
            let children = children_mut(tree, parent)?;
            if *index > children.len() {
                return Err(PatchError::InsertOutOfRange {
                    parent: parent.clone(),
                    index: *index,
                    len: children.len(),
                });
            }
            children.insert(*index, node.clone());
        }
        PatchOp::Remove { key } => {
            let (parent, index) = key.split_last().ok_or(PatchError::RootTarget)?;
            let children = children_mut(tree, &parent)?;
            if index >= children.len() {
                return Err(PatchError::MissingNode(key.clone()));
            }
            children.remove(index);
        }
        PatchOp::Replace { key, node } => {
            let slot = node_mut(tree, key)?;
            *slot = node.clone();
        }
        PatchOp::UpdateText { key, text } => {
            let slot = node_mut(tree, key)?;
            if !slot.set_text(text.clone()) {
                return Err(PatchError::NotText(key.clone()));
            }
        }
    }
    Ok(())
}

fn children_mut<'a>(tree: &'a mut Vec<Node>, key: &Key) -> Result<&'a mut Vec<Node>, PatchError> {
    if key.is_root() {
        return Ok(tree);
    }
    Ok(&mut node_mut(tree, key)?.children)
}

fn node_mut<'a>(tree: &'a mut [Node], key: &Key) -> Result<&'a mut Node, PatchError> {
    let (first, rest) = key.path().split_first().ok_or(PatchError::RootTarget)?;
    let mut node = tree
        .get_mut(*first)
        .ok_or_else(|| PatchError::MissingNode(key.clone()))?;
    for &ordinal in rest {
        node = node
            .children
            .get_mut(ordinal)
            .ok_or_else(|| PatchError::MissingNode(key.clone()))?;
    }
    Ok(node)
}
