use serde::{Deserialize, Serialize};

use crate::core::{Attrs, Node, Selection};
use crate::error::ApplyError;

/// Child indices from the `doc` node down to a node.
pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    ReplaceNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    SetNodeAttrs {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}

/// Applies every op of `tx` to a copy of `doc` and returns the new tree.
/// On error nothing is returned, so a failed transaction never leaks a
/// partially edited tree.
pub fn apply_transaction(doc: &Node, tx: &Transaction) -> Result<Node, ApplyError> {
    let mut next = doc.clone();
    for op in &tx.ops {
        apply_op_to(&mut next, op)?;
    }
    Ok(next)
}

fn apply_op_to(doc: &mut Node, op: &Op) -> Result<(), ApplyError> {
    match op {
        Op::RemoveNode { path } => {
            let (index, children) = parent_children_mut(doc, path)?;
            if index >= children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "Remove index out of bounds: {index} >= {}",
                    children.len()
                )));
            }
            children.remove(index);
        }
        Op::ReplaceNode { path, node } => {
            let target = node_mut(doc, path)?;
            *target = node.clone();
        }
        Op::SetNodeAttrs { path, patch } => {
            let target = node_mut(doc, path)?;
            if target.is_text() {
                return Err(ApplyError::InvalidPath("Text has no attrs".into()));
            }
            for (k, v) in &patch.set {
                target.attrs.insert(k.clone(), v.clone());
            }
        }
    }
    Ok(())
}

pub fn node_at_path<'a>(doc: &'a Node, path: &[usize]) -> Option<&'a Node> {
    let mut node = doc;
    for &ix in path {
        node = node.content.get(ix)?;
    }
    Some(node)
}

fn node_mut<'a>(doc: &'a mut Node, path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    if path.is_empty() {
        return Err(ApplyError::InvalidPath("Empty path".into()));
    }

    let mut node = doc;
    for (depth, &ix) in path.iter().enumerate() {
        let len = node.content.len();
        node = node.content.get_mut(ix).ok_or_else(|| {
            ApplyError::InvalidPath(format!("Path out of bounds at depth {depth}: {ix} >= {len}"))
        })?;
    }
    Ok(node)
}

fn parent_children_mut<'a>(
    doc: &'a mut Node,
    path: &[usize],
) -> Result<(usize, &'a mut Vec<Node>), ApplyError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(ApplyError::InvalidPath("Empty path".into()));
    };

    let parent = if parent_path.is_empty() {
        doc
    } else {
        node_mut(doc, parent_path)?
    };
    if parent.is_text() {
        return Err(ApplyError::InvalidPath("Parent is not a container".into()));
    }
    Ok((index, &mut parent.content))
}
