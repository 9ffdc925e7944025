use crate::core::{Mark, Node};
use crate::ops::{Path, node_at_path};
use crate::schema::SchemaRegistry;

/// Size of `node` in positions: characters for text, 1 for inline leaves,
/// content plus opening and closing tokens for everything else.
pub fn node_size(node: &Node, schema: &SchemaRegistry) -> usize {
    if node.is_text() {
        return node.text_str().chars().count();
    }
    if schema.is_leaf(&node.type_name) {
        return 1;
    }
    content_size(&node.content, schema) + 2
}

pub fn content_size(children: &[Node], schema: &SchemaRegistry) -> usize {
    children.iter().map(|c| node_size(c, schema)).sum()
}

/// Offset of child `index` from the start of its parent's content.
pub fn child_offset(children: &[Node], index: usize, schema: &SchemaRegistry) -> usize {
    content_size(&children[..index.min(children.len())], schema)
}

/// A document position resolved against a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// Child indices from the root down to the parent node.
    pub path: Path,
    /// Content start position of each node along the path, root first.
    pub starts: Vec<usize>,
    pub parent_offset: usize,
    /// Index of the child at or after `parent_offset`.
    pub index: usize,
    /// Offset into the child at `index` when the position is inside a text
    /// node, else 0.
    pub text_offset: usize,
}

impl ResolvedPos {
    pub fn parent<'a>(&self, doc: &'a Node) -> Option<&'a Node> {
        node_at_path(doc, &self.path)
    }

    /// Ancestors from the root down to the parent.
    pub fn ancestors<'a>(&self, doc: &'a Node) -> Vec<&'a Node> {
        let mut out = vec![doc];
        let mut node = doc;
        for &ix in &self.path {
            match node.content.get(ix) {
                Some(child) => {
                    out.push(child);
                    node = child;
                }
                None => break,
            }
        }
        out
    }

    pub fn start(&self) -> usize {
        self.starts.last().copied().unwrap_or(0)
    }

    pub fn node_after<'a>(&self, doc: &'a Node) -> Option<&'a Node> {
        self.parent(doc)?.content.get(self.index)
    }

    pub fn node_before<'a>(&self, doc: &'a Node) -> Option<&'a Node> {
        let parent = self.parent(doc)?;
        if self.text_offset > 0 {
            return parent.content.get(self.index);
        }
        parent.content.get(self.index.checked_sub(1)?)
    }

    /// Marks in effect at this position. Inside a text node these are that
    /// node's marks; at a boundary they are taken from the node before,
    /// dropping non-inclusive marks the node after does not share.
    pub fn marks(&self, doc: &Node, schema: &SchemaRegistry) -> Vec<Mark> {
        let Some(parent) = self.parent(doc) else {
            return Vec::new();
        };
        if parent.content.is_empty() {
            return Vec::new();
        }
        if self.text_offset > 0 {
            return parent.content[self.index].marks.clone();
        }

        let before = self.index.checked_sub(1).and_then(|i| parent.content.get(i));
        let after = parent.content.get(self.index);
        let (main, other) = match before {
            Some(before) => (before, after),
            None => match after {
                Some(after) => (after, None),
                None => return Vec::new(),
            },
        };

        main.marks
            .iter()
            .filter(|mark| {
                schema.is_mark_inclusive(&mark.type_name)
                    || other.is_some_and(|o| o.marks.contains(mark))
            })
            .cloned()
            .collect()
    }
}

/// Resolves `pos` in `doc`, or `None` when it lies outside the document.
pub fn resolve(doc: &Node, pos: usize, schema: &SchemaRegistry) -> Option<ResolvedPos> {
    if pos > content_size(&doc.content, schema) {
        return None;
    }

    let mut path = Vec::new();
    let mut starts = vec![0usize];
    let mut node = doc;
    let mut start = 0usize;

    loop {
        let offset = pos - start;
        let mut index = node.content.len();
        let mut child_start = 0usize;
        for (ix, child) in node.content.iter().enumerate() {
            let end = child_start + node_size(child, schema);
            if offset < end {
                index = ix;
                break;
            }
            child_start = end;
        }

        let at_boundary = index == node.content.len() || offset == child_start;
        if at_boundary {
            return Some(ResolvedPos {
                pos,
                path,
                starts,
                parent_offset: offset,
                index,
                text_offset: 0,
            });
        }

        let child = &node.content[index];
        if child.is_text() || schema.is_leaf(&child.type_name) {
            return Some(ResolvedPos {
                pos,
                path,
                starts,
                parent_offset: offset,
                index,
                text_offset: offset - child_start,
            });
        }

        path.push(index);
        start += child_start + 1;
        starts.push(start);
        node = child;
    }
}

/// A textblock found while walking the document.
#[derive(Debug, Clone)]
pub struct TextBlock<'a> {
    pub path: Path,
    pub node: &'a Node,
    /// Position of the block's content start.
    pub start: usize,
    pub size: usize,
}

impl TextBlock<'_> {
    pub fn end(&self) -> usize {
        self.start + self.size
    }
}

pub fn text_blocks_in_order<'a>(doc: &'a Node, schema: &SchemaRegistry) -> Vec<TextBlock<'a>> {
    fn walk<'a>(
        nodes: &'a [Node],
        start: usize,
        path: &mut Vec<usize>,
        schema: &SchemaRegistry,
        out: &mut Vec<TextBlock<'a>>,
    ) {
        let mut pos = start;
        for (ix, node) in nodes.iter().enumerate() {
            let size = node_size(node, schema);
            if node.is_text() || schema.is_leaf(&node.type_name) {
                pos += size;
                continue;
            }

            path.push(ix);
            if schema.is_textblock(&node.type_name) {
                out.push(TextBlock {
                    path: path.clone(),
                    node,
                    start: pos + 1,
                    size: size - 2,
                });
            } else {
                walk(&node.content, pos + 1, path, schema, out);
            }
            path.pop();

            pos += size;
        }
    }

    let mut out = Vec::new();
    walk(&doc.content, 0, &mut Vec::new(), schema, &mut out);
    out
}

/// Textblocks whose content touches `from..=to`.
pub fn text_blocks_touching<'a>(
    doc: &'a Node,
    from: usize,
    to: usize,
    schema: &SchemaRegistry,
) -> Vec<TextBlock<'a>> {
    text_blocks_in_order(doc, schema)
        .into_iter()
        .filter(|b| b.start <= to && b.end() >= from)
        .collect()
}

/// Inline children overlapping `from..to`, with their start positions.
pub fn inline_nodes_between<'a>(
    doc: &'a Node,
    from: usize,
    to: usize,
    schema: &SchemaRegistry,
) -> Vec<(usize, &'a Node)> {
    let mut out = Vec::new();
    if from >= to {
        return out;
    }
    for block in text_blocks_in_order(doc, schema) {
        if block.end() <= from || block.start >= to {
            continue;
        }
        let mut pos = block.start;
        for child in &block.node.content {
            let size = node_size(child, schema);
            if pos < to && pos + size > from {
                out.push((pos, child));
            }
            pos += size;
        }
    }
    out
}

/// Byte index of the `n`th character of `s`.
pub(crate) fn char_to_byte(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(ix, _)| ix).unwrap_or(s.len())
}
