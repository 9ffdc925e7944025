use serde::{Deserialize, Serialize};

use crate::core::{Mark, Node};
use crate::ops::Op;
use crate::position::{
    char_to_byte, child_offset, inline_nodes_between, node_size, resolve, text_blocks_in_order,
};
use crate::schema::SchemaRegistry;

/// A half-open span of document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRange {
    pub from: usize,
    pub to: usize,
}

impl MarkRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

/// Finds the maximal run of siblings around `pos` that carry a mark of
/// type `mark_type`.
///
/// The child at `pos` (the one after it, at a boundary) must carry the mark;
/// at the very end of a parent the last child is used instead. The run then
/// grows over preceding and following siblings for as long as they carry a
/// mark of the same type.
pub fn locate(
    schema: &SchemaRegistry,
    doc: &Node,
    pos: usize,
    mark_type: &str,
) -> Option<MarkRange> {
    let rpos = resolve(doc, pos, schema)?;
    let parent = rpos.parent(doc)?;
    let children = &parent.content;
    if children.is_empty() {
        return None;
    }

    let index = rpos.index.min(children.len() - 1);
    let child = &children[index];
    if !child.has_mark(mark_type) {
        return None;
    }

    let mut from = rpos.start() + child_offset(children, index, schema);
    let mut to = from + node_size(child, schema);

    let mut start_index = index;
    while start_index > 0 && children[start_index - 1].has_mark(mark_type) {
        start_index -= 1;
        from -= node_size(&children[start_index], schema);
    }

    let mut end_index = index + 1;
    while end_index < children.len() && children[end_index].has_mark(mark_type) {
        to += node_size(&children[end_index], schema);
        end_index += 1;
    }

    Some(MarkRange { from, to })
}

/// How many of the text runs in a range must carry a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Any,
    All,
}

/// Whether the text in `from..to` carries `mark_type`. With
/// [`Coverage::All`] a range without text is reported as unmarked.
pub fn range_has_mark(
    schema: &SchemaRegistry,
    doc: &Node,
    from: usize,
    to: usize,
    mark_type: &str,
    coverage: Coverage,
) -> bool {
    let mut texts = inline_nodes_between(doc, from, to, schema)
        .into_iter()
        .map(|(_, node)| node)
        .filter(|node| node.is_text())
        .peekable();

    match coverage {
        Coverage::Any => texts.any(|node| node.has_mark(mark_type)),
        Coverage::All => texts.peek().is_some() && texts.all(|node| node.has_mark(mark_type)),
    }
}

/// Ops that add `mark` to every text run in `range`, replacing any mark of
/// the same type.
pub fn add_mark(schema: &SchemaRegistry, doc: &Node, range: MarkRange, mark: &Mark) -> Vec<Op> {
    map_marks_in_range(schema, doc, range, &|marks| schema.add_mark_to_set(marks, mark))
}

/// Ops that drop marks of `mark_type` from every text run in `range`.
pub fn remove_mark(
    schema: &SchemaRegistry,
    doc: &Node,
    range: MarkRange,
    mark_type: &str,
) -> Vec<Op> {
    map_marks_in_range(schema, doc, range, &|marks| {
        marks
            .iter()
            .filter(|m| m.type_name != mark_type)
            .cloned()
            .collect()
    })
}

fn map_marks_in_range(
    schema: &SchemaRegistry,
    doc: &Node,
    range: MarkRange,
    apply: &dyn Fn(&[Mark]) -> Vec<Mark>,
) -> Vec<Op> {
    if range.is_empty() {
        return Vec::new();
    }

    let mut ops = Vec::new();
    for block in text_blocks_in_order(doc, schema) {
        if block.end() <= range.from || block.start >= range.to {
            continue;
        }
        let local_from = range.from.saturating_sub(block.start);
        let local_to = range.to.min(block.end()) - block.start;

        let content = apply_marks_in_block(schema, &block.node.content, local_from, local_to, apply);
        if content == block.node.content {
            continue;
        }

        let mut node = block.node.clone();
        node.content = content;
        ops.push(Op::ReplaceNode {
            path: block.path.clone(),
            node,
        });
    }
    ops
}

fn apply_marks_in_block(
    schema: &SchemaRegistry,
    children: &[Node],
    start: usize,
    end: usize,
    apply: &dyn Fn(&[Mark]) -> Vec<Mark>,
) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let node_start = cursor;
        let node_end = cursor + node_size(node, schema);
        cursor = node_end;

        if end <= node_start || start >= node_end || !node.is_text() {
            out.push(node.clone());
            continue;
        }

        let text = node.text_str();
        let sel_start = char_to_byte(text, start.saturating_sub(node_start));
        let sel_end = char_to_byte(text, end - node_start);

        let prefix = &text[..sel_start];
        let middle = &text[sel_start..sel_end];
        let suffix = &text[sel_end..];

        if !prefix.is_empty() {
            out.push(Node::marked_text(prefix, node.marks.clone()));
        }
        if !middle.is_empty() {
            out.push(Node::marked_text(middle, apply(&node.marks)));
        }
        if !suffix.is_empty() {
            out.push(Node::marked_text(suffix, node.marks.clone()));
        }
    }

    merge_adjacent_text(out)
}

/// Joins neighbouring text nodes that carry identical marks.
pub fn merge_adjacent_text(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for node in children {
        if node.is_text() && node.text_str().is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.is_text() && node.is_text() && last.marks == node.marks {
                last.text
                    .get_or_insert_with(String::new)
                    .push_str(node.text_str());
                continue;
            }
        }
        out.push(node);
    }
    out
}
