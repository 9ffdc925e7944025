//! Projection of a document into an element tree, and back.
//!
//! Node and mark types describe their element through an [`OutputSpec`];
//! [`serialize_document`] nests mark wrappers in rank order and lets adjacent
//! text runs share them. [`parse_document`] inverts the projection using the
//! registered parse rules.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::core::{Attrs, Mark, Node};
use crate::error::SchemaError;
use crate::schema::{DOC, PARAGRAPH, SchemaRegistry};

const VOID_TAGS: [&str; 1] = ["br"];

/// The element a node or mark type projects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Whether the node's content is rendered inside the element.
    pub has_content: bool,
}

impl OutputSpec {
    pub fn container(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            has_content: true,
        }
    }

    pub fn leaf(tag: impl Into<String>) -> Self {
        Self {
            has_content: false,
            ..Self::container(tag)
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    fn into_element(self) -> OutputElement {
        OutputElement {
            tag: self.tag,
            attrs: self.attrs,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutputNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputNode {
    Text(String),
    Element(OutputElement),
}

/// Projects the content of `doc` into output nodes.
pub fn serialize_document(
    schema: &SchemaRegistry,
    doc: &Node,
) -> Result<Vec<OutputNode>, SchemaError> {
    serialize_content(schema, &doc.content)
}

fn serialize_node(schema: &SchemaRegistry, node: &Node) -> Result<Vec<OutputNode>, SchemaError> {
    if node.is_text() {
        return Ok(vec![OutputNode::Text(node.text_str().to_string())]);
    }

    let spec = schema.node_type(&node.type_name)?;
    let Some(to_output) = &spec.to_output else {
        // Types without an element (the root) are transparent.
        return serialize_content(schema, &node.content);
    };

    let out = to_output(node);
    let has_content = out.has_content;
    let mut el = out.into_element();
    if has_content {
        el.children = serialize_content(schema, &node.content)?;
    }
    Ok(vec![OutputNode::Element(el)])
}

fn serialize_content(
    schema: &SchemaRegistry,
    children: &[Node],
) -> Result<Vec<OutputNode>, SchemaError> {
    let mut out: Vec<OutputNode> = Vec::new();
    let mut open: Vec<(Mark, OutputElement)> = Vec::new();

    fn close(open: &mut Vec<(Mark, OutputElement)>, out: &mut Vec<OutputNode>) {
        if let Some((_, el)) = open.pop() {
            push(open, out, OutputNode::Element(el));
        }
    }

    fn push(open: &mut [(Mark, OutputElement)], out: &mut Vec<OutputNode>, node: OutputNode) {
        match open.last_mut() {
            Some((_, el)) => el.children.push(node),
            None => out.push(node),
        }
    }

    for child in children {
        let mut marks: Vec<Mark> = Vec::new();
        for mark in &child.marks {
            marks = schema.add_mark_to_set(&marks, mark);
        }

        let keep = open
            .iter()
            .zip(&marks)
            .take_while(|((open_mark, _), mark)| open_mark == *mark)
            .count();
        while open.len() > keep {
            close(&mut open, &mut out);
        }
        for mark in marks.into_iter().skip(keep) {
            let spec = schema.mark_type(&mark.type_name)?;
            let el = (spec.to_output)(&mark).into_element();
            open.push((mark, el));
        }

        for node in serialize_node(schema, child)? {
            push(&mut open, &mut out, node);
        }
    }
    while !open.is_empty() {
        close(&mut open, &mut out);
    }
    Ok(out)
}

/// Writes the projection of `doc` as HTML.
pub fn render_html(schema: &SchemaRegistry, doc: &Node) -> Result<String, SchemaError> {
    let nodes = serialize_document(schema, doc)?;
    let mut html = String::new();
    for node in &nodes {
        write_html(node, &mut html);
    }
    Ok(html)
}

fn write_html(node: &OutputNode, out: &mut String) {
    match node {
        OutputNode::Text(text) => out.push_str(&html_escape::encode_text(text)),
        OutputNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (key, value) in &el.attrs {
                let _ = write!(
                    out,
                    " {key}=\"{}\"",
                    html_escape::encode_double_quoted_attribute(value)
                );
            }
            out.push('>');
            if VOID_TAGS.contains(&el.tag.as_str()) {
                return;
            }
            for child in &el.children {
                write_html(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

/// Rebuilds a `doc` node from output nodes. Elements that match no parse
/// rule are transparent: their children are parsed in place.
pub fn parse_document(
    schema: &SchemaRegistry,
    nodes: &[OutputNode],
) -> Result<Node, SchemaError> {
    let mut content = Vec::new();
    parse_into(schema, nodes, &[], &mut content)?;
    let content = wrap_inline_runs(schema, content)?;
    schema.instantiate(DOC, Attrs::new(), content)
}

fn parse_into(
    schema: &SchemaRegistry,
    nodes: &[OutputNode],
    marks: &[Mark],
    out: &mut Vec<Node>,
) -> Result<(), SchemaError> {
    for node in nodes {
        match node {
            OutputNode::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                if let Some(last) = out.last_mut() {
                    if last.is_text() && last.marks == marks {
                        last.text.get_or_insert_with(String::new).push_str(text);
                        continue;
                    }
                }
                out.push(schema.text(text.clone(), marks.to_vec())?);
            }
            OutputNode::Element(el) => {
                if let Some((spec, attrs)) = schema.match_node_tag(el) {
                    if spec.is_leaf() {
                        out.push(schema.instantiate(&spec.name, attrs, Vec::new())?);
                        continue;
                    }
                    let inline = spec.content.accepts_inline();
                    let mut children = Vec::new();
                    let child_marks = if inline { marks } else { &[] };
                    parse_into(schema, &el.children, child_marks, &mut children)?;
                    if !inline {
                        children = wrap_inline_runs(schema, children)?;
                    }
                    let name = spec.name.clone();
                    out.push(schema.instantiate(&name, attrs, children)?);
                } else if let Some((spec, attrs)) = schema.match_mark_tag(el) {
                    let mark = schema.create_mark(&spec.name, attrs)?;
                    let marks = schema.add_mark_to_set(marks, &mark);
                    parse_into(schema, &el.children, &marks, out)?;
                } else {
                    parse_into(schema, &el.children, marks, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Groups stray inline nodes in block content into paragraphs.
fn wrap_inline_runs(schema: &SchemaRegistry, nodes: Vec<Node>) -> Result<Vec<Node>, SchemaError> {
    let mut out = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    for node in nodes {
        let inline = schema.node_type(&node.type_name)?.is_inline();
        if inline {
            run.push(node);
            continue;
        }
        if !run.is_empty() {
            let content = std::mem::take(&mut run);
            out.push(schema.instantiate(PARAGRAPH, Attrs::new(), content)?);
        }
        out.push(node);
    }
    if !run.is_empty() {
        out.push(schema.instantiate(PARAGRAPH, Attrs::new(), run)?);
    }
    Ok(out)
}
