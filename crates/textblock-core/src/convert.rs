//! Conversion between the persisted block model and the document tree.
//!
//! The two trees have the same shape. The block model spells the list types
//! with hyphens and keeps children under `nodes`; the document tree uses
//! underscores and `content`. Renames apply to type names only, never to
//! text or attribute values.

use serde::{Deserialize, Serialize};

use crate::core::{Attrs, Mark, Node};
use crate::error::ConversionError;
use crate::schema::DOC;

/// (block model, document tree)
const TYPE_RENAMES: [(&str, &str); 3] = [
    ("ordered-list", "ordered_list"),
    ("bulleted-list", "bulleted_list"),
    ("list-item", "list_item"),
];

/// A node of the persisted block-model tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockModel {
    #[serde(rename = "typeName")]
    pub type_name: String,
    #[serde(default, rename = "attributes", skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<BlockModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl BlockModel {
    pub fn new(type_name: impl Into<String>, nodes: Vec<BlockModel>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Attrs::new(),
            nodes,
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new("text", Vec::new())
        }
    }
}

fn to_internal_name(name: &str, path: &[usize]) -> Result<String, ConversionError> {
    for (external, internal) in TYPE_RENAMES {
        if name == external {
            return Ok(internal.to_string());
        }
        if name == internal {
            return Err(ConversionError::ForeignTypeName {
                type_name: name.to_string(),
                form: "block model",
                path: path.to_vec(),
            });
        }
    }
    Ok(name.to_string())
}

fn to_external_name(name: &str, path: &[usize]) -> Result<String, ConversionError> {
    for (external, internal) in TYPE_RENAMES {
        if name == internal {
            return Ok(external.to_string());
        }
        if name == external {
            return Err(ConversionError::ForeignTypeName {
                type_name: name.to_string(),
                form: "document",
                path: path.to_vec(),
            });
        }
    }
    Ok(name.to_string())
}

/// Converts a block-model tree to a document tree.
pub fn to_internal(model: &BlockModel) -> Result<Node, ConversionError> {
    fn walk(model: &BlockModel, path: &mut Vec<usize>) -> Result<Node, ConversionError> {
        if model.text.is_some() && !model.nodes.is_empty() {
            return Err(ConversionError::TextWithChildren {
                type_name: model.type_name.clone(),
                path: path.clone(),
            });
        }

        let mut content = Vec::with_capacity(model.nodes.len());
        for (ix, child) in model.nodes.iter().enumerate() {
            path.push(ix);
            content.push(walk(child, path)?);
            path.pop();
        }

        Ok(Node {
            type_name: to_internal_name(&model.type_name, path)?,
            attrs: model.attrs.clone(),
            content,
            text: model.text.clone(),
            marks: model.marks.clone(),
        })
    }

    walk(model, &mut Vec::new())
}

/// Converts a document tree to a block-model tree.
pub fn to_external(node: &Node) -> Result<BlockModel, ConversionError> {
    fn walk(node: &Node, path: &mut Vec<usize>) -> Result<BlockModel, ConversionError> {
        if node.text.is_some() && !node.content.is_empty() {
            return Err(ConversionError::TextWithChildren {
                type_name: node.type_name.clone(),
                path: path.clone(),
            });
        }

        let mut nodes = Vec::with_capacity(node.content.len());
        for (ix, child) in node.content.iter().enumerate() {
            path.push(ix);
            nodes.push(walk(child, path)?);
            path.pop();
        }

        Ok(BlockModel {
            type_name: to_external_name(&node.type_name, path)?,
            attrs: node.attrs.clone(),
            nodes,
            text: node.text.clone(),
            marks: node.marks.clone(),
        })
    }

    walk(node, &mut Vec::new())
}

pub fn to_internal_json(json: &str) -> Result<Node, ConversionError> {
    let model: BlockModel = serde_json::from_str(json)?;
    to_internal(&model)
}

pub fn to_external_json(node: &Node) -> Result<String, ConversionError> {
    let model = to_external(node)?;
    Ok(serde_json::to_string(&model)?)
}

/// The top-level blocks a host persists for one text widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockContent {
    pub nodes: Vec<BlockModel>,
}

impl BlockContent {
    pub fn new(nodes: Vec<BlockModel>) -> Self {
        Self { nodes }
    }

    /// Wraps the blocks in a `doc` node and converts them.
    pub fn to_document(&self) -> Result<Node, ConversionError> {
        to_internal(&BlockModel::new(DOC, self.nodes.clone()))
    }

    pub fn from_document(doc: &Node) -> Result<Self, ConversionError> {
        if doc.type_name != DOC {
            return Err(ConversionError::NotADocument(doc.type_name.clone()));
        }
        Ok(Self {
            nodes: to_external(doc)?.nodes,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
