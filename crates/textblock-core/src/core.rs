use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::{self, CommandRegistry};
use crate::convert::BlockContent;
use crate::error::{ApplyError, CommandError, LoadError};
use crate::ops::{Transaction, apply_transaction};
use crate::position::content_size;
use crate::schema::{HeadingIdStrategy, SchemaRegistry, TEXT};
use crate::selection::{self, SelectionState};
use crate::style::{LocalStyles, PendingStyle, StyleChange, StyleResolver};

pub type Attrs = BTreeMap<String, Value>;

/// A formatting annotation attached to a run of inline content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "typeName")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }
}

/// A node of the internal document tree.
///
/// Text leaves carry `text` and `marks`; every other node carries `content`.
/// Trees are treated as immutable snapshots: edits go through
/// [`Transaction`]s which produce a new tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "typeName")]
    pub type_name: String,
    #[serde(default, rename = "attributes", skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// Builds a node without consulting a schema. Use
    /// [`SchemaRegistry::instantiate`] when the content must be checked.
    pub fn element(type_name: impl Into<String>, content: Vec<Node>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Attrs::new(),
            content,
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            type_name: TEXT.to_string(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(text.into()),
            marks: Vec::new(),
        }
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        let mut node = Self::text(text);
        node.marks = marks;
        node
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn is_text(&self) -> bool {
        self.type_name == TEXT
    }

    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }

    pub fn mark(&self, type_name: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.type_name == type_name)
    }

    pub fn has_mark(&self, type_name: &str) -> bool {
        self.mark(type_name).is_some()
    }

    /// Concatenated text of every text leaf below this node.
    pub fn text_content(&self) -> String {
        fn walk(node: &Node, out: &mut String) {
            if let Some(text) = &node.text {
                out.push_str(text);
            }
            for child in &node.content {
                walk(child, out);
            }
        }

        let mut out = String::new();
        walk(self, &mut out);
        out
    }
}

/// A selection expressed in document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    Range { from: usize, to: usize },
    Cursor { at: usize },
}

impl Selection {
    pub fn cursor(at: usize) -> Self {
        Selection::Cursor { at }
    }

    /// Builds a range, ordering the bounds. Equal bounds yield a cursor.
    pub fn range(a: usize, b: usize) -> Self {
        if a == b {
            return Selection::Cursor { at: a };
        }
        Selection::Range {
            from: a.min(b),
            to: a.max(b),
        }
    }

    pub fn from(&self) -> usize {
        match *self {
            Selection::Range { from, to } => from.min(to),
            Selection::Cursor { at } => at,
        }
    }

    pub fn to(&self) -> usize {
        match *self {
            Selection::Range { from, to } => from.max(to),
            Selection::Cursor { at } => at,
        }
    }

    pub fn anchor(&self) -> usize {
        self.from()
    }

    pub fn is_collapsed(&self) -> bool {
        self.from() == self.to()
    }

    fn clamped(self, max: usize) -> Self {
        Selection::range(self.from().min(max), self.to().min(max))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub default_viewport: String,
    pub default_bulleted_list_style: Option<String>,
    pub heading_ids: HeadingIdStrategy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_viewport: String::new(),
            default_bulleted_list_style: None,
            heading_ids: HeadingIdStrategy::Slug,
        }
        .with_defaults()
    }
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.default_viewport.is_empty() {
            self.default_viewport = "xs".to_string();
        }
        if self.default_bulleted_list_style.is_none() {
            self.default_bulleted_list_style = Some("globals/ul/default".to_string());
        }
        self
    }
}

/// Holds the single current document snapshot and the selection, and runs
/// commands against them.
pub struct Editor {
    doc: Node,
    selection: Selection,
    registry: Arc<SchemaRegistry>,
    commands: Arc<CommandRegistry>,
    config: EditorConfig,
    style_generation: u64,
}

impl Editor {
    pub fn new(
        doc: Node,
        selection: Selection,
        registry: Arc<SchemaRegistry>,
    ) -> Result<Self, LoadError> {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Node,
        selection: Selection,
        registry: Arc<SchemaRegistry>,
        config: EditorConfig,
    ) -> Result<Self, LoadError> {
        registry.validate_document(&doc)?;
        let max = content_size(&doc.content, &registry);
        Ok(Self {
            doc,
            selection: selection.clamped(max),
            registry,
            commands: Arc::new(CommandRegistry::standard()),
            config: config.with_defaults(),
            style_generation: 0,
        })
    }

    /// Loads a persisted block-model tree.
    pub fn from_block_content(
        content: &BlockContent,
        registry: Arc<SchemaRegistry>,
    ) -> Result<Self, LoadError> {
        let doc = content.to_document()?;
        Self::new(doc, Selection::cursor(0), registry)
    }

    /// An editor holding a single empty paragraph, using the standard schema.
    pub fn with_standard_schema(config: EditorConfig) -> Self {
        let config = config.with_defaults();
        let registry = Arc::new(SchemaRegistry::standard_with(config.heading_ids));
        let doc = Node::element(
            crate::schema::DOC,
            vec![Node::element(crate::schema::PARAGRAPH, Vec::new())],
        );
        Self {
            doc,
            selection: Selection::cursor(1),
            registry,
            commands: Arc::new(CommandRegistry::standard()),
            config,
            style_generation: 0,
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let max = content_size(&self.doc.content, &self.registry);
        self.selection = selection.clamped(max);
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current content in block-model form.
    pub fn to_block_content(&self) -> Result<BlockContent, crate::error::ConversionError> {
        BlockContent::from_document(&self.doc)
    }

    /// Replaces the document with persisted content, keeping the cursor at
    /// the start.
    pub fn set_block_content(&mut self, content: &BlockContent) -> Result<(), LoadError> {
        let doc = content.to_document()?;
        self.registry.validate_document(&doc)?;
        self.doc = doc;
        self.selection = Selection::cursor(0);
        Ok(())
    }

    pub fn selection_state(&self) -> SelectionState {
        selection::compute_selection_state(&self.registry, &self.doc, &self.selection)
    }

    /// Applies a transaction, replacing the current snapshot on success.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let next = apply_transaction(&self.doc, &tx)?;
        self.registry.validate_document(&next)?;

        tracing::debug!(
            ops = tx.ops.len(),
            source = tx.meta.source.as_deref().unwrap_or("unknown"),
            "applied transaction"
        );

        self.doc = next;
        let selection = tx.selection_after.unwrap_or(self.selection);
        self.set_selection(selection);
        Ok(())
    }

    /// Applies a transaction if a command produced one.
    pub fn apply_optional(&mut self, tx: Option<Transaction>) -> Result<bool, ApplyError> {
        match tx {
            Some(tx) => self.apply(tx).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.commands.command(id) else {
            return Err(CommandError::UnknownCommand(id.to_string()));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str) -> Result<Value, CommandError> {
        let value = match id {
            "selection.state" => serde_json::to_value(self.selection_state()),
            "marks.hyperlink" => serde_json::to_value(commands::hyperlink_at(
                &self.registry,
                &self.doc,
                &self.selection,
            )),
            "commands.list" => serde_json::to_value(self.commands.list()),
            _ => return Err(CommandError::UnknownCommand(id.to_string())),
        };
        value.map_err(|err| CommandError::query(id, err))
    }

    pub fn run_query<T>(&self, id: &str) -> Result<T, CommandError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id)?;
        serde_json::from_value(value)
            .map_err(|err| CommandError::query(id, format!("failed to decode result: {err}")))
    }

    /// Sets the color mark, resolving its class name synchronously.
    pub fn set_color<R: StyleResolver>(
        &mut self,
        resolver: &R,
        color_key: &str,
    ) -> Result<bool, CommandError> {
        let tx = commands::set_color(
            &self.registry,
            &self.doc,
            &self.selection,
            resolver,
            color_key,
        )?;
        Ok(self.apply_optional(tx)?)
    }

    /// Starts a style change on the block at the anchor. The returned
    /// pending change must be resolved and passed to [`Self::commit_style`].
    pub fn prepare_style(&mut self, change: StyleChange) -> Option<PendingStyle> {
        let styles = commands::current_block_styles(&self.registry, &self.doc, &self.selection)?;
        self.style_generation += 1;
        Some(PendingStyle::new(self.style_generation, change, styles))
    }

    /// Applies a resolved style change against the current snapshot.
    ///
    /// A pending change superseded by a newer `prepare_style` is dropped, as
    /// is one whose block styles changed since it was prepared: its class
    /// name no longer describes the merged styles, so the caller has to
    /// prepare again.
    pub fn commit_style(
        &mut self,
        pending: PendingStyle,
        class_name: Option<String>,
    ) -> Result<bool, ApplyError> {
        if pending.generation() != self.style_generation {
            tracing::debug!(
                generation = pending.generation(),
                current = self.style_generation,
                "discarding superseded style change"
            );
            return Ok(false);
        }

        // Re-read the block: the tree may have changed while the class name
        // was being resolved.
        let Some(mut styles) =
            commands::current_block_styles(&self.registry, &self.doc, &self.selection)
        else {
            return Ok(false);
        };
        pending.change().apply(&mut styles);
        if styles != *pending.styles() {
            tracing::debug!("block styles changed while resolving class name; commit discarded");
            return Ok(false);
        }

        let tx = commands::set_block_styles(
            &self.registry,
            &self.doc,
            &self.selection,
            &styles,
            class_name.as_deref(),
        )?;
        self.apply_optional(tx)
    }

    async fn resolve_and_commit<R: StyleResolver>(
        &mut self,
        resolver: &R,
        change: StyleChange,
    ) -> Result<bool, ApplyError> {
        let Some(pending) = self.prepare_style(change) else {
            tracing::debug!("no block at selection; style change is a no-op");
            return Ok(false);
        };
        let class_name = if pending.styles().is_empty() {
            None
        } else {
            resolver.class_names_for_style_map(pending.styles()).await
        };
        self.commit_style(pending, class_name)
    }

    pub async fn set_alignment<R: StyleResolver>(
        &mut self,
        resolver: &R,
        style_key: &str,
        viewport: Option<&str>,
    ) -> Result<bool, ApplyError> {
        let viewport = viewport.unwrap_or(&self.config.default_viewport).to_string();
        let change = StyleChange::Alignment {
            viewport,
            key: style_key.to_string(),
        };
        self.resolve_and_commit(resolver, change).await
    }

    pub async fn set_text_style<R: StyleResolver>(
        &mut self,
        resolver: &R,
        text_style_key: Option<&str>,
    ) -> Result<bool, ApplyError> {
        let change = StyleChange::Appearance(text_style_key.map(str::to_string));
        self.resolve_and_commit(resolver, change).await
    }

    /// Wraps the current block in a bulleted list styled by `style_key`
    /// (or the configured default).
    pub async fn toggle_unordered_list<R: StyleResolver>(
        &mut self,
        resolver: &R,
        style_key: Option<&str>,
    ) -> Result<bool, CommandError> {
        let style_key = style_key
            .map(str::to_string)
            .or_else(|| self.config.default_bulleted_list_style.clone());

        let mut attrs = Attrs::new();
        if let Some(key) = style_key {
            if let Some(class_name) = resolver.class_name_by_style_key(&key).await {
                let styles = LocalStyles {
                    appearance: Some(key),
                    ..LocalStyles::default()
                };
                attrs.insert("className".to_string(), Value::String(class_name));
                attrs.insert("styles".to_string(), styles.to_value());
            }
        }

        let tx = commands::wrap_in_list(
            &self.registry,
            &self.doc,
            &self.selection,
            crate::schema::BULLETED_LIST,
            attrs,
        )?;
        Ok(self.apply_optional(tx)?)
    }
}
