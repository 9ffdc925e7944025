use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Editor, Node, Selection};
use crate::error::{CommandError, SchemaError};
use crate::marks::{self, Coverage, MarkRange, locate, merge_adjacent_text, range_has_mark};
use crate::ops::{AttrPatch, Op, Path, Transaction, node_at_path};
use crate::position::{
    ResolvedPos, char_to_byte, inline_nodes_between, node_size, resolve, text_blocks_touching,
};
use crate::schema::{
    BOLD, BULLETED_LIST, CODE, COLOR, FORMATTED, HEADINGS, HIGHLIGHTED, HYPERLINK, ITALIC,
    LIST_ITEM, NodeSpec, ORDERED_LIST, PARAGRAPH, PROPERTY, QUOTE, STRIKED, SchemaRegistry,
    UNDERLINED,
};
use crate::style::{LocalStyles, StyleResolver};

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;

/// The host-facing description of a command, as listed by
/// [`CommandRegistry::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_example: Option<Value>,
}

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            id: self.id.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            args_example: self.args_example.clone(),
        }
    }
}

/// Commands addressable by id from the host.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: CommandSpec) -> Result<(), CommandError> {
        if self.commands.contains_key(&spec.id) {
            return Err(CommandError::DuplicateCommand(spec.id));
        }
        self.commands.insert(spec.id.clone(), spec);
        Ok(())
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Every command, sorted by id.
    pub fn list(&self) -> Vec<CommandInfo> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.commands.get(id))
            .map(CommandSpec::info)
            .collect()
    }

    pub fn standard() -> Self {
        let mut registry = Self::new();
        for spec in standard_commands() {
            registry
                .register(spec)
                .expect("standard command ids must be unique");
        }
        registry
    }
}

fn apply_result(
    editor: &mut Editor,
    tx: Result<Option<Transaction>, SchemaError>,
) -> Result<(), CommandError> {
    editor.apply_optional(tx?)?;
    Ok(())
}

fn arg_str<'a>(args: Option<&'a Value>, command: &str, name: &str) -> Result<&'a str, CommandError> {
    args.and_then(|v| v.get(name))
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::missing(command, name))
}

fn arg_attrs(args: Option<&Value>) -> Attrs {
    args.and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn standard_commands() -> Vec<CommandSpec> {
    const TOGGLES: [(&str, &str, &str); 6] = [
        ("marks.toggle_bold", "Toggle bold", BOLD),
        ("marks.toggle_italic", "Toggle italic", ITALIC),
        ("marks.toggle_underlined", "Toggle underline", UNDERLINED),
        ("marks.toggle_highlighted", "Toggle highlight", HIGHLIGHTED),
        ("marks.toggle_striked", "Toggle strikethrough", STRIKED),
        ("marks.toggle_code", "Toggle code", CODE),
    ];

    let mut commands: Vec<CommandSpec> = TOGGLES
        .into_iter()
        .map(|(id, label, mark_type)| {
            CommandSpec::new(id, label, move |editor, _args| {
                let tx = toggle_mark(
                    editor.registry(),
                    editor.doc(),
                    &editor.selection(),
                    mark_type,
                    Attrs::new(),
                );
                apply_result(editor, tx)
            })
            .description(format!(
                "Toggle {mark_type} on the selection, or on the run around the cursor."
            ))
            .keywords([mark_type, "mark"])
        })
        .collect();

    commands.extend([
        CommandSpec::new("marks.set_color", "Set color", |editor, args| {
            let color_key = arg_str(args.as_ref(), "marks.set_color", "colorKey")?;
            let color_class = arg_str(args.as_ref(), "marks.set_color", "colorClass")?;
            let mut attrs = Attrs::new();
            attrs.insert("colorKey".to_string(), Value::from(color_key));
            attrs.insert("colorClass".to_string(), Value::from(color_class));
            let tx = update_mark(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                COLOR,
                attrs,
            );
            apply_result(editor, tx)
        })
        .description("Set the color mark with an already resolved class name.")
        .keywords(["color", "text color"])
        .args_example(serde_json::json!({ "colorKey": "colors/primary", "colorClass": "text-primary" })),
        CommandSpec::new("marks.remove_color", "Remove color", |editor, _args| {
            let tx = unset_mark(editor.registry(), editor.doc(), &editor.selection(), COLOR);
            apply_result(editor, tx)
        })
        .keywords(["color", "reset"]),
        CommandSpec::new("marks.set_hyperlink", "Set hyperlink", |editor, args| {
            let tx = set_hyperlink(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                arg_attrs(args.as_ref()),
            );
            apply_result(editor, tx)
        })
        .description("Set hyperlink attributes. Requires `href` or `targetKey`.")
        .keywords(["link", "url", "hyperlink"])
        .args_example(serde_json::json!({ "href": "https://example.com", "targetKey": "urls/example" })),
        CommandSpec::new("marks.remove_hyperlink", "Remove hyperlink", |editor, _args| {
            let tx = unset_mark(editor.registry(), editor.doc(), &editor.selection(), HYPERLINK);
            apply_result(editor, tx)
        })
        .keywords(["link", "unlink", "hyperlink"]),
        CommandSpec::new("block.set_paragraph", "Set paragraph", |editor, _args| {
            let tx = set_block_type(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                PARAGRAPH,
                Attrs::new(),
            );
            apply_result(editor, tx)
        })
        .keywords(["paragraph", "text", "reset"]),
        CommandSpec::new("block.set_heading", "Set heading", |editor, args| {
            let level = match args.as_ref().and_then(|v| v.get("level")) {
                None => 1,
                Some(value) => value
                    .as_u64()
                    .filter(|level| (1..=6).contains(level))
                    .ok_or_else(|| {
                        CommandError::invalid(
                            "block.set_heading",
                            "level",
                            format!("expected 1 to 6, got {value}"),
                        )
                    })?,
            };
            let tx = set_block_type(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                HEADINGS[level as usize - 1],
                Attrs::new(),
            );
            apply_result(editor, tx)
        })
        .description("Convert the selected text blocks into a heading.")
        .keywords(["heading", "title", "h1", "h2", "h3", "h4", "h5", "h6"])
        .args_example(serde_json::json!({ "level": 2 })),
        CommandSpec::new("block.set_quote", "Set quote", |editor, _args| {
            let tx = set_block_type(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                QUOTE,
                Attrs::new(),
            );
            apply_result(editor, tx)
        })
        .keywords(["quote", "blockquote"]),
        CommandSpec::new("block.set_formatted", "Set preformatted", |editor, _args| {
            let tx = set_block_type(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                FORMATTED,
                Attrs::new(),
            );
            apply_result(editor, tx)
        })
        .keywords(["formatted", "pre", "code block"]),
        CommandSpec::new("list.toggle_ordered", "Ordered list", |editor, args| {
            let tx = wrap_in_list(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                ORDERED_LIST,
                arg_attrs(args.as_ref()),
            );
            apply_result(editor, tx)
        })
        .description("Wrap the selected blocks in an ordered list, or retype the enclosing list.")
        .keywords(["list", "ordered", "numbered", "ol"])
        .args_example(serde_json::json!({ "order": 3 })),
        CommandSpec::new("list.toggle_bulleted", "Bulleted list", |editor, args| {
            let tx = wrap_in_list(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                BULLETED_LIST,
                arg_attrs(args.as_ref()),
            );
            apply_result(editor, tx)
        })
        .description("Wrap the selected blocks in a bulleted list, or retype the enclosing list.")
        .keywords(["list", "bulleted", "unordered", "ul"]),
        CommandSpec::new("text.insert", "Insert text", |editor, args| {
            let text = arg_str(args.as_ref(), "text.insert", "text")?;
            let tx = insert_text(editor.registry(), editor.doc(), &editor.selection(), text);
            apply_result(editor, tx)
        })
        .args_example(serde_json::json!({ "text": "Hello" })),
        CommandSpec::new("text.insert_property", "Insert property", |editor, args| {
            let name = arg_str(args.as_ref(), "text.insert_property", "name")?;
            let placeholder = args
                .as_ref()
                .and_then(|v| v.get("placeholder"))
                .and_then(Value::as_str);
            let tx = insert_property(
                editor.registry(),
                editor.doc(),
                &editor.selection(),
                name,
                placeholder,
            );
            apply_result(editor, tx)
        })
        .description("Insert a property placeholder at the selection.")
        .keywords(["property", "placeholder", "field"])
        .args_example(serde_json::json!({ "name": "userName", "placeholder": "User name" })),
    ]);

    commands
}

fn finish(ops: Vec<Op>, selection_after: Selection, source: &str) -> Option<Transaction> {
    if ops.is_empty() {
        tracing::debug!(source, "command produced no changes");
        return None;
    }
    Some(
        Transaction::new(ops)
            .selection_after(selection_after)
            .source(source),
    )
}

/// The range a mark command acts on: the selection itself, or for a cursor
/// the run of `mark_type` around it.
pub fn mark_command_range(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    mark_type: &str,
) -> Option<MarkRange> {
    if selection.is_collapsed() {
        locate(schema, doc, selection.from(), mark_type)
    } else {
        Some(MarkRange::new(selection.from(), selection.to()))
    }
}

/// Removes `mark_type` when every text run in the acted-on range carries it,
/// otherwise adds it over the whole range.
pub fn toggle_mark(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    mark_type: &str,
    attrs: Attrs,
) -> Result<Option<Transaction>, SchemaError> {
    let mark = schema.create_mark(mark_type, attrs)?;
    let Some(range) = mark_command_range(schema, doc, selection, mark_type) else {
        tracing::debug!(mark_type, "no mark range at cursor; toggle skipped");
        return Ok(None);
    };

    let ops = if range_has_mark(schema, doc, range.from, range.to, mark_type, Coverage::All) {
        marks::remove_mark(schema, doc, range, mark_type)
    } else {
        marks::add_mark(schema, doc, range, &mark)
    };
    Ok(finish(ops, *selection, "command:toggle_mark"))
}

/// Sets `mark_type` with `attrs`, replacing any previous instance. A cursor
/// only updates a mark it is already inside.
pub fn update_mark(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    mark_type: &str,
    attrs: Attrs,
) -> Result<Option<Transaction>, SchemaError> {
    let mark = schema.create_mark(mark_type, attrs)?;
    let Some(range) = mark_command_range(schema, doc, selection, mark_type) else {
        tracing::debug!(mark_type, "no mark range at cursor; update skipped");
        return Ok(None);
    };
    let ops = marks::add_mark(schema, doc, range, &mark);
    Ok(finish(ops, *selection, "command:update_mark"))
}

/// Drops `mark_type` from the selection or the run around the cursor.
pub fn unset_mark(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    mark_type: &str,
) -> Result<Option<Transaction>, SchemaError> {
    schema.mark_type(mark_type)?;
    let Some(range) = mark_command_range(schema, doc, selection, mark_type) else {
        tracing::debug!(mark_type, "no mark range at cursor; removal skipped");
        return Ok(None);
    };
    let ops = marks::remove_mark(schema, doc, range, mark_type);
    Ok(finish(ops, *selection, "command:remove_mark"))
}

pub fn set_hyperlink(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    attrs: Attrs,
) -> Result<Option<Transaction>, SchemaError> {
    let has_target = ["href", "targetKey"].iter().any(|key| {
        attrs
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    });
    if !has_target {
        tracing::debug!("hyperlink without href or targetKey; skipped");
        return Ok(None);
    }
    update_mark(schema, doc, selection, HYPERLINK, attrs)
}

/// Sets the color mark for `color_key`, resolving its class name through
/// `resolver`.
pub fn set_color<R: StyleResolver>(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    resolver: &R,
    color_key: &str,
) -> Result<Option<Transaction>, SchemaError> {
    let Some(class_name) = resolver.class_name_by_color_key(color_key) else {
        tracing::debug!(color_key, "color key did not resolve; skipped");
        return Ok(None);
    };
    let mut attrs = Attrs::new();
    attrs.insert("colorKey".to_string(), Value::from(color_key));
    attrs.insert("colorClass".to_string(), Value::String(class_name));
    update_mark(schema, doc, selection, COLOR, attrs)
}

/// Attributes of the hyperlink at the selection, if any.
pub fn hyperlink_at(schema: &SchemaRegistry, doc: &Node, selection: &Selection) -> Option<Attrs> {
    if !selection.is_collapsed() {
        return inline_nodes_between(doc, selection.from(), selection.to(), schema)
            .into_iter()
            .find_map(|(_, node)| node.mark(HYPERLINK))
            .map(|mark| mark.attrs.clone());
    }

    let rpos = resolve(doc, selection.anchor(), schema)?;
    [rpos.node_after(doc), rpos.node_before(doc)]
        .into_iter()
        .flatten()
        .find_map(|node| node.mark(HYPERLINK))
        .map(|mark| mark.attrs.clone())
}

/// Declared attributes of `spec`, taken from `overlay` first and then from
/// the previous node's attributes.
fn carry_attrs(spec: &NodeSpec, previous: &Attrs, overlay: &Attrs) -> Attrs {
    spec.attrs
        .keys()
        .filter_map(|key| {
            overlay
                .get(key)
                .or_else(|| previous.get(key))
                .map(|value| (key.clone(), value.clone()))
        })
        .collect()
}

/// Whether the parent of `path` still matches its content model once the
/// node there is replaced by `replacement`.
fn fits_parent(schema: &SchemaRegistry, doc: &Node, path: &[usize], replacement: &Node) -> bool {
    let Some((&index, parent_path)) = path.split_last() else {
        return false;
    };
    let Some(parent) = node_at_path(doc, parent_path) else {
        return false;
    };
    let Ok(parent_spec) = schema.node_type(&parent.type_name) else {
        return false;
    };
    let child_specs: Result<Vec<&NodeSpec>, _> = parent
        .content
        .iter()
        .enumerate()
        .map(|(ix, child)| {
            let name = if ix == index {
                &replacement.type_name
            } else {
                &child.type_name
            };
            schema.node_type(name)
        })
        .collect();
    child_specs.is_ok_and(|specs| parent_spec.content.matches(&specs))
}

/// Retypes every textblock the selection touches. Blocks whose parent would
/// not accept the new type are left alone.
pub fn set_block_type(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    type_name: &str,
    attrs: Attrs,
) -> Result<Option<Transaction>, SchemaError> {
    let spec = schema.node_type(type_name)?;
    if !spec.is_textblock() {
        return Err(SchemaError::violation(
            type_name,
            spec.content.expression(),
            "not a textblock type",
        ));
    }

    let mut ops = Vec::new();
    for block in text_blocks_touching(doc, selection.from(), selection.to(), schema) {
        let unchanged = block.node.type_name == type_name
            && attrs
                .iter()
                .all(|(key, value)| block.node.attrs.get(key).unwrap_or(&Value::Null) == value);
        if unchanged {
            continue;
        }
        let node = schema.instantiate(
            type_name,
            carry_attrs(spec, &block.node.attrs, &attrs),
            block.node.content.clone(),
        )?;
        if node == *block.node {
            continue;
        }
        if !fits_parent(schema, doc, &block.path, &node) {
            tracing::debug!(path = ?block.path, type_name, "block type not allowed here");
            continue;
        }
        ops.push(Op::ReplaceNode {
            path: block.path,
            node,
        });
    }
    Ok(finish(ops, *selection, "command:set_block_type"))
}

fn is_list(type_name: &str) -> bool {
    type_name == ORDERED_LIST || type_name == BULLETED_LIST
}

/// Wraps the selected sibling textblocks in a list of `list_type`.
///
/// Inside a list of another type the nearest list is retyped instead; inside
/// a list of the same type nothing happens.
pub fn wrap_in_list(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    list_type: &str,
    attrs: Attrs,
) -> Result<Option<Transaction>, SchemaError> {
    schema.node_type(list_type)?;
    let Some(from) = resolve(doc, selection.from(), schema) else {
        tracing::debug!("selection outside document; list wrap skipped");
        return Ok(None);
    };

    let ancestors = from.ancestors(doc);
    if let Some(depth) = ancestors.iter().rposition(|n| is_list(&n.type_name)) {
        let list = ancestors[depth];
        if list.type_name == list_type {
            tracing::debug!(list_type, "already inside this list type");
            return Ok(None);
        }
        let node = schema.instantiate(list_type, attrs, list.content.clone())?;
        let ops = vec![Op::ReplaceNode {
            path: from.path[..depth].to_vec(),
            node,
        }];
        return Ok(finish(ops, *selection, "command:wrap_in_list"));
    }

    let in_textblock = from
        .parent(doc)
        .is_some_and(|p| schema.is_textblock(&p.type_name));
    let Some((&first, container_path)) = from.path.split_last().filter(|_| in_textblock) else {
        tracing::debug!("selection is not inside a textblock; list wrap skipped");
        return Ok(None);
    };
    let Some(container) = node_at_path(doc, container_path) else {
        return Ok(None);
    };

    let to_index = resolve(doc, selection.to(), schema)
        .filter(|to| to.path.len() == from.path.len() && to.path.starts_with(container_path))
        .and_then(|to| to.path.last().copied())
        .unwrap_or(first);
    let last = (first..=to_index)
        .take_while(|&ix| {
            container
                .content
                .get(ix)
                .is_some_and(|n| schema.is_textblock(&n.type_name))
        })
        .last()
        .unwrap_or(first);

    let paragraph_spec = schema.node_type(PARAGRAPH)?;
    let mut items = Vec::with_capacity(last - first + 1);
    for block in &container.content[first..=last] {
        let paragraph = if block.type_name == PARAGRAPH {
            block.clone()
        } else {
            schema.instantiate(
                PARAGRAPH,
                carry_attrs(paragraph_spec, &block.attrs, &Attrs::new()),
                block.content.clone(),
            )?
        };
        items.push(schema.instantiate(LIST_ITEM, Attrs::new(), vec![paragraph])?);
    }
    let list = schema.instantiate(list_type, attrs, items)?;

    let child_path = |ix: usize| -> Path {
        let mut path = container_path.to_vec();
        path.push(ix);
        path
    };
    let mut ops: Vec<Op> = (first + 1..=last)
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(ix),
        })
        .collect();
    ops.push(Op::ReplaceNode {
        path: child_path(first),
        node: list,
    });

    // Each wrapped block gains a list_item on both sides, and the first
    // also the list itself.
    let new_from = selection.from() + 2;
    let selection_after = if to_index <= last {
        Selection::range(new_from, selection.to() + 2 + 2 * (to_index - first))
    } else {
        Selection::cursor(new_from)
    };
    Ok(finish(ops, selection_after, "command:wrap_in_list"))
}

/// Style attributes of the textblock at the anchor, or `None` when the
/// anchor is not in a block that carries styles.
pub fn current_block_styles(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
) -> Option<LocalStyles> {
    let rpos = resolve(doc, selection.anchor(), schema)?;
    let block = rpos.parent(doc)?;
    let spec = schema.node_type(&block.type_name).ok()?;
    if !spec.is_textblock() || !spec.attrs.contains_key("styles") {
        return None;
    }
    Some(LocalStyles::from_attr(block.attrs.get("styles")))
}

/// Writes `styles` and the resolved class name onto every styled textblock
/// the selection touches.
pub fn set_block_styles(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    styles: &LocalStyles,
    class_name: Option<&str>,
) -> Result<Option<Transaction>, SchemaError> {
    let styles_value = if styles.is_empty() {
        Value::Null
    } else {
        styles.to_value()
    };
    let class_value = class_name
        .filter(|c| !c.is_empty())
        .map_or(Value::Null, Value::from);

    let mut ops = Vec::new();
    for block in text_blocks_touching(doc, selection.from(), selection.to(), schema) {
        let spec = schema.node_type(&block.node.type_name)?;
        if !spec.attrs.contains_key("styles") {
            continue;
        }
        let current = |key: &str| block.node.attrs.get(key).unwrap_or(&Value::Null);
        if *current("styles") == styles_value && *current("className") == class_value {
            continue;
        }

        let mut patch = AttrPatch::default();
        patch
            .set
            .insert("styles".to_string(), styles_value.clone());
        patch
            .set
            .insert("className".to_string(), class_value.clone());
        ops.push(Op::SetNodeAttrs {
            path: block.path,
            patch,
        });
    }
    Ok(finish(ops, *selection, "command:set_block_styles"))
}

/// A selection that lies within a single textblock.
struct InlineTarget<'a> {
    path: Path,
    block: &'a Node,
    start: usize,
    from: ResolvedPos,
}

fn inline_target<'a>(
    schema: &SchemaRegistry,
    doc: &'a Node,
    selection: &Selection,
) -> Option<InlineTarget<'a>> {
    let from = resolve(doc, selection.from(), schema)?;
    let to = resolve(doc, selection.to(), schema)?;
    if from.path != to.path {
        return None;
    }
    let block = from.parent(doc)?;
    if !schema.is_textblock(&block.type_name) {
        return None;
    }
    Some(InlineTarget {
        path: from.path.clone(),
        block,
        start: from.start(),
        from,
    })
}

/// Replaces the inline content between `from` and `to` (offsets into the
/// block's content) with `insert`.
fn splice_inline(
    schema: &SchemaRegistry,
    children: &[Node],
    from: usize,
    to: usize,
    insert: Vec<Node>,
) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len() + insert.len() + 1);
    let mut pending = Some(insert);
    let mut cursor = 0usize;

    for node in children {
        let start = cursor;
        let end = cursor + node_size(node, schema);
        cursor = end;

        if end <= from {
            out.push(node.clone());
            continue;
        }
        if start >= to && start >= from {
            out.extend(pending.take().into_iter().flatten());
            out.push(node.clone());
            continue;
        }

        if node.is_text() {
            let text = node.text_str();
            if from > start {
                let split = char_to_byte(text, from - start);
                out.push(Node::marked_text(&text[..split], node.marks.clone()));
            }
            out.extend(pending.take().into_iter().flatten());
            if to < end {
                let split = char_to_byte(text, to - start);
                out.push(Node::marked_text(&text[split..], node.marks.clone()));
            }
        } else {
            out.extend(pending.take().into_iter().flatten());
        }
    }
    out.extend(pending.take().into_iter().flatten());

    merge_adjacent_text(out)
}

fn replace_selection(
    schema: &SchemaRegistry,
    target: InlineTarget<'_>,
    selection: &Selection,
    insert: Vec<Node>,
    source: &str,
) -> Option<Transaction> {
    let inserted: usize = insert.iter().map(|n| node_size(n, schema)).sum();
    let content = splice_inline(
        schema,
        &target.block.content,
        selection.from() - target.start,
        selection.to() - target.start,
        insert,
    );

    let mut node = target.block.clone();
    node.content = content;
    finish(
        vec![Op::ReplaceNode {
            path: target.path,
            node,
        }],
        Selection::cursor(selection.from() + inserted),
        source,
    )
}

/// Replaces the selection with `text`, carrying the marks in effect at the
/// insertion point.
pub fn insert_text(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    text: &str,
) -> Result<Option<Transaction>, SchemaError> {
    if text.is_empty() {
        return Ok(None);
    }
    let Some(target) = inline_target(schema, doc, selection) else {
        tracing::debug!("selection does not lie within one textblock; insert skipped");
        return Ok(None);
    };
    let marks = target.from.marks(doc, schema);
    let node = schema.text(text, marks)?;
    Ok(replace_selection(
        schema,
        target,
        selection,
        vec![node],
        "command:insert_text",
    ))
}

/// Replaces the selection with a `property` placeholder leaf.
pub fn insert_property(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
    name: &str,
    placeholder: Option<&str>,
) -> Result<Option<Transaction>, SchemaError> {
    let mut attrs = Attrs::new();
    attrs.insert("name".to_string(), Value::from(name));
    if let Some(placeholder) = placeholder {
        attrs.insert("placeholder".to_string(), Value::from(placeholder));
    }
    let node = schema.instantiate(PROPERTY, attrs, Vec::new())?;

    let Some(target) = inline_target(schema, doc, selection) else {
        tracing::debug!("selection does not lie within one textblock; insert skipped");
        return Ok(None);
    };
    Ok(replace_selection(
        schema,
        target,
        selection,
        vec![node],
        "command:insert_property",
    ))
}
