use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Mark, Node};
use crate::error::SchemaError;
use crate::output::{OutputElement, OutputSpec};

pub const DOC: &str = "doc";
pub const TEXT: &str = "text";
pub const PARAGRAPH: &str = "paragraph";
pub const FORMATTED: &str = "formatted";
pub const ORDERED_LIST: &str = "ordered_list";
pub const BULLETED_LIST: &str = "bulleted_list";
pub const LIST_ITEM: &str = "list_item";
pub const HEADINGS: [&str; 6] = [
    "heading1", "heading2", "heading3", "heading4", "heading5", "heading6",
];
pub const QUOTE: &str = "quote";
pub const BREAK: &str = "break";
pub const PROPERTY: &str = "property";

pub const BOLD: &str = "bold";
pub const ITALIC: &str = "italic";
pub const UNDERLINED: &str = "underlined";
pub const HIGHLIGHTED: &str = "highlighted";
pub const STRIKED: &str = "striked";
pub const CODE: &str = "code";
pub const COLOR: &str = "color";
pub const HYPERLINK: &str = "hyperlink";

pub const POPUP_TARGET: &str = "_popup";
pub const DOWNLOAD_TARGET: &str = "_download";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
    /// Only legal where a parent's content model names it explicitly.
    Structural,
}

impl NodeRole {
    fn group(self) -> Option<&'static str> {
        match self {
            NodeRole::Block => Some("block"),
            NodeRole::Inline => Some("inline"),
            NodeRole::Structural => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Repeat {
    fn bounds(self) -> (usize, usize) {
        match self {
            Repeat::One => (1, 1),
            Repeat::Optional => (0, 1),
            Repeat::ZeroOrMore => (0, usize::MAX),
            Repeat::OneOrMore => (1, usize::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ContentMatcher {
    Type(String),
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentTerm {
    matcher: ContentMatcher,
    repeat: Repeat,
}

/// The legal children of a node type, parsed from a content expression such
/// as `"paragraph block*"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentModel {
    expression: String,
    terms: Vec<ContentTerm>,
}

impl ContentModel {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(expression: &str) -> Result<Self, SchemaError> {
        let mut terms = Vec::new();
        for token in expression.split_whitespace() {
            let (name, repeat) = match token.chars().last() {
                Some('*') => (&token[..token.len() - 1], Repeat::ZeroOrMore),
                Some('+') => (&token[..token.len() - 1], Repeat::OneOrMore),
                Some('?') => (&token[..token.len() - 1], Repeat::Optional),
                _ => (token, Repeat::One),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(SchemaError::InvalidContentExpression {
                    expression: expression.to_string(),
                    message: format!("unexpected token `{token}`"),
                });
            }
            let matcher = match name {
                "block" | "inline" => ContentMatcher::Group(name.to_string()),
                _ => ContentMatcher::Type(name.to_string()),
            };
            terms.push(ContentTerm { matcher, repeat });
        }
        Ok(Self {
            expression: expression.to_string(),
            terms,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn accepts_inline(&self) -> bool {
        self.terms
            .iter()
            .any(|t| matches!(&t.matcher, ContentMatcher::Group(g) if g == "inline"))
    }

    /// Greedy match of `children` against the terms. No backtracking is
    /// needed for the expressions the standard schema uses.
    pub fn matches(&self, children: &[&NodeSpec]) -> bool {
        let mut ix = 0usize;
        for term in &self.terms {
            let (min, max) = term.repeat.bounds();
            let mut count = 0usize;
            while count < max && ix < children.len() && term.accepts(children[ix]) {
                ix += 1;
                count += 1;
            }
            if count < min {
                return false;
            }
        }
        ix == children.len()
    }
}

impl ContentTerm {
    fn accepts(&self, spec: &NodeSpec) -> bool {
        match &self.matcher {
            ContentMatcher::Type(name) => spec.name == *name,
            ContentMatcher::Group(group) => spec.role.group() == Some(group.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrSpec {
    Required,
    Default(Value),
    /// Absent unless supplied.
    Optional,
}

pub type AttrSpecs = BTreeMap<String, AttrSpec>;

pub type NodeOutputFn = Arc<dyn Fn(&Node) -> OutputSpec + Send + Sync>;
pub type MarkOutputFn = Arc<dyn Fn(&Mark) -> OutputSpec + Send + Sync>;
pub type GetAttrsFn = Arc<dyn Fn(&OutputElement) -> Attrs + Send + Sync>;

#[derive(Clone)]
pub struct ParseRule {
    pub tag: String,
    pub get_attrs: Option<GetAttrsFn>,
}

impl ParseRule {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            get_attrs: None,
        }
    }

    pub fn with_attrs(
        tag: impl Into<String>,
        get_attrs: impl Fn(&OutputElement) -> Attrs + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag: tag.into(),
            get_attrs: Some(Arc::new(get_attrs)),
        }
    }

    fn attrs(&self, el: &OutputElement) -> Attrs {
        self.get_attrs.as_ref().map(|f| f(el)).unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    pub content: ContentModel,
    pub attrs: AttrSpecs,
    pub to_output: Option<NodeOutputFn>,
    pub parse: Vec<ParseRule>,
    pub generates_id: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, role: NodeRole, content: ContentModel) -> Self {
        Self {
            name: name.into(),
            role,
            content,
            attrs: AttrSpecs::new(),
            to_output: None,
            parse: Vec::new(),
            generates_id: false,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn output(mut self, f: impl Fn(&Node) -> OutputSpec + Send + Sync + 'static) -> Self {
        self.to_output = Some(Arc::new(f));
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.name != TEXT && self.content.is_empty()
    }

    pub fn is_inline(&self) -> bool {
        self.role == NodeRole::Inline
    }

    pub fn is_textblock(&self) -> bool {
        self.role == NodeRole::Block && self.content.accepts_inline()
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("content", &self.content.expression)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct MarkSpec {
    pub name: String,
    pub attrs: AttrSpecs,
    /// Whether text typed at the edge of the mark inherits it.
    pub inclusive: bool,
    pub rank: usize,
    pub to_output: MarkOutputFn,
    pub parse: Vec<ParseRule>,
}

impl MarkSpec {
    pub fn new(
        name: impl Into<String>,
        to_output: impl Fn(&Mark) -> OutputSpec + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            attrs: AttrSpecs::new(),
            inclusive: true,
            rank: 0,
            to_output: Arc::new(to_output),
            parse: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }
}

impl fmt::Debug for MarkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkSpec")
            .field("name", &self.name)
            .field("inclusive", &self.inclusive)
            .field("rank", &self.rank)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TypeDescriptor<'a> {
    Node(&'a NodeSpec),
    Mark(&'a MarkSpec),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingIdStrategy {
    #[default]
    Slug,
    Random,
    None,
}

/// Node and mark types by name. Built once and shared; nothing in it
/// changes after construction.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    nodes: HashMap<String, NodeSpec>,
    marks: HashMap<String, MarkSpec>,
    mark_order: Vec<String>,
    heading_ids: HeadingIdStrategy,
}

impl SchemaRegistry {
    pub fn new(heading_ids: HeadingIdStrategy) -> Self {
        Self {
            heading_ids,
            ..Self::default()
        }
    }

    pub fn register_node_type(&mut self, spec: NodeSpec) -> Result<(), SchemaError> {
        if self.nodes.contains_key(&spec.name) || self.marks.contains_key(&spec.name) {
            return Err(SchemaError::DuplicateType(spec.name));
        }
        self.nodes.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn register_mark_type(&mut self, mut spec: MarkSpec) -> Result<(), SchemaError> {
        if self.nodes.contains_key(&spec.name) || self.marks.contains_key(&spec.name) {
            return Err(SchemaError::DuplicateType(spec.name));
        }
        spec.rank = self.mark_order.len();
        self.mark_order.push(spec.name.clone());
        self.marks.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<TypeDescriptor<'_>, SchemaError> {
        if let Some(spec) = self.nodes.get(name) {
            return Ok(TypeDescriptor::Node(spec));
        }
        if let Some(spec) = self.marks.get(name) {
            return Ok(TypeDescriptor::Mark(spec));
        }
        Err(SchemaError::UnknownType(name.to_string()))
    }

    pub fn node_type(&self, name: &str) -> Result<&NodeSpec, SchemaError> {
        self.nodes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn mark_type(&self, name: &str) -> Result<&MarkSpec, SchemaError> {
        self.marks
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Mark types in rank order.
    pub fn mark_types(&self) -> impl Iterator<Item = &MarkSpec> {
        self.mark_order.iter().filter_map(|name| self.marks.get(name))
    }

    pub fn is_leaf(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(NodeSpec::is_leaf)
    }

    pub fn is_textblock(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(NodeSpec::is_textblock)
    }

    pub fn is_mark_inclusive(&self, name: &str) -> bool {
        self.marks.get(name).is_none_or(|m| m.inclusive)
    }

    fn mark_rank(&self, name: &str) -> usize {
        self.marks.get(name).map(|m| m.rank).unwrap_or(usize::MAX)
    }

    /// Adds `mark` to `marks`, replacing any mark of the same type and keeping
    /// rank order.
    pub fn add_mark_to_set(&self, marks: &[Mark], mark: &Mark) -> Vec<Mark> {
        let mut out: Vec<Mark> = marks
            .iter()
            .filter(|m| m.type_name != mark.type_name)
            .cloned()
            .collect();
        let rank = self.mark_rank(&mark.type_name);
        let at = out
            .iter()
            .position(|m| self.mark_rank(&m.type_name) > rank)
            .unwrap_or(out.len());
        out.insert(at, mark.clone());
        out
    }

    fn fill_attrs(
        &self,
        type_name: &str,
        specs: &AttrSpecs,
        mut given: Attrs,
    ) -> Result<Attrs, SchemaError> {
        let mut attrs = Attrs::new();
        for (name, spec) in specs {
            match (given.remove(name), spec) {
                (Some(value), _) => {
                    attrs.insert(name.clone(), value);
                }
                (None, AttrSpec::Default(value)) => {
                    attrs.insert(name.clone(), value.clone());
                }
                (None, AttrSpec::Optional) => {}
                (None, AttrSpec::Required) => {
                    return Err(SchemaError::MissingAttribute {
                        type_name: type_name.to_string(),
                        attr: name.clone(),
                    });
                }
            }
        }
        if !given.is_empty() {
            tracing::trace!(
                type_name,
                dropped = ?given.keys().collect::<Vec<_>>(),
                "dropping undeclared attributes"
            );
        }
        Ok(attrs)
    }

    fn check_content(&self, spec: &NodeSpec, content: &[Node]) -> Result<(), SchemaError> {
        let child_specs = content
            .iter()
            .map(|child| self.node_type(&child.type_name))
            .collect::<Result<Vec<_>, _>>()?;
        if spec.content.matches(&child_specs) {
            return Ok(());
        }

        let found: Vec<&str> = content.iter().map(|c| c.type_name.as_str()).collect();
        Err(SchemaError::violation(
            &spec.name,
            spec.content.expression(),
            format!("found [{}]", found.join(", ")),
        ))
    }

    /// Builds a node of type `name`, filling attribute defaults and checking
    /// `content` against the type's content model.
    pub fn instantiate(
        &self,
        name: &str,
        attrs: Attrs,
        content: Vec<Node>,
    ) -> Result<Node, SchemaError> {
        let spec = self.node_type(name)?;
        if name == TEXT {
            return Err(SchemaError::violation(
                TEXT,
                "text",
                "text nodes are built with SchemaRegistry::text",
            ));
        }
        let attrs = self.fill_attrs(name, &spec.attrs, attrs)?;
        self.check_content(spec, &content)?;

        let mut node = Node {
            type_name: name.to_string(),
            attrs,
            content,
            text: None,
            marks: Vec::new(),
        };
        if spec.generates_id {
            self.ensure_id(&mut node);
        }
        Ok(node)
    }

    pub fn text(&self, text: impl Into<String>, marks: Vec<Mark>) -> Result<Node, SchemaError> {
        let text = text.into();
        if text.is_empty() {
            return Err(SchemaError::violation(TEXT, "text", "empty text node"));
        }
        let mut sorted: Vec<Mark> = Vec::new();
        for mark in &marks {
            self.mark_type(&mark.type_name)?;
            sorted = self.add_mark_to_set(&sorted, mark);
        }
        Ok(Node::marked_text(text, sorted))
    }

    pub fn create_mark(&self, name: &str, attrs: Attrs) -> Result<Mark, SchemaError> {
        let spec = self.mark_type(name)?;
        let attrs = self.fill_attrs(name, &spec.attrs, attrs)?;
        Ok(Mark {
            type_name: name.to_string(),
            attrs,
        })
    }

    fn ensure_id(&self, node: &mut Node) {
        let has_id = node
            .attrs
            .get("id")
            .is_some_and(|v| v.as_str().is_some_and(|s| !s.is_empty()));
        if has_id {
            return;
        }
        let id = match self.heading_ids {
            HeadingIdStrategy::None => return,
            HeadingIdStrategy::Slug => {
                let slug = slugify(&node.text_content());
                if slug.is_empty() { random_id() } else { slug }
            }
            HeadingIdStrategy::Random => random_id(),
        };
        tracing::trace!(type_name = %node.type_name, %id, "generated heading id");
        node.attrs.insert("id".to_string(), Value::String(id));
    }

    /// Checks a whole tree rooted at `doc`.
    pub fn validate_document(&self, doc: &Node) -> Result<(), SchemaError> {
        if doc.type_name != DOC {
            return Err(SchemaError::violation(
                DOC,
                "doc",
                format!("root is `{}`", doc.type_name),
            ));
        }
        self.validate(doc)
    }

    pub fn validate(&self, node: &Node) -> Result<(), SchemaError> {
        let spec = self.node_type(&node.type_name)?;
        if node.is_text() {
            if node.text_str().is_empty() {
                return Err(SchemaError::violation(TEXT, "text", "empty text node"));
            }
            for mark in &node.marks {
                self.mark_type(&mark.type_name)?;
            }
            return Ok(());
        }
        if node.text.is_some() {
            return Err(SchemaError::violation(
                &node.type_name,
                spec.content.expression(),
                "non-text node carries text",
            ));
        }
        self.check_content(spec, &node.content)?;
        for child in &node.content {
            self.validate(child)?;
        }
        Ok(())
    }

    pub(crate) fn match_node_tag(&self, el: &OutputElement) -> Option<(&NodeSpec, Attrs)> {
        self.nodes.values().find_map(|spec| {
            spec.parse
                .iter()
                .find(|rule| rule.tag == el.tag)
                .map(|rule| (spec, rule.attrs(el)))
        })
    }

    pub(crate) fn match_mark_tag(&self, el: &OutputElement) -> Option<(&MarkSpec, Attrs)> {
        self.mark_types().find_map(|spec| {
            spec.parse
                .iter()
                .find(|rule| rule.tag == el.tag)
                .map(|rule| (spec, rule.attrs(el)))
        })
    }

    /// The registry every editor uses unless told otherwise.
    pub fn standard() -> Self {
        Self::standard_with(HeadingIdStrategy::default())
    }

    pub fn standard_with(heading_ids: HeadingIdStrategy) -> Self {
        let mut registry = Self::new(heading_ids);
        for spec in standard_nodes() {
            registry
                .register_node_type(spec)
                .expect("standard node types must be unique");
        }
        for spec in standard_marks() {
            registry
                .register_mark_type(spec)
                .expect("standard mark types must be unique");
        }
        registry
    }
}

fn random_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("h{}", &id[..12])
}

/// Lowercases, keeps alphanumerics and collapses everything else to single
/// dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn content(expression: &str) -> ContentModel {
    ContentModel::parse(expression).expect("standard content expression must parse")
}

fn id_and_class(node: &Node, spec: OutputSpec) -> OutputSpec {
    let mut spec = spec;
    if let Some(id) = node.attr_str("id").filter(|s| !s.is_empty()) {
        spec = spec.attr("id", id);
    }
    if let Some(class) = node.attr_str("className").filter(|s| !s.is_empty()) {
        spec = spec.attr("class", class);
    }
    spec
}

fn textblock(name: &str, tag: &'static str) -> NodeSpec {
    NodeSpec::new(name, NodeRole::Block, content("inline*"))
        .attr("id", AttrSpec::Default(Value::Null))
        .attr("className", AttrSpec::Default(Value::Null))
        .attr("styles", AttrSpec::Default(Value::Null))
        .output(move |node| id_and_class(node, OutputSpec::container(tag)))
        .parse_rule(ParseRule::tag(tag))
}

fn heading(name: &str, tag: &'static str) -> NodeSpec {
    let mut spec = textblock(name, tag);
    spec.parse = vec![ParseRule::with_attrs(tag, |el| {
        let mut attrs = Attrs::new();
        let id = el.attrs.get("id").cloned().map(Value::String).unwrap_or(Value::Null);
        attrs.insert("id".to_string(), id);
        attrs
    })];
    spec.generates_id = true;
    spec
}

fn standard_nodes() -> Vec<NodeSpec> {
    const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

    let mut nodes = vec![
        NodeSpec::new(DOC, NodeRole::Structural, content("block+")),
        NodeSpec::new(TEXT, NodeRole::Inline, ContentModel::empty()),
        textblock(PARAGRAPH, "p"),
        textblock(FORMATTED, "pre"),
        textblock(QUOTE, "blockquote"),
        NodeSpec::new(ORDERED_LIST, NodeRole::Block, content("list_item+"))
            .attr("order", AttrSpec::Default(Value::from(1)))
            .output(|node| {
                let order = node.attrs.get("order").and_then(Value::as_i64).unwrap_or(1);
                if order == 1 {
                    OutputSpec::container("ol")
                } else {
                    OutputSpec::container("ol").attr("start", order.to_string())
                }
            })
            .parse_rule(ParseRule::with_attrs("ol", |el| {
                let order = el
                    .attrs
                    .get("start")
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(1);
                let mut attrs = Attrs::new();
                attrs.insert("order".to_string(), Value::from(order));
                attrs
            })),
        NodeSpec::new(BULLETED_LIST, NodeRole::Block, content("list_item+"))
            .attr("className", AttrSpec::Default(Value::Null))
            .attr("styles", AttrSpec::Default(Value::Null))
            .output(|node| {
                let spec = OutputSpec::container("ul");
                match node.attr_str("className").filter(|s| !s.is_empty()) {
                    Some(class) => spec.attr("class", class),
                    None => spec,
                }
            })
            .parse_rule(ParseRule::tag("ul")),
        NodeSpec::new(LIST_ITEM, NodeRole::Structural, content("paragraph block*"))
            .output(|_| OutputSpec::container("li"))
            .parse_rule(ParseRule::tag("li")),
        NodeSpec::new(BREAK, NodeRole::Inline, ContentModel::empty())
            .output(|_| OutputSpec::leaf("br"))
            .parse_rule(ParseRule::tag("br")),
        NodeSpec::new(PROPERTY, NodeRole::Inline, ContentModel::empty())
            .attr("name", AttrSpec::Default(Value::Null))
            .attr("placeholder", AttrSpec::Default(Value::Null))
            .output(|node| {
                let mut spec = OutputSpec::leaf("property");
                for key in ["name", "placeholder"] {
                    if let Some(value) = node.attr_str(key) {
                        spec = spec.attr(key, value);
                    }
                }
                spec
            })
            .parse_rule(ParseRule::with_attrs("property", |el| {
                let mut attrs = Attrs::new();
                for key in ["name", "placeholder"] {
                    if let Some(value) = el.attrs.get(key) {
                        attrs.insert(key.to_string(), Value::String(value.clone()));
                    }
                }
                attrs
            })),
    ];

    for (name, tag) in HEADINGS.iter().zip(HEADING_TAGS) {
        nodes.push(heading(name, tag));
    }
    nodes
}

fn simple_mark(name: &str, tag: &'static str) -> MarkSpec {
    MarkSpec::new(name, move |_| OutputSpec::container(tag)).parse_rule(ParseRule::tag(tag))
}

fn standard_marks() -> Vec<MarkSpec> {
    vec![
        simple_mark(BOLD, "b"),
        simple_mark(ITALIC, "i"),
        simple_mark(UNDERLINED, "u"),
        simple_mark(HIGHLIGHTED, "mark"),
        simple_mark(STRIKED, "strike"),
        simple_mark(CODE, "code"),
        MarkSpec::new(COLOR, |mark| {
            let spec = OutputSpec::container("span");
            match mark.attr_str("colorClass") {
                Some(class) => spec.attr("class", class),
                None => spec,
            }
        })
        .attr("colorKey", AttrSpec::Required)
        .attr("colorClass", AttrSpec::Required),
        hyperlink_spec(),
    ]
}

fn hyperlink_spec() -> MarkSpec {
    let mut spec = MarkSpec::new(HYPERLINK, hyperlink_output)
        .inclusive(false)
        .parse_rule(ParseRule::with_attrs("a", |el| {
            let mut attrs = Attrs::new();
            for key in ["href", "target"] {
                if let Some(value) = el.attrs.get(key) {
                    attrs.insert(key.to_string(), Value::String(value.clone()));
                }
            }
            attrs
        }));
    for attr in [
        "href",
        "anchor",
        "anchorName",
        "targetKey",
        "target",
        "download",
        "rel",
        "triggerEvent",
        "data-toggle",
        "data-target",
        "data-trigger-event",
    ] {
        spec = spec.attr(attr, AttrSpec::Optional);
    }
    spec
}

/// The anchor element for a hyperlink, branching on its `target`.
pub fn hyperlink_output(mark: &Mark) -> OutputSpec {
    let href = mark.attr_str("href").unwrap_or("");
    let target_key = mark.attr_str("targetKey");

    match mark.attr_str("target") {
        Some(POPUP_TARGET) => {
            let popup = target_key.unwrap_or("").replacen("popups/", "popups", 1);
            let mut spec = OutputSpec::container("a")
                .attr("data-toggle", "popup")
                .attr("data-target", format!("#{popup}"));
            if let Some(event) = mark.attr_str("triggerEvent") {
                spec = spec.attr("data-trigger-event", event);
            }
            spec.attr("href", "javascript:void(0)")
        }
        Some(DOWNLOAD_TARGET) => OutputSpec::container("a")
            .attr("href", href)
            .attr("download", ""),
        target => {
            let href = match mark.attr_str("anchor").filter(|a| !a.is_empty()) {
                Some(anchor) => format!("{href}#{anchor}"),
                None => href.to_string(),
            };
            let mut spec = OutputSpec::container("a").attr("href", href);
            if let Some(target) = target {
                spec = spec.attr("target", target);
            }
            if target_key.is_some_and(|k| k.starts_with("urls/")) {
                spec = spec.attr("rel", "noopener noreferrer");
            }
            spec
        }
    }
}
