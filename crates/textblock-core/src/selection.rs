use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Node, Selection};
use crate::marks::{Coverage, range_has_mark};
use crate::position::resolve;
use crate::schema::{
    BOLD, BULLETED_LIST, CODE, COLOR, HIGHLIGHTED, HYPERLINK, ITALIC, LIST_ITEM, ORDERED_LIST,
    STRIKED, SchemaRegistry, UNDERLINED,
};
use crate::style::LocalStyles;

/// What the host toolbar needs to know about the selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub block: Option<String>,
    pub ordered_list: bool,
    pub bulleted_list: bool,
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
    pub highlighted: bool,
    pub striked: bool,
    pub code: bool,
    pub hyperlink: bool,
    pub color_key: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alignment: BTreeMap<String, String>,
    pub appearance: Option<String>,
}

/// Derives the selection state. Never touches the tree or the selection.
///
/// A collapsed selection looks one position back, so a cursor right after
/// bold text reports bold.
pub fn compute_selection_state(
    schema: &SchemaRegistry,
    doc: &Node,
    selection: &Selection,
) -> SelectionState {
    let to = selection.to();
    let from = if selection.is_collapsed() {
        selection.from().saturating_sub(1)
    } else {
        selection.from()
    };

    let Some(anchor) = resolve(doc, selection.anchor(), schema) else {
        return SelectionState::default();
    };
    let ancestors = anchor.ancestors(doc);
    let Some(&block) = ancestors.last() else {
        return SelectionState::default();
    };

    let mut state = SelectionState {
        block: Some(block_name(&ancestors)),
        ..SelectionState::default()
    };

    let nearest_list = ancestors
        .iter()
        .rev()
        .find(|n| n.type_name == ORDERED_LIST || n.type_name == BULLETED_LIST);
    if let Some(list) = nearest_list {
        state.ordered_list = list.type_name == ORDERED_LIST;
        state.bulleted_list = list.type_name == BULLETED_LIST;
    }

    let has = |mark_type: &str| range_has_mark(schema, doc, from, to, mark_type, Coverage::All);
    state.bold = has(BOLD);
    state.italic = has(ITALIC);
    state.underlined = has(UNDERLINED);
    state.highlighted = has(HIGHLIGHTED);
    state.striked = has(STRIKED);
    state.code = has(CODE);
    state.hyperlink = has(HYPERLINK);

    state.color_key = anchor
        .marks(doc, schema)
        .iter()
        .find(|m| m.type_name == COLOR)
        .and_then(|m| m.attr_str("colorKey"))
        .map(str::to_string);

    let styles = LocalStyles::from_attr(block.attrs.get("styles"));
    state.alignment = styles.alignment;
    state.appearance = styles.appearance;

    state
}

/// The anchor's parent, except that the leading paragraph of a list item
/// reports the item itself.
fn block_name(ancestors: &[&Node]) -> String {
    let parent = ancestors[ancestors.len() - 1];
    if ancestors.len() >= 2 {
        let grandparent = ancestors[ancestors.len() - 2];
        let leads_item = grandparent.type_name == LIST_ITEM
            && grandparent
                .content
                .first()
                .is_some_and(|first| std::ptr::eq(first, parent));
        if leads_item {
            return LIST_ITEM.to_string();
        }
    }
    parent.type_name.clone()
}
