use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use textblock_core::{CommandError, CommandInfo, Editor, Node, SchemaRegistry, Selection};

fn editor() -> Editor {
    let doc = Node::element(
        "doc",
        vec![Node::element("paragraph", vec![Node::text("text")])],
    );
    Editor::new(doc, Selection::cursor(2), Arc::new(SchemaRegistry::standard())).unwrap()
}

#[test]
fn commands_are_listed_in_id_order() {
    let editor = editor();
    let commands = editor
        .run_query::<Vec<CommandInfo>>("commands.list")
        .unwrap();

    let ids: Vec<&str> = commands.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, editor.commands().ids());
    assert_eq!(ids.first(), Some(&"block.set_formatted"));
    assert!(ids.contains(&"marks.toggle_bold"));

    let heading = commands
        .iter()
        .find(|c| c.id == "block.set_heading")
        .unwrap();
    assert_eq!(heading.label, "Set heading");
    assert_eq!(heading.args_example, Some(json!({ "level": 2 })));
    assert!(heading.keywords.iter().any(|k| k == "h1"));
    assert!(heading.description.is_some());
}

#[test]
fn listed_commands_match_the_registry() {
    let editor = editor();
    let listed = editor.commands().list();
    for info in &listed {
        let spec = editor.commands().command(&info.id).unwrap();
        assert_eq!(&spec.info(), info);
    }
    assert_eq!(listed.len(), editor.commands().ids().len());
}

#[test]
fn query_result_of_the_wrong_shape_is_an_error() {
    let editor = editor();
    let err = editor
        .run_query::<Vec<String>>("selection.state")
        .unwrap_err();
    let CommandError::Query { id, .. } = &err else {
        panic!("expected query error, got {err:?}");
    };
    assert_eq!(id, "selection.state");
}

#[test]
fn unknown_query_is_an_error() {
    let editor = editor();
    assert_eq!(
        editor.run_query_json("selection.nothing"),
        Err(CommandError::UnknownCommand("selection.nothing".to_string()))
    );
}
