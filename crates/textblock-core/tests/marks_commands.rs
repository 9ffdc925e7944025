use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use textblock_core::{
    Attrs, BOLD, BlockContent, CommandError, Editor, HYPERLINK, Mark, Node, SchemaRegistry,
    Selection, to_external_json, to_internal_json, toggle_mark,
};

fn paragraph_doc(children: Vec<Node>) -> Node {
    Node::element("doc", vec![Node::element("paragraph", children)])
}

fn editor(doc: Node, selection: Selection) -> Editor {
    Editor::new(doc, selection, Arc::new(SchemaRegistry::standard())).unwrap()
}

fn runs(editor: &Editor) -> Vec<(String, Vec<String>)> {
    editor.doc().content[0]
        .content
        .iter()
        .map(|n| {
            (
                n.text_str().to_string(),
                n.marks.iter().map(|m| m.type_name.clone()).collect(),
            )
        })
        .collect()
}

fn run(text: &str, marks: &[&str]) -> (String, Vec<String>) {
    (
        text.to_string(),
        marks.iter().map(|m| m.to_string()).collect(),
    )
}

#[test]
fn bolding_hello_end_to_end() {
    let input = r#"{"typeName":"doc","nodes":[{"typeName":"paragraph","nodes":[{"typeName":"text","text":"Hello"}]}]}"#;
    let doc = to_internal_json(input).unwrap();
    let mut editor = editor(doc, Selection::range(1, 6));

    editor.run_command("marks.toggle_bold", None).unwrap();

    let output: serde_json::Value =
        serde_json::from_str(&to_external_json(editor.doc()).unwrap()).unwrap();
    assert_eq!(
        output,
        json!({
            "typeName": "doc",
            "nodes": [{
                "typeName": "paragraph",
                "nodes": [{ "typeName": "text", "text": "Hello", "marks": [{ "typeName": "bold" }] }]
            }]
        })
    );
    assert_eq!(editor.selection(), Selection::range(1, 6));
}

#[test]
fn toggle_only_affects_the_selection() {
    let mut editor = editor(paragraph_doc(vec![Node::text("abcde")]), Selection::range(2, 4));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(
        runs(&editor),
        vec![run("a", &[]), run("bc", &["bold"]), run("de", &[])]
    );
}

#[test]
fn toggle_twice_restores_the_document() {
    let original = paragraph_doc(vec![
        Node::text("ab"),
        Node::marked_text("cd", vec![Mark::new("italic")]),
        Node::text("ef"),
    ]);
    let mut editor = editor(original.clone(), Selection::range(2, 6));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_ne!(editor.doc(), &original);
    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(editor.doc(), &original);
}

#[test]
fn collapsed_toggle_clears_the_whole_run() {
    let mut editor = editor(
        paragraph_doc(vec![
            Node::text("ab"),
            Node::marked_text("cd", vec![Mark::new(BOLD)]),
            Node::marked_text("ef", vec![Mark::new(BOLD), Mark::new("italic")]),
            Node::text("gh"),
        ]),
        Selection::cursor(4),
    );

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(
        runs(&editor),
        vec![run("abcd", &[]), run("ef", &["italic"]), run("gh", &[])]
    );
}

#[test]
fn collapsed_toggle_outside_any_run_is_a_no_op() {
    let doc = paragraph_doc(vec![Node::text("plain")]);
    let mut editor = editor(doc.clone(), Selection::cursor(3));

    editor.run_command("marks.toggle_italic", None).unwrap();
    assert_eq!(editor.doc(), &doc);
}

#[test]
fn mixed_selection_is_set_as_a_whole() {
    let mut editor = editor(
        paragraph_doc(vec![
            Node::marked_text("ab", vec![Mark::new(BOLD)]),
            Node::text("cd"),
        ]),
        Selection::range(1, 5),
    );

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(runs(&editor), vec![run("abcd", &["bold"])]);
}

#[test]
fn toggle_across_blocks() {
    let doc = Node::element(
        "doc",
        vec![
            Node::element("paragraph", vec![Node::text("one")]),
            Node::element("heading1", vec![Node::text("two")]).with_attr("id", "two"),
        ],
    );
    let mut editor = editor(doc, Selection::range(2, 8));

    editor.run_command("marks.toggle_underlined", None).unwrap();

    let first = &editor.doc().content[0].content;
    let second = &editor.doc().content[1].content;
    assert_eq!(first[1].text_str(), "ne");
    assert!(first[1].has_mark("underlined"));
    assert_eq!(second[0].text_str(), "tw");
    assert!(second[0].has_mark("underlined"));
    assert!(!second[1].has_mark("underlined"));
}

#[test]
fn unknown_mark_type_is_an_error() {
    let schema = SchemaRegistry::standard();
    let doc = paragraph_doc(vec![Node::text("x")]);
    assert!(toggle_mark(&schema, &doc, &Selection::range(1, 2), "sparkle", Attrs::new()).is_err());
}

#[test]
fn unknown_command_is_an_error() {
    let mut editor = editor(paragraph_doc(vec![Node::text("x")]), Selection::cursor(1));
    assert_eq!(
        editor.run_command("marks.toggle_sparkle", None),
        Err(CommandError::UnknownCommand("marks.toggle_sparkle".to_string()))
    );
}

#[test]
fn set_color_requires_both_arguments() {
    let mut editor = editor(paragraph_doc(vec![Node::text("x")]), Selection::range(1, 2));
    assert!(matches!(
        editor.run_command("marks.set_color", Some(json!({ "colorKey": "colors/red" }))),
        Err(CommandError::MissingArgument { name, .. }) if name == "colorClass"
    ));

    editor
        .run_command(
            "marks.set_color",
            Some(json!({ "colorKey": "colors/red", "colorClass": "text-red" })),
        )
        .unwrap();
    let color = editor.doc().content[0].content[0].mark("color").unwrap();
    assert_eq!(color.attr_str("colorClass"), Some("text-red"));

    editor.set_selection(Selection::cursor(2));
    editor.run_command("marks.remove_color", None).unwrap();
    assert!(editor.doc().content[0].content[0].marks.is_empty());
}

#[test]
fn hyperlink_set_update_and_remove() {
    let mut editor = editor(
        paragraph_doc(vec![Node::text("go here now")]),
        Selection::range(4, 8),
    );

    editor
        .run_command("marks.set_hyperlink", Some(json!({ "anchor": "x" })))
        .unwrap();
    assert_eq!(editor.run_query::<Option<Attrs>>("marks.hyperlink").unwrap(), None);

    editor
        .run_command(
            "marks.set_hyperlink",
            Some(json!({ "href": "/about", "targetKey": "pages/about" })),
        )
        .unwrap();
    assert_eq!(
        runs(&editor),
        vec![run("go ", &[]), run("here", &["hyperlink"]), run(" now", &[])]
    );

    // Collapsed inside the link: update the whole link.
    editor.set_selection(Selection::cursor(6));
    editor
        .run_command("marks.set_hyperlink", Some(json!({ "href": "/team" })))
        .unwrap();
    let link = editor
        .run_query::<Option<Attrs>>("marks.hyperlink")
        .unwrap()
        .unwrap();
    assert_eq!(link.get("href"), Some(&json!("/team")));
    assert_eq!(link.get("targetKey"), None);

    // Collapsed outside: no link to update.
    editor.set_selection(Selection::cursor(2));
    let before = editor.doc().clone();
    editor
        .run_command("marks.set_hyperlink", Some(json!({ "href": "/x" })))
        .unwrap();
    assert_eq!(editor.doc(), &before);

    editor.set_selection(Selection::cursor(6));
    editor.run_command("marks.remove_hyperlink", None).unwrap();
    assert!(
        editor.doc().content[0]
            .content
            .iter()
            .all(|n| !n.has_mark(HYPERLINK))
    );
}

#[test]
fn typing_at_the_end_of_a_link_does_not_extend_it() {
    let link = Mark::new(HYPERLINK).with_attr("href", "/a");
    let mut editor = editor(
        paragraph_doc(vec![
            Node::marked_text("bold", vec![Mark::new(BOLD)]),
            Node::marked_text("link", vec![link]),
        ]),
        Selection::cursor(9),
    );

    editor
        .run_command("text.insert", Some(json!({ "text": "!" })))
        .unwrap();
    assert_eq!(
        runs(&editor),
        vec![run("bold", &["bold"]), run("link", &["hyperlink"]), run("!", &[])]
    );
    assert_eq!(editor.selection(), Selection::cursor(10));

    // Bold is inclusive, so typing right after it stays bold.
    editor.set_selection(Selection::cursor(5));
    editor
        .run_command("text.insert", Some(json!({ "text": "er" })))
        .unwrap();
    assert_eq!(runs(&editor)[0], run("bolder", &["bold"]));
}

#[test]
fn inserting_text_replaces_the_selection() {
    let mut editor = editor(
        paragraph_doc(vec![Node::text("hello world")]),
        Selection::range(7, 12),
    );

    editor
        .run_command("text.insert", Some(json!({ "text": "there" })))
        .unwrap();
    assert_eq!(editor.doc().content[0].text_content(), "hello there");
    assert_eq!(editor.selection(), Selection::cursor(12));

    assert!(matches!(
        editor.run_command("text.insert", None),
        Err(CommandError::MissingArgument { .. })
    ));
}

#[test]
fn property_placeholder_is_inserted_inline() {
    let mut editor = editor(paragraph_doc(vec![Node::text("ab")]), Selection::cursor(2));

    editor
        .run_command(
            "text.insert_property",
            Some(json!({ "name": "userName", "placeholder": "User name" })),
        )
        .unwrap();

    let content = &editor.doc().content[0].content;
    assert_eq!(content.len(), 3);
    assert_eq!(content[1].type_name, "property");
    assert_eq!(content[1].attr_str("name"), Some("userName"));
    assert_eq!(content[1].attr_str("placeholder"), Some("User name"));
    assert_eq!(editor.selection(), Selection::cursor(3));

    let saved = BlockContent::from_document(editor.doc()).unwrap();
    assert_eq!(saved.nodes[0].nodes[1].type_name, "property");
}
