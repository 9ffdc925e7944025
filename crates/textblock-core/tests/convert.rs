use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use textblock_core::{
    BlockContent, BlockModel, ConversionError, Editor, EditorConfig, LoadError, Mark, Node,
    SchemaError, SchemaRegistry, Selection, to_external, to_external_json, to_internal,
    to_internal_json,
};

const HELLO: &str = r#"{"typeName":"doc","nodes":[{"typeName":"paragraph","nodes":[{"typeName":"text","text":"Hello"}]}]}"#;

fn list_model() -> BlockModel {
    let mut text = BlockModel::text("ordered-list");
    text.marks = vec![Mark::new("bold")];

    let mut list = BlockModel::new(
        "ordered-list",
        vec![BlockModel::new(
            "list-item",
            vec![BlockModel::new("paragraph", vec![text])],
        )],
    );
    list.attrs.insert("order".to_string(), json!(3));

    BlockModel::new(
        "doc",
        vec![
            list,
            BlockModel::new(
                "bulleted-list",
                vec![BlockModel::new(
                    "list-item",
                    vec![BlockModel::new(
                        "paragraph",
                        vec![BlockModel::text("list-item and bulleted-list")],
                    )],
                )],
            ),
        ],
    )
}

#[test]
fn hello_document_converts_and_round_trips() {
    let doc = to_internal_json(HELLO).unwrap();

    assert_eq!(
        doc,
        Node::element(
            "doc",
            vec![Node::element("paragraph", vec![Node::text("Hello")])]
        )
    );
    assert_eq!(
        serde_json::to_value(&doc).unwrap(),
        json!({
            "typeName": "doc",
            "content": [{ "typeName": "paragraph", "content": [{ "typeName": "text", "text": "Hello" }] }]
        })
    );

    let back: serde_json::Value = serde_json::from_str(&to_external_json(&doc).unwrap()).unwrap();
    let original: serde_json::Value = serde_json::from_str(HELLO).unwrap();
    assert_eq!(back, original);
}

#[test]
fn list_type_names_are_renamed_structurally() {
    let model = list_model();
    let doc = to_internal(&model).unwrap();

    assert_eq!(doc.content[0].type_name, "ordered_list");
    assert_eq!(doc.content[0].content[0].type_name, "list_item");
    assert_eq!(doc.content[1].type_name, "bulleted_list");
    assert_eq!(doc.content[0].attrs.get("order"), Some(&json!(3)));

    let text = &doc.content[0].content[0].content[0].content[0];
    assert_eq!(text.text_str(), "ordered-list");
    assert!(text.has_mark("bold"));
    assert_eq!(
        doc.content[1].text_content(),
        "list-item and bulleted-list"
    );

    assert_eq!(to_external(&doc).unwrap(), model);
}

#[test]
fn internal_tree_round_trips() {
    let doc = Node::element(
        "doc",
        vec![
            Node::element(
                "ordered_list",
                vec![Node::element(
                    "list_item",
                    vec![Node::element("paragraph", vec![Node::text("a")])],
                )],
            ),
            Node::element("heading1", vec![Node::text("ordered_list")]).with_attr("id", "x"),
        ],
    );

    let model = to_external(&doc).unwrap();
    assert_eq!(model.nodes[0].type_name, "ordered-list");
    assert_eq!(to_internal(&model).unwrap(), doc);
}

#[test]
fn internal_names_in_block_model_are_rejected() {
    let model = BlockModel::new(
        "doc",
        vec![BlockModel::new(
            "ordered_list",
            vec![BlockModel::new("list-item", Vec::new())],
        )],
    );

    let err = to_internal(&model).unwrap_err();
    let ConversionError::ForeignTypeName { type_name, path, .. } = &err else {
        panic!("expected foreign type name, got {err:?}");
    };
    assert_eq!(type_name, "ordered_list");
    assert_eq!(path, &vec![0]);
}

#[test]
fn external_names_in_document_are_rejected() {
    let doc = Node::element("doc", vec![Node::element("bulleted-list", Vec::new())]);
    assert!(matches!(
        to_external(&doc),
        Err(ConversionError::ForeignTypeName { .. })
    ));
}

#[test]
fn text_with_children_is_rejected() {
    let mut bad = BlockModel::text("x");
    bad.nodes.push(BlockModel::text("y"));
    let model = BlockModel::new("doc", vec![BlockModel::new("paragraph", vec![bad])]);

    let err = to_internal(&model).unwrap_err();
    let ConversionError::TextWithChildren { path, .. } = &err else {
        panic!("expected text-with-children error, got {err:?}");
    };
    assert_eq!(path, &vec![0, 0]);
}

#[test]
fn malformed_json_is_a_conversion_error() {
    assert!(matches!(
        to_internal_json(r#"{"nodes": []}"#),
        Err(ConversionError::Json(_))
    ));
}

#[test]
fn block_content_wraps_top_level_blocks() {
    let content = BlockContent::from_json_str(
        r#"[{"typeName":"bulleted-list","nodes":[{"typeName":"list-item","nodes":[{"typeName":"paragraph"}]}]}]"#,
    )
    .unwrap();

    let doc = content.to_document().unwrap();
    assert_eq!(doc.type_name, "doc");
    assert_eq!(doc.content[0].type_name, "bulleted_list");

    assert_eq!(BlockContent::from_document(&doc).unwrap(), content);

    let not_doc = Node::element("paragraph", Vec::new());
    assert!(matches!(
        BlockContent::from_document(&not_doc),
        Err(ConversionError::NotADocument(name)) if name == "paragraph"
    ));
}

#[test]
fn editor_saves_and_reloads_block_content() {
    // ordered_list(0) > list_item(1) > paragraph(2) > "one" at 3..6
    let content = BlockContent::from_json_str(
        r#"[{"typeName":"ordered-list","nodes":[{"typeName":"list-item","nodes":[{"typeName":"paragraph","nodes":[{"typeName":"text","text":"one"}]}]}]}]"#,
    )
    .unwrap();
    let mut editor =
        Editor::from_block_content(&content, Arc::new(SchemaRegistry::standard())).unwrap();

    editor.set_selection(Selection::range(3, 6));
    editor.run_command("marks.toggle_bold", None).unwrap();

    let saved = editor.to_block_content().unwrap();
    assert_eq!(saved.nodes[0].type_name, "ordered-list");
    assert_eq!(saved.nodes[0].nodes[0].type_name, "list-item");
    let text = &saved.nodes[0].nodes[0].nodes[0].nodes[0];
    assert_eq!(text.text.as_deref(), Some("one"));
    assert_eq!(text.marks, vec![Mark::new("bold")]);

    let reloaded = BlockContent::from_json_str(&saved.to_json_pretty().unwrap()).unwrap();
    assert_eq!(reloaded, saved);

    let replacement = BlockContent::new(vec![BlockModel::new(
        "paragraph",
        vec![BlockModel::text("fresh")],
    )]);
    editor.set_block_content(&replacement).unwrap();
    assert_eq!(editor.selection(), Selection::cursor(0));
    assert_eq!(editor.doc().content[0].text_content(), "fresh");
    assert_eq!(editor.to_block_content().unwrap(), replacement);
}

#[test]
fn empty_block_content_is_rejected() {
    let mut editor = Editor::with_standard_schema(EditorConfig::default());
    let before = editor.doc().clone();

    let err = editor.set_block_content(&BlockContent::default()).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Schema(SchemaError::ContentModelViolation { .. })
    ));
    assert_eq!(editor.doc(), &before);
    assert!(
        Editor::from_block_content(
            &BlockContent::default(),
            Arc::new(SchemaRegistry::standard())
        )
        .is_err()
    );
}
