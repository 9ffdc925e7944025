use rstest::rstest;
use textblock_core::{
    BOLD, Coverage, ITALIC, Mark, MarkRange, Node, SchemaRegistry, locate, range_has_mark,
};

/// `doc > paragraph > [A(bold, italic), B(bold), C, D(bold)]`, each run two
/// characters long. A spans 1..3, B 3..5, C 5..7, D 7..9.
fn runs() -> Node {
    Node::element(
        "doc",
        vec![Node::element(
            "paragraph",
            vec![
                Node::marked_text("aa", vec![Mark::new(BOLD), Mark::new(ITALIC)]),
                Node::marked_text("bb", vec![Mark::new(BOLD)]),
                Node::text("cc"),
                Node::marked_text("dd", vec![Mark::new(BOLD)]),
            ],
        )],
    )
}

#[rstest]
#[case::start_of_a(1, Some(MarkRange::new(1, 5)))]
#[case::inside_a(2, Some(MarkRange::new(1, 5)))]
#[case::between_a_and_b(3, Some(MarkRange::new(1, 5)))]
#[case::inside_b(4, Some(MarkRange::new(1, 5)))]
#[case::before_c(5, None)]
#[case::inside_c(6, None)]
#[case::before_d(7, Some(MarkRange::new(7, 9)))]
#[case::inside_d(8, Some(MarkRange::new(7, 9)))]
#[case::end_of_parent(9, Some(MarkRange::new(7, 9)))]
fn bold_run_is_maximal(#[case] pos: usize, #[case] expected: Option<MarkRange>) {
    let schema = SchemaRegistry::standard();
    assert_eq!(locate(&schema, &runs(), pos, BOLD), expected);
}

#[test]
fn italic_run_stops_at_first_sibling_without_it() {
    let schema = SchemaRegistry::standard();
    assert_eq!(
        locate(&schema, &runs(), 2, ITALIC),
        Some(MarkRange::new(1, 3))
    );
    assert_eq!(locate(&schema, &runs(), 4, ITALIC), None);
}

#[test]
fn positions_outside_text_resolve_to_nothing() {
    let schema = SchemaRegistry::standard();
    let doc = runs();

    assert_eq!(locate(&schema, &doc, 0, BOLD), None);
    assert_eq!(locate(&schema, &doc, 10, BOLD), None);
    assert_eq!(locate(&schema, &doc, 99, BOLD), None);

    let empty = Node::element("doc", vec![Node::element("paragraph", Vec::new())]);
    assert_eq!(locate(&schema, &empty, 1, BOLD), None);
}

#[test]
fn runs_do_not_cross_inline_leaves_without_the_mark() {
    let schema = SchemaRegistry::standard();
    let doc = Node::element(
        "doc",
        vec![Node::element(
            "paragraph",
            vec![
                Node::marked_text("ab", vec![Mark::new(BOLD)]),
                Node::element("break", Vec::new()),
                Node::marked_text("cd", vec![Mark::new(BOLD)]),
            ],
        )],
    );

    assert_eq!(locate(&schema, &doc, 2, BOLD), Some(MarkRange::new(1, 3)));
    assert_eq!(locate(&schema, &doc, 5, BOLD), Some(MarkRange::new(4, 6)));
}

#[rstest]
#[case(1, 5, Coverage::All, true)]
#[case(1, 7, Coverage::All, false)]
#[case(1, 7, Coverage::Any, true)]
#[case(5, 7, Coverage::Any, false)]
#[case(3, 3, Coverage::All, false)]
fn range_coverage(
    #[case] from: usize,
    #[case] to: usize,
    #[case] coverage: Coverage,
    #[case] expected: bool,
) {
    let schema = SchemaRegistry::standard();
    assert_eq!(
        range_has_mark(&schema, &runs(), from, to, BOLD, coverage),
        expected
    );
}
