//! End-to-end tests: markup in, tree edits, markup out

use richtext_dom::{parse_html, Dom, Position, Range};

#[test]
fn test_entities_and_void_elements_survive_round_trip() {
    let source = r#"<p class="x">a &amp; b<br>c</p><p>&lt;tag&gt;</p>"#;
    let (dom, root) = parse_html(source);

    let second = dom.children(root)[1];
    assert_eq!(dom.text_content(second), "<tag>");
    assert_eq!(dom.inner_html(root), source);
}

#[test]
fn test_split_to_splits_every_container() {
    let (mut dom, root) = parse_html("<p>ab<strong>cd</strong></p>");
    let p = dom.children(root)[0];
    let strong = dom.children(p)[1];
    let text = dom.children(strong)[0];

    let index = dom.split_to(root, Position::new(text, 1)).unwrap();

    assert_eq!(index, 1);
    assert_eq!(
        dom.inner_html(root),
        "<p>ab<strong>c</strong></p><p><strong>d</strong></p>"
    );
}

#[test]
fn test_clone_range_leaves_source_untouched() {
    let (mut dom, root) = parse_html("<em>hello</em> world");
    let em = dom.children(root)[0];
    let hello = dom.children(em)[0];
    let world = dom.children(root)[1];

    let range = Range::new(Position::new(hello, 2), Position::new(world, 3));
    let cloned = dom.clone_range(root, range).unwrap();

    assert_eq!(dom.serialize_nodes(&cloned), "<em>llo</em> wo");
    assert_eq!(dom.inner_html(root), "<em>hello</em> world");
}

#[test]
fn test_set_inner_html_replaces_children() {
    let mut dom = Dom::new();
    let body = dom.create_element("div");
    dom.set_inner_html(body, "<p>old</p>").unwrap();
    let old = dom.children(body)[0];

    dom.set_inner_html(body, "new <em>text</em>").unwrap();

    assert_eq!(dom.inner_html(body), "new <em>text</em>");
    assert!(!dom.contains_node(old));
}
