//! Integration tests for the editing surface, driven through DomEngine

use richtext_editor::{
    Block, ClipboardFile, DomEngine, EditableEngine, EditingSurfaceController, FieldHost,
    FieldProps, FormatChange, HostCapabilities, Key, KeyEvent, Node, Notification, PastePayload, Value,
    ValueFormat,
};

const ZWSP: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq)]
enum HostCall {
    Change(Value),
    UndoLevel,
    Split {
        before: Value,
        after: Value,
        blocks: Vec<Block>,
    },
    Merge(bool),
    Replace(Vec<Block>),
    Remove(bool),
    Undo,
    Redo,
    Focus(String),
}

#[derive(Debug, Default)]
struct RecordingHost {
    capabilities: HostCapabilities,
    calls: Vec<HostCall>,
}

impl RecordingHost {
    fn new(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            calls: Vec::new(),
        }
    }

    fn undo_levels(&self) -> usize {
        self.calls.iter().filter(|c| **c == HostCall::UndoLevel).count()
    }

    fn splits(&self) -> Vec<(Value, Value, Vec<Block>)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Split { before, after, blocks } => {
                    Some((before.clone(), after.clone(), blocks.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn changes(&self) -> Vec<Value> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Change(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

impl FieldHost for RecordingHost {
    fn on_change(&mut self, value: Value) {
        self.calls.push(HostCall::Change(value));
    }

    fn create_undo_level(&mut self) {
        self.calls.push(HostCall::UndoLevel);
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn on_split(&mut self, before: Value, after: Value, blocks: Vec<Block>) {
        self.calls.push(HostCall::Split { before, after, blocks });
    }

    fn on_merge(&mut self, forward: bool) {
        self.calls.push(HostCall::Merge(forward));
    }

    fn on_replace(&mut self, blocks: Vec<Block>) {
        self.calls.push(HostCall::Replace(blocks));
    }

    fn on_remove(&mut self, forward: bool) {
        self.calls.push(HostCall::Remove(forward));
    }

    fn on_undo(&mut self) {
        self.calls.push(HostCall::Undo);
    }

    fn on_redo(&mut self) {
        self.calls.push(HostCall::Redo);
    }

    fn set_focused_element(&mut self, instance_id: &str) {
        self.calls.push(HostCall::Focus(instance_id.to_string()));
    }
}

type Field = EditingSurfaceController<DomEngine, RecordingHost>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn field(props: FieldProps, capabilities: HostCapabilities) -> anyhow::Result<Field> {
    init_tracing();
    let mut field = EditingSurfaceController::new(DomEngine::new(), RecordingHost::new(capabilities), props);
    field.mount()?;
    field.engine_mut().focus();
    Ok(field)
}

fn split_only() -> HostCapabilities {
    HostCapabilities {
        split: true,
        ..HostCapabilities::default()
    }
}

fn text(content: &str) -> Value {
    Value::Tree(vec![Node::text(content)])
}

fn paragraph(content: &str) -> Node {
    Node::element("p").with_child(Node::text(content))
}

#[test]
fn test_value_round_trip() -> anyhow::Result<()> {
    let values = vec![
        Value::Tree(vec![]),
        text("plain"),
        Value::Tree(vec![
            Node::text("a "),
            Node::element("strong").with_child(Node::element("em").with_child(Node::text("b"))),
            Node::text(" & "),
            Node::element("a")
                .with_attr("href", "/x?y=1&z=2")
                .with_attr("target", "_blank")
                .with_child(Node::text("link")),
            Node::element("br"),
            Node::text("<tail>"),
        ]),
    ];

    for value in values {
        let field = field(FieldProps::new("p").with_value(value.clone()), HostCapabilities::default())?;
        assert_eq!(field.get_content(), value);
    }
    Ok(())
}

#[test]
fn test_is_empty_is_idempotent() -> anyhow::Result<()> {
    let field = field(FieldProps::new("p").with_value(text("x")), HostCapabilities::all())?;
    let content = field.engine().get_content();

    let first = field.is_empty();
    let second = field.is_empty();

    assert_eq!(first, second);
    assert!(!first);
    assert_eq!(field.engine().get_content(), content);
    assert!(field.host().calls.is_empty());
    Ok(())
}

#[test]
fn test_string_format_counts_as_empty() -> anyhow::Result<()> {
    let props = FieldProps::new("p")
        .with_format(ValueFormat::String)
        .with_value(Value::Html("text".into()));
    let field = field(props, HostCapabilities::default())?;

    assert!(field.is_empty());
    Ok(())
}

#[test]
fn test_first_keystroke_in_empty_field_skips_checkpoint() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p"), HostCapabilities::default())?;

    field.engine_mut().type_text("a")?;
    field.pump();
    assert_eq!(field.host().undo_levels(), 0);
    assert_eq!(field.host().changes(), vec![text("a")]);
    assert!(!field.session().last_change_was_persistent());

    field.engine_mut().type_text("b")?;
    field.pump();
    assert_eq!(field.host().undo_levels(), 1);
    assert!(field.session().last_change_was_persistent());
    Ok(())
}

#[test]
fn test_merge_at_edges() -> anyhow::Result<()> {
    let capabilities = HostCapabilities {
        merge: true,
        ..HostCapabilities::default()
    };
    let mut field = field(FieldProps::new("p").with_value(text("abc")), capabilities)?;

    field.engine_mut().set_caret(0);
    let response = field.handle(Notification::KeyDown(KeyEvent::new(Key::Backspace)));
    assert!(response.prevent_default);
    assert!(response.stop_propagation);

    field.engine_mut().set_caret(3);
    field.handle(Notification::KeyDown(KeyEvent::new(Key::Delete)));

    // Mid-text deletes belong to the engine
    field.engine_mut().set_caret(1);
    let response = field.handle(Notification::KeyDown(KeyEvent::new(Key::Backspace)));
    assert!(!response.prevent_default);

    let calls = &field.host().calls;
    assert_eq!(
        calls.iter().filter(|c| matches!(c, HostCall::Merge(_))).cloned().collect::<Vec<_>>(),
        vec![HostCall::Merge(false), HostCall::Merge(true)]
    );
    // Each merge is preceded by a checkpoint that keeps the content
    assert_eq!(
        calls[..3],
        [HostCall::Change(text("abc")), HostCall::UndoLevel, HostCall::Merge(false)]
    );
    assert_eq!(field.engine().get_content(), "abc");
    Ok(())
}

#[test]
fn test_no_merge_across_images_or_line_breaks() -> anyhow::Result<()> {
    let capabilities = HostCapabilities {
        merge: true,
        ..HostCapabilities::default()
    };
    let image = || Node::element("img").with_attr("src", "x.png");

    let value = Value::Tree(vec![image(), Node::text("abc")]);
    let mut leading = field(FieldProps::new("p").with_value(value), capabilities)?;
    leading.engine_mut().set_caret(0);
    let response = leading.handle(Notification::KeyDown(KeyEvent::new(Key::Backspace)));
    assert!(!response.prevent_default);
    assert!(!leading.host().calls.iter().any(|c| matches!(c, HostCall::Merge(_))));

    let value = Value::Tree(vec![Node::text("abc"), Node::element("br"), image()]);
    let mut trailing = field(FieldProps::new("p").with_value(value), capabilities)?;
    trailing.engine_mut().set_caret(3);
    let response = trailing.handle(Notification::KeyDown(KeyEvent::new(Key::Delete)));
    assert!(!response.prevent_default);
    assert!(!trailing.host().calls.iter().any(|c| matches!(c, HostCall::Merge(_))));
    Ok(())
}

#[test]
fn test_remove_empty_field_on_backspace() -> anyhow::Result<()> {
    let capabilities = HostCapabilities {
        merge: true,
        remove: true,
        ..HostCapabilities::default()
    };
    let mut field = field(FieldProps::new("p"), capabilities)?;

    field.handle(Notification::KeyDown(KeyEvent::new(Key::Backspace)));

    assert!(field.host().calls.contains(&HostCall::Merge(false)));
    assert!(field.host().calls.contains(&HostCall::Remove(false)));
    Ok(())
}

#[test]
fn test_split_never_leaks_sentinel() -> anyhow::Result<()> {
    let props = FieldProps::new("p")
        .with_format(ValueFormat::String)
        .with_value(Value::Html(format!("<a href=\"/x\">link</a>{}", ZWSP)));
    let mut field = field(props, split_only())?;
    field.engine_mut().set_caret(5);

    let response = field.handle(Notification::KeyDown(KeyEvent::new(Key::Enter)));

    assert!(response.prevent_default);
    let splits = field.host().splits();
    assert_eq!(splits.len(), 1);
    let (before, after, blocks) = &splits[0];
    assert_eq!(before, &Value::Html("<a href=\"/x\">link</a>".into()));
    assert_eq!(after, &Value::Html(String::new()));
    assert!(blocks.is_empty());
    for value in field.host().changes() {
        assert!(!value.contains_char(ZWSP));
    }
    Ok(())
}

#[test]
fn test_enter_split_restores_field() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("abcd")), split_only())?;
    field.engine_mut().set_caret(2);

    field.handle(Notification::KeyDown(KeyEvent::new(Key::Enter)));

    assert_eq!(field.host().splits(), vec![(text("ab"), text("cd"), vec![])]);
    assert_eq!(field.engine().get_content(), "abcd");
    Ok(())
}

#[test]
fn test_double_enter_splits_multiline_field() -> anyhow::Result<()> {
    let value = Value::Tree(vec![paragraph("one"), paragraph("two")]);
    let props = FieldProps::new("div").with_multiline("p").with_value(value.clone());
    let mut field = field(props, split_only())?;

    field.engine_mut().insert_paragraph()?;
    field.pump();
    assert!(field.host().splits().is_empty());

    field.engine_mut().insert_paragraph()?;
    field.pump();

    assert_eq!(field.host().splits(), vec![(value, Value::Tree(vec![]), vec![])]);
    // The engine's empty lines are gone again
    assert_eq!(field.engine().get_content(), "<p>one</p><p>two</p>");
    Ok(())
}

#[test]
fn test_paste_image_into_empty_field_replaces_it() -> anyhow::Result<()> {
    let capabilities = HostCapabilities {
        split: true,
        replace: true,
        ..HostCapabilities::default()
    };
    let mut field = field(FieldProps::new("p"), capabilities)?;
    let payload = PastePayload::new().with_file(ClipboardFile::new("shot.png", "image/png", vec![0x89, 0x50]));

    let response = field.paste(payload);

    assert!(response.prevent_default);
    // The replace waits for the next tick
    assert!(!field.host().calls.iter().any(|c| matches!(c, HostCall::Replace(_))));
    assert_eq!(field.pending_tasks(), 1);
    assert_eq!(field.run_deferred(), 1);

    let replaced: Vec<Vec<Block>> = field
        .host()
        .calls
        .iter()
        .filter_map(|c| match c {
            HostCall::Replace(blocks) => Some(blocks.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].len(), 1);
    assert_eq!(replaced[0][0].name, "core/image");
    let url = replaced[0][0].attribute("url").unwrap_or_default();
    assert!(url.starts_with("blob:"));
    assert!(field.blobs().get(url).is_some());

    field.unmount();
    assert!(field.blobs().is_empty());
    Ok(())
}

#[test]
fn test_paste_image_into_filled_field_defers_split() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("ab")), split_only())?;
    field.engine_mut().set_caret(1);

    field.paste(PastePayload::new().with_file(ClipboardFile::new("a.gif", "image/gif", vec![])));
    assert!(field.host().splits().is_empty());

    assert_eq!(field.run_deferred(), 1);
    let splits = field.host().splits();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].0, text("a"));
    assert_eq!(splits[0].1, text("b"));
    assert_eq!(splits[0].2[0].name, "core/image");
    Ok(())
}

#[test]
fn test_paste_paragraphs_splits_field() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("xy")), split_only())?;
    field.engine_mut().set_caret(1);

    let payload = PastePayload::new()
        .with_plain_text("A\nB")
        .with_html("<p>A</p><p>B</p>");
    let response = field.paste(payload);

    assert!(response.prevent_default);
    let splits = field.host().splits();
    assert_eq!(splits.len(), 1);
    let (before, after, blocks) = &splits[0];
    assert_eq!(before, &text("x"));
    assert_eq!(after, &text("y"));
    assert_eq!(
        blocks.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
        ["core/paragraph", "core/paragraph"]
    );
    assert_eq!(blocks[0].content(), Some("A"));
    assert_eq!(blocks[1].content(), Some("B"));
    assert_eq!(field.engine().get_content(), "xy");
    Ok(())
}

#[test]
fn test_paste_url_over_selection_creates_link() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("click here")), split_only())?;
    field.engine_mut().select(0, 10);

    let response = field.paste(PastePayload::new().with_plain_text("https://example.org"));

    assert!(response.prevent_default);
    assert_eq!(
        field.engine().get_content(),
        r#"<a href="https://example.org">click here</a>"#
    );
    assert!(field.host().splits().is_empty());
    Ok(())
}

#[test]
fn test_paste_plain_text_inline() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("x")), HostCapabilities::default())?;

    let response = field.paste(PastePayload::new().with_plain_text("hi <b>"));

    assert!(!response.prevent_default);
    assert_eq!(response.content.as_deref(), Some("hi &lt;b&gt;"));
    assert_eq!(field.engine().get_content(), "xhi &lt;b&gt;");
    Ok(())
}

#[test]
fn test_focus_out_strips_sentinel() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("ab")), HostCapabilities::default())?;
    field.engine_mut().set_caret(2);

    // Collapsed bold parks the caret on a sentinel
    field.change_formats(vec![("bold".into(), FormatChange::Toggle(true))]);
    assert!(field.engine().get_content().contains(ZWSP));

    field.handle(Notification::FocusOut);
    assert_eq!(field.engine().get_content(), "ab<strong></strong>");
    Ok(())
}

#[test]
fn test_emitted_values_never_contain_sentinel() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("ab")), HostCapabilities::default())?;
    field.engine_mut().set_caret(2);

    field.change_formats(vec![("bold".into(), FormatChange::Toggle(true))]);
    field.engine_mut().type_text("c")?;
    field.pump();

    let changes = field.host().changes();
    assert!(changes.iter().all(|value| !value.contains_char(ZWSP)));
    assert_eq!(
        changes.last(),
        Some(&Value::Tree(vec![
            Node::text("ab"),
            Node::element("strong").with_child(Node::text("c")),
        ]))
    );
    Ok(())
}

#[test]
fn test_horizontal_navigation_over_sentinel() -> anyhow::Result<()> {
    let props = FieldProps::new("p")
        .with_format(ValueFormat::String)
        .with_value(Value::Html(format!("ab{}", ZWSP)));
    let mut field = field(props, HostCapabilities::default())?;
    field.engine_mut().set_caret(2);

    let right = field.handle(Notification::KeyDown(KeyEvent::new(Key::Right)));
    let left = field.handle(Notification::KeyDown(KeyEvent::new(Key::Left)));

    assert!(right.stop_propagation);
    assert!(!right.prevent_default);
    assert!(!left.stop_propagation);
    Ok(())
}

#[test]
fn test_redo_shortcut_forwarded_to_host() -> anyhow::Result<()> {
    let capabilities = HostCapabilities {
        redo: true,
        ..HostCapabilities::default()
    };
    let mut field = field(FieldProps::new("p"), capabilities)?;

    let redo = field.handle(Notification::KeyDown(KeyEvent::char('z').with_primary().with_shift()));
    // meta+y is no longer bound
    let legacy = field.handle(Notification::KeyDown(KeyEvent::char('y').with_primary()));

    assert!(redo.prevent_default);
    assert!(!legacy.prevent_default);
    field.run_deferred();
    assert_eq!(field.host().calls, vec![HostCall::Redo]);
    Ok(())
}

#[test]
fn test_backspace_key_up_emits() -> anyhow::Result<()> {
    let mut field = field(FieldProps::new("p").with_value(text("a")), HostCapabilities::default())?;

    field.handle(Notification::KeyUp(KeyEvent::new(Key::Backspace)));
    field.handle(Notification::KeyUp(KeyEvent::new(Key::Enter)));

    assert_eq!(field.host().changes(), vec![text("a")]);
    Ok(())
}
