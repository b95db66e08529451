#![cfg(feature = "pulldown")]

use pretty_assertions::assert_eq;
use pulldown_cmark::{Event, Tag, TagEnd};
use stream2md::MarkdownStream;
use stream2md::adapters::pulldown::{PulldownAdapter, to_events};

#[test]
fn adapter_tracks_the_stream_through_patches() {
    let mut stream = MarkdownStream::default();
    let mut adapter = PulldownAdapter::new();

    for chunk in ["# Ti", "tle\n\nHello **wor", "ld**\n\n- [x] done\n"] {
        let update = stream.append(chunk);
        adapter.apply_update(&update).unwrap();
        assert_eq!(adapter.document().nodes(), stream.tree());
    }
    let update = stream.finalize();
    adapter.apply_update(&update).unwrap();

    let events = adapter.events();
    assert!(events.iter().any(|e| matches!(e, Event::Start(Tag::Strong))));
    assert!(events.contains(&Event::TaskListMarker(true)));
    let html = adapter.html();
    assert!(html.starts_with("<h1>Title</h1>\n<p>Hello <strong>world</strong></p>\n"), "{html}");
    assert!(html.contains("checkbox"), "{html}");
}

#[test]
fn fenced_code_becomes_a_code_block() {
    let mut stream = MarkdownStream::default();
    stream.append("```rust\nlet x = 1;\n```\n");
    let events = to_events(stream.tree());
    assert_eq!(
        events,
        vec![
            Event::Start(Tag::CodeBlock(pulldown_cmark::CodeBlockKind::Fenced(
                "rust".into()
            ))),
            Event::Text("let x = 1;\n".into()),
            Event::End(TagEnd::CodeBlock),
        ]
    );
}

#[test]
fn reset_update_clears_the_adapter() {
    let mut stream = MarkdownStream::default();
    let mut adapter = PulldownAdapter::new();
    adapter.apply_update(&stream.append("```\ncode\n```")).unwrap();
    assert!(!adapter.document().is_empty());

    let update = stream.append("x");
    assert!(update.reset);
    adapter.apply_update(&update).unwrap();
    assert!(adapter.document().is_empty());
}
