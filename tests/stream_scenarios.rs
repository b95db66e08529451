mod support;

use pretty_assertions::assert_eq;
use stream2md::{Key, MarkdownStream, Node, NodeKind, Options, PatchOp, StreamError, render_html};

fn insert(index: usize, node: Node) -> PatchOp {
    PatchOp::Insert {
        parent: Key::root(),
        index,
        node,
    }
}

#[test]
fn heading_is_emitted_once_its_line_ends() {
    let mut s = MarkdownStream::default();

    let update = s.append("# Hel");
    assert!(update.patches.is_empty());
    assert_eq!(update.boundary, 0);

    let update = s.append("lo\n\nWorld");
    assert_eq!(update.boundary, "# Hello\n\n".len());
    assert_eq!(
        update.patches,
        vec![insert(0, Node::heading(1, vec![Node::text("Hello")]))]
    );

    let update = s.finalize();
    assert_eq!(update.boundary, s.buffer().len());
    assert_eq!(
        update.patches,
        vec![insert(1, Node::paragraph(vec![Node::text("World")]))]
    );
}

#[test]
fn fence_appears_in_one_insert_when_closed() {
    let mut s = MarkdownStream::default();

    let update = s.append("```rust\nfn main() {}");
    assert!(update.patches.is_empty());
    assert_eq!(update.boundary, 0);

    let update = s.append("\n```");
    assert_eq!(update.boundary, s.buffer().len());
    assert_eq!(
        update.patches,
        vec![insert(0, Node::code_fence("rust", "fn main() {}"))]
    );

    assert!(s.finalize().is_empty());
}

#[test]
fn strong_split_across_chunks_is_held_until_finalize() {
    let mut s = MarkdownStream::default();
    assert_eq!(s.append("**bo").boundary, 0);
    assert_eq!(s.append("ld**").boundary, 0);
    assert!(s.tree().is_empty());

    let update = s.finalize();
    assert_eq!(
        update.patches,
        vec![insert(
            0,
            Node::paragraph(vec![Node::new(NodeKind::Strong, vec![Node::text("bold")])])
        )]
    );
}

#[test]
fn open_strong_in_a_continuation_line_cuts_the_boundary() {
    let mut s = MarkdownStream::default();
    let update = s.append("Intro\n**bo");
    assert_eq!(update.boundary, "Intro\n".len());
    assert_eq!(s.tree(), [Node::paragraph(vec![Node::text("Intro")])]);

    let update = s.append("ld** xy");
    assert_eq!(update.boundary, s.buffer().len() - 1);
    assert_eq!(
        s.tree(),
        [Node::paragraph(vec![
            Node::text("Intro"),
            Node::leaf(NodeKind::SoftBreak),
            Node::new(NodeKind::Strong, vec![Node::text("bold")]),
            Node::text(" x"),
        ])]
    );
}

#[test]
fn growing_the_last_word_is_a_single_text_update() {
    let mut s = MarkdownStream::default();
    s.append("Hello\n");
    s.append("wor");
    let update = s.append("ld");
    assert_eq!(
        update.patches,
        vec![PatchOp::UpdateText {
            key: Key::from(vec![0, 2]),
            text: "worl".to_string(),
        }]
    );
}

#[test]
fn finalize_is_idempotent() {
    let mut s = MarkdownStream::default();
    s.append("Some *text");
    let first = s.finalize();
    assert!(!first.patches.is_empty());
    let tree = s.tree().to_vec();

    let second = s.finalize();
    assert!(second.is_empty());
    assert_eq!(second.boundary, first.boundary);
    assert_eq!(s.tree(), tree.as_slice());
}

#[test]
fn append_after_finalize_is_ignored() {
    let mut s = MarkdownStream::default();
    s.append("done\n");
    s.finalize();

    let update = s.append("more");
    assert!(update.is_empty());
    assert_eq!(s.buffer(), "done\n");
    assert_eq!(s.try_append("more"), Err(StreamError::Finalized));
}

#[test]
fn reset_starts_a_new_document() {
    let mut s = MarkdownStream::default();
    s.append("# Old\n");
    s.finalize();

    s.reset();
    assert!(!s.is_finalized());
    assert!(s.tree().is_empty());
    assert_eq!(s.safe_boundary(), 0);

    let update = s.append("# New\n");
    assert_eq!(
        update.patches,
        vec![insert(0, Node::heading(1, vec![Node::text("New")]))]
    );
}

#[test]
fn crlf_is_normalized_across_chunk_edges() {
    let mut s = MarkdownStream::default();
    s.append("# A\r");
    s.append("\nb\r\n\r\n");
    assert!(!s.buffer().contains('\r'));
    assert_eq!(s.buffer(), "# A\nb\n\n");
    assert_eq!(
        s.tree(),
        [
            Node::heading(1, vec![Node::text("A")]),
            Node::paragraph(vec![Node::text("b")]),
        ]
    );
}

#[test]
fn withdrawn_eager_fence_close_rebuilds() {
    let mut s = MarkdownStream::default();
    s.append("```\ncode\n");
    let update = s.append("```");
    assert_eq!(update.boundary, s.buffer().len());
    assert_eq!(s.tree(), [Node::code_fence("", "code")]);

    let update = s.append("x");
    assert!(update.reset);
    assert!(update.patches.is_empty());
    assert_eq!(update.boundary, 0);
    assert!(s.tree().is_empty());

    let update = s.append("\n```\n");
    assert!(!update.reset);
    assert_eq!(
        update.patches,
        vec![insert(0, Node::code_fence("", "code\n```x"))]
    );
}

#[test]
fn try_append_reports_a_regression_without_touching_the_tree() {
    let mut s = MarkdownStream::default();
    s.append("```\ncode\n```");
    let before = s.tree().to_vec();

    assert_eq!(
        s.try_append("x"),
        Err(StreamError::BoundaryRegression {
            previous: "```\ncode\n```".len(),
            current: 0,
        })
    );
    assert_eq!(s.tree(), before.as_slice());

    let update = s.rebuild();
    assert!(update.reset);
    assert!(s.tree().is_empty());
}

#[test]
fn partial_markup_never_reaches_the_renderer() {
    let doc = "Intro line\n\
               Some **bold** and *em* and `code` and ~~gone~~ here.\n\
               Next [link](http://x.y/z) and more.\n";
    let mut s = MarkdownStream::default();
    for c in doc.chars() {
        s.append(&c.to_string());
        let html = render_html(s.tree());
        for marker in ['*', '`', '~', '['] {
            assert!(!html.contains(marker), "{marker:?} leaked into {html}");
        }
        support::assert_balanced_html(&html);
    }
    s.finalize();
    assert_eq!(s.tree(), support::parse_whole(doc, s.options()).as_slice());
}

#[test]
fn urls_and_combining_marks_stream_without_regressions() {
    let opts = Options::default();
    for doc in [
        "See the docs\nat http://example.com/page now\n",
        "Intro line\nhttps://example.com\n",
        "Intro\ncafe\u{301} au lait\n",
        "!~\na\u{200d}b\n",
    ] {
        let replay = support::replay(support::chunk_chars(doc), opts.clone());
        assert_eq!(replay.final_tree, support::parse_whole(doc, &opts), "{doc:?}");
    }
}

#[test]
fn scheme_is_held_until_the_url_ends() {
    let mut s = MarkdownStream::default();
    s.append("Intro line\n");
    assert_eq!(s.append("https://e").boundary, "Intro line\n".len());
    assert_eq!(s.tree(), [Node::paragraph(vec![Node::text("Intro line")])]);
}

#[test]
fn decomposed_letter_is_never_split() {
    let mut s = MarkdownStream::default();
    s.append("Intro\ncafe");
    assert_eq!(s.safe_boundary(), "Intro\ncaf".len());
    let update = s.try_append("\u{301}").unwrap();
    assert_eq!(update.boundary, "Intro\ncaf".len());
}

#[test]
fn cut_paragraph_lines_never_change_block_kind() {
    for doc in ["#<u>#   <u>\n\n", "> >---^> <# \n\n", "Intro\n#x y\n"] {
        let replay = support::replay(support::chunk_chars(doc), Options::default());
        let replaced = replay
            .updates
            .iter()
            .flat_map(|u| &u.patches)
            .any(|p| matches!(p, PatchOp::Replace { .. }));
        assert!(!replaced, "{doc:?}: {:#?}", replay.updates);
    }
}

#[test]
fn loosening_a_list_replaces_it_whole() {
    let mut s = MarkdownStream::default();
    s.append("- a\n");
    assert!(matches!(s.tree()[0].kind, NodeKind::List { tight: true, .. }));

    let update = s.append("\n- b\n");
    assert!(!update.reset);
    let [PatchOp::Replace { key, node }] = update.patches.as_slice() else {
        panic!("expected one replace: {:#?}", update.patches);
    };
    assert_eq!(*key, Key::from(vec![0]));
    assert!(matches!(node.kind, NodeKind::List { tight: false, .. }));
    assert_eq!(node.children.len(), 2);
}
