#![allow(dead_code)]

use stream2md::{Document, MarkdownStream, Node, Options, Update, parse_blocks, render_html};

pub const SAMPLE: &str = include_str!("../fixtures/sample.md");

/// Everything observed while streaming one chunking of a document.
#[derive(Debug)]
pub struct Replay {
    pub updates: Vec<Update>,
    /// Safe boundary after every append, then after finalize.
    pub boundaries: Vec<usize>,
    /// Reference HTML of the tree after every append.
    pub renders: Vec<String>,
    pub final_tree: Vec<Node>,
    pub document: Document,
}

/// Stream `chunks` through a fresh engine with `try_append`, checking at every step that the
/// boundary never moves backwards, that the emitted tree is the parse of the safe prefix, and that
/// replaying the patches on a `Document` reproduces it.
pub fn replay(chunks: impl IntoIterator<Item = String>, opts: Options) -> Replay {
    let mut stream = MarkdownStream::new(opts.clone());
    let mut document = Document::new();
    let mut updates = Vec::new();
    let mut boundaries = Vec::new();
    let mut renders = Vec::new();
    let mut last = 0usize;

    for chunk in chunks {
        let update = stream
            .try_append(&chunk)
            .unwrap_or_else(|e| panic!("append {chunk:?} failed: {e}"));
        assert!(!update.reset, "unexpected reset after {chunk:?}");
        assert!(
            update.boundary >= last,
            "boundary moved back from {last} to {} after {chunk:?}",
            update.boundary
        );
        last = update.boundary;
        check_step(&stream, &mut document, &update, &opts);
        boundaries.push(update.boundary);
        renders.push(render_html(stream.tree()));
        updates.push(update);
    }

    let update = stream.finalize();
    assert_eq!(update.boundary, stream.buffer().len());
    check_step(&stream, &mut document, &update, &opts);
    boundaries.push(update.boundary);
    updates.push(update);

    Replay {
        updates,
        boundaries,
        renders,
        final_tree: stream.tree().to_vec(),
        document,
    }
}

fn check_step(stream: &MarkdownStream, document: &mut Document, update: &Update, opts: &Options) {
    document
        .apply(update)
        .unwrap_or_else(|e| panic!("patches do not apply: {e}\n{update:#?}"));
    assert_eq!(document.nodes(), stream.tree());
    let prefix = &stream.buffer()[..stream.safe_boundary()];
    assert_eq!(stream.tree(), parse_blocks(prefix, opts).as_slice());
}

/// Tree of the whole text parsed in one go.
pub fn parse_whole(text: &str, opts: &Options) -> Vec<Node> {
    parse_blocks(text, opts)
}

/// Tags the reference renderer emits on its own (raw allow-listed HTML is left out).
const RENDERER_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "code",
    "table", "thead", "tbody", "tr", "th", "td", "em", "strong", "del", "a",
];

/// Panics unless every renderer-owned tag in `html` is closed in order.
pub fn assert_balanced_html(html: &str) {
    let mut stack: Vec<String> = Vec::new();
    let mut rest = html;
    while let Some(lt) = rest.find('<') {
        rest = &rest[lt + 1..];
        let closing = rest.starts_with('/');
        let name: String = rest
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if !RENDERER_TAGS.contains(&name.as_str()) {
            continue;
        }
        if closing {
            assert_eq!(stack.pop().as_deref(), Some(name.as_str()), "in {html}");
        } else {
            stack.push(name);
        }
    }
    assert!(stack.is_empty(), "unclosed {stack:?} in {html}");
}

pub fn chunk_whole(text: &str) -> Vec<String> {
    vec![text.to_string()]
}

pub fn chunk_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(|s| s.to_string()).collect()
}

pub fn chunk_chars(text: &str) -> Vec<String> {
    text.chars().map(|c| c.to_string()).collect()
}

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in s.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

/// Deterministic chunking into pieces of 1..=max_bytes bytes, split on char boundaries.
pub fn chunk_pseudo_random(text: &str, seed_label: &str, trial: u64, max_bytes: usize) -> Vec<String> {
    assert!(max_bytes > 0);
    let mut state = fnv1a64(seed_label) ^ trial.wrapping_mul(0x9e3779b97f4a7c15);
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let want = (xorshift64(&mut state) as usize % max_bytes) + 1;
        let mut end = (start + want).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(text[start..end].to_string());
        start = end;
    }
    out
}
