use pulldown_cmark::{
    Alignment as PulldownAlignment, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag,
    TagEnd,
};

use crate::error::PatchError;
use crate::node::{Alignment, Node, NodeKind};
use crate::state::Document;
use crate::types::Update;

/// Keeps a [`Document`] in sync with the engine and exposes it as pulldown-cmark events, so a
/// host can reuse `pulldown_cmark::html` or its own event-driven renderer.
#[derive(Debug, Default)]
pub struct PulldownAdapter {
    document: Document,
}

impl PulldownAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.document.clear();
    }

    pub fn apply_update(&mut self, update: &Update) -> Result<(), PatchError> {
        self.document.apply(update)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn events(&self) -> Vec<Event<'static>> {
        to_events(self.document.nodes())
    }

    pub fn html(&self) -> String {
        let mut out = String::new();
        push_html(&mut out, self.document.nodes());
        out
    }
}

pub fn to_events(nodes: &[Node]) -> Vec<Event<'static>> {
    let mut out = Vec::new();
    for node in nodes {
        push_node(node, false, &mut out);
    }
    out
}

/// Render `nodes` with pulldown-cmark's HTML writer.
pub fn push_html(out: &mut String, nodes: &[Node]) {
    pulldown_cmark::html::push_html(out, to_events(nodes).into_iter());
}

fn owned(s: &str) -> CowStr<'static> {
    CowStr::from(s.to_string())
}

fn heading_level(level: u8) -> HeadingLevel {
    match level {
        1 => HeadingLevel::H1,
        2 => HeadingLevel::H2,
        3 => HeadingLevel::H3,
        4 => HeadingLevel::H4,
        5 => HeadingLevel::H5,
        _ => HeadingLevel::H6,
    }
}

fn alignment(a: Alignment) -> PulldownAlignment {
    match a {
        Alignment::None => PulldownAlignment::None,
        Alignment::Left => PulldownAlignment::Left,
        Alignment::Center => PulldownAlignment::Center,
        Alignment::Right => PulldownAlignment::Right,
    }
}

fn push_children(node: &Node, tight: bool, out: &mut Vec<Event<'static>>) {
    for child in &node.children {
        push_node(child, tight, out);
    }
}

fn wrap(node: &Node, start: Tag<'static>, end: TagEnd, out: &mut Vec<Event<'static>>) {
    out.push(Event::Start(start));
    push_children(node, false, out);
    out.push(Event::End(end));
}

fn push_node(node: &Node, tight: bool, out: &mut Vec<Event<'static>>) {
    match &node.kind {
        NodeKind::Heading { level } => {
            let level = heading_level(*level);
            let start = Tag::Heading {
                level,
                id: None,
                classes: Vec::new(),
                attrs: Vec::new(),
            };
            wrap(node, start, TagEnd::Heading(level), out);
        }
        NodeKind::Paragraph if tight => push_children(node, false, out),
        NodeKind::Paragraph => wrap(node, Tag::Paragraph, TagEnd::Paragraph, out),
        NodeKind::List {
            ordered,
            start,
            tight,
        } => {
            out.push(Event::Start(Tag::List(ordered.then_some(*start))));
            for item in &node.children {
                push_node(item, *tight, out);
            }
            out.push(Event::End(TagEnd::List(*ordered)));
        }
        NodeKind::ListItem { checked } => {
            out.push(Event::Start(Tag::Item));
            if let Some(checked) = checked {
                out.push(Event::TaskListMarker(*checked));
            }
            push_children(node, tight, out);
            out.push(Event::End(TagEnd::Item));
        }
        NodeKind::BlockQuote { .. } => {
            out.push(Event::Start(Tag::BlockQuote(None)));
            push_children(node, false, out);
            out.push(Event::End(TagEnd::BlockQuote(None)));
        }
        NodeKind::CodeFence { lang, literal } => {
            out.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(owned(lang)))));
            if !literal.is_empty() {
                out.push(Event::Text(CowStr::from(format!("{literal}\n"))));
            }
            out.push(Event::End(TagEnd::CodeBlock));
        }
        NodeKind::Table { alignments } => {
            let alignments = alignments.iter().copied().map(alignment).collect();
            out.push(Event::Start(Tag::Table(alignments)));
            for row in &node.children {
                push_node(row, false, out);
            }
            out.push(Event::End(TagEnd::Table));
        }
        // The head row holds its cells directly, the way pulldown-cmark emits it.
        NodeKind::TableRow { header: true } => {
            wrap(node, Tag::TableHead, TagEnd::TableHead, out)
        }
        NodeKind::TableRow { header: false } => {
            wrap(node, Tag::TableRow, TagEnd::TableRow, out)
        }
        NodeKind::TableCell => wrap(node, Tag::TableCell, TagEnd::TableCell, out),
        NodeKind::ThematicBreak => out.push(Event::Rule),
        NodeKind::HtmlBlock { literal } => {
            out.push(Event::Start(Tag::HtmlBlock));
            out.push(Event::Html(CowStr::from(format!("{literal}\n"))));
            out.push(Event::End(TagEnd::HtmlBlock));
        }
        NodeKind::Text(text) => out.push(Event::Text(owned(text))),
        NodeKind::Emphasis => wrap(node, Tag::Emphasis, TagEnd::Emphasis, out),
        NodeKind::Strong => wrap(node, Tag::Strong, TagEnd::Strong, out),
        NodeKind::Strikethrough => wrap(node, Tag::Strikethrough, TagEnd::Strikethrough, out),
        NodeKind::Sub | NodeKind::Sup => {
            let tag = if node.kind == NodeKind::Sub { "sub" } else { "sup" };
            out.push(Event::InlineHtml(CowStr::from(format!("<{tag}>"))));
            push_children(node, false, out);
            out.push(Event::InlineHtml(CowStr::from(format!("</{tag}>"))));
        }
        NodeKind::CodeSpan(code) => out.push(Event::Code(owned(code))),
        NodeKind::Link { href, title } => {
            let start = Tag::Link {
                link_type: LinkType::Inline,
                dest_url: owned(href),
                title: owned(title.as_deref().unwrap_or_default()),
                id: CowStr::Borrowed(""),
            };
            wrap(node, start, TagEnd::Link, out);
        }
        NodeKind::Image { src, title, alt } => {
            out.push(Event::Start(Tag::Image {
                link_type: LinkType::Inline,
                dest_url: owned(src),
                title: owned(title.as_deref().unwrap_or_default()),
                id: CowStr::Borrowed(""),
            }));
            if !alt.is_empty() {
                out.push(Event::Text(owned(alt)));
            }
            out.push(Event::End(TagEnd::Image));
        }
        NodeKind::HtmlInline(html) => out.push(Event::InlineHtml(owned(html))),
        NodeKind::SoftBreak => out.push(Event::SoftBreak),
        NodeKind::HardBreak => out.push(Event::HardBreak),
    }
}
