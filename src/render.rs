//! Reference HTML renderer.
//!
//! Hosts usually bring their own renderer and drive it from patches; this one exists for hosts
//! that only need HTML and for checking trees in tests.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::html::neutralize_disallowed;
use crate::node::{Alignment, Node, NodeKind};
use crate::options::Options;

/// Syntax highlighting for fenced code.
pub trait Highlighter {
    /// HTML for the body of `<code>`, or `None` to fall back to escaped text. The returned markup
    /// is trusted as-is.
    fn highlight(&self, language: &str, code: &str) -> Option<String>;
}

#[derive(Default)]
pub struct HtmlRenderer {
    opts: Options,
    highlighter: Option<Box<dyn Highlighter + Send + Sync>>,
}

impl std::fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("opts", &self.opts)
            .field("highlighter", &self.highlighter.is_some())
            .finish()
    }
}

impl HtmlRenderer {
    pub fn new(opts: Options) -> Self {
        Self {
            opts,
            highlighter: None,
        }
    }

    pub fn with_highlighter<H>(mut self, highlighter: H) -> Self
    where
        H: Highlighter + Send + Sync + 'static,
    {
        self.highlighter = Some(Box::new(highlighter));
        self
    }

    pub fn render(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            self.block(node, false, &mut out);
        }
        out
    }

    fn blocks(&self, nodes: &[Node], tight: bool, out: &mut String) {
        for node in nodes {
            self.block(node, tight, out);
        }
    }

    fn block(&self, node: &Node, tight: bool, out: &mut String) {
        match &node.kind {
            NodeKind::Heading { level } => {
                let _ = write!(out, "<h{level}>");
                self.inlines(&node.children, out);
                let _ = writeln!(out, "</h{level}>");
            }
            NodeKind::Paragraph if tight => self.inlines(&node.children, out),
            NodeKind::Paragraph => {
                out.push_str("<p>");
                self.inlines(&node.children, out);
                out.push_str("</p>\n");
            }
            NodeKind::List {
                ordered,
                start,
                tight,
            } => {
                let tag = if *ordered { "ol" } else { "ul" };
                if *ordered && *start != 1 {
                    let _ = writeln!(out, "<ol start=\"{start}\">");
                } else {
                    let _ = writeln!(out, "<{tag}>");
                }
                for item in &node.children {
                    self.list_item(item, *tight, out);
                }
                let _ = writeln!(out, "</{tag}>");
            }
            NodeKind::ListItem { .. } => self.list_item(node, tight, out),
            NodeKind::BlockQuote { .. } => {
                out.push_str("<blockquote>\n");
                self.blocks(&node.children, false, out);
                out.push_str("</blockquote>\n");
            }
            NodeKind::CodeFence { lang, literal } => self.code_fence(lang, literal, out),
            NodeKind::Table { alignments } => self.table(node, alignments, out),
            NodeKind::ThematicBreak => out.push_str("<hr />\n"),
            NodeKind::HtmlBlock { literal } => {
                out.push_str(&neutralize_disallowed(literal, &self.opts));
                out.push('\n');
            }
            _ => self.inline(node, out),
        }
    }

    fn list_item(&self, item: &Node, tight: bool, out: &mut String) {
        out.push_str("<li>");
        if let NodeKind::ListItem {
            checked: Some(checked),
        } = item.kind
        {
            out.push_str("<input type=\"checkbox\" disabled=\"\"");
            if checked {
                out.push_str(" checked=\"\"");
            }
            out.push_str(" /> ");
        }
        let starts_with_block = item
            .children
            .first()
            .is_some_and(|c| !(tight && c.kind == NodeKind::Paragraph));
        if starts_with_block {
            out.push('\n');
        }
        self.blocks(&item.children, tight, out);
        out.push_str("</li>\n");
    }

    fn code_fence(&self, lang: &str, literal: &str, out: &mut String) {
        out.push_str("<pre><code");
        if !lang.is_empty() {
            let _ = write!(
                out,
                " class=\"language-{}\"",
                encode_double_quoted_attribute(lang)
            );
        }
        out.push('>');
        let highlighted = self
            .highlighter
            .as_ref()
            .and_then(|h| h.highlight(lang, literal));
        match highlighted {
            Some(html) => out.push_str(&html),
            None => {
                out.push_str(&encode_text(literal));
                if !literal.is_empty() {
                    out.push('\n');
                }
            }
        }
        out.push_str("</code></pre>\n");
    }

    fn table(&self, table: &Node, alignments: &[Alignment], out: &mut String) {
        out.push_str("<table>\n");
        let (head, body) = table
            .children
            .split_first()
            .map_or((None, &[][..]), |(h, b)| (Some(h), b));
        if let Some(head) = head {
            out.push_str("<thead>\n");
            self.table_row(head, "th", alignments, out);
            out.push_str("</thead>\n");
        }
        if !body.is_empty() {
            out.push_str("<tbody>\n");
            for row in body {
                self.table_row(row, "td", alignments, out);
            }
            out.push_str("</tbody>\n");
        }
        out.push_str("</table>\n");
    }

    fn table_row(&self, row: &Node, tag: &str, alignments: &[Alignment], out: &mut String) {
        out.push_str("<tr>\n");
        for (i, cell) in row.children.iter().enumerate() {
            let align = match alignments.get(i).copied().unwrap_or_default() {
                Alignment::None => "",
                Alignment::Left => " style=\"text-align: left\"",
                Alignment::Center => " style=\"text-align: center\"",
                Alignment::Right => " style=\"text-align: right\"",
            };
            let _ = write!(out, "<{tag}{align}>");
            self.inlines(&cell.children, out);
            let _ = writeln!(out, "</{tag}>");
        }
        out.push_str("</tr>\n");
    }

    fn inlines(&self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            self.inline(node, out);
        }
    }

    fn wrap(&self, tag: &str, node: &Node, out: &mut String) {
        let _ = write!(out, "<{tag}>");
        self.inlines(&node.children, out);
        let _ = write!(out, "</{tag}>");
    }

    fn inline(&self, node: &Node, out: &mut String) {
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&encode_text(text)),
            NodeKind::Emphasis => self.wrap("em", node, out),
            NodeKind::Strong => self.wrap("strong", node, out),
            NodeKind::Strikethrough => self.wrap("del", node, out),
            NodeKind::Sub => self.wrap("sub", node, out),
            NodeKind::Sup => self.wrap("sup", node, out),
            NodeKind::CodeSpan(code) => {
                let _ = write!(out, "<code>{}</code>", encode_text(code));
            }
            NodeKind::Link { href, title } => {
                let _ = write!(out, "<a href=\"{}\"", encode_double_quoted_attribute(href));
                if let Some(title) = title {
                    let _ = write!(out, " title=\"{}\"", encode_double_quoted_attribute(title));
                }
                out.push('>');
                self.inlines(&node.children, out);
                out.push_str("</a>");
            }
            NodeKind::Image { src, title, alt } => {
                let _ = write!(
                    out,
                    "<img src=\"{}\" alt=\"{}\"",
                    encode_double_quoted_attribute(src),
                    encode_double_quoted_attribute(alt)
                );
                if let Some(title) = title {
                    let _ = write!(out, " title=\"{}\"", encode_double_quoted_attribute(title));
                }
                out.push_str(" />");
            }
            NodeKind::HtmlInline(html) => out.push_str(&neutralize_disallowed(html, &self.opts)),
            NodeKind::SoftBreak => out.push('\n'),
            NodeKind::HardBreak => out.push_str("<br />\n"),
            _ => self.block(node, false, out),
        }
    }
}

/// Render with default options and no highlighter.
pub fn render_html(nodes: &[Node]) -> String {
    HtmlRenderer::default().render(nodes)
}
