use std::ops::Range;

use crate::html;
use crate::inline::parse_inline;
use crate::node::{Node, NodeKind};
use crate::options::Options;
use crate::syntax::{
    CodeFenceHeader, ListMarker, atx_heading, blockquote_content, can_interrupt_paragraph,
    dedent, has_unescaped_pipe, indent_width, is_blank, is_code_fence_closing_line,
    is_thematic_break, list_marker, parse_code_fence_header, split_table_row,
    table_delimiter_row, task_marker,
};

/// Parse `text` into top-level blocks. Never fails: unrecognised lines become paragraph text and
/// an unclosed fence runs to the end of the input.
pub fn parse_blocks(text: &str, opts: &Options) -> Vec<Node> {
    let lines = split_lines(text);
    BlockParser { opts }.parse(&lines, 0)
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

struct BlockParser<'o> {
    opts: &'o Options,
}

impl BlockParser<'_> {
    fn parse(&self, lines: &[&str], quote_depth: usize) -> Vec<Node> {
        self.parse_spans(lines, quote_depth)
            .into_iter()
            .map(|(node, _)| node)
            .collect()
    }

    /// Blocks with the line range each one occupies (trailing blank lines excluded).
    fn parse_spans(&self, lines: &[&str], quote_depth: usize) -> Vec<(Node, Range<usize>)> {
        let mut out = Vec::new();
        let mut i = 0usize;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                i += 1;
                continue;
            }

            let (node, next) = if let Some(header) = parse_code_fence_header(line) {
                self.code_fence(lines, i, header)
            } else if is_thematic_break(line) {
                (Node::leaf(NodeKind::ThematicBreak), i + 1)
            } else if let Some((level, content)) = atx_heading(line) {
                (Node::heading(level, parse_inline(content, self.opts)), i + 1)
            } else if blockquote_content(line).is_some() {
                self.blockquote(lines, i, quote_depth)
            } else if html::is_html_block_start(line, self.opts) {
                self.html_block(lines, i)
            } else if let Some(marker) = list_marker(line) {
                self.list(lines, i, marker, quote_depth)
            } else if let Some(table) = self.table(lines, i) {
                table
            } else {
                self.paragraph(lines, i)
            };

            let mut end = next;
            while end > i + 1 && is_blank(lines[end - 1]) {
                end -= 1;
            }
            out.push((node, i..end));
            i = next;
        }
        out
    }

    fn code_fence(&self, lines: &[&str], start: usize, header: CodeFenceHeader<'_>) -> (Node, usize) {
        let mut body = Vec::new();
        let mut i = start + 1;
        while i < lines.len() {
            let line = lines[i];
            i += 1;
            if is_code_fence_closing_line(line, header.fence_char, header.fence_len) {
                break;
            }
            body.push(dedent(line, header.indent));
        }
        let node = Node::code_fence(header.language.unwrap_or_default(), body.join("\n"));
        (node, i)
    }

    fn blockquote(&self, lines: &[&str], start: usize, quote_depth: usize) -> (Node, usize) {
        let mut inner = Vec::new();
        let mut i = start;
        while i < lines.len() {
            let Some(content) = blockquote_content(lines[i]) else {
                break;
            };
            inner.push(content);
            i += 1;
        }
        let depth = quote_depth + 1;
        let node = Node::new(NodeKind::BlockQuote { depth }, self.parse(&inner, depth));
        (node, i)
    }

    fn html_block(&self, lines: &[&str], start: usize) -> (Node, usize) {
        let mut i = start;
        while i < lines.len() && !is_blank(lines[i]) {
            i += 1;
        }
        let literal = lines[start..i].join("\n");
        (Node::leaf(NodeKind::HtmlBlock { literal }), i)
    }

    fn list(
        &self,
        lines: &[&str],
        start: usize,
        first: ListMarker,
        quote_depth: usize,
    ) -> (Node, usize) {
        let mut items = Vec::new();
        let mut loose = false;
        let mut marker = first;
        let mut i = start;

        loop {
            let mut content = &lines[i][marker.content_offset..];
            let mut checked = None;
            if self.opts.task_lists {
                if let Some((state, rest)) = task_marker(content) {
                    checked = Some(state);
                    content = rest;
                }
            }

            let mut item_lines = vec![content];
            i += 1;
            while i < lines.len() {
                let line = lines[i];
                if is_blank(line) {
                    item_lines.push("");
                } else if indent_width(line) >= marker.content_column {
                    item_lines.push(dedent(line, marker.content_column));
                } else {
                    break;
                }
                i += 1;
            }
            let mut trailing_blank = false;
            while item_lines.len() > 1 && item_lines.last().is_some_and(|l| is_blank(l)) {
                item_lines.pop();
                trailing_blank = true;
            }

            let children = self.parse_spans(&item_lines, quote_depth);
            if children.windows(2).any(|w| w[1].1.start > w[0].1.end) {
                loose = true;
            }
            items.push(Node::new(
                NodeKind::ListItem { checked },
                children.into_iter().map(|(node, _)| node).collect(),
            ));

            let sibling = lines
                .get(i)
                .filter(|l| !is_thematic_break(l))
                .and_then(|l| list_marker(l))
                .filter(|m| m.same_list(&first));
            match sibling {
                Some(next) => {
                    if trailing_blank {
                        loose = true;
                    }
                    marker = next;
                }
                None => break,
            }
        }

        let node = Node::new(
            NodeKind::List {
                ordered: first.ordered,
                start: first.start,
                tight: !loose,
            },
            items,
        );
        (node, i)
    }

    fn table(&self, lines: &[&str], start: usize) -> Option<(Node, usize)> {
        if !self.opts.tables {
            return None;
        }
        let header = lines[start];
        if !has_unescaped_pipe(header) {
            return None;
        }
        let alignments = table_delimiter_row(lines.get(start + 1)?)?;
        let head_cells = split_table_row(header);
        if head_cells.len() != alignments.len() {
            return None;
        }

        let columns = alignments.len();
        let mut rows = vec![self.table_row(&head_cells, columns, true)];
        let mut i = start + 2;
        while i < lines.len() {
            let line = lines[i];
            if !is_table_body_row(line, self.opts) {
                break;
            }
            rows.push(self.table_row(&split_table_row(line), columns, false));
            i += 1;
        }
        Some((Node::new(NodeKind::Table { alignments }, rows), i))
    }

    fn table_row(&self, cells: &[&str], columns: usize, header: bool) -> Node {
        let children = (0..columns)
            .map(|c| {
                let inlines = cells
                    .get(c)
                    .map(|cell| parse_inline(cell, self.opts))
                    .unwrap_or_default();
                Node::new(NodeKind::TableCell, inlines)
            })
            .collect();
        Node::new(NodeKind::TableRow { header }, children)
    }

    fn paragraph(&self, lines: &[&str], start: usize) -> (Node, usize) {
        let mut i = start + 1;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) || can_interrupt_paragraph(line, self.opts) {
                break;
            }
            i += 1;
        }
        let joined = lines[start..i]
            .iter()
            .map(|l| l.trim_start())
            .collect::<Vec<_>>()
            .join("\n");
        let node = Node::paragraph(parse_inline(joined.trim_end(), self.opts));
        (node, i)
    }
}

/// A line that continues an open table.
pub(crate) fn is_table_body_row(line: &str, opts: &Options) -> bool {
    !is_blank(line) && has_unescaped_pipe(line) && !can_interrupt_paragraph(line, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclosed_fence_runs_to_end_of_input() {
        let blocks = parse_blocks("```rs\nfn main() {}\n", &Options::default());
        assert_eq!(blocks, vec![Node::code_fence("rs", "fn main() {}")]);
    }

    #[test]
    fn split_lines_drops_the_trailing_empty_line() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert!(split_lines("").is_empty());
    }
}
