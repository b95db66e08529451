//! Safe-prefix detection.
//!
//! The detector answers one question for the engine: how much of the buffer can be parsed now
//! without the result changing when more text arrives. It scans complete lines once, tracking the
//! few constructs that span lines (fences, HTML blocks, tables, the open paragraph and the list
//! columns around it), then asks the inline scanner about the open paragraph.

use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::block::is_table_body_row;
use crate::html::is_html_block_start;
use crate::inline::unresolved_offset;
use crate::options::Options;
use crate::syntax::{
    atx_heading, blockquote_content, can_interrupt_paragraph, could_start_block, dedent,
    has_unescaped_pipe, indent_width, is_blank, is_code_fence_closing_line, is_thematic_break,
    last_unescaped_pipe, list_marker, parse_code_fence_header, split_table_row,
    table_delimiter_row,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafeBoundary {
    /// `buffer[..offset]` parses the same way no matter what is appended.
    pub offset: usize,
    /// `buffer[..settled]` ends between top-level blocks that can no longer change, so it can be
    /// parsed on its own and reused.
    pub settled: usize,
}

pub fn compute_safe_boundary(buffer: &str, opts: &Options) -> SafeBoundary {
    let mut scan = BoundaryScan::new(opts);
    let mut start = 0usize;
    while let Some(rel) = buffer[start..].find('\n') {
        let end = start + rel;
        scan.complete_line(buffer, start, end);
        start = end + 1;
    }
    let boundary = scan.finish(buffer, start);
    trace!(
        offset = boundary.offset,
        settled = boundary.settled,
        len = buffer.len(),
        "safe boundary"
    );
    boundary
}

#[derive(Debug, Clone, Copy)]
struct OpenFence {
    ch: char,
    len: usize,
    /// Container column the fence lines are dedented by before the closing check.
    indent: usize,
}

#[derive(Debug, Clone)]
struct OpenParagraph {
    /// Offset of the paragraph's first content byte.
    start: usize,
    quote_depth: usize,
    container_col: usize,
    top_level: bool,
    /// First line has a pipe and may turn out to be a table header; `header_cols` cells.
    table_header: Option<usize>,
}

struct BoundaryScan<'o> {
    opts: &'o Options,
    stable: usize,
    settled: usize,
    fence: Option<OpenFence>,
    html_block: bool,
    table_quote_depth: Option<usize>,
    paragraph: Option<OpenParagraph>,
    lists: Vec<usize>,
    quote_depth: usize,
    after_blank: Option<usize>,
}

/// Quote depth, the content after all quote markers and its offset within `line`.
fn strip_quotes(line: &str) -> (usize, &str, usize) {
    let mut depth = 0usize;
    let mut rest = line;
    while let Some(content) = blockquote_content(rest) {
        rest = content;
        depth += 1;
    }
    (depth, rest, line.len() - rest.len())
}

impl<'o> BoundaryScan<'o> {
    fn new(opts: &'o Options) -> Self {
        Self {
            opts,
            stable: 0,
            settled: 0,
            fence: None,
            html_block: false,
            table_quote_depth: None,
            paragraph: None,
            lists: Vec::new(),
            quote_depth: 0,
            after_blank: None,
        }
    }

    fn complete_line(&mut self, buffer: &str, start: usize, end: usize) {
        let line = &buffer[start..end];
        let next = end + 1;

        if let Some(fence) = self.fence {
            let (_, content, _) = strip_quotes(line);
            if is_code_fence_closing_line(dedent(content, fence.indent), fence.ch, fence.len) {
                self.fence = None;
                self.stable = next;
            }
            return;
        }

        if self.html_block {
            if !is_blank(line) {
                self.stable = next;
                return;
            }
            self.html_block = false;
        }

        let (quote_depth, content, quote_off) = strip_quotes(line);
        if is_blank(content) {
            self.paragraph = None;
            self.table_quote_depth = None;
            self.stable = next;
            if quote_depth == 0 {
                self.after_blank = Some(next);
            }
            return;
        }

        let indent = indent_width(content);
        if let Some(blank_end) = self.after_blank.take() {
            if quote_depth == 0 && indent == 0 && list_marker(content).is_none() {
                self.settled = blank_end;
            }
        }
        if quote_depth != self.quote_depth {
            self.lists.clear();
            self.quote_depth = quote_depth;
        }

        // Dedent into the deepest list item this line belongs to, the way the parser sees it.
        let base = self
            .lists
            .iter()
            .rev()
            .find(|&&col| indent >= col)
            .copied()
            .unwrap_or(0);
        let rel = dedent(content, base);
        let rel_off = start + quote_off + (content.len() - rel.len());
        let marker = if is_thematic_break(rel) {
            None
        } else {
            list_marker(rel)
        };

        if let Some(table_depth) = self.table_quote_depth {
            if table_depth == quote_depth && marker.is_none() && is_table_body_row(rel, self.opts) {
                self.stable = next;
                return;
            }
            self.table_quote_depth = None;
        }

        if let Some(paragraph) = &self.paragraph {
            let continues = paragraph.quote_depth == quote_depth
                && match marker {
                    Some(m) => {
                        base + m.indent >= paragraph.container_col && !m.can_interrupt_paragraph()
                    }
                    None => {
                        indent >= paragraph.container_col
                            && !can_interrupt_paragraph(rel, self.opts)
                    }
                };
            if continues {
                let header_cols = paragraph.table_header;
                if let Some(cols) = header_cols {
                    if table_delimiter_row(rel).is_some_and(|a| a.len() == cols) {
                        self.paragraph = None;
                        self.table_quote_depth = Some(quote_depth);
                        self.stable = next;
                        return;
                    }
                }
                if let Some(p) = self.paragraph.as_mut() {
                    p.table_header = None;
                }
                self.stable = next;
                return;
            }
        }
        self.paragraph = None;

        match marker {
            Some(m) => {
                let marker_col = base + m.indent;
                while self.lists.last().is_some_and(|&col| col > marker_col) {
                    self.lists.pop();
                }
                self.lists.push(base + m.content_column);
            }
            None => {
                while self.lists.last().is_some_and(|&col| col > indent) {
                    self.lists.pop();
                }
            }
        }

        let (block_text, block_off, container_col) = match marker {
            Some(m) => (
                &rel[m.content_offset..],
                rel_off + m.content_offset,
                base + m.content_column,
            ),
            None => (rel, rel_off, base),
        };
        let (_, block_text, inner_quote_off) = strip_quotes(block_text);
        let block_off = block_off + inner_quote_off;

        if is_blank(block_text) {
            self.stable = next;
            return;
        }
        if let Some(header) = parse_code_fence_header(block_text) {
            self.fence = Some(OpenFence {
                ch: header.fence_char,
                len: header.fence_len,
                indent: container_col,
            });
            return;
        }
        if is_html_block_start(block_text, self.opts) {
            self.html_block = true;
            self.stable = next;
            return;
        }
        if atx_heading(block_text).is_some() || is_thematic_break(block_text) {
            self.stable = next;
            return;
        }

        let table_header = if self.opts.tables && has_unescaped_pipe(block_text) {
            Some(split_table_row(block_text).len())
        } else {
            None
        };
        let top_level = quote_depth == 0 && marker.is_none() && self.lists.is_empty();
        self.paragraph = Some(OpenParagraph {
            start: block_off,
            quote_depth,
            container_col,
            top_level,
            table_header,
        });
        if table_header.is_none() {
            self.stable = next;
        }
    }

    /// Pulls a cut inside a paragraph line back to the start of that line when the cut-off part
    /// would read as the start of another block (`#`, `---`, `-`, `1.`).
    fn keep_paragraph_kind(&self, buffer: &str, start: usize, offset: usize) -> usize {
        if offset <= start {
            return offset;
        }
        let line_start = buffer[..offset].rfind('\n').map_or(0, |i| i + 1);
        if line_start <= start {
            let first = &buffer[start..offset];
            if could_start_block(first, self.opts) || list_marker(first).is_some() {
                return start;
            }
            return offset;
        }
        if line_start == offset {
            return offset;
        }
        let (_, content, _) = strip_quotes(&buffer[line_start..offset]);
        if could_start_block(content.trim_start(), self.opts) {
            trace!(line_start, offset, "cut would change the paragraph line's block kind");
            line_start
        } else {
            offset
        }
    }

    fn finish(self, buffer: &str, tail_start: usize) -> SafeBoundary {
        let tail = &buffer[tail_start..];
        let mut offset = self.stable;
        let mut tail_included = false;

        if !tail.is_empty() && self.html_block {
            // Held until the HTML block is closed by a blank line.
        } else if let Some(fence) = self.fence {
            let (_, content, _) = strip_quotes(tail);
            if is_code_fence_closing_line(dedent(content, fence.indent), fence.ch, fence.len) {
                offset = buffer.len();
            }
        } else if !is_blank(tail) {
            if let Some(end) = self.table_row_prefix(tail) {
                offset = tail_start + end;
            } else if let Some(start) = self.tail_paragraph_start(tail) {
                let end = tail_start + stable_tail_len(tail);
                if end > start {
                    let text = &buffer[start..end];
                    let cut = unresolved_offset(text, self.opts, true)
                        .into_iter()
                        .chain(trailing_backslash(text))
                        .min();
                    offset = cut.map_or(end, |c| start + c);
                    tail_included = true;
                }
            }
        }

        if !tail_included {
            if let Some(paragraph) = &self.paragraph {
                let text = &buffer[paragraph.start..tail_start];
                let cut = unresolved_offset(text, self.opts, false)
                    .into_iter()
                    .chain(trailing_backslash(text))
                    .min();
                if let Some(c) = cut {
                    offset = offset.min(paragraph.start + c);
                }
            }
        }

        if let Some(paragraph) = &self.paragraph {
            offset = self.keep_paragraph_kind(buffer, paragraph.start, offset);
        }
        if buffer[..offset].trim().is_empty() {
            offset = 0;
        }
        SafeBoundary {
            offset,
            settled: self.settled.min(offset),
        }
    }

    /// Start of the open top-level paragraph an incomplete last line continues. The first line
    /// of a paragraph is never shown incomplete: a later pipe could still make it a table header.
    fn tail_paragraph_start(&self, tail: &str) -> Option<usize> {
        if could_start_block(tail, self.opts) {
            return None;
        }
        self.paragraph
            .as_ref()
            .filter(|p| p.top_level && p.table_header.is_none())
            .map(|p| p.start)
    }

    /// Length of a partial top-level table row up to its last complete cell.
    fn table_row_prefix(&self, tail: &str) -> Option<usize> {
        if self.table_quote_depth != Some(0) || !self.lists.is_empty() {
            return None;
        }
        if !tail.trim_start().starts_with('|') {
            return None;
        }
        let last = last_unescaped_pipe(tail)?;
        let has_cell = tail[..last]
            .chars()
            .any(|c| c != '|' && !c.is_whitespace());
        has_cell.then_some(last + 1)
    }
}

/// Length of the part of an incomplete line that can be shown now. Trailing whitespace and the
/// final grapheme cluster are dropped: a combining mark or joiner may still extend the cluster.
fn stable_tail_len(tail: &str) -> usize {
    tail.trim_end()
        .grapheme_indices(true)
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

/// A backslash ending the last complete line: a hard break if the paragraph goes on, literal
/// text if it ends there.
fn trailing_backslash(text: &str) -> Option<usize> {
    let line = text.strip_suffix('\n')?;
    let run = line.len() - line.trim_end_matches('\\').len();
    (run % 2 == 1).then(|| line.len() - 1)
}
