//! Inline spans inside leaf blocks.
//!
//! Emphasis-like delimiters and link brackets are resolved with the usual delimiter/bracket
//! stacks. The same scanner also reports the earliest construct that is still open at the end of
//! the input, which is what the boundary detector needs to know.

use crate::html::{self, HtmlTag, TagScan};
use crate::node::{Node, NodeKind};
use crate::options::Options;

pub fn parse_inline(text: &str, opts: &Options) -> Vec<Node> {
    let mut parser = InlineParser::new(text, opts);
    parser.run();
    parser.finish()
}

/// Byte offset of the earliest inline construct in `text` that may still change meaning when
/// more text is appended.
///
/// With `partial`, `text` ends mid-line: the trailing run of characters that can still combine
/// with the next chunk (delimiters, brackets, backslash, whitespace) and a trailing word that may
/// grow into a bare URL are treated as unresolved too.
pub fn unresolved_offset(text: &str, opts: &Options, partial: bool) -> Option<usize> {
    let end = if partial {
        // Only the incomplete last line is trimmed; earlier lines already ended.
        let line_start = text.rfind('\n').map_or(0, |i| i + 1);
        line_start
            + text[line_start..]
                .trim_end_matches(|c: char| {
                    c.is_whitespace()
                        || matches!(c, '*' | '_' | '~' | '^' | '`' | '\\' | '!' | '[' | ']' | '<')
                })
                .len()
    } else {
        text.len()
    };

    let scanned = &text[..end];
    let mut parser = InlineParser::new(scanned, opts);
    parser.run();
    parser.finish();
    let mut cut = parser.unresolved;

    if partial {
        if opts.autolinks {
            if let Some(start) = trailing_url_prefix(scanned) {
                cut = Some(cut.map_or(start, |c| c.min(start)));
            }
        }
        if end < text.len() {
            cut = Some(cut.map_or(end, |c| c.min(end)));
        }
    }
    cut
}

/// Start of a trailing word that is, or may still grow into, an `http://` or `https://` URL.
fn trailing_url_prefix(text: &str) -> Option<usize> {
    let word_start = text
        .rfind(char::is_whitespace)
        .map_or(0, |i| i + text[i..].chars().next().map_or(1, char::len_utf8));
    let word = &text[word_start..];
    let trimmed = word.trim_start_matches(['*', '_', '~', '(']);
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    let is_url = ["http://", "https://"].iter().any(|scheme| {
        if lower.len() < scheme.len() {
            scheme.starts_with(&lower)
        } else {
            lower.starts_with(scheme)
        }
    });
    is_url.then_some(text.len() - trimmed.len())
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

fn is_special(b: u8) -> bool {
    matches!(
        b,
        b'\\' | b'`' | b'*' | b'_' | b'~' | b'^' | b'!' | b'[' | b']' | b'<' | b'\n' | b'h' | b'H'
    )
}

/// Replace backslash escapes of ASCII punctuation with the character itself.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone)]
struct Delim {
    /// Index into `nodes` of the text node that holds the run.
    node: usize,
    ch: u8,
    count: usize,
    orig: usize,
    can_open: bool,
    can_close: bool,
    offset: usize,
}

#[derive(Debug, Clone)]
struct Bracket {
    node: usize,
    image: bool,
    offset: usize,
    delim_bottom: usize,
    active: bool,
}

#[derive(Debug)]
enum LinkTail {
    Link {
        dest: String,
        title: Option<String>,
        len: usize,
    },
    Incomplete,
    NotALink,
}

#[derive(Debug)]
enum AutolinkScan {
    Link(usize),
    Incomplete,
    NotALink,
}

struct InlineParser<'a> {
    text: &'a str,
    opts: &'a Options,
    pos: usize,
    nodes: Vec<Node>,
    plain: String,
    delims: Vec<Delim>,
    brackets: Vec<Bracket>,
    open_tags: Vec<(String, usize)>,
    unresolved: Option<usize>,
}

impl<'a> InlineParser<'a> {
    fn new(text: &'a str, opts: &'a Options) -> Self {
        Self {
            text,
            opts,
            pos: 0,
            nodes: Vec::new(),
            plain: String::new(),
            delims: Vec::new(),
            brackets: Vec::new(),
            open_tags: Vec::new(),
            unresolved: None,
        }
    }

    fn run(&mut self) {
        let text = self.text;
        let bytes = text.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\\' => self.backslash(),
                b'`' => self.code_span(),
                b @ (b'*' | b'_') => self.delimiter_run(b),
                b'~' if self.opts.strikethrough || self.opts.sub_sup => self.delimiter_run(b'~'),
                b'^' if self.opts.sub_sup => self.delimiter_run(b'^'),
                b'!' if bytes.get(self.pos + 1) == Some(&b'[') => self.open_bracket(true),
                b'[' => self.open_bracket(false),
                b']' => self.close_bracket(),
                b'<' => self.angle(),
                b'\n' => self.line_break(),
                b'h' | b'H' if self.opts.autolinks && self.at_url_word_start() => {
                    if !self.bare_url() {
                        self.push_literal(1);
                    }
                }
                b if is_special(b) => self.push_literal(1),
                _ => self.push_plain_run(),
            }
        }
    }

    fn finish(&mut self) -> Vec<Node> {
        self.flush_text();
        self.process_emphasis(0, true);
        let pending: Vec<usize> = self
            .brackets
            .iter()
            .filter(|b| b.active)
            .map(|b| b.offset)
            .chain(self.open_tags.iter().map(|(_, offset)| *offset))
            .collect();
        for offset in pending {
            self.mark_unresolved(offset);
        }
        let mut nodes = std::mem::take(&mut self.nodes);
        merge_text(&mut nodes);
        nodes
    }

    fn mark_unresolved(&mut self, offset: usize) {
        self.unresolved = Some(self.unresolved.map_or(offset, |u| u.min(offset)));
    }

    fn flush_text(&mut self) {
        if !self.plain.is_empty() {
            let text = std::mem::take(&mut self.plain);
            self.nodes.push(Node::text(text));
        }
    }

    fn push_node(&mut self, node: Node) {
        self.flush_text();
        self.nodes.push(node);
    }

    fn push_literal(&mut self, len: usize) {
        self.plain.push_str(&self.text[self.pos..self.pos + len]);
        self.pos += len;
    }

    fn push_plain_run(&mut self) {
        let bytes = self.text.as_bytes();
        let mut end = self.pos + 1;
        while end < bytes.len() && !is_special(bytes[end]) {
            end += 1;
        }
        self.plain.push_str(&self.text[self.pos..end]);
        self.pos = end;
    }

    fn prev_char(&self, at: usize) -> Option<char> {
        self.text[..at].chars().next_back()
    }

    fn backslash(&mut self) {
        match self.text.as_bytes().get(self.pos + 1).copied() {
            Some(b'\n') => {
                self.trim_trailing_spaces();
                self.push_node(Node::leaf(NodeKind::HardBreak));
                self.pos += 2;
                self.skip_line_indent();
            }
            Some(b) if b.is_ascii_punctuation() => {
                self.plain.push(b as char);
                self.pos += 2;
            }
            Some(_) => self.push_literal(1),
            None => {
                self.mark_unresolved(self.pos);
                self.push_literal(1);
            }
        }
    }

    fn code_span(&mut self) {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        let run = bytes[start..].iter().take_while(|&&b| b == b'`').count();
        let content_start = start + run;

        let mut i = content_start;
        while i < bytes.len() {
            if bytes[i] != b'`' {
                i += 1;
                continue;
            }
            let close_run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if close_run == run {
                let raw = self.text[content_start..i].replace('\n', " ");
                let content = if raw.len() >= 2
                    && raw.starts_with(' ')
                    && raw.ends_with(' ')
                    && !raw.bytes().all(|b| b == b' ')
                {
                    raw[1..raw.len() - 1].to_string()
                } else {
                    raw
                };
                self.push_node(Node::leaf(NodeKind::CodeSpan(content)));
                self.pos = i + close_run;
                return;
            }
            i += close_run;
        }

        self.mark_unresolved(start);
        self.push_literal(run);
    }

    fn delimiter_run(&mut self, ch: u8) {
        let start = self.pos;
        let run = self.text.as_bytes()[start..]
            .iter()
            .take_while(|&&b| b == ch)
            .count();
        let literal = match ch {
            b'~' => match run {
                1 => !self.opts.sub_sup,
                2 => !self.opts.strikethrough,
                _ => true,
            },
            b'^' => run != 1,
            _ => false,
        };
        if literal {
            self.push_literal(run);
            return;
        }
        self.pos += run;

        let prev = self.prev_char(start);
        let next = self.text[self.pos..].chars().next();
        let prev_ws = prev.is_none_or(char::is_whitespace);
        let next_ws = next.is_none_or(char::is_whitespace);
        let prev_punct = prev.is_some_and(is_punctuation);
        let next_punct = next.is_some_and(is_punctuation);
        let left = !next_ws && (!next_punct || prev_ws || prev_punct);
        let right = !prev_ws && (!prev_punct || next_ws || next_punct);
        let (can_open, can_close) = if ch == b'_' {
            (left && (!right || prev_punct), right && (!left || next_punct))
        } else {
            (left, right)
        };

        self.push_node(Node::text(&self.text[start..self.pos]));
        self.delims.push(Delim {
            node: self.nodes.len() - 1,
            ch,
            count: run,
            orig: run,
            can_open,
            can_close,
            offset: start,
        });
    }

    fn process_emphasis(&mut self, bottom: usize, record_unresolved: bool) {
        let mut closer = bottom;
        while closer < self.delims.len() {
            let c = self.delims[closer].clone();
            if !c.can_close || c.count == 0 {
                closer += 1;
                continue;
            }

            let mut opener = None;
            let mut o = closer;
            while o > bottom {
                o -= 1;
                let d = &self.delims[o];
                if d.ch != c.ch || !d.can_open || d.count == 0 {
                    continue;
                }
                if matches!(c.ch, b'*' | b'_')
                    && (c.can_open || d.can_close)
                    && (d.orig + c.orig) % 3 == 0
                    && !(d.orig % 3 == 0 && c.orig % 3 == 0)
                {
                    continue;
                }
                if c.ch == b'~' && d.count != c.count {
                    continue;
                }
                opener = Some(o);
                break;
            }
            let Some(o) = opener else {
                closer += 1;
                continue;
            };

            let on = self.delims[o].node;
            let cn = c.node;
            if cn <= on + 1 {
                closer += 1;
                continue;
            }
            let used = match c.ch {
                b'*' | b'_' if c.count >= 2 && self.delims[o].count >= 2 => 2,
                b'~' => c.count,
                _ => 1,
            };
            let kind = match (c.ch, used) {
                (b'~', 1) => NodeKind::Sub,
                (b'~', _) => NodeKind::Strikethrough,
                (b'^', _) => NodeKind::Sup,
                (_, 1) => NodeKind::Emphasis,
                _ => NodeKind::Strong,
            };
            if matches!(kind, NodeKind::Sub | NodeKind::Sup)
                && self.nodes[on + 1..cn].iter().any(contains_whitespace)
            {
                closer += 1;
                continue;
            }

            let inner: Vec<Node> = self.nodes.drain(on + 1..cn).collect();
            self.nodes.insert(on + 1, Node::new(kind, inner));
            let shift = cn - (on + 2);
            for d in &mut self.delims[closer..] {
                d.node -= shift;
            }
            let cn = on + 2;

            if let NodeKind::Text(s) = &mut self.nodes[on].kind {
                s.truncate(s.len() - used);
            }
            if let NodeKind::Text(s) = &mut self.nodes[cn].kind {
                s.drain(..used);
            }
            self.delims[o].count -= used;
            self.delims[closer].count -= used;

            self.delims.drain(o + 1..closer);
            closer = o + 1;
            if self.delims[o].count == 0 {
                self.delims.remove(o);
                closer -= 1;
            }
            if self.delims[closer].count == 0 {
                self.delims.remove(closer);
            }
        }

        if record_unresolved {
            let open: Vec<usize> = self.delims[bottom..]
                .iter()
                .filter(|d| d.can_open && d.count > 0)
                .map(|d| d.offset)
                .collect();
            for offset in open {
                self.mark_unresolved(offset);
            }
        }
        self.delims.truncate(bottom);
    }

    fn open_bracket(&mut self, image: bool) {
        let len = if image { 2 } else { 1 };
        let offset = self.pos;
        self.push_node(Node::text(&self.text[offset..offset + len]));
        self.brackets.push(Bracket {
            node: self.nodes.len() - 1,
            image,
            offset,
            delim_bottom: self.delims.len(),
            active: true,
        });
        self.pos += len;
    }

    fn close_bracket(&mut self) {
        let Some(bracket) = self.brackets.pop() else {
            self.push_literal(1);
            return;
        };
        if !bracket.active {
            self.push_literal(1);
            return;
        }

        match link_tail(&self.text[self.pos + 1..]) {
            LinkTail::Link { dest, title, len } => {
                self.flush_text();
                self.pos += 1 + len;
                self.process_emphasis(bracket.delim_bottom, false);
                let children: Vec<Node> = self.nodes.drain(bracket.node + 1..).collect();
                self.nodes.pop();
                let node = if bracket.image {
                    let mut alt = String::new();
                    for child in &children {
                        alt.push_str(&child.plain_text());
                    }
                    Node::leaf(NodeKind::Image {
                        src: dest,
                        title,
                        alt,
                    })
                } else {
                    for b in &mut self.brackets {
                        if !b.image {
                            b.active = false;
                        }
                    }
                    Node::new(NodeKind::Link { href: dest, title }, children)
                };
                self.nodes.push(node);
            }
            LinkTail::Incomplete => {
                self.mark_unresolved(bracket.offset);
                self.push_literal(1);
            }
            LinkTail::NotALink => self.push_literal(1),
        }
    }

    fn angle(&mut self) {
        let text = self.text;
        let rest = &text[self.pos..];
        let autolink = uri_autolink(rest);
        if let AutolinkScan::Link(len) = autolink {
            let url = &rest[1..len - 1];
            self.push_node(Node::new(
                NodeKind::Link {
                    href: url.to_string(),
                    title: None,
                },
                vec![Node::text(url)],
            ));
            self.pos += len;
            return;
        }

        match html::scan_tag(rest) {
            TagScan::Tag { tag, len } if self.opts.allows_tag(tag.name()) => {
                match &tag {
                    HtmlTag::Opening {
                        name,
                        self_closing: false,
                    } => self.open_tags.push((name.clone(), self.pos)),
                    HtmlTag::Closing { name } => {
                        if let Some(i) = self.open_tags.iter().rposition(|(n, _)| n == name) {
                            self.open_tags.truncate(i);
                        }
                    }
                    HtmlTag::Opening { .. } => {}
                }
                self.push_node(Node::leaf(NodeKind::HtmlInline(rest[..len].to_string())));
                self.pos += len;
            }
            TagScan::Incomplete => {
                self.mark_unresolved(self.pos);
                self.push_literal(1);
            }
            _ => {
                if matches!(autolink, AutolinkScan::Incomplete) {
                    self.mark_unresolved(self.pos);
                }
                self.push_literal(1);
            }
        }
    }

    fn trim_trailing_spaces(&mut self) -> usize {
        let trimmed = self.plain.trim_end_matches(' ').len();
        let removed = self.plain.len() - trimmed;
        self.plain.truncate(trimmed);
        removed
    }

    fn skip_line_indent(&mut self) {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
            self.pos += 1;
        }
    }

    fn line_break(&mut self) {
        let spaces = self.trim_trailing_spaces();
        let kind = if spaces >= 2 {
            NodeKind::HardBreak
        } else {
            NodeKind::SoftBreak
        };
        self.push_node(Node::leaf(kind));
        self.pos += 1;
        self.skip_line_indent();
    }

    fn at_url_word_start(&self) -> bool {
        match self.prev_char(self.pos) {
            None => true,
            Some(c) => c.is_whitespace() || matches!(c, '*' | '_' | '~' | '('),
        }
    }

    fn bare_url(&mut self) -> bool {
        let text = self.text;
        let rest = &text[self.pos..];
        let lower: String = rest.chars().take(8).collect::<String>().to_ascii_lowercase();
        let scheme_len = if lower.starts_with("https://") {
            8
        } else if lower.starts_with("http://") {
            7
        } else {
            return false;
        };

        let mut end = rest
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(rest.len());
        let reaches_end = end == rest.len();
        loop {
            let url = &rest[..end];
            let Some(last) = url.chars().next_back() else {
                break;
            };
            let trim = match last {
                '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | '\'' | '"' | ';' => true,
                ')' => url.matches(')').count() > url.matches('(').count(),
                _ => false,
            };
            if !trim {
                break;
            }
            end -= last.len_utf8();
        }
        if end <= scheme_len {
            return false;
        }

        if reaches_end {
            self.mark_unresolved(self.pos);
        }
        let url = &rest[..end];
        self.push_node(Node::new(
            NodeKind::Link {
                href: url.to_string(),
                title: None,
            },
            vec![Node::text(url)],
        ));
        self.pos += end;
        true
    }
}

fn contains_whitespace(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Text(s) | NodeKind::CodeSpan(s) => s.chars().any(char::is_whitespace),
        NodeKind::SoftBreak | NodeKind::HardBreak => true,
        _ => node.children.iter().any(contains_whitespace),
    }
}

/// Drop empty text nodes and merge adjacent ones, recursively.
fn merge_text(nodes: &mut Vec<Node>) {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        merge_text(&mut node.children);
        if let NodeKind::Text(s) = &node.kind {
            if s.is_empty() {
                continue;
            }
            if let Some(Node {
                kind: NodeKind::Text(prev),
                ..
            }) = out.last_mut()
            {
                prev.push_str(s);
                continue;
            }
        }
        out.push(node);
    }
    *nodes = out;
}

fn skip_ws_with_one_newline(bytes: &[u8], mut i: usize) -> usize {
    let mut newlines = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'\n' if newlines == 0 => {
                newlines += 1;
                i += 1;
            }
            _ => break,
        }
    }
    i
}

/// `(destination "title")` right after a closing bracket.
fn link_tail(s: &str) -> LinkTail {
    let bytes = s.as_bytes();
    let Some(&first) = bytes.first() else {
        return LinkTail::Incomplete;
    };
    if first != b'(' {
        return LinkTail::NotALink;
    }
    let mut i = skip_ws_with_one_newline(bytes, 1);
    if i >= bytes.len() {
        return LinkTail::Incomplete;
    }

    let dest;
    if bytes[i] == b'<' {
        let start = i + 1;
        let mut j = start;
        loop {
            match bytes.get(j) {
                None => return LinkTail::Incomplete,
                Some(b'>') => break,
                Some(b'\n' | b'<') => return LinkTail::NotALink,
                Some(b'\\') => j += 2,
                Some(_) => j += 1,
            }
        }
        dest = &s[start..j];
        i = j + 1;
    } else {
        let start = i;
        let mut depth = 0usize;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b'\\' && bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) {
                i += 2;
                continue;
            }
            if b.is_ascii_whitespace() || b.is_ascii_control() {
                break;
            }
            if b == b'(' {
                depth += 1;
            } else if b == b')' {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            i += 1;
        }
        if i >= bytes.len() {
            return LinkTail::Incomplete;
        }
        dest = &s[start..i];
    }

    let before_title = i;
    i = skip_ws_with_one_newline(bytes, i);
    if i >= bytes.len() {
        return LinkTail::Incomplete;
    }

    let mut title = None;
    if i > before_title && matches!(bytes[i], b'"' | b'\'' | b'(') {
        let close = if bytes[i] == b'(' { b')' } else { bytes[i] };
        let start = i + 1;
        let mut j = start;
        loop {
            match bytes.get(j) {
                None => return LinkTail::Incomplete,
                Some(b'\\') => j += 2,
                Some(&b) if b == close => break,
                Some(_) => j += 1,
            }
        }
        title = Some(unescape(&s[start..j.min(bytes.len())]));
        i = skip_ws_with_one_newline(bytes, j + 1);
        if i >= bytes.len() {
            return LinkTail::Incomplete;
        }
    }

    if bytes[i] != b')' {
        return LinkTail::NotALink;
    }
    LinkTail::Link {
        dest: unescape(dest),
        title,
        len: i + 1,
    }
}

/// `<scheme:...>` with a 2-32 character scheme.
fn uri_autolink(s: &str) -> AutolinkScan {
    let bytes = s.as_bytes();
    let mut i = 1usize;
    if i >= bytes.len() {
        return AutolinkScan::Incomplete;
    }
    if !bytes[i].is_ascii_alphabetic() {
        return AutolinkScan::NotALink;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'+' | b'.' | b'-')) {
        i += 1;
    }
    if i >= bytes.len() {
        return AutolinkScan::Incomplete;
    }
    let scheme_len = i - 1;
    if bytes[i] != b':' || !(2..=32).contains(&scheme_len) {
        return AutolinkScan::NotALink;
    }
    i += 1;
    while i < bytes.len() {
        match bytes[i] {
            b'>' => return AutolinkScan::Link(i + 1),
            b'<' => return AutolinkScan::NotALink,
            b if b.is_ascii_whitespace() || b.is_ascii_control() => return AutolinkScan::NotALink,
            _ => i += 1,
        }
    }
    AutolinkScan::Incomplete
}
