use crate::html;
use crate::node::Alignment;
use crate::options::Options;

fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Leading whitespace as `(columns, bytes)`; a tab advances to the next multiple of 4.
pub fn leading_whitespace(line: &str) -> (usize, usize) {
    let mut cols = 0usize;
    let mut bytes = 0usize;
    for b in line.bytes() {
        match b {
            b' ' => cols += 1,
            b'\t' => cols += 4 - cols % 4,
            _ => break,
        }
        bytes += 1;
    }
    (cols, bytes)
}

pub fn indent_width(line: &str) -> usize {
    leading_whitespace(line).0
}

/// Remove up to `cols` columns of leading whitespace. A tab that straddles the limit is removed.
pub fn dedent(line: &str, cols: usize) -> &str {
    let mut seen = 0usize;
    let mut cut = 0usize;
    for b in line.bytes() {
        if seen >= cols {
            break;
        }
        match b {
            b' ' => seen += 1,
            b'\t' => seen += 4 - seen % 4,
            _ => break,
        }
        cut += 1;
    }
    &line[cut..]
}

fn strip_up_to_three_spaces(line: &str) -> Option<&str> {
    let (cols, bytes) = leading_whitespace(line);
    if cols > 3 {
        return None;
    }
    Some(&line[bytes..])
}

/// ATX heading: level and content with the optional closing `#` sequence removed.
pub fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let s = strip_up_to_three_spaces(line)?;
    let level = s.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &s[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let content = rest.trim();
    let without_closing = content.trim_end_matches('#');
    let content = if without_closing.is_empty() {
        ""
    } else if without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        content
    };
    Some((level as u8, content))
}

pub fn thematic_break_char(line: &str) -> Option<char> {
    // - up to 3 leading spaces
    // - one of '-', '*', '_' repeated >= 3
    // - spaces/tabs may appear between markers
    let s = strip_up_to_three_spaces(line)?;
    let s = s.trim_end_matches([' ', '\t']);
    let mut it = s.chars();
    let first = it.next()?;
    if first != '-' && first != '*' && first != '_' {
        return None;
    }
    let mut count = 1usize;
    for c in it {
        if c == first {
            count += 1;
            continue;
        }
        if c == ' ' || c == '\t' {
            continue;
        }
        return None;
    }
    if count >= 3 { Some(first) } else { None }
}

pub fn is_thematic_break(line: &str) -> bool {
    thematic_break_char(line).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFenceHeader<'a> {
    /// Columns of indentation before the fence; stripped from content lines.
    pub indent: usize,
    pub fence_char: char,
    pub fence_len: usize,
    /// Entire info string (trimmed), excluding fence markers.
    pub info: &'a str,
    /// First token of `info`. `None` means "no language".
    pub language: Option<&'a str>,
}

pub fn parse_code_fence_header(line: &str) -> Option<CodeFenceHeader<'_>> {
    let (indent, ws) = leading_whitespace(line);
    if indent > 3 {
        return None;
    }
    let s = &line[ws..];
    let bytes = s.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    let fence_char = bytes[0] as char;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }
    let mut fence_len = 0usize;
    while fence_len < bytes.len() && bytes[fence_len] == bytes[0] {
        fence_len += 1;
    }
    if fence_len < 3 {
        return None;
    }

    let info = s[fence_len..].trim();
    // A backtick fence's info string may not contain backticks (it would be a code span).
    if fence_char == '`' && info.contains('`') {
        return None;
    }
    let language = info.split_whitespace().next();

    Some(CodeFenceHeader {
        indent,
        fence_char,
        fence_len,
        info,
        language,
    })
}

pub fn is_code_fence_closing_line(line: &str, fence_char: char, fence_len: usize) -> bool {
    let Some(s) = strip_up_to_three_spaces(line) else {
        return false;
    };
    let trimmed = s.trim_end();
    let mut count = 0usize;
    for ch in trimmed.chars() {
        if ch != fence_char {
            return false;
        }
        count += 1;
    }
    count >= fence_len
}

/// Content after a blockquote marker (`>` after up to 3 spaces, plus one optional space).
pub fn blockquote_content(line: &str) -> Option<&str> {
    let s = strip_up_to_three_spaces(line)?;
    let rest = s.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub ordered: bool,
    pub start: u64,
    /// `-`, `+`, `*` for bullets; `.` or `)` for ordered markers.
    pub delimiter: u8,
    /// Columns before the marker.
    pub indent: usize,
    /// Byte offset of the item content within the line.
    pub content_offset: usize,
    /// Column continuation lines must reach to belong to the item.
    pub content_column: usize,
    /// Nothing but whitespace after the marker.
    pub empty: bool,
}

impl ListMarker {
    pub fn same_list(&self, other: &ListMarker) -> bool {
        self.ordered == other.ordered && self.delimiter == other.delimiter
    }

    /// Whether this item may start while a paragraph is open.
    pub fn can_interrupt_paragraph(&self) -> bool {
        !self.empty && (!self.ordered || self.start == 1)
    }
}

pub fn list_marker(line: &str) -> Option<ListMarker> {
    let (indent, ws) = leading_whitespace(line);
    if indent > 3 {
        return None;
    }
    let bytes = line.as_bytes();
    let mut i = ws;
    let (ordered, start, delimiter) = match *bytes.get(i)? {
        b @ (b'-' | b'+' | b'*') => {
            i += 1;
            (false, 0, b)
        }
        b'0'..=b'9' => {
            let digits = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - digits > 9 {
                return None;
            }
            let d = *bytes.get(i)?;
            if d != b'.' && d != b')' {
                return None;
            }
            let start = line[digits..i].parse().ok()?;
            i += 1;
            (true, start, d)
        }
        _ => return None,
    };

    let marker_end = i;
    let marker_cols = indent + (marker_end - ws);
    let mut spaces = 0usize;
    let mut j = marker_end;
    while j < bytes.len() && is_space_or_tab(bytes[j]) {
        spaces += if bytes[j] == b'\t' { 4 - (marker_cols + spaces) % 4 } else { 1 };
        j += 1;
    }
    if j == marker_end && j < bytes.len() {
        return None;
    }

    let empty = j == bytes.len();
    let (content_offset, content_column) = if empty {
        (bytes.len(), marker_cols + 1)
    } else if spaces > 4 {
        // Only one space belongs to the marker; the rest is indentation of the content.
        (marker_end + 1, marker_cols + 1)
    } else {
        (j, marker_cols + spaces)
    };

    Some(ListMarker {
        ordered,
        start,
        delimiter,
        indent,
        content_offset,
        content_column,
        empty,
    })
}

/// `[ ]` / `[x]` at the start of list item content: checked state and the remaining content.
pub fn task_marker(content: &str) -> Option<(bool, &str)> {
    let bytes = content.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'[' || bytes[2] != b']' {
        return None;
    }
    let checked = match bytes[1] {
        b' ' => false,
        b'x' | b'X' => true,
        _ => return None,
    };
    let rest = &content[3..];
    if rest.is_empty() {
        return Some((checked, rest));
    }
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((checked, rest.trim_start()))
}

/// Split a table row into trimmed cells on unescaped pipes; outer pipes are optional.
pub fn split_table_row(line: &str) -> Vec<&str> {
    let s = line.trim();
    let s = s.strip_prefix('|').unwrap_or(s);
    let s = match s.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => s,
    };
    let bytes = s.as_bytes();
    let mut cells = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'|' => {
                cells.push(s[start..i].trim());
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cells.push(s[start.min(s.len())..].trim());
    cells
}

pub fn has_unescaped_pipe(line: &str) -> bool {
    last_unescaped_pipe(line).is_some()
}

pub fn last_unescaped_pipe(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut last = None;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'|' => {
                last = Some(i);
                i += 1;
            }
            _ => i += 1,
        }
    }
    last
}

pub fn table_delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    if !has_unescaped_pipe(line) && !line.trim().starts_with(':') {
        return None;
    }
    let cells = split_table_row(line);
    let mut alignments = Vec::with_capacity(cells.len());
    for cell in cells {
        let left = cell.starts_with(':');
        let right = cell.len() > 1 && cell.ends_with(':');
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
            return None;
        }
        alignments.push(match (left, right) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        });
    }
    Some(alignments)
}

/// A complete line that ends an open paragraph by starting another block.
pub fn can_interrupt_paragraph(line: &str, opts: &Options) -> bool {
    atx_heading(line).is_some()
        || is_thematic_break(line)
        || parse_code_fence_header(line).is_some()
        || blockquote_content(line).is_some()
        || html::is_html_block_start(line, opts)
        || list_marker(line).is_some_and(|m| m.can_interrupt_paragraph())
}

/// Whether `partial` (an incomplete last line) or any extension of it could end an open
/// paragraph by starting another block.
pub fn could_start_block(partial: &str, opts: &Options) -> bool {
    let (cols, ws) = leading_whitespace(partial);
    if cols > 3 {
        return false;
    }
    let s = &partial[ws..];
    let Some(&first) = s.as_bytes().first() else {
        return true;
    };
    match first {
        b'#' => {
            let run = s.bytes().take_while(|&b| b == b'#').count();
            run <= 6 && (run == s.len() || is_space_or_tab(s.as_bytes()[run]))
        }
        b'`' | b'~' => {
            let run = s.bytes().take_while(|&b| b == first).count();
            run == s.len() || run >= 3
        }
        b'>' => true,
        b'-' | b'*' | b'_' | b'+' => {
            if s.bytes().all(|b| b == first || is_space_or_tab(b)) {
                return true;
            }
            first != b'_' && s.len() > 1 && is_space_or_tab(s.as_bytes()[1])
        }
        b'0'..=b'9' => {
            let digits = s.bytes().take_while(u8::is_ascii_digit).count();
            let number = s[..digits].trim_start_matches('0');
            let is_one = number.is_empty() || number == "1";
            if digits == s.len() {
                return digits <= 9 && is_one;
            }
            let d = s.as_bytes()[digits];
            if d != b'.' && d != b')' {
                return false;
            }
            let rest = &s[digits + 1..];
            digits <= 9 && is_one && (rest.is_empty() || rest.starts_with([' ', '\t']))
        }
        b'<' => html::could_start_html_block(s, opts),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("# Title", Some((1, "Title")))]
    #[case("###### six ###", Some((6, "six")))]
    #[case("## a#", Some((2, "a#")))]
    #[case("#", Some((1, "")))]
    #[case("####### seven", None)]
    #[case("#hashtag", None)]
    #[case("    # indented", None)]
    fn atx_headings(#[case] line: &str, #[case] expected: Option<(u8, &str)>) {
        assert_eq!(atx_heading(line), expected);
    }

    #[rstest]
    #[case("- item", false, 0, 2)]
    #[case("  * item", false, 0, 4)]
    #[case("1. one", true, 1, 3)]
    #[case("12) twelve", true, 12, 4)]
    fn list_markers(
        #[case] line: &str,
        #[case] ordered: bool,
        #[case] start: u64,
        #[case] column: usize,
    ) {
        let m = list_marker(line).unwrap();
        assert_eq!(m.ordered, ordered);
        assert_eq!(m.start, start);
        assert_eq!(m.content_column, column);
        assert!(!m.empty);
    }

    #[test]
    fn list_marker_requires_space() {
        assert!(list_marker("-item").is_none());
        assert!(list_marker("1.5 apples").is_none());
        assert!(list_marker("-").unwrap().empty);
    }

    #[test]
    fn task_markers() {
        assert_eq!(task_marker("[x] done"), Some((true, "done")));
        assert_eq!(task_marker("[ ] todo"), Some((false, "todo")));
        assert_eq!(task_marker("[y] nope"), None);
        assert_eq!(task_marker("[x]nope"), None);
    }

    #[test]
    fn delimiter_rows_carry_alignment() {
        assert_eq!(
            table_delimiter_row("|:---|:---:|---:|---|"),
            Some(vec![
                Alignment::Left,
                Alignment::Center,
                Alignment::Right,
                Alignment::None
            ])
        );
        assert_eq!(table_delimiter_row("---"), None);
        assert_eq!(table_delimiter_row("| a |"), None);
    }

    #[test]
    fn table_rows_split_on_unescaped_pipes() {
        assert_eq!(split_table_row("| a | b \\| c |"), vec!["a", "b \\| c"]);
        assert_eq!(split_table_row("a|b"), vec!["a", "b"]);
    }

    #[rstest]
    #[case("", true)]
    #[case("#", true)]
    #[case("## ", true)]
    #[case("#x", false)]
    #[case("``", true)]
    #[case("`a", false)]
    #[case("- ", true)]
    #[case("-x", false)]
    #[case("* * ", true)]
    #[case("1", true)]
    #[case("2", false)]
    #[case("1.", true)]
    #[case("2.", false)]
    #[case("1.5", false)]
    #[case("<det", true)]
    #[case("<div", false)]
    #[case("hello", false)]
    fn block_start_prefixes(#[case] partial: &str, #[case] expected: bool) {
        assert_eq!(could_start_block(partial, &Options::default()), expected);
    }
}
