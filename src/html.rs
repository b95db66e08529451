use std::borrow::Cow;

use crate::options::Options;

/// Allow-listed tags that open an HTML block when they start a line.
const BLOCK_TAGS: &[&str] = &["details", "summary"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlTag {
    Opening { name: String, self_closing: bool },
    Closing { name: String },
}

impl HtmlTag {
    pub fn name(&self) -> &str {
        match self {
            HtmlTag::Opening { name, .. } | HtmlTag::Closing { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagScan {
    /// A complete tag spanning `len` bytes.
    Tag { tag: HtmlTag, len: usize },
    /// The input ended before the tag did.
    Incomplete,
    NotATag,
}

fn is_ascii_tag_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

fn is_attr_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-')
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n')
}

pub fn is_void_html_tag(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Scan one open or closing tag at the start of `s` (which must start with `<`).
pub fn scan_tag(s: &str) -> TagScan {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return TagScan::NotATag;
    }
    let mut i = 1usize;
    if i >= bytes.len() {
        return TagScan::Incomplete;
    }
    let is_closing = bytes[i] == b'/';
    if is_closing {
        i += 1;
        if i >= bytes.len() {
            return TagScan::Incomplete;
        }
    }
    if !bytes[i].is_ascii_alphabetic() {
        return TagScan::NotATag;
    }
    let name_start = i;
    while i < bytes.len() && is_ascii_tag_name_char(bytes[i]) {
        i += 1;
    }
    let name = s[name_start..i].to_ascii_lowercase();

    if is_closing {
        while i < bytes.len() && is_ws(bytes[i]) {
            i += 1;
        }
        return match bytes.get(i) {
            None => TagScan::Incomplete,
            Some(b'>') => TagScan::Tag {
                tag: HtmlTag::Closing { name },
                len: i + 1,
            },
            Some(_) => TagScan::NotATag,
        };
    }

    loop {
        let ws_start = i;
        while i < bytes.len() && is_ws(bytes[i]) {
            i += 1;
        }
        let Some(&b) = bytes.get(i) else {
            return TagScan::Incomplete;
        };
        match b {
            b'>' => {
                let self_closing = is_void_html_tag(&name);
                return TagScan::Tag {
                    tag: HtmlTag::Opening { name, self_closing },
                    len: i + 1,
                };
            }
            b'/' => {
                return match bytes.get(i + 1) {
                    None => TagScan::Incomplete,
                    Some(b'>') => TagScan::Tag {
                        tag: HtmlTag::Opening {
                            name,
                            self_closing: true,
                        },
                        len: i + 2,
                    },
                    Some(_) => TagScan::NotATag,
                };
            }
            b if is_attr_name_start(b) && i > ws_start => {
                while i < bytes.len() && is_attr_name_char(bytes[i]) {
                    i += 1;
                }
                let after_name = i;
                while i < bytes.len() && is_ws(bytes[i]) {
                    i += 1;
                }
                if i >= bytes.len() {
                    return TagScan::Incomplete;
                }
                if bytes[i] != b'=' {
                    i = after_name;
                    continue;
                }
                i += 1;
                while i < bytes.len() && is_ws(bytes[i]) {
                    i += 1;
                }
                let Some(&q) = bytes.get(i) else {
                    return TagScan::Incomplete;
                };
                if q == b'"' || q == b'\'' {
                    match s[i + 1..].find(q as char) {
                        Some(rel) => i += rel + 2,
                        None => return TagScan::Incomplete,
                    }
                } else {
                    let value_start = i;
                    while i < bytes.len()
                        && !is_ws(bytes[i])
                        && !matches!(bytes[i], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
                    {
                        i += 1;
                    }
                    if i >= bytes.len() {
                        return TagScan::Incomplete;
                    }
                    if i == value_start {
                        return TagScan::NotATag;
                    }
                }
            }
            _ => return TagScan::NotATag,
        }
    }
}

/// Leading tag name of `<name` / `</name`, with the byte length consumed.
fn leading_tag_name(s: &str) -> Option<(&str, usize)> {
    let rest = s.strip_prefix('<')?;
    let (rest, skip) = match rest.strip_prefix('/') {
        Some(r) => (r, 2),
        None => (rest, 1),
    };
    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    Some((&rest[..len], skip + len))
}

/// A line that opens an HTML block: an allow-listed block tag after up to 3 spaces.
pub fn is_html_block_start(line: &str, opts: &Options) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let Some((name, consumed)) = leading_tag_name(trimmed) else {
        return false;
    };
    let is_block_tag = BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name));
    if !is_block_tag || !opts.allows_tag(name) {
        return false;
    }
    match trimmed.as_bytes().get(consumed) {
        None => true,
        Some(&b) => is_ws(b) || b == b'>' || b == b'/',
    }
}

/// Whether `s` (starting with `<`) or an extension of it can still become an HTML block start.
pub fn could_start_html_block(s: &str, opts: &Options) -> bool {
    let Some((name, consumed)) = leading_tag_name(s) else {
        return false;
    };
    if consumed == s.len() {
        return BLOCK_TAGS.iter().any(|t| {
            t.len() >= name.len()
                && t[..name.len()].eq_ignore_ascii_case(name)
                && opts.allows_tag(t)
        });
    }
    is_html_block_start(s, opts)
}

/// Escape the `<` of every tag that is not allow-listed, leaving allowed tags verbatim.
pub fn neutralize_disallowed<'a>(html: &'a str, opts: &Options) -> Cow<'a, str> {
    if !html.contains('<') {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len() + 8);
    let mut rest = html;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let at = &rest[lt..];
        match scan_tag(at) {
            TagScan::Tag { tag, len } if opts.allows_tag(tag.name()) => {
                out.push_str(&at[..len]);
                rest = &at[len..];
            }
            _ => {
                out.push_str("&lt;");
                rest = &at[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> Option<(HtmlTag, usize)> {
        match scan_tag(s) {
            TagScan::Tag { tag, len } => Some((tag, len)),
            _ => None,
        }
    }

    #[test]
    fn scans_open_close_and_void_tags() {
        assert_eq!(
            tag("<kbd>Ctrl"),
            Some((
                HtmlTag::Opening {
                    name: "kbd".into(),
                    self_closing: false
                },
                5
            ))
        );
        assert_eq!(
            tag("</KBD >"),
            Some((HtmlTag::Closing { name: "kbd".into() }, 7))
        );
        assert_eq!(
            tag("<br>"),
            Some((
                HtmlTag::Opening {
                    name: "br".into(),
                    self_closing: true
                },
                4
            ))
        );
    }

    #[test]
    fn attribute_values_may_contain_punctuation() {
        let s = "<span style=\"color: #e74c3c\">red</span>";
        let (t, len) = tag(s).unwrap();
        assert_eq!(t.name(), "span");
        assert_eq!(&s[..len], "<span style=\"color: #e74c3c\">");
    }

    #[test]
    fn truncated_tags_are_incomplete() {
        assert_eq!(scan_tag("<"), TagScan::Incomplete);
        assert_eq!(scan_tag("<sp"), TagScan::Incomplete);
        assert_eq!(scan_tag("<span style=\"col"), TagScan::Incomplete);
        assert_eq!(scan_tag("</u"), TagScan::Incomplete);
    }

    #[test]
    fn autolinks_and_comparisons_are_not_tags() {
        assert_eq!(scan_tag("<https://example.com>"), TagScan::NotATag);
        assert_eq!(scan_tag("< 3"), TagScan::NotATag);
        assert_eq!(scan_tag("<a=b>"), TagScan::NotATag);
    }

    #[test]
    fn block_starts_follow_the_allow_list() {
        let opts = Options::default();
        assert!(is_html_block_start("<details>", &opts));
        assert!(is_html_block_start("</details>", &opts));
        assert!(is_html_block_start("<summary>📂 info</summary>", &opts));
        assert!(!is_html_block_start("<div>", &opts));
        assert!(!is_html_block_start("<detailsx>", &opts));

        let mut narrow = Options::default();
        narrow.html_allow_list.retain(|t| t != "details");
        assert!(!is_html_block_start("<details>", &narrow));
    }

    #[test]
    fn disallowed_tags_are_escaped() {
        let opts = Options::default();
        assert_eq!(
            neutralize_disallowed("<details><script>x</script></details>", &opts),
            "<details>&lt;script>x&lt;/script></details>"
        );
    }
}
