/// Raw HTML tags that are passed through verbatim. Everything else is kept as literal text.
pub const DEFAULT_HTML_ALLOW_LIST: &[&str] = &[
    "u", "mark", "sub", "sup", "kbd", "span", "details", "summary", "br",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Rewrite CRLF and lone CR to LF while ingesting (a trailing CR is held until the next chunk).
    pub normalize_newlines: bool,
    /// Pipe tables (header row + delimiter row).
    pub tables: bool,
    /// `[ ]` / `[x]` markers at the start of list items.
    pub task_lists: bool,
    /// `~~text~~`.
    pub strikethrough: bool,
    /// `~sub~` and `^sup^`.
    pub sub_sup: bool,
    /// Bare `http://` / `https://` URLs become links.
    pub autolinks: bool,
    /// Lowercase tag names allowed as raw HTML.
    pub html_allow_list: Vec<String>,
}

impl Options {
    pub fn allows_tag(&self, name: &str) -> bool {
        self.html_allow_list
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            normalize_newlines: true,
            tables: true,
            task_lists: true,
            strikethrough: true,
            sub_sup: true,
            autolinks: true,
            html_allow_list: DEFAULT_HTML_ALLOW_LIST
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}
