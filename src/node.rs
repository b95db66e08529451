#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Heading { level: u8 },
    Paragraph,
    List { ordered: bool, start: u64, tight: bool },
    ListItem { checked: Option<bool> },
    /// `depth` counts enclosing quotes, the outermost quote has depth 1.
    BlockQuote { depth: usize },
    CodeFence { lang: String, literal: String },
    Table { alignments: Vec<Alignment> },
    TableRow { header: bool },
    TableCell,
    ThematicBreak,
    HtmlBlock { literal: String },

    Text(String),
    Emphasis,
    Strong,
    Strikethrough,
    CodeSpan(String),
    Link { href: String, title: Option<String> },
    Image { src: String, title: Option<String>, alt: String },
    Sub,
    Sup,
    HtmlInline(String),
    SoftBreak,
    HardBreak,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Heading { .. } => "heading",
            NodeKind::Paragraph => "paragraph",
            NodeKind::List { .. } => "list",
            NodeKind::ListItem { .. } => "list_item",
            NodeKind::BlockQuote { .. } => "blockquote",
            NodeKind::CodeFence { .. } => "code_fence",
            NodeKind::Table { .. } => "table",
            NodeKind::TableRow { .. } => "table_row",
            NodeKind::TableCell => "table_cell",
            NodeKind::ThematicBreak => "thematic_break",
            NodeKind::HtmlBlock { .. } => "html_block",
            NodeKind::Text(_) => "text",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Strikethrough => "strikethrough",
            NodeKind::CodeSpan(_) => "code_span",
            NodeKind::Link { .. } => "link",
            NodeKind::Image { .. } => "image",
            NodeKind::Sub => "sub",
            NodeKind::Sup => "sup",
            NodeKind::HtmlInline(_) => "html_inline",
            NodeKind::SoftBreak => "soft_break",
            NodeKind::HardBreak => "hard_break",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Heading { .. }
                | NodeKind::Paragraph
                | NodeKind::List { .. }
                | NodeKind::ListItem { .. }
                | NodeKind::BlockQuote { .. }
                | NodeKind::CodeFence { .. }
                | NodeKind::Table { .. }
                | NodeKind::TableRow { .. }
                | NodeKind::TableCell
                | NodeKind::ThematicBreak
                | NodeKind::HtmlBlock { .. }
        )
    }

    /// The text payload of text-bearing kinds.
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeKind::Text(s) | NodeKind::CodeSpan(s) | NodeKind::HtmlInline(s) => Some(s),
            NodeKind::CodeFence { literal, .. } | NodeKind::HtmlBlock { literal } => Some(literal),
            _ => None,
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeKind::Text(s) | NodeKind::CodeSpan(s) | NodeKind::HtmlInline(s) => Some(s),
            NodeKind::CodeFence { literal, .. } | NodeKind::HtmlBlock { literal } => Some(literal),
            _ => None,
        }
    }

    /// Same variant and same attributes, ignoring the text payload.
    ///
    /// Two nodes of the same shape can be updated in place with `UpdateText`.
    pub fn same_shape(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Text(_), NodeKind::Text(_))
            | (NodeKind::CodeSpan(_), NodeKind::CodeSpan(_))
            | (NodeKind::HtmlInline(_), NodeKind::HtmlInline(_))
            | (NodeKind::HtmlBlock { .. }, NodeKind::HtmlBlock { .. }) => true,
            (NodeKind::CodeFence { lang: a, .. }, NodeKind::CodeFence { lang: b, .. }) => a == b,
            _ => self == other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    pub fn leaf(kind: NodeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text(text.into()))
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph, children)
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Heading { level }, children)
    }

    pub fn code_fence(lang: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::leaf(NodeKind::CodeFence {
            lang: lang.into(),
            literal: literal.into(),
        })
    }

    pub fn text_content(&self) -> Option<&str> {
        self.kind.text()
    }

    /// Replace the text payload; returns `false` for kinds without one.
    pub fn set_text(&mut self, text: String) -> bool {
        match self.kind.text_mut() {
            Some(slot) => {
                *slot = text;
                true
            }
            None => false,
        }
    }

    /// Concatenated text of the subtree, as used for image alt text.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain_text(&mut out);
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(s) | NodeKind::CodeSpan(s) => out.push_str(s),
            NodeKind::Image { alt, .. } => out.push_str(alt),
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
            _ => {}
        }
        for child in &self.children {
            child.push_plain_text(out);
        }
    }

    /// Pre-order traversal of the subtree, including `self`.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}
