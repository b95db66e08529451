use std::borrow::Cow;

/// Append-only text buffer fed by streamed chunks.
#[derive(Debug, Default, Clone)]
pub struct Ingestor {
    buffer: String,
    normalize_newlines: bool,
    /// A chunk ended with '\r'; the next chunk decides whether it was half of a CRLF pair.
    pending_cr: bool,
}

impl Ingestor {
    pub fn new(normalize_newlines: bool) -> Self {
        Self {
            buffer: String::new(),
            normalize_newlines,
            pending_cr: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the number of bytes added to the buffer.
    pub fn append(&mut self, chunk: &str) -> usize {
        let before = self.buffer.len();
        if self.normalize_newlines {
            let normalized = self.normalize_newlines_cow(chunk);
            self.buffer.push_str(&normalized);
        } else {
            self.buffer.push_str(chunk);
        }
        self.buffer.len() - before
    }

    /// Flush a held-back '\r'. Called when the stream ends.
    pub fn finish(&mut self) -> usize {
        if self.pending_cr {
            self.pending_cr = false;
            self.buffer.push('\n');
            return 1;
        }
        0
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_cr = false;
    }

    fn normalize_newlines_cow<'a>(&mut self, chunk: &'a str) -> Cow<'a, str> {
        if !chunk.contains('\r') && !self.pending_cr {
            return Cow::Borrowed(chunk);
        }
        if chunk.is_empty() {
            return Cow::Borrowed(chunk);
        }

        let mut out = String::with_capacity(chunk.len() + 1);
        let mut chars = chunk.chars().peekable();

        if self.pending_cr {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
            self.pending_cr = false;
        }

        while let Some(c) = chars.next() {
            if c != '\r' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'\n') {
                chars.next();
                out.push('\n');
                continue;
            }
            if chars.peek().is_none() {
                self.pending_cr = true;
                continue;
            }
            out.push('\n');
        }

        Cow::Owned(out)
    }
}
