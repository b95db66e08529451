use tracing::{debug, error, warn};

use crate::block::parse_blocks;
use crate::boundary::{SafeBoundary, compute_safe_boundary};
use crate::diff::diff_from;
use crate::error::StreamError;
use crate::node::Node;
use crate::options::Options;
use crate::types::Update;

pub mod ingest;

use ingest::Ingestor;

/// Streaming Markdown engine.
///
/// Text arrives through [`append`](Self::append); every call re-derives the safe boundary,
/// parses the buffer up to it and returns the patches that turn the previously emitted tree into
/// the new one. The emitted tree always equals `parse_blocks(&buffer()[..safe_boundary()])`.
///
/// Top-level blocks before the settled offset never change again. They stay at the front of the
/// tree and are neither re-parsed nor re-diffed.
#[derive(Debug)]
pub struct MarkdownStream {
    opts: Options,
    ingest: Ingestor,
    boundary: SafeBoundary,
    tree: Vec<Node>,
    /// `tree[..settled_blocks]` was parsed from `buffer[..settled_offset]`.
    settled_blocks: usize,
    settled_offset: usize,
    finalized: bool,
}

impl Default for MarkdownStream {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl MarkdownStream {
    pub fn new(opts: Options) -> Self {
        let ingest = Ingestor::new(opts.normalize_newlines);
        Self {
            opts,
            ingest,
            boundary: SafeBoundary::default(),
            tree: Vec::new(),
            settled_blocks: 0,
            settled_offset: 0,
            finalized: false,
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Everything received so far, after newline normalization.
    pub fn buffer(&self) -> &str {
        self.ingest.as_str()
    }

    /// The tree emitted by the last update.
    pub fn tree(&self) -> &[Node] {
        &self.tree
    }

    pub fn safe_boundary(&self) -> usize {
        self.boundary.offset
    }

    pub fn settled_offset(&self) -> usize {
        self.settled_offset
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Append a chunk and return the resulting update. Never fails.
    ///
    /// After [`finalize`](Self::finalize) the chunk is ignored and the update is empty. If the
    /// safe boundary would move backwards the engine rebuilds its tree from scratch and returns a
    /// `reset` update.
    pub fn append(&mut self, chunk: &str) -> Update {
        match self.try_append(chunk) {
            Ok(update) => update,
            Err(StreamError::Finalized) => {
                warn!(len = chunk.len(), "append after finalize ignored");
                Update::empty(self.boundary.offset)
            }
            Err(StreamError::BoundaryRegression { previous, current }) => {
                error!(previous, current, "safe boundary regressed; rebuilding");
                self.rebuild()
            }
        }
    }

    /// Like [`append`](Self::append), but reports a finalized stream or a boundary regression
    /// instead of recovering.
    ///
    /// On `BoundaryRegression` the chunk has been buffered and the emitted tree is unchanged;
    /// [`rebuild`](Self::rebuild) resynchronizes.
    pub fn try_append(&mut self, chunk: &str) -> Result<Update, StreamError> {
        if self.finalized {
            return Err(StreamError::Finalized);
        }
        if self.ingest.append(chunk) == 0 {
            return Ok(Update::empty(self.boundary.offset));
        }

        let next = self.detect();
        if next.offset < self.boundary.offset {
            return Err(StreamError::BoundaryRegression {
                previous: self.boundary.offset,
                current: next.offset,
            });
        }
        if next.offset == self.boundary.offset {
            return Ok(Update::empty(self.boundary.offset));
        }
        Ok(self.advance(next))
    }

    /// Close the stream: the boundary moves to the end of the buffer and every open construct is
    /// closed as-is. Calling it again returns an empty update.
    pub fn finalize(&mut self) -> Update {
        if self.finalized {
            return Update::empty(self.boundary.offset);
        }
        self.finalized = true;
        self.ingest.finish();

        let end = self.ingest.len();
        if end == self.boundary.offset {
            debug!(boundary = end, "finalize: tree already complete");
            return Update::empty(end);
        }
        self.advance(SafeBoundary {
            offset: end,
            settled: self.settled_offset,
        })
    }

    /// Discard the buffer, the tree and every cache. The next append starts a new document.
    pub fn reset(&mut self) {
        self.ingest.clear();
        self.boundary = SafeBoundary::default();
        self.tree.clear();
        self.settled_blocks = 0;
        self.settled_offset = 0;
        self.finalized = false;
    }

    /// Re-derive the boundary and the tree from the whole buffer. The update has `reset` set and
    /// inserts every top-level node.
    pub fn rebuild(&mut self) -> Update {
        self.settled_blocks = 0;
        self.settled_offset = 0;
        let next = if self.finalized {
            SafeBoundary {
                offset: self.ingest.len(),
                settled: 0,
            }
        } else {
            compute_safe_boundary(self.ingest.as_str(), &self.opts)
        };

        self.tree.clear();
        self.boundary = SafeBoundary::default();
        let mut update = self.advance(next);
        update.reset = true;
        debug!(
            boundary = update.boundary,
            blocks = self.tree.len(),
            "rebuilt tree"
        );
        update
    }

    /// Boundary of the current buffer. Scanning resumes at the settled offset: no construct spans
    /// it, so the text after it is detected on its own.
    fn detect(&self) -> SafeBoundary {
        let base = self.settled_offset;
        let local = compute_safe_boundary(&self.ingest.as_str()[base..], &self.opts);
        SafeBoundary {
            offset: base + local.offset,
            settled: base + local.settled,
        }
    }

    fn advance(&mut self, next: SafeBoundary) -> Update {
        let base = self.settled_blocks;
        let mut fresh = Vec::new();

        if next.settled > self.settled_offset {
            let text = &self.ingest.as_str()[self.settled_offset..next.settled];
            let settled = parse_blocks(text, &self.opts);
            self.settled_blocks += settled.len();
            self.settled_offset = next.settled;
            fresh.extend(settled);
        }
        let text = &self.ingest.as_str()[self.settled_offset..next.offset];
        fresh.extend(parse_blocks(text, &self.opts));

        let patches = diff_from(&self.tree[base..], &fresh, base);
        self.tree.truncate(base);
        self.tree.extend(fresh);
        self.boundary = next;

        debug!(
            boundary = next.offset,
            settled = self.settled_offset,
            memoised_blocks = self.settled_blocks,
            patches = patches.len(),
            "stream step"
        );
        Update {
            patches,
            boundary: next.offset,
            reset: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn settled_blocks_stay_at_the_front_of_the_tree() {
        let mut s = MarkdownStream::default();
        s.append("# Title\n\nfirst paragraph\n\nsec");
        assert_eq!(s.settled_offset(), "# Title\n\n".len());
        let update = s.append("ond\n");
        assert!(
            update.patches.iter().all(|p| p.key().path()[0] >= 1),
            "{update:?}"
        );
        assert_eq!(s.tree().len(), 3);
        assert_eq!(s.tree()[0].kind, NodeKind::Heading { level: 1 });
    }

    #[test]
    fn empty_chunk_is_an_empty_update() {
        let mut s = MarkdownStream::default();
        s.append("hello");
        let update = s.append("");
        assert!(update.is_empty());
        assert_eq!(update.boundary, s.safe_boundary());
    }

    #[test]
    fn rebuild_inserts_every_top_level_block() {
        let mut s = MarkdownStream::default();
        s.append("# a\n\n- b\n- c\n\n> d\n");
        let update = s.rebuild();
        assert!(update.reset);
        assert_eq!(update.patches.len(), s.tree().len());

        let mut tree = vec![Node::paragraph(vec![])];
        update.apply_to(&mut tree).unwrap();
        assert_eq!(tree, s.tree());
    }
}
