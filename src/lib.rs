pub mod block;
pub mod boundary;
pub mod diff;
pub mod error;
pub mod html;
pub mod inline;
pub mod node;
pub mod options;
pub mod render;
pub mod state;
pub mod stream;
pub mod syntax;
pub mod types;

#[cfg(feature = "pulldown")]
pub mod adapters;

pub use block::parse_blocks;
pub use boundary::{SafeBoundary, compute_safe_boundary};
pub use diff::{apply_patches, diff};
pub use error::*;
pub use inline::parse_inline;
pub use node::*;
pub use options::*;
pub use render::{Highlighter, HtmlRenderer, render_html};
pub use state::*;
pub use stream::*;
pub use types::*;
