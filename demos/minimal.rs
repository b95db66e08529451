//! Minimal `stream2md` usage: feed chunks, mirror the tree with patches, print HTML.
//!
//! Run:
//!   cargo run --example minimal

use stream2md::{Document, MarkdownStream, PatchOp, render_html};

fn main() {
    let mut stream = MarkdownStream::default();
    let mut doc = Document::new();

    let chunks = [
        "# Title\n\n",
        "Hello **wor",
        "ld**.\nSecond line with `co",
        "de`.\n\n",
        "- item 1\n",
        "- item 2\n",
    ];

    for (i, chunk) in chunks.iter().enumerate() {
        println!("\n== tick {i} ==");
        let update = stream.append(chunk);
        if let Err(e) = doc.apply(&update) {
            eprintln!("patch failed: {e}");
            return;
        }
        if update.reset {
            println!("reset: true");
        }
        println!("boundary={} patches={}", update.boundary, update.patches.len());
        for patch in &update.patches {
            match patch {
                PatchOp::Insert { parent, index, node } => {
                    println!("  insert {parent}[{index}] {}", node.kind.name())
                }
                PatchOp::Remove { key } => println!("  remove {key}"),
                PatchOp::Replace { key, node } => println!("  replace {key} {}", node.kind.name()),
                PatchOp::UpdateText { key, text } => println!("  text {key} {text:?}"),
            }
        }
    }

    println!("\n== finalize ==");
    let update = stream.finalize();
    if let Err(e) = doc.apply(&update) {
        eprintln!("patch failed: {e}");
        return;
    }
    print!("{}", render_html(doc.nodes()));
}
