//! A bidirectional CommonMark engine.
//!
//! `roundmark` parses CommonMark (plus the GFM table, strikethrough,
//! task-list and autolink extensions) into an AST, serializes that AST
//! back to canonical Markdown or to JSON, and lowers HTML into the same
//! AST so HTML converts to Markdown through one renderer.
//!
//! ```
//! use roundmark::{markdown_to_markdown, Options};
//!
//! let options = Options::default();
//! assert_eq!(
//!     markdown_to_markdown("Hello   *world*.\n", &options),
//!     "Hello   *world*.\n"
//! );
//! ```
//!
//! The HTML path:
//!
//! ```
//! use roundmark::{html_to_markdown, Options};
//!
//! let options = Options::default();
//! assert_eq!(
//!     html_to_markdown("<h1>Hi</h1>", &options).unwrap(),
//!     "# Hi\n"
//! );
//! ```

mod arena_tree;
mod character_set;
mod cm;
mod ctype;
mod entity;
mod html2md;
mod json;
mod nodes;
mod parser;
mod scanners;
mod strings;

#[cfg(test)]
mod tests;

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub use arena_tree::{NodeId, Tree, WalkStatus};
pub use html2md::{html_to_markdown, html_to_tree};
pub use nodes::{
    Ast, ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeEmoji, NodeHeading, NodeHtmlBlock,
    NodeLink, NodeList, NodeValue, TableAlignment,
};
pub use parser::{
    ExtensionOptions, ListStyleType, Options, ParseOptions, RefMap, RenderOptions,
    ResolvedReference,
};

/// Everything that can fail across the engine. The Markdown parser and
/// renderer are total; only the HTML path, serialization, and internal
/// invariant traps surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The DOM parser could not produce a usable fragment; carries its
    /// diagnostics verbatim.
    #[error("HTML parse failed: {0}")]
    HtmlParse(String),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing rendered output failed.
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    /// An internal invariant was violated; always a bug, never silently
    /// swallowed.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

/// Parses a named Markdown document from bytes.
///
/// Total on any byte input: malformed UTF-8 is replaced, malformed
/// constructs degrade to literal text. An `Err` here means an internal
/// invariant tripped, which is a bug in the engine rather than in the
/// input.
pub fn parse(name: &str, buffer: &[u8], options: &Options) -> Result<Tree, Error> {
    catch_unwind(AssertUnwindSafe(|| {
        parser::parse_document(name, buffer, options)
    }))
    .map_err(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown parser panic".to_string());
        Error::Invariant(msg)
    })
}

/// Parses a named Markdown document from a string.
pub fn parse_str(name: &str, text: &str, options: &Options) -> Result<Tree, Error> {
    parse(name, text.as_bytes(), options)
}

/// Renders a tree as canonical Markdown bytes.
pub fn render_markdown(tree: &Tree, options: &Options) -> Vec<u8> {
    let mut out = vec![];
    cm::format_document(tree, options, &mut out)
        .expect("writing to a Vec cannot fail");
    out
}

/// Renders a tree as canonical Markdown into a writer.
pub fn format_markdown(
    tree: &Tree,
    options: &Options,
    output: &mut dyn io::Write,
) -> io::Result<()> {
    cm::format_document(tree, options, output)
}

/// Serializes a tree as JSON bytes.
pub fn render_json(tree: &Tree) -> Result<Vec<u8>, Error> {
    let mut out = vec![];
    json::format_document(tree, &mut out)?;
    Ok(out)
}

/// Parses Markdown and renders it straight back out in canonical form.
pub fn markdown_to_markdown(text: &str, options: &Options) -> String {
    let tree = parser::parse_document("", text.as_bytes(), options);
    String::from_utf8_lossy(&render_markdown(&tree, options)).into_owned()
}
