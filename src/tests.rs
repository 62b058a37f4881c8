use crate::arena_tree::{NodeId, Tree};
use crate::nodes::NodeValue;
use crate::Options;

use pretty_assertions::assert_eq;

mod autolink;
mod core;
mod emoji;
mod html2md;
mod json;
mod pathological;
mod strikethrough;
mod table;

#[track_caller]
pub(crate) fn parse_with(input: &str, options: &Options) -> Tree {
    crate::parse_str("test", input, options).unwrap()
}

/// Asserts that `input` formats to exactly `expected` under default
/// options.
#[track_caller]
pub(crate) fn markdown(input: &str, expected: &str) {
    markdown_opts(input, expected, |_| ());
}

#[track_caller]
pub(crate) fn markdown_opts<F>(input: &str, expected: &str, opts: F)
where
    F: Fn(&mut Options),
{
    let mut options = Options::default();
    opts(&mut options);
    let output = crate::markdown_to_markdown(input, &options);
    assert_eq!(output, expected, "input: {:?}", input);
}

macro_rules! md_opts {
    ([$($optclass:ident.$optname:ident),*], $lhs:expr, $rhs:expr $(,)?) => {
        crate::tests::markdown_opts($lhs, $rhs, |opts| {
            $(opts.$optclass.$optname = true;)*
        });
    };
}

pub(crate) use md_opts;

/// Asserts the parsed AST shape under default options.
#[track_caller]
pub(crate) fn ast(input: &str, expected: &str) {
    ast_opts(input, expected, |_| ());
}

#[track_caller]
pub(crate) fn ast_opts<F>(input: &str, expected: &str, opts: F)
where
    F: Fn(&mut Options),
{
    let mut options = Options::default();
    opts(&mut options);
    let tree = parse_with(input, &options);
    assert_eq!(shape(&tree), expected, "input: {:?}", input);
}

/// Asserts that format output re-parses to the same AST shape.
#[track_caller]
pub(crate) fn roundtrip(input: &str) {
    roundtrip_opts(input, |_| ());
}

#[track_caller]
pub(crate) fn roundtrip_opts<F>(input: &str, opts: F)
where
    F: Fn(&mut Options),
{
    let mut options = Options::default();
    opts(&mut options);

    let tree = parse_with(input, &options);
    let rendered = crate::markdown_to_markdown(input, &options);
    let reparsed = parse_with(&rendered, &options);

    assert_eq!(
        shape(&tree),
        shape(&reparsed),
        "round trip diverged; input: {:?}, rendered: {:?}",
        input,
        rendered
    );
}

/// A compact S-expression of the tree: node kinds plus the payloads that
/// carry meaning, skipping marker-choice details so round-trip comparisons
/// see semantics only.
pub(crate) fn shape(tree: &Tree) -> String {
    let mut out = String::new();
    write_shape(tree, tree.root(), &mut out);
    out
}

fn write_shape(tree: &Tree, id: NodeId, out: &mut String) {
    use std::fmt::Write;

    out.push('(');
    match tree[id].value {
        NodeValue::Document => out.push_str("document"),
        NodeValue::BlockQuote => out.push_str("block_quote"),
        NodeValue::Paragraph => out.push_str("paragraph"),
        NodeValue::ThematicBreak => out.push_str("thematic_break"),
        NodeValue::Heading(ref nh) => write!(out, "heading[{}]", nh.level).unwrap(),
        NodeValue::List(ref nl) => write!(
            out,
            "list[{},{}]",
            match nl.list_type {
                crate::ListType::Bullet => "bullet".to_string(),
                crate::ListType::Ordered => format!("ordered start={}", nl.start),
            },
            if nl.tight { "tight" } else { "loose" }
        )
        .unwrap(),
        NodeValue::Item(ref nl) => {
            if nl.list_type == crate::ListType::Ordered && nl.start > 0 {
                write!(out, "item[{}]", nl.start).unwrap()
            } else {
                out.push_str("item")
            }
        }
        NodeValue::TaskItem(symbol) => {
            write!(out, "task_item[{}]", if symbol.is_some() { "x" } else { " " }).unwrap()
        }
        NodeValue::CodeBlock(ref ncb) => write!(
            out,
            "code_block[{}]{:?}",
            String::from_utf8_lossy(&ncb.info),
            String::from_utf8_lossy(&ncb.literal)
        )
        .unwrap(),
        NodeValue::HtmlBlock(ref nhb) => {
            write!(out, "html_block{:?}", String::from_utf8_lossy(&nhb.literal)).unwrap()
        }
        NodeValue::Table(ref aligns) => {
            let names: Vec<&str> = aligns
                .iter()
                .map(|a| a.json_name().unwrap_or("none"))
                .collect();
            write!(out, "table[{}]", names.join(",")).unwrap()
        }
        NodeValue::TableRow(header) => {
            write!(out, "table_row[{}]", if header { "header" } else { "body" }).unwrap()
        }
        NodeValue::TableCell(..) => out.push_str("table_cell"),
        NodeValue::Text(ref t) => write!(out, "{:?}", String::from_utf8_lossy(t)).unwrap(),
        NodeValue::SoftBreak => out.push_str("softbreak"),
        NodeValue::LineBreak => out.push_str("linebreak"),
        NodeValue::Code(ref code) => {
            write!(out, "code {:?}", String::from_utf8_lossy(&code.literal)).unwrap()
        }
        NodeValue::HtmlInline(ref t) => {
            write!(out, "html_inline{:?}", String::from_utf8_lossy(t)).unwrap()
        }
        NodeValue::Emph => out.push_str("emph"),
        NodeValue::Strong => out.push_str("strong"),
        NodeValue::Strikethrough => out.push_str("strikethrough"),
        NodeValue::Link(ref nl) => write!(
            out,
            "link[{};{}]",
            String::from_utf8_lossy(&nl.url),
            String::from_utf8_lossy(&nl.title)
        )
        .unwrap(),
        NodeValue::Image(ref nl) => write!(
            out,
            "image[{};{}]",
            String::from_utf8_lossy(&nl.url),
            String::from_utf8_lossy(&nl.title)
        )
        .unwrap(),
        NodeValue::Emoji(ref ne) => write!(out, "emoji[{}]", ne.alias).unwrap(),
        NodeValue::Caret => out.push_str("caret"),
    }

    for child in tree.children(id) {
        out.push(' ');
        write_shape(tree, child, out);
    }
    out.push(')');
}
