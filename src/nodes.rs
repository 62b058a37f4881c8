//! The Markdown AST: a single node struct with a closed type-tag enum, per
//! the uniform representation. Markers (`#`, fences, brackets) are not
//! stored as nodes; the renderer re-derives them from the structured
//! fields.

use crate::arena_tree::{NodeId, Tree};

/// The core AST node enum.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// The root of every document. Contains **blocks**.
    Document,

    /// **Block**. A block quote. Contains other **blocks**.
    BlockQuote,

    /// **Block**. A list. Contains list items.
    List(NodeList),

    /// **Block**. A list item. Contains other **blocks**.
    Item(NodeList),

    /// **Block**. A task-list item; the payload is the check symbol, absent
    /// when the box is unchecked.
    TaskItem(Option<u8>),

    /// **Block**. A fenced or indented code block. The literal is raw text,
    /// never inline-parsed.
    CodeBlock(NodeCodeBlock),

    /// **Block**. A raw HTML block, captured verbatim.
    HtmlBlock(NodeHtmlBlock),

    /// **Block**. A paragraph. Contains **inlines**.
    Paragraph,

    /// **Block**. An ATX or setext heading. Contains **inlines**.
    Heading(NodeHeading),

    /// **Block**. A thematic break. Has no children.
    ThematicBreak,

    /// **Block**. A table; the payload is the per-column alignments.
    /// Contains table rows.
    Table(Vec<TableAlignment>),

    /// **Block**. A table row; `true` for the header row. Contains cells.
    TableRow(bool),

    /// **Block**. A table cell. Contains **inlines**.
    TableCell(TableAlignment),

    /// **Inline**. Literal text.
    Text(Vec<u8>),

    /// **Inline**. A soft line break.
    SoftBreak,

    /// **Inline**. A hard line break.
    LineBreak,

    /// **Inline**. A code span.
    Code(NodeCode),

    /// **Inline**. Raw HTML contained inline.
    HtmlInline(Vec<u8>),

    /// **Inline**. Emphasised text.
    Emph,

    /// **Inline**. Strong text.
    Strong,

    /// **Inline**. Struck-through text (GFM extension).
    Strikethrough,

    /// **Inline**. A link; children are the link text.
    Link(NodeLink),

    /// **Inline**. An image; children are the alt text.
    Image(NodeLink),

    /// **Inline**. An `:alias:` emoji (extension).
    Emoji(NodeEmoji),

    /// **Inline**. The zero-width editor caret sentinel.
    Caret,
}

/// Alignment of a table column or cell.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl TableAlignment {
    pub(crate) fn json_name(&self) -> Option<&'static str> {
        match self {
            TableAlignment::None => None,
            TableAlignment::Left => Some("left"),
            TableAlignment::Center => Some("center"),
            TableAlignment::Right => Some("right"),
        }
    }
}

/// A link destination and title; also an image source for `Image`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeLink {
    pub url: Vec<u8>,
    pub title: Vec<u8>,
}

/// List metadata, carried both by the list and by each of its items.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct NodeList {
    pub list_type: ListType,

    /// Column of the marker, relative to the containing block.
    pub marker_offset: usize,

    /// Spaces from the start of the marker to the item content.
    pub padding: usize,

    /// For ordered lists and items, the marker's ordinal.
    pub start: usize,

    pub delimiter: ListDelimType,

    /// For bullet lists, the marker character (`-`, `+` or `*`).
    pub bullet_char: u8,

    /// Whether items render without blank-line separation. Decided when
    /// the list is finalized.
    pub tight: bool,

    /// Whether any item in the list is a task item.
    pub is_task_list: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    #[default]
    Bullet,
    Ordered,
}

/// The character after an ordered-list number.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ListDelimType {
    #[default]
    Period,
    Paren,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeCodeBlock {
    pub fenced: bool,
    pub fence_char: u8,
    pub fence_length: usize,
    pub fence_offset: usize,

    /// The info string after the opening fence, entity- and
    /// backslash-unescaped.
    pub info: Vec<u8>,

    pub literal: Vec<u8>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct NodeHeading {
    /// 1 through 6.
    pub level: u8,

    pub setext: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeHtmlBlock {
    /// Which of the seven start conditions opened the block; 0 for blocks
    /// synthesized by the HTML lowering.
    pub block_type: u8,

    pub literal: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeCode {
    /// Length of the delimiting backtick runs.
    pub num_backticks: usize,

    pub literal: Vec<u8>,
}

/// An emoji alias with whichever resolution applies: a Unicode emoji from
/// the shortcode table, or an image URL from the caller-supplied alias map.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeEmoji {
    pub alias: String,
    pub unicode: Option<String>,
    pub img_url: Option<String>,
}

impl NodeValue {
    /// Whether this node is a block.
    pub fn block(&self) -> bool {
        matches!(
            *self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(..)
                | NodeValue::Item(..)
                | NodeValue::TaskItem(..)
                | NodeValue::CodeBlock(..)
                | NodeValue::HtmlBlock(..)
                | NodeValue::Paragraph
                | NodeValue::Heading(..)
                | NodeValue::ThematicBreak
                | NodeValue::Table(..)
                | NodeValue::TableRow(..)
                | NodeValue::TableCell(..)
        )
    }

    /// Whether raw line text accumulates on this block during parsing.
    pub(crate) fn accepts_lines(&self) -> bool {
        matches!(
            *self,
            NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::CodeBlock(..)
        )
    }

    /// Whether this node's children are inlines.
    pub fn contains_inlines(&self) -> bool {
        matches!(
            *self,
            NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::TableCell(..)
        )
    }

    pub fn text(&self) -> Option<&Vec<u8>> {
        match *self {
            NodeValue::Text(ref t) => Some(t),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut Vec<u8>> {
        match *self {
            NodeValue::Text(ref mut t) => Some(t),
            _ => None,
        }
    }

    /// The human-readable type name used by the JSON serialization.
    pub fn type_name(&self) -> &'static str {
        match *self {
            NodeValue::Document => "document",
            NodeValue::BlockQuote => "block_quote",
            NodeValue::List(..) => "list",
            NodeValue::Item(..) => "item",
            NodeValue::TaskItem(..) => "task_item",
            NodeValue::CodeBlock(..) => "code_block",
            NodeValue::HtmlBlock(..) => "html_block",
            NodeValue::Paragraph => "paragraph",
            NodeValue::Heading(..) => "heading",
            NodeValue::ThematicBreak => "thematic_break",
            NodeValue::Table(..) => "table",
            NodeValue::TableRow(..) => "table_row",
            NodeValue::TableCell(..) => "table_cell",
            NodeValue::Text(..) => "text",
            NodeValue::SoftBreak => "softbreak",
            NodeValue::LineBreak => "linebreak",
            NodeValue::Code(..) => "code",
            NodeValue::HtmlInline(..) => "html_inline",
            NodeValue::Emph => "emph",
            NodeValue::Strong => "strong",
            NodeValue::Strikethrough => "strikethrough",
            NodeValue::Link(..) => "link",
            NodeValue::Image(..) => "image",
            NodeValue::Emoji(..) => "emoji",
            NodeValue::Caret => "caret",
        }
    }
}

/// One node's data: the type tag, the raw-line scratch buffer used while
/// the block is open, parse-state flags, and an attribute list surfaced by
/// the JSON serialization.
#[derive(Debug, Clone)]
pub struct Ast {
    pub value: NodeValue,
    pub(crate) content: Vec<u8>,
    pub(crate) open: bool,
    pub(crate) last_line_blank: bool,
    /// The input line the block started on; 0 for inlines and synthesized
    /// nodes.
    pub(crate) start_line: usize,
    pub attrs: Vec<(String, String)>,
}

impl Ast {
    pub fn new(value: NodeValue) -> Ast {
        Ast {
            value,
            content: vec![],
            open: false,
            last_line_blank: false,
            start_line: 0,
            attrs: vec![],
        }
    }
}

/// An `Ast` in the open state, as the block parser creates them.
pub(crate) fn make_block(value: NodeValue) -> Ast {
    Ast {
        value,
        content: vec![],
        open: true,
        last_line_blank: false,
        start_line: 0,
        attrs: vec![],
    }
}

pub(crate) fn last_child_is_open(tree: &Tree, id: NodeId) -> bool {
    tree.last_child(id).is_some_and(|ch| tree[ch].open)
}

/// The containment matrix: which child types a node may adopt.
pub(crate) fn can_contain_type(tree: &Tree, id: NodeId, child: &NodeValue) -> bool {
    if let NodeValue::Document = *child {
        return false;
    }

    match tree[id].value {
        NodeValue::Document | NodeValue::BlockQuote | NodeValue::Item(..) | NodeValue::TaskItem(..) => {
            child.block() && !matches!(*child, NodeValue::Item(..) | NodeValue::TaskItem(..))
        }

        NodeValue::List(..) => matches!(*child, NodeValue::Item(..) | NodeValue::TaskItem(..)),

        NodeValue::Paragraph
        | NodeValue::Heading(..)
        | NodeValue::Emph
        | NodeValue::Strong
        | NodeValue::Strikethrough
        | NodeValue::Link(..)
        | NodeValue::Image(..) => !child.block(),

        NodeValue::Table(..) => matches!(*child, NodeValue::TableRow(..)),

        NodeValue::TableRow(..) => matches!(*child, NodeValue::TableCell(..)),

        NodeValue::TableCell(..) => matches!(
            *child,
            NodeValue::Text(..)
                | NodeValue::Code(..)
                | NodeValue::Emph
                | NodeValue::Strong
                | NodeValue::Strikethrough
                | NodeValue::Link(..)
                | NodeValue::Image(..)
                | NodeValue::Emoji(..)
                | NodeValue::Caret
                | NodeValue::HtmlInline(..)
        ),

        _ => false,
    }
}

/// Whether the node (or, for lists, its deepest trailing item) ended with
/// a blank line; drives list tightness.
pub(crate) fn ends_with_blank_line(tree: &Tree, id: NodeId) -> bool {
    let mut it = Some(id);
    while let Some(cur) = it {
        if tree[cur].last_line_blank {
            return true;
        }
        match tree[cur].value {
            NodeValue::List(..) | NodeValue::Item(..) | NodeValue::TaskItem(..) => {
                it = tree.last_child(cur)
            }
            _ => it = None,
        }
    }
    false
}

/// The closest enclosing block, starting from `id` itself.
pub(crate) fn containing_block(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut ch = Some(id);
    while let Some(n) = ch {
        if tree[n].value.block() {
            return Some(n);
        }
        ch = tree.parent(n);
    }
    None
}
