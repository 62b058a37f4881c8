//! The canonical Markdown ("format") renderer. Output re-parses to an
//! AST equivalent to the input tree; it is not byte-identical to the
//! original source, only semantically so.

use std::cmp::max;
use std::io::{self, Write};

use crate::arena_tree::{NodeId, Tree};
use crate::ctype::{isalpha, isdigit, ispunct, isspace};
use crate::nodes::{
    self, ListDelimType, ListType, NodeCodeBlock, NodeHeading, NodeHtmlBlock, NodeLink, NodeValue,
    TableAlignment,
};
use crate::parser::Options;
use crate::scanners;
use crate::strings::trim_start_match;

/// Formats an AST as Markdown, modified by the given options.
pub fn format_document(
    tree: &Tree,
    options: &Options,
    output: &mut dyn Write,
) -> io::Result<()> {
    let mut f = MarkdownFormatter::new(tree, options);
    f.format(tree.root());
    if !f.v.is_empty() && f.v[f.v.len() - 1] != b'\n' {
        f.v.push(b'\n');
    }
    output.write_all(&f.v)?;
    Ok(())
}

struct MarkdownFormatter<'a, 'o> {
    tree: &'a Tree,
    node: NodeId,
    options: &'o Options,
    v: Vec<u8>,
    prefix: Vec<u8>,
    column: usize,
    need_cr: u8,
    begin_line: bool,
    begin_content: bool,
    in_tight_list_item: bool,
    custom_escape: Option<fn(&Tree, NodeId, u8) -> bool>,
}

#[derive(PartialEq, Clone, Copy)]
enum Escaping {
    Literal,
    Normal,
    Url,
    Title,
}

impl<'a, 'o> Write for MarkdownFormatter<'a, 'o> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.output(buf, Escaping::Literal);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a, 'o> MarkdownFormatter<'a, 'o> {
    fn new(tree: &'a Tree, options: &'o Options) -> Self {
        MarkdownFormatter {
            tree,
            node: tree.root(),
            options,
            v: vec![],
            prefix: vec![],
            column: 0,
            need_cr: 0,
            begin_line: true,
            begin_content: true,
            in_tight_list_item: false,
            custom_escape: None,
        }
    }

    fn output(&mut self, buf: &[u8], escaping: Escaping) {
        if self.in_tight_list_item && self.need_cr > 1 {
            self.need_cr = 1;
        }

        let mut k = self.v.len() as i32 - 1;
        while self.need_cr > 0 {
            if k < 0 || self.v[k as usize] == b'\n' {
                k -= 1;
            } else {
                self.v.push(b'\n');
                if self.need_cr > 1 {
                    self.v.extend(&self.prefix);
                }
            }
            self.column = 0;
            self.begin_line = true;
            self.begin_content = true;
            self.need_cr -= 1;
        }

        for (i, &b) in buf.iter().enumerate() {
            if self.begin_line {
                self.v.extend(&self.prefix);
                self.column = self.prefix.len();
            }

            if let Some(custom_escape) = self.custom_escape {
                if custom_escape(self.tree, self.node, b) {
                    self.v.push(b'\\');
                }
            }

            if escaping == Escaping::Literal {
                if b == b'\n' {
                    self.v.push(b'\n');
                    self.column = 0;
                    self.begin_line = true;
                    self.begin_content = true;
                } else {
                    self.v.push(b);
                    self.column += 1;
                    self.begin_line = false;
                    self.begin_content = self.begin_content && isdigit(b);
                }
            } else {
                self.outc(b, escaping, buf.get(i + 1).copied());
                self.begin_line = false;
                self.begin_content = self.begin_content && isdigit(b);
            }
        }
    }

    fn outc(&mut self, c: u8, escaping: Escaping, nextc: Option<u8>) {
        let follows_digit = !self.v.is_empty() && isdigit(self.v[self.v.len() - 1]);

        let nextc = nextc.unwrap_or(0);

        let needs_escaping = c < 0x80
            && escaping != Escaping::Literal
            && ((escaping == Escaping::Normal
                && (c < 0x20
                    || c == b'*'
                    || c == b'_'
                    || c == b'['
                    || c == b']'
                    || c == b'#'
                    || c == b'<'
                    || c == b'>'
                    || c == b'\\'
                    || c == b'`'
                    || c == b'~'
                    || (c == b'&' && isalpha(nextc))
                    || (c == b'!' && nextc == b'[')
                    || (self.begin_content
                        && (c == b'-' || c == b'+' || c == b'=')
                        && !follows_digit)
                    || (self.begin_content
                        && (c == b'.' || c == b')')
                        && follows_digit
                        && (nextc == 0 || isspace(nextc)))))
                || (escaping == Escaping::Url
                    && (c == b'`'
                        || c == b'<'
                        || c == b'>'
                        || isspace(c)
                        || c == b'\\'
                        || c == b')'
                        || c == b'('))
                || (escaping == Escaping::Title
                    && (c == b'`' || c == b'<' || c == b'>' || c == b'"' || c == b'\\')));

        if needs_escaping {
            if escaping == Escaping::Url && isspace(c) {
                write!(self.v, "%{:2X}", c).unwrap();
                self.column += 3;
            } else if ispunct(c) {
                write!(self.v, "\\{}", c as char).unwrap();
                self.column += 2;
            } else {
                let s = format!("&#{};", c);
                self.v.extend(s.as_bytes());
                self.column += s.len();
            }
        } else {
            self.v.push(c);
            self.column += 1;
        }
    }

    fn cr(&mut self) {
        self.need_cr = max(self.need_cr, 1);
    }

    fn blankline(&mut self) {
        self.need_cr = max(self.need_cr, 2);
    }

    fn format(&mut self, node: NodeId) {
        enum Phase {
            Pre,
            Post,
        }
        let mut stack = vec![(node, Phase::Pre)];

        while let Some((node, phase)) = stack.pop() {
            match phase {
                Phase::Pre => {
                    if self.format_node(node, true) {
                        stack.push((node, Phase::Post));
                        for ch in self.tree.reverse_children(node) {
                            stack.push((ch, Phase::Pre));
                        }
                    }
                }
                Phase::Post => {
                    self.format_node(node, false);
                }
            }
        }
    }

    fn get_in_tight_list_item(&self, node: NodeId) -> bool {
        let tmp = match nodes::containing_block(self.tree, node) {
            Some(tmp) => tmp,
            None => return false,
        };

        if matches!(
            self.tree[tmp].value,
            NodeValue::Item(..) | NodeValue::TaskItem(..)
        ) {
            if let NodeValue::List(ref nl) = self.tree[self.tree.parent(tmp).unwrap()].value {
                return nl.tight;
            }
            return false;
        }

        let parent = match self.tree.parent(tmp) {
            Some(parent) => parent,
            None => return false,
        };

        if matches!(
            self.tree[parent].value,
            NodeValue::Item(..) | NodeValue::TaskItem(..)
        ) {
            if let NodeValue::List(ref nl) = self.tree[self.tree.parent(parent).unwrap()].value {
                return nl.tight;
            }
        }

        false
    }

    fn format_node(&mut self, node: NodeId, entering: bool) -> bool {
        self.node = node;

        if !(matches!(
            self.tree[node].value,
            NodeValue::Item(..) | NodeValue::TaskItem(..)
        ) && self.tree.previous_sibling(node).is_none()
            && entering)
        {
            self.in_tight_list_item = self.get_in_tight_list_item(node);
        }

        match self.tree[node].value {
            NodeValue::Document => (),
            NodeValue::BlockQuote => self.format_block_quote(entering),
            NodeValue::List(..) => self.format_list(node, entering),
            NodeValue::Item(..) => self.format_item(node, entering),
            NodeValue::TaskItem(symbol) => self.format_task_item(symbol, node, entering),
            NodeValue::Heading(ref nch) => self.format_heading(nch, entering),
            NodeValue::CodeBlock(ref ncb) => self.format_code_block(ncb, entering),
            NodeValue::HtmlBlock(ref nhb) => self.format_html_block(nhb, entering),
            NodeValue::ThematicBreak => self.format_thematic_break(entering),
            NodeValue::Paragraph => self.format_paragraph(entering),
            NodeValue::Text(ref literal) => self.format_text(&literal.clone(), entering),
            NodeValue::LineBreak => self.format_line_break(entering),
            NodeValue::SoftBreak => self.format_soft_break(entering),
            NodeValue::Code(ref code) => self.format_code(&code.literal.clone(), entering),
            NodeValue::HtmlInline(ref literal) => {
                self.format_html_inline(&literal.clone(), entering)
            }
            NodeValue::Strong => self.format_strong(),
            NodeValue::Emph => self.format_emph(node),
            NodeValue::Strikethrough => self.format_strikethrough(),
            NodeValue::Link(ref nl) => return self.format_link(node, &nl.clone(), entering),
            NodeValue::Image(ref nl) => self.format_image(&nl.clone(), entering),
            NodeValue::Emoji(ref ne) => self.format_emoji(&ne.alias.clone(), entering),
            NodeValue::Caret => self.format_caret(entering),
            NodeValue::Table(..) => self.format_table(entering),
            NodeValue::TableRow(..) => self.format_table_row(entering),
            NodeValue::TableCell(..) => self.format_table_cell(node, entering),
        };
        true
    }

    fn format_block_quote(&mut self, entering: bool) {
        if entering {
            write!(self, "> ").unwrap();
            self.begin_content = true;
            write!(self.prefix, "> ").unwrap();
        } else {
            let new_len = self.prefix.len() - 2;
            self.prefix.truncate(new_len);
            self.blankline();
        }
    }

    fn format_list(&mut self, node: NodeId, entering: bool) {
        if !entering
            && match self.tree.next_sibling(node) {
                Some(next_sibling) => matches!(
                    self.tree[next_sibling].value,
                    NodeValue::CodeBlock(..) | NodeValue::List(..)
                ),
                _ => false,
            }
        {
            // Separate the list from a following list or indented code so
            // the reparse can't merge them.
            self.cr();
            write!(self, "<!-- end list -->").unwrap();
            self.blankline();
        }
    }

    fn list_marker_info(&self, node: NodeId) -> (Vec<u8>, usize) {
        let parent = match self.tree[self.tree.parent(node).unwrap()].value {
            NodeValue::List(ref nl) => *nl,
            _ => unreachable!(),
        };

        if parent.list_type == ListType::Bullet {
            let bullet = match self.tree[node].value {
                NodeValue::Item(ref nl) if nl.bullet_char != 0 => nl.bullet_char,
                _ => self.options.render.list_style as u8,
            };
            (vec![bullet, b' '], 2)
        } else {
            // An item keeps the number and delimiter its marker carried;
            // items without one count up from the list's start.
            let (list_number, list_delim) = match self.tree[node].value {
                NodeValue::Item(ref nl) if nl.start > 0 => (nl.start, nl.delimiter),
                _ => (
                    parent.start
                        + self
                            .tree
                            .children(self.tree.parent(node).unwrap())
                            .take_while(|&s| s != node)
                            .count(),
                    parent.delimiter,
                ),
            };
            let mut marker = vec![];
            write!(
                marker,
                "{}{} ",
                list_number,
                if list_delim == ListDelimType::Paren {
                    ")"
                } else {
                    "."
                }
            )
            .unwrap();
            let len = marker.len();
            (marker, len)
        }
    }

    fn format_item(&mut self, node: NodeId, entering: bool) {
        let (marker, marker_width) = self.list_marker_info(node);

        if entering {
            self.write_all(&marker).unwrap();
            self.begin_content = true;
            for _ in 0..marker_width {
                write!(self.prefix, " ").unwrap();
            }
        } else {
            let new_len = self.prefix.len() - marker_width;
            self.prefix.truncate(new_len);
            self.cr();
        }
    }

    fn format_task_item(&mut self, symbol: Option<u8>, node: NodeId, entering: bool) {
        self.format_item(node, entering);
        if entering {
            write!(self, "[{}] ", symbol.unwrap_or(b' ') as char).unwrap();
        }
    }

    fn format_heading(&mut self, nch: &NodeHeading, entering: bool) {
        if entering {
            for _ in 0..nch.level {
                write!(self, "#").unwrap();
            }
            write!(self, " ").unwrap();
            self.begin_content = true;
        } else {
            self.blankline();
        }
    }

    fn format_code_block(&mut self, ncb: &NodeCodeBlock, entering: bool) {
        if !entering {
            return;
        }

        let info = &ncb.info;
        let literal = &ncb.literal;

        let fence_char = if info.contains(&b'`') { b'~' } else { b'`' };
        let numticks = max(3, longest_char_sequence(literal, fence_char) + 1);

        self.blankline();
        for _ in 0..numticks {
            write!(self, "{}", fence_char as char).unwrap();
        }
        if !info.is_empty() {
            write!(self, " ").unwrap();
            self.write_all(info).unwrap();
        }
        self.cr();
        self.write_all(literal).unwrap();
        self.cr();
        for _ in 0..numticks {
            write!(self, "{}", fence_char as char).unwrap();
        }
        self.blankline();
    }

    fn format_html_block(&mut self, nhb: &NodeHtmlBlock, entering: bool) {
        if entering {
            self.blankline();
            self.write_all(&nhb.literal.clone()).unwrap();
            self.blankline();
        }
    }

    fn format_thematic_break(&mut self, entering: bool) {
        if entering {
            self.blankline();
            write!(self, "---").unwrap();
            self.blankline();
        }
    }

    fn format_paragraph(&mut self, entering: bool) {
        if !entering {
            self.blankline();
        }
    }

    fn format_text(&mut self, literal: &[u8], entering: bool) {
        if entering {
            self.output(literal, Escaping::Normal);
        }
    }

    fn format_line_break(&mut self, entering: bool) {
        if entering {
            write!(self, "\\").unwrap();
            self.cr();
        }
    }

    fn format_soft_break(&mut self, entering: bool) {
        if entering {
            if self.options.render.hardbreaks {
                write!(self, "\\").unwrap();
            }
            self.cr();
        }
    }

    fn format_code(&mut self, literal: &[u8], entering: bool) {
        if entering {
            let numticks = shortest_unused_sequence(literal, b'`');
            for _ in 0..numticks {
                write!(self, "`").unwrap();
            }

            let all_space = literal
                .iter()
                .all(|&c| c == b' ' || c == b'\r' || c == b'\n');
            let has_edge_space = !literal.is_empty()
                && (literal[0] == b' ' || literal[literal.len() - 1] == b' ');
            let has_edge_backtick = !literal.is_empty()
                && (literal[0] == b'`' || literal[literal.len() - 1] == b'`');

            let pad = literal.is_empty() || has_edge_backtick || (!all_space && has_edge_space);
            if pad {
                write!(self, " ").unwrap();
            }
            self.output(literal, Escaping::Literal);
            if pad {
                write!(self, " ").unwrap();
            }
            for _ in 0..numticks {
                write!(self, "`").unwrap();
            }
        }
    }

    fn format_html_inline(&mut self, literal: &[u8], entering: bool) {
        if entering {
            self.write_all(literal).unwrap();
        }
    }

    fn format_strong(&mut self) {
        write!(self, "**").unwrap();
    }

    fn format_emph(&mut self, node: NodeId) {
        let emph_delim = if match self.tree.parent(node) {
            Some(parent) => matches!(self.tree[parent].value, NodeValue::Emph),
            _ => false,
        } && self.tree.next_sibling(node).is_none()
            && self.tree.previous_sibling(node).is_none()
        {
            b'_'
        } else {
            b'*'
        };

        self.write_all(&[emph_delim]).unwrap();
    }

    fn format_strikethrough(&mut self) {
        write!(self, "~~").unwrap();
    }

    fn format_link(&mut self, node: NodeId, nl: &NodeLink, entering: bool) -> bool {
        if self.is_autolink(node, nl) {
            if entering {
                write!(self, "<").unwrap();
                self.write_all(trim_start_match(&nl.url, b"mailto:")).unwrap();
                write!(self, ">").unwrap();
                return false;
            }
        } else if entering {
            write!(self, "[").unwrap();
        } else {
            write!(self, "](").unwrap();
            self.output(&nl.url, Escaping::Url);
            if !nl.title.is_empty() {
                write!(self, " \"").unwrap();
                self.output(&nl.title.clone(), Escaping::Title);
                write!(self, "\"").unwrap();
            }
            write!(self, ")").unwrap();
        }

        true
    }

    fn format_image(&mut self, nl: &NodeLink, entering: bool) {
        if entering {
            write!(self, "![").unwrap();
        } else {
            write!(self, "](").unwrap();
            self.output(&nl.url, Escaping::Url);
            if !nl.title.is_empty() {
                write!(self, " \"").unwrap();
                self.output(&nl.title.clone(), Escaping::Title);
                write!(self, "\"").unwrap();
            }
            write!(self, ")").unwrap();
        }
    }

    fn format_emoji(&mut self, alias: &str, entering: bool) {
        if entering {
            write!(self, ":").unwrap();
            self.output(alias.as_bytes(), Escaping::Literal);
            write!(self, ":").unwrap();
        }
    }

    fn format_caret(&mut self, entering: bool) {
        if entering {
            if let Some(caret) = self.options.parse.caret_marker.as_deref() {
                self.write_all(caret.as_bytes()).unwrap();
            }
        }
    }

    fn format_table(&mut self, entering: bool) {
        if entering {
            self.custom_escape = Some(table_escape);
        } else {
            self.custom_escape = None;
        }
        self.blankline();
    }

    fn format_table_row(&mut self, entering: bool) {
        if entering {
            self.cr();
            write!(self, "|").unwrap();
        }
    }

    fn format_table_cell(&mut self, node: NodeId, entering: bool) {
        if entering {
            write!(self, " ").unwrap();
        } else {
            write!(self, " |").unwrap();

            let row = self.tree.parent(node).unwrap();
            let in_header = match self.tree[row].value {
                NodeValue::TableRow(header) => header,
                _ => panic!("table cell outside row"),
            };

            if in_header && self.tree.next_sibling(node).is_none() {
                let table = self.tree.parent(row).unwrap();
                let alignments = match self.tree[table].value {
                    NodeValue::Table(ref alignments) => alignments.clone(),
                    _ => panic!("table row outside table"),
                };

                self.cr();
                write!(self, "|").unwrap();
                for a in alignments {
                    write!(
                        self,
                        " {} |",
                        match a {
                            TableAlignment::Left => ":--",
                            TableAlignment::Center => ":-:",
                            TableAlignment::Right => "--:",
                            TableAlignment::None => "---",
                        }
                    )
                    .unwrap();
                }
                self.cr();
            }
        }
    }

    fn is_autolink(&self, node: NodeId, nl: &NodeLink) -> bool {
        if nl.url.is_empty() || scanners::scheme(&nl.url).is_none() {
            return false;
        }

        if !nl.title.is_empty() {
            return false;
        }

        let link_text = match self.tree.first_child(node) {
            None => return false,
            Some(child) => match self.tree[child].value {
                NodeValue::Text(ref t) => t.clone(),
                _ => return false,
            },
        };

        trim_start_match(&nl.url, b"mailto:") == link_text.as_slice()
    }
}

fn longest_char_sequence(literal: &[u8], ch: u8) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &c in literal {
        if c == ch {
            current += 1;
        } else {
            if current > longest {
                longest = current;
            }
            current = 0;
        }
    }
    max(longest, current)
}

fn shortest_unused_sequence(literal: &[u8], f: u8) -> usize {
    let mut used = 1u64;
    let mut current = 0;
    for &c in literal {
        if c == f {
            current += 1;
        } else {
            if current > 0 && current < 64 {
                used |= 1 << current;
            }
            current = 0;
        }
    }

    if current > 0 && current < 64 {
        used |= 1 << current;
    }

    let mut i = 0;
    while used & 1 != 0 {
        used >>= 1;
        i += 1;
    }
    i
}

fn table_escape(tree: &Tree, node: NodeId, c: u8) -> bool {
    match tree[node].value {
        NodeValue::Table(..) | NodeValue::TableRow(..) | NodeValue::TableCell(..) => false,
        _ => c == b'|',
    }
}
