//! The block parser. Lines feed a tree of open blocks: each line first
//! tries to continue the open chain, then to open new block starts at the
//! matched position, and whatever text remains lands on the deepest block
//! that accepts lines. Finalization runs bottom-up when a block stops
//! matching, and the inline parser fills in leaf content afterwards.

mod autolink;
mod inlines;
pub mod options;
pub mod shortcodes;
mod table;

use std::cmp::min;
use std::mem;

use crate::arena_tree::{NodeId, Tree};
use crate::ctype::{isdigit, isspace};
use crate::entity;
use crate::nodes::{
    self, make_block, ListDelimType, ListType, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeList, NodeValue,
};
use crate::scanners::{self, SetextChar};
use crate::strings::{self, Anchorizer};

pub use self::inlines::{RefMap, ResolvedReference};
pub use self::options::{
    ExtensionOptions, ListStyleType, Options, ParseOptions, RenderOptions,
};

const TAB_STOP: usize = 4;
const CODE_INDENT: usize = 4;

// Very deeply nested lists can cause quadratic behavior in open_new_blocks;
// no non-contrived document nests this far.
const MAX_LIST_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutolinkType {
    Uri,
    Email,
}

macro_rules! node_matches {
    ($tree:expr, $id:expr, $( $pat:pat_param )|+) => {
        matches!($tree[$id].value, $( $pat )|+)
    };
}

/// Parse a Markdown document to an AST.
pub fn parse_document(name: &str, buffer: &[u8], options: &Options) -> Tree {
    let tree = Tree::new(name, make_block(NodeValue::Document));
    let mut parser = Parser::new(tree, options);
    parser.feed(buffer);
    parser.finish()
}

pub(crate) struct Parser<'o> {
    pub(crate) tree: Tree,
    refmap: RefMap,
    current: NodeId,
    pub(crate) line_number: usize,
    pub(crate) offset: usize,
    column: usize,
    thematic_break_kill_pos: usize,
    pub(crate) first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    pub(crate) blank: bool,
    partially_consumed_tab: bool,
    last_line_length: usize,
    options: &'o Options,
}

impl<'o> Parser<'o> {
    fn new(tree: Tree, options: &'o Options) -> Self {
        let root = tree.root();
        Parser {
            tree,
            refmap: RefMap::new(),
            current: root,
            line_number: 0,
            offset: 0,
            column: 0,
            thematic_break_kill_pos: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
            last_line_length: 0,
            options,
        }
    }

    fn feed(&mut self, s: &[u8]) {
        let mut linebuf: Vec<u8> = vec![];
        let mut buffer = 0;
        let end = s.len();

        while buffer < end {
            let mut process = false;
            let mut eol = buffer;
            while eol < end {
                if strings::is_line_end_char(s[eol]) {
                    process = true;
                    break;
                }
                if s[eol] == 0 {
                    break;
                }
                eol += 1;
            }
            if eol >= end {
                process = true;
            }

            if process {
                if !linebuf.is_empty() {
                    linebuf.extend_from_slice(&s[buffer..eol]);
                    let line = mem::take(&mut linebuf);
                    self.process_line(&line);
                } else {
                    self.process_line(&s[buffer..eol]);
                }
            } else if eol < end && s[eol] == b'\0' {
                linebuf.extend_from_slice(&s[buffer..eol]);
                linebuf.extend_from_slice("\u{fffd}".as_bytes());
            } else {
                linebuf.extend_from_slice(&s[buffer..eol]);
            }

            buffer = eol;
            if buffer < end {
                if s[buffer] == b'\0' {
                    buffer += 1;
                } else {
                    if s[buffer] == b'\r' {
                        buffer += 1;
                    }
                    if buffer < end && s[buffer] == b'\n' {
                        buffer += 1;
                    }
                }
            }
        }
    }

    fn find_first_nonspace(&mut self, line: &[u8]) {
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);

        if self.first_nonspace <= self.offset {
            self.first_nonspace = self.offset;
            self.first_nonspace_column = self.column;

            loop {
                if self.first_nonspace >= line.len() {
                    break;
                }
                match line[self.first_nonspace] {
                    b' ' => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += 1;
                        chars_to_tab -= 1;
                        if chars_to_tab == 0 {
                            chars_to_tab = TAB_STOP;
                        }
                    }
                    b'\t' => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += chars_to_tab;
                        chars_to_tab = TAB_STOP;
                    }
                    _ => break,
                }
            }
        }

        self.indent = self.first_nonspace_column - self.column;
        self.blank = self.first_nonspace < line.len()
            && strings::is_line_end_char(line[self.first_nonspace]);
    }

    pub(crate) fn advance_offset(&mut self, line: &[u8], mut count: usize, columns: bool) {
        while count > 0 {
            match line[self.offset] {
                b'\t' => {
                    let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                    if columns {
                        self.partially_consumed_tab = chars_to_tab > count;
                        let chars_to_advance = min(count, chars_to_tab);
                        self.column += chars_to_advance;
                        self.offset += if self.partially_consumed_tab { 0 } else { 1 };
                        count -= chars_to_advance;
                    } else {
                        self.partially_consumed_tab = false;
                        self.column += chars_to_tab;
                        self.offset += 1;
                        count -= 1;
                    }
                }
                _ => {
                    self.partially_consumed_tab = false;
                    self.offset += 1;
                    self.column += 1;
                    count -= 1;
                }
            }
        }
    }

    fn process_line(&mut self, line: &[u8]) {
        let mut new_line: Vec<u8>;
        let line = if line.is_empty() || !strings::is_line_end_char(*line.last().unwrap()) {
            new_line = line.to_vec();
            new_line.push(b'\n');
            &new_line
        } else {
            line
        };

        self.offset = 0;
        self.column = 0;
        self.first_nonspace = 0;
        self.first_nonspace_column = 0;
        self.indent = 0;
        self.thematic_break_kill_pos = 0;
        self.blank = false;
        self.partially_consumed_tab = false;

        if self.line_number == 0 && line.starts_with("\u{feff}".as_bytes()) {
            self.offset += 3;
        }

        self.line_number += 1;

        let mut all_matched = true;
        if let Some(last_matched_container) = self.check_open_blocks(line, &mut all_matched) {
            let mut container = last_matched_container;
            let current = self.current;
            self.open_new_blocks(&mut container, line, all_matched);

            if current == self.current {
                self.add_text_to_container(container, last_matched_container, line);
            }
        }

        self.last_line_length = {
            let mut l = line.len();
            if l > 0 && line[l - 1] == b'\n' {
                l -= 1;
            }
            if l > 0 && line[l - 1] == b'\r' {
                l -= 1;
            }
            l
        };
    }

    fn check_open_blocks(&mut self, line: &[u8], all_matched: &mut bool) -> Option<NodeId> {
        let (new_all_matched, mut container, should_continue) =
            self.check_open_blocks_inner(self.tree.root(), line);

        *all_matched = new_all_matched;
        if !*all_matched {
            container = self.tree.parent(container).unwrap();
        }

        if !should_continue {
            None
        } else {
            Some(container)
        }
    }

    fn check_open_blocks_inner(&mut self, mut container: NodeId, line: &[u8]) -> (bool, NodeId, bool) {
        enum Continuation {
            BlockQuote,
            Item(NodeList),
            CodeBlock,
            HtmlBlock(u8),
            Paragraph,
            Table,
            Leaf,
            Other,
        }

        let mut should_continue = true;

        while nodes::last_child_is_open(&self.tree, container) {
            container = self.tree.last_child(container).unwrap();

            self.find_first_nonspace(line);

            let continuation = match self.tree[container].value {
                NodeValue::BlockQuote => Continuation::BlockQuote,
                NodeValue::Item(ref nl) => Continuation::Item(*nl),
                NodeValue::CodeBlock(..) => Continuation::CodeBlock,
                NodeValue::HtmlBlock(ref nhb) => Continuation::HtmlBlock(nhb.block_type),
                NodeValue::Paragraph => Continuation::Paragraph,
                NodeValue::Table(..) => Continuation::Table,
                NodeValue::Heading(..) | NodeValue::TableRow(..) | NodeValue::TableCell(..) => {
                    Continuation::Leaf
                }
                _ => Continuation::Other,
            };

            match continuation {
                Continuation::BlockQuote => {
                    if !self.parse_block_quote_prefix(line) {
                        return (false, container, should_continue);
                    }
                }
                Continuation::Item(nl) => {
                    if !self.parse_node_item_prefix(line, container, &nl) {
                        return (false, container, should_continue);
                    }
                }
                Continuation::CodeBlock => {
                    if !self.parse_code_block_prefix(line, container, &mut should_continue) {
                        return (false, container, should_continue);
                    }
                }
                Continuation::HtmlBlock(block_type) => {
                    if !self.parse_html_block_prefix(block_type) {
                        return (false, container, should_continue);
                    }
                }
                Continuation::Paragraph => {
                    if self.blank {
                        return (false, container, should_continue);
                    }
                }
                Continuation::Table => {
                    if !table::matches(&line[self.first_nonspace..]) {
                        return (false, container, should_continue);
                    }
                }
                Continuation::Leaf => {
                    return (false, container, should_continue);
                }
                Continuation::Other => {}
            }
        }

        (true, container, should_continue)
    }

    fn parse_block_quote_prefix(&mut self, line: &[u8]) -> bool {
        let indent = self.indent;
        if indent <= 3 && line[self.first_nonspace] == b'>' {
            self.advance_offset(line, indent + 1, true);

            if strings::is_space_or_tab(line[self.offset]) {
                self.advance_offset(line, 1, true);
            }

            return true;
        }

        false
    }

    fn parse_node_item_prefix(&mut self, line: &[u8], container: NodeId, nl: &NodeList) -> bool {
        if self.indent >= nl.marker_offset + nl.padding {
            self.advance_offset(line, nl.marker_offset + nl.padding, true);
            true
        } else if self.blank && self.tree.first_child(container).is_some() {
            let offset = self.first_nonspace - self.offset;
            self.advance_offset(line, offset, false);
            true
        } else {
            false
        }
    }

    fn parse_code_block_prefix(
        &mut self,
        line: &[u8],
        container: NodeId,
        should_continue: &mut bool,
    ) -> bool {
        let (fenced, fence_char, fence_length, fence_offset) = match self.tree[container].value {
            NodeValue::CodeBlock(ref ncb) => (
                ncb.fenced,
                ncb.fence_char,
                ncb.fence_length,
                ncb.fence_offset,
            ),
            _ => unreachable!(),
        };

        if !fenced {
            if self.indent >= CODE_INDENT {
                self.advance_offset(line, CODE_INDENT, true);
                return true;
            } else if self.blank {
                let offset = self.first_nonspace - self.offset;
                self.advance_offset(line, offset, false);
                return true;
            }
            return false;
        }

        let matched = if self.indent <= 3 && line[self.first_nonspace] == fence_char {
            scanners::close_code_fence(&line[self.first_nonspace..]).unwrap_or(0)
        } else {
            0
        };

        if matched >= fence_length {
            *should_continue = false;
            self.advance_offset(line, matched, false);
            self.current = self.finalize(container).unwrap();
            return false;
        }

        let mut i = fence_offset;
        while i > 0 && strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
            i -= 1;
        }
        true
    }

    fn parse_html_block_prefix(&mut self, t: u8) -> bool {
        match t {
            1..=5 => true,
            6 | 7 => !self.blank,
            // Blocks synthesized by the HTML lowering never re-enter the
            // block parser.
            _ => unreachable!(),
        }
    }

    fn open_new_blocks(&mut self, container: &mut NodeId, line: &[u8], all_matched: bool) {
        let mut matched: usize = 0;
        let mut nl: NodeList = NodeList::default();
        let mut sc = SetextChar::Equals;
        let mut maybe_lazy = node_matches!(self.tree, self.current, NodeValue::Paragraph);
        let mut depth = 0;

        while !node_matches!(
            self.tree,
            *container,
            NodeValue::CodeBlock(..) | NodeValue::HtmlBlock(..)
        ) {
            depth += 1;
            self.find_first_nonspace(line);
            let indented = self.indent >= CODE_INDENT;

            if self.handle_blockquote(container, line, indented)
                || self.handle_atx_heading(container, line, indented, &mut matched)
                || self.handle_code_fence(container, line, indented, &mut matched)
                || self.handle_html_block(container, line, indented, &mut matched)
                || self.handle_setext_heading(container, line, indented, &mut sc)
                || self.handle_thematic_break(container, line, indented, &mut matched, all_matched)
                || self.handle_list(container, line, indented, &mut matched, depth, &mut nl)
                || self.handle_code_block(container, line, indented, maybe_lazy)
            {
                // a block start opened
            } else {
                let new_container = if !indented && self.options.extension.table {
                    table::try_opening_block(self, *container, line)
                } else {
                    None
                };

                match new_container {
                    Some(new_container) => *container = new_container,
                    None => break,
                }
            }

            if self.tree[*container].value.accepts_lines() {
                break;
            }

            maybe_lazy = false;
        }
    }

    fn handle_blockquote(&mut self, container: &mut NodeId, line: &[u8], indented: bool) -> bool {
        if indented || line[self.first_nonspace] != b'>' {
            return false;
        }

        let offset = self.first_nonspace + 1 - self.offset;
        self.advance_offset(line, offset, false);
        if strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
        }
        *container = self.add_child(*container, NodeValue::BlockQuote);

        true
    }

    fn handle_atx_heading(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
    ) -> bool {
        if indented
            || !unwrap_into(
                scanners::atx_heading_start(&line[self.first_nonspace..]),
                matched,
            )
        {
            return false;
        }

        let heading_startpos = self.first_nonspace;
        let offset = self.offset;
        self.advance_offset(line, heading_startpos + *matched - offset, false);
        *container = self.add_child(*container, NodeValue::Heading(NodeHeading::default()));

        let mut hashpos = line[self.first_nonspace..]
            .iter()
            .position(|&c| c == b'#')
            .unwrap()
            + self.first_nonspace;
        let mut level = 0;
        while line[hashpos] == b'#' {
            level += 1;
            hashpos += 1;
        }

        self.tree[*container].value = NodeValue::Heading(NodeHeading {
            level,
            setext: false,
        });

        true
    }

    fn handle_code_fence(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
    ) -> bool {
        if indented
            || !unwrap_into(
                scanners::open_code_fence(&line[self.first_nonspace..]),
                matched,
            )
        {
            return false;
        }

        let first_nonspace = self.first_nonspace;
        let offset = self.offset;
        let ncb = NodeCodeBlock {
            fenced: true,
            fence_char: line[first_nonspace],
            fence_length: *matched,
            fence_offset: first_nonspace - offset,
            info: vec![],
            literal: vec![],
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(ncb));
        self.advance_offset(line, first_nonspace + *matched - offset, false);

        true
    }

    fn handle_html_block(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
    ) -> bool {
        if indented {
            return false;
        }

        let start = unwrap_into(
            scanners::html_block_start(&line[self.first_nonspace..]),
            matched,
        ) || (!node_matches!(self.tree, *container, NodeValue::Paragraph)
            && unwrap_into(
                scanners::html_block_start_7(&line[self.first_nonspace..]),
                matched,
            ));
        if !start {
            return false;
        }

        let nhb = NodeHtmlBlock {
            block_type: *matched as u8,
            literal: vec![],
        };

        *container = self.add_child(*container, NodeValue::HtmlBlock(nhb));

        true
    }

    fn handle_setext_heading(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        sc: &mut SetextChar,
    ) -> bool {
        if indented
            || !node_matches!(self.tree, *container, NodeValue::Paragraph)
            || !unwrap_into(
                scanners::setext_heading_line(&line[self.first_nonspace..]),
                sc,
            )
        {
            return false;
        }

        let has_content = {
            let mut content = mem::take(&mut self.tree[*container].content);
            let has_content = self.resolve_reference_link_definitions(&mut content);
            self.tree[*container].content = content;
            has_content
        };

        if has_content {
            self.tree[*container].value = NodeValue::Heading(NodeHeading {
                level: match sc {
                    SetextChar::Equals => 1,
                    SetextChar::Hyphen => 2,
                },
                setext: true,
            });
            let adv = line.len() - 1 - self.offset;
            self.advance_offset(line, adv, false);
        }

        true
    }

    fn scan_thematic_break_inner(&mut self, line: &[u8]) -> (usize, bool) {
        let mut i = self.first_nonspace;

        if i >= line.len() {
            return (i, false);
        }

        let c = line[i];
        if c != b'*' && c != b'_' && c != b'-' {
            return (i, false);
        }

        let mut count = 1;
        let mut nextc;
        loop {
            i += 1;
            if i >= line.len() {
                return (i, false);
            }
            nextc = line[i];

            if nextc == c {
                count += 1;
            } else if nextc != b' ' && nextc != b'\t' {
                break;
            }
        }

        if count >= 3 && (nextc == b'\r' || nextc == b'\n') {
            ((i - self.first_nonspace) + 1, true)
        } else {
            (i, false)
        }
    }

    fn scan_thematic_break(&mut self, line: &[u8]) -> Option<usize> {
        let (offset, found) = self.scan_thematic_break_inner(line);
        if !found {
            self.thematic_break_kill_pos = offset;
            None
        } else {
            Some(offset)
        }
    }

    fn handle_thematic_break(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
        all_matched: bool,
    ) -> bool {
        if indented
            || (node_matches!(self.tree, *container, NodeValue::Paragraph) && !all_matched)
            || self.thematic_break_kill_pos > self.first_nonspace
            || !unwrap_into(self.scan_thematic_break(line), matched)
        {
            return false;
        }

        *container = self.add_child(*container, NodeValue::ThematicBreak);

        let adv = line.len() - 1 - self.offset;
        self.advance_offset(line, adv, false);

        true
    }

    fn handle_list(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
        depth: usize,
        nl: &mut NodeList,
    ) -> bool {
        if (indented && !node_matches!(self.tree, *container, NodeValue::List(..)))
            || self.indent >= 4
            || depth >= MAX_LIST_DEPTH
            || !unwrap_into_2(
                parse_list_marker(
                    line,
                    self.first_nonspace,
                    node_matches!(self.tree, *container, NodeValue::Paragraph),
                ),
                matched,
                nl,
            )
        {
            return false;
        }

        let offset = self.first_nonspace + *matched - self.offset;
        self.advance_offset(line, offset, false);
        let (save_partially_consumed_tab, save_offset, save_column) =
            (self.partially_consumed_tab, self.offset, self.column);

        while self.column - save_column <= 5 && strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
        }

        let i = self.column - save_column;
        if !(1..5).contains(&i) || strings::is_line_end_char(line[self.offset]) {
            nl.padding = *matched + 1;
            self.offset = save_offset;
            self.column = save_column;
            self.partially_consumed_tab = save_partially_consumed_tab;
            if i > 0 {
                self.advance_offset(line, 1, true);
            }
        } else {
            nl.padding = *matched + i;
        }

        nl.marker_offset = self.indent;

        if match self.tree[*container].value {
            NodeValue::List(ref mnl) => !lists_match(nl, mnl),
            _ => true,
        } {
            *container = self.add_child(*container, NodeValue::List(*nl));
        }

        *container = self.add_child(*container, NodeValue::Item(*nl));

        true
    }

    fn handle_code_block(
        &mut self,
        container: &mut NodeId,
        line: &[u8],
        indented: bool,
        maybe_lazy: bool,
    ) -> bool {
        if !indented || maybe_lazy || self.blank {
            return false;
        }

        self.advance_offset(line, CODE_INDENT, true);
        let ncb = NodeCodeBlock {
            fenced: false,
            fence_char: 0,
            fence_length: 0,
            fence_offset: 0,
            info: vec![],
            literal: vec![],
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(ncb));

        true
    }

    pub(crate) fn add_child(&mut self, mut parent: NodeId, value: NodeValue) -> NodeId {
        while !nodes::can_contain_type(&self.tree, parent, &value) {
            parent = self.finalize(parent).unwrap();
        }

        let mut ast = make_block(value);
        ast.start_line = self.line_number;
        let node = self.tree.alloc(ast);
        self.tree.append(parent, node);
        node
    }

    fn add_text_to_container(
        &mut self,
        mut container: NodeId,
        last_matched_container: NodeId,
        line: &[u8],
    ) {
        self.find_first_nonspace(line);

        if self.blank {
            if let Some(last_child) = self.tree.last_child(container) {
                self.tree[last_child].last_line_blank = true;
            }
        }

        self.tree[container].last_line_blank = self.blank
            && match self.tree[container].value {
                NodeValue::BlockQuote
                | NodeValue::Heading(..)
                | NodeValue::ThematicBreak => false,
                NodeValue::CodeBlock(ref ncb) => !ncb.fenced,
                NodeValue::Item(..) | NodeValue::TaskItem(..) => {
                    self.tree.first_child(container).is_some()
                        || self.tree[container].start_line != self.line_number
                }
                _ => true,
            };

        let mut tmp = container;
        while let Some(parent) = self.tree.parent(tmp) {
            self.tree[parent].last_line_blank = false;
            tmp = parent;
        }

        if self.current != last_matched_container
            && container == last_matched_container
            && !self.blank
            && node_matches!(self.tree, self.current, NodeValue::Paragraph)
        {
            // Lazy continuation: the paragraph keeps accepting text even
            // though its ancestors stopped matching.
            self.add_line(self.current, line);
        } else {
            while self.current != last_matched_container {
                self.current = self.finalize(self.current).unwrap();
            }

            enum AddTextResult {
                LiteralText,
                HtmlBlock(u8),
                Otherwise,
            }

            let add_text_result = match self.tree[container].value {
                NodeValue::CodeBlock(..) => AddTextResult::LiteralText,
                NodeValue::HtmlBlock(ref nhb) => AddTextResult::HtmlBlock(nhb.block_type),
                _ => AddTextResult::Otherwise,
            };

            match add_text_result {
                AddTextResult::LiteralText => {
                    self.add_line(container, line);
                }
                AddTextResult::HtmlBlock(block_type) => {
                    self.add_line(container, line);

                    let matches_end_condition = match block_type {
                        1 => scanners::html_block_end_1(&line[self.first_nonspace..]),
                        2 => scanners::html_block_end_2(&line[self.first_nonspace..]),
                        3 => scanners::html_block_end_3(&line[self.first_nonspace..]),
                        4 => scanners::html_block_end_4(&line[self.first_nonspace..]),
                        5 => scanners::html_block_end_5(&line[self.first_nonspace..]),
                        _ => false,
                    };

                    if matches_end_condition {
                        container = self.finalize(container).unwrap();
                    }
                }
                AddTextResult::Otherwise => {
                    if self.blank {
                        // nothing to add
                    } else if self.tree[container].value.accepts_lines() {
                        let mut line_vec: Vec<u8> = line.to_vec();
                        if let NodeValue::Heading(ref nh) = self.tree[container].value {
                            if !nh.setext {
                                strings::chop_trailing_hashtags(&mut line_vec);
                            }
                        }
                        let count = self.first_nonspace - self.offset;

                        // An ATX line of only hashes and spaces can chop to
                        // shorter than first_nonspace; then there is no
                        // text to add at all.
                        if self.first_nonspace <= line_vec.len() {
                            self.advance_offset(&line_vec, count, false);
                            self.add_line(container, &line_vec);
                        }
                    } else {
                        container = self.add_child(container, NodeValue::Paragraph);
                        let count = self.first_nonspace - self.offset;
                        self.advance_offset(line, count, false);
                        self.add_line(container, line);
                    }
                }
            }

            self.current = container;
        }
    }

    fn add_line(&mut self, node: NodeId, line: &[u8]) {
        assert!(self.tree[node].open);
        if self.partially_consumed_tab {
            self.offset += 1;
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            for _ in 0..chars_to_tab {
                self.tree[node].content.push(b' ');
            }
        }
        if self.offset < line.len() {
            let tail = &line[self.offset..];
            self.tree[node].content.extend_from_slice(tail);
        }
    }

    fn finish(mut self) -> Tree {
        self.finalize_document();
        let root = self.tree.root();
        self.postprocess_text_nodes(root);
        if self.options.extension.heading_anchor {
            self.assign_heading_anchors();
        }
        self.tree
    }

    fn finalize_document(&mut self) {
        while self.current != self.tree.root() {
            self.current = self.finalize(self.current).unwrap();
        }

        self.finalize(self.tree.root());
        self.process_inlines();
    }

    fn finalize(&mut self, node: NodeId) -> Option<NodeId> {
        enum Finalization {
            Paragraph,
            CodeBlock { fenced: bool },
            HtmlBlock,
            List,
            Other,
        }

        assert!(self.tree[node].open, "finalizing an already-closed block");
        self.tree[node].open = false;

        let parent = self.tree.parent(node);
        let mut content = mem::take(&mut self.tree[node].content);

        let kind = match self.tree[node].value {
            NodeValue::Paragraph => Finalization::Paragraph,
            NodeValue::CodeBlock(ref ncb) => Finalization::CodeBlock { fenced: ncb.fenced },
            NodeValue::HtmlBlock(..) => Finalization::HtmlBlock,
            NodeValue::List(..) => Finalization::List,
            _ => Finalization::Other,
        };

        match kind {
            Finalization::Paragraph => {
                let has_content = self.resolve_reference_link_definitions(&mut content);
                if !has_content {
                    self.tree.detach(node);
                }
                self.tree[node].content = content;
            }
            Finalization::CodeBlock { fenced } => {
                if !fenced {
                    strings::remove_trailing_blank_lines(&mut content);
                    content.push(b'\n');
                } else {
                    // The first line is the info string.
                    let mut pos = 0;
                    while pos < content.len() {
                        if strings::is_line_end_char(content[pos]) {
                            break;
                        }
                        pos += 1;
                    }
                    assert!(pos < content.len());

                    let mut tmp = entity::unescape_html(&content[..pos]);
                    strings::trim(&mut tmp);
                    strings::unescape(&mut tmp);

                    let info = if tmp.is_empty() {
                        self.options
                            .parse
                            .default_info_string
                            .as_ref()
                            .map_or(vec![], |s| s.as_bytes().to_vec())
                    } else {
                        tmp
                    };

                    if content[pos] == b'\r' {
                        pos += 1;
                    }
                    if pos < content.len() && content[pos] == b'\n' {
                        pos += 1;
                    }
                    content.drain(..pos);

                    if let NodeValue::CodeBlock(ref mut ncb) = self.tree[node].value {
                        ncb.info = info;
                    }
                }

                if let NodeValue::CodeBlock(ref mut ncb) = self.tree[node].value {
                    ncb.literal = content;
                }
            }
            Finalization::HtmlBlock => {
                if let NodeValue::HtmlBlock(ref mut nhb) = self.tree[node].value {
                    nhb.literal = content;
                }
            }
            Finalization::List => {
                let mut tight = true;
                let mut ch = self.tree.first_child(node);

                'tight: while let Some(item) = ch {
                    if self.tree[item].last_line_blank && self.tree.next_sibling(item).is_some() {
                        tight = false;
                        break;
                    }

                    let mut subch = self.tree.first_child(item);
                    while let Some(subitem) = subch {
                        if (self.tree.next_sibling(item).is_some()
                            || self.tree.next_sibling(subitem).is_some())
                            && nodes::ends_with_blank_line(&self.tree, subitem)
                        {
                            tight = false;
                            break 'tight;
                        }
                        subch = self.tree.next_sibling(subitem);
                    }

                    ch = self.tree.next_sibling(item);
                }

                if let NodeValue::List(ref mut nl) = self.tree[node].value {
                    nl.tight = tight;
                }
            }
            Finalization::Other => {
                self.tree[node].content = content;
            }
        }

        parent
    }

    fn resolve_reference_link_definitions(&mut self, content: &mut Vec<u8>) -> bool {
        let mut seeked = 0;
        {
            let mut pos = 0;
            let mut seek: &[u8] = content;
            while !seek.is_empty()
                && seek[0] == b'['
                && unwrap_into(self.parse_reference_inline(seek), &mut pos)
            {
                seek = &seek[pos..];
                seeked += pos;
            }
        }

        if seeked != 0 {
            content.drain(..seeked);
        }

        !strings::is_blank(content)
    }

    fn parse_reference_inline(&mut self, content: &[u8]) -> Option<usize> {
        let mut subj = inlines::Subject::new(
            &mut self.tree,
            self.options,
            content.to_vec(),
            &mut self.refmap,
        );

        let lab = match subj.link_label() {
            Some(lab) if !lab.is_empty() => lab,
            _ => return None,
        };

        if subj.peek_byte() != Some(b':') {
            return None;
        }

        subj.pos += 1;
        subj.spnl();
        let ((url_start, url_end), matchlen) =
            inlines::manual_scan_link_url(&subj.input[subj.pos..])?;
        let url = subj.input[subj.pos + url_start..subj.pos + url_end].to_vec();
        subj.pos += matchlen;

        let beforetitle = subj.pos;
        subj.spnl();
        let title_search = if subj.pos == beforetitle {
            None
        } else {
            scanners::link_title(&subj.input[subj.pos..])
        };
        let title = match title_search {
            Some(matchlen) => {
                let t = subj.input[subj.pos..subj.pos + matchlen].to_vec();
                subj.pos += matchlen;
                t
            }
            _ => {
                subj.pos = beforetitle;
                vec![]
            }
        };

        subj.skip_spaces();
        if !subj.skip_line_end() {
            if !title.is_empty() {
                subj.pos = beforetitle;
                subj.skip_spaces();
                if !subj.skip_line_end() {
                    return None;
                }
            } else {
                return None;
            }
        }

        let lab = strings::normalize_label(&lab);
        if !lab.is_empty() {
            log::debug!("reference definition [{}]", lab);
            let url = strings::clean_url(&url);
            let title = strings::clean_title(&title);
            subj.refmap
                .map
                .entry(lab)
                .or_insert(ResolvedReference { url, title });
        }
        Some(subj.pos)
    }

    fn process_inlines(&mut self) {
        let root = self.tree.root();
        let inline_parents: Vec<NodeId> = self
            .tree
            .descendants(root)
            .filter(|&id| self.tree[id].value.contains_inlines())
            .collect();

        for node in inline_parents {
            self.parse_inlines(node);
        }
    }

    fn parse_inlines(&mut self, node: NodeId) {
        let content_full = mem::take(&mut self.tree[node].content);
        let content = strings::rtrim_slice(&content_full).to_vec();

        let mut subj = inlines::Subject::new(
            &mut self.tree,
            self.options,
            content,
            &mut self.refmap,
        );

        while subj.parse_inline(node) {}

        subj.process_emphasis(0);

        while subj.pop_bracket() {}
    }

    fn postprocess_text_nodes(&mut self, node: NodeId) {
        let mut stack = vec![node];

        while let Some(node) = stack.pop() {
            let mut nch = self.tree.first_child(node);

            while let Some(n) = nch {
                let mut this_bracket = false;
                let mut emptied = false;

                match self.tree[n].value {
                    NodeValue::Text(..) => {
                        // Join adjacent text nodes, then post-process.
                        while let Some(ns) = self.tree.next_sibling(n) {
                            let adj = match self.tree[ns].value {
                                NodeValue::Text(ref adj) => adj.clone(),
                                _ => break,
                            };
                            match self.tree[n].value {
                                NodeValue::Text(ref mut root) => root.extend_from_slice(&adj),
                                _ => unreachable!(),
                            }
                            self.tree.detach(ns);
                        }

                        self.postprocess_text_node(n);
                        emptied = self.tree[n]
                            .value
                            .text()
                            .is_some_and(|t| t.is_empty());
                    }
                    NodeValue::Link(..) | NodeValue::Image(..) => {
                        // No autolinks inside link or image text.
                        this_bracket = true;
                    }
                    _ => {}
                }

                nch = self.tree.next_sibling(n);

                if emptied {
                    self.tree.detach(n);
                } else if !this_bracket {
                    stack.push(n);
                }
            }
        }
    }

    fn postprocess_text_node(&mut self, node: NodeId) {
        if self.options.extension.tasklist {
            self.process_tasklist(node);
        }

        if self.options.extension.autolink {
            autolink::process_email_autolinks(&mut self.tree, node);
        }
    }

    fn process_tasklist(&mut self, node: NodeId) {
        let (end, symbol) = {
            let text = match self.tree[node].value {
                NodeValue::Text(ref t) => t,
                _ => return,
            };
            match scanners::tasklist(text) {
                Some(p) => p,
                None => return,
            }
        };

        let parent = match self.tree.parent(node) {
            Some(p) => p,
            None => return,
        };
        if self.tree.previous_sibling(node).is_some()
            || self.tree.previous_sibling(parent).is_some()
        {
            return;
        }

        if !node_matches!(self.tree, parent, NodeValue::Paragraph) {
            return;
        }

        let grandparent = match self.tree.parent(parent) {
            Some(g) => g,
            None => return,
        };
        if !node_matches!(self.tree, grandparent, NodeValue::Item(..)) {
            return;
        }

        let great_grandparent = match self.tree.parent(grandparent) {
            Some(g) => g,
            None => return,
        };
        if !node_matches!(self.tree, great_grandparent, NodeValue::List(..)) {
            return;
        }

        if let NodeValue::Text(ref mut text) = self.tree[node].value {
            text.drain(..end);
            // The space after the checkbox separates it from the text.
            if text.first() == Some(&b' ') {
                text.remove(0);
            }
        }

        self.tree[grandparent].value = NodeValue::TaskItem(if symbol == b' ' {
            None
        } else {
            Some(symbol)
        });

        if let NodeValue::List(ref mut list) = self.tree[great_grandparent].value {
            list.is_task_list = true;
        }
    }

    fn assign_heading_anchors(&mut self) {
        let root = self.tree.root();
        let headings: Vec<NodeId> = self
            .tree
            .descendants(root)
            .filter(|&id| node_matches!(self.tree, id, NodeValue::Heading(..)))
            .collect();

        let mut anchorizer = Anchorizer::new();
        for heading in headings {
            let mut text = String::new();
            for id in self.tree.descendants(heading).skip(1) {
                match self.tree[id].value {
                    NodeValue::Text(ref t) | NodeValue::HtmlInline(ref t) => {
                        text.push_str(&String::from_utf8_lossy(t))
                    }
                    NodeValue::Code(ref code) => {
                        text.push_str(&String::from_utf8_lossy(&code.literal))
                    }
                    NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
                    _ => {}
                }
            }
            let anchor = anchorizer.anchorize(&text);
            self.tree[heading].attrs.push(("id".to_string(), anchor));
        }
    }
}

fn parse_list_marker(
    line: &[u8],
    mut pos: usize,
    interrupts_paragraph: bool,
) -> Option<(usize, NodeList)> {
    let mut c = line[pos];
    let startpos = pos;

    if c == b'*' || c == b'-' || c == b'+' {
        pos += 1;
        if !isspace(line[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(line[i]) {
                i += 1;
            }
            if line[i] == b'\n' {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Bullet,
                marker_offset: 0,
                padding: 0,
                start: 1,
                delimiter: ListDelimType::Period,
                bullet_char: c,
                tight: false,
                is_task_list: false,
            },
        ));
    } else if isdigit(c) {
        let mut start: usize = 0;
        let mut digits = 0;

        loop {
            start = (10 * start) + (line[pos] - b'0') as usize;
            pos += 1;
            digits += 1;

            if !(digits < 9 && isdigit(line[pos])) {
                break;
            }
        }

        if interrupts_paragraph && start != 1 {
            return None;
        }

        c = line[pos];
        if c != b'.' && c != b')' {
            return None;
        }

        pos += 1;

        if !isspace(line[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(line[i]) {
                i += 1;
            }
            if strings::is_line_end_char(line[i]) {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Ordered,
                marker_offset: 0,
                padding: 0,
                start,
                delimiter: if c == b'.' {
                    ListDelimType::Period
                } else {
                    ListDelimType::Paren
                },
                bullet_char: 0,
                tight: false,
                is_task_list: false,
            },
        ));
    }

    None
}

fn lists_match(list_data: &NodeList, item_data: &NodeList) -> bool {
    list_data.list_type == item_data.list_type
        && list_data.delimiter == item_data.delimiter
        && list_data.bullet_char == item_data.bullet_char
}

pub(crate) fn unwrap_into<T>(t: Option<T>, out: &mut T) -> bool {
    match t {
        Some(v) => {
            *out = v;
            true
        }
        _ => false,
    }
}

fn unwrap_into_2<T, U>(tu: Option<(T, U)>, out_t: &mut T, out_u: &mut U) -> bool {
    match tu {
        Some((t, u)) => {
            *out_t = t;
            *out_u = u;
            true
        }
        _ => false,
    }
}
