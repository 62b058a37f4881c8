//! The inline parser. A `Subject` makes a single forward pass over one
//! leaf block's token buffer, dispatching on the byte at the cursor;
//! emphasis-family delimiters go through a doubly linked stack resolved in
//! `process_emphasis`, brackets through their own stack resolved when the
//! closing `]` arrives.

use smallvec::SmallVec;

use crate::arena_tree::{NodeId, Tree};
use crate::ctype::{ispunct, isspace};
use crate::entity;
use crate::nodes::{Ast, NodeCode, NodeEmoji, NodeLink, NodeValue};
use crate::parser::{autolink, AutolinkType, Options};
use crate::scanners;
use crate::strings;
use unicode_categories::UnicodeCategories;

const MAXBACKTICKS: usize = 80;
const MAX_LINK_LABEL_LENGTH: usize = 1000;

pub(crate) struct Subject<'t, 'o, 'r> {
    pub tree: &'t mut Tree,
    pub options: &'o Options,
    pub input: Vec<u8>,
    pub pos: usize,
    pub refmap: &'r mut RefMap,
    delimiters: Vec<Delimiter>,
    last_delimiter: Option<usize>,
    brackets: SmallVec<[Bracket; 8]>,
    within_brackets: bool,
    backticks: [usize; MAXBACKTICKS + 1],
    scanned_for_backticks: bool,
    no_link_openers: bool,
    flags: HtmlSkipFlags,
    special_char_bytes: [bool; 256],
}

#[derive(Default)]
struct HtmlSkipFlags {
    cdata: bool,
    declaration: bool,
    pi: bool,
    comment: bool,
}

struct Delimiter {
    inl: NodeId,
    position: usize,
    length: usize,
    delim_byte: u8,
    can_open: bool,
    can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Bracket {
    inl_text: NodeId,
    position: usize,
    image: bool,
    bracket_after: bool,
}

pub(crate) fn make_inline(tree: &mut Tree, value: NodeValue) -> NodeId {
    tree.alloc(Ast::new(value))
}

impl<'t, 'o, 'r> Subject<'t, 'o, 'r> {
    pub fn new(
        tree: &'t mut Tree,
        options: &'o Options,
        input: Vec<u8>,
        refmap: &'r mut RefMap,
    ) -> Self {
        let mut s = Subject {
            tree,
            options,
            input,
            pos: 0,
            refmap,
            delimiters: vec![],
            last_delimiter: None,
            brackets: SmallVec::new(),
            within_brackets: false,
            backticks: [0; MAXBACKTICKS + 1],
            scanned_for_backticks: false,
            no_link_openers: true,
            flags: HtmlSkipFlags::default(),
            special_char_bytes: [false; 256],
        };
        for &b in b"\n\r_*`\\&<[]!" {
            s.special_char_bytes[b as usize] = true;
        }
        if options.extension.autolink {
            s.special_char_bytes[b':' as usize] = true;
            s.special_char_bytes[b'w' as usize] = true;
        }
        if options.extension.strikethrough {
            s.special_char_bytes[b'~' as usize] = true;
        }
        if options.extension.emoji {
            s.special_char_bytes[b':' as usize] = true;
        }
        if let Some(caret) = options.parse.caret_marker.as_deref() {
            if let Some(&b) = caret.as_bytes().first() {
                s.special_char_bytes[b as usize] = true;
            }
        }
        s
    }

    fn make_inline(&mut self, value: NodeValue) -> NodeId {
        make_inline(self.tree, value)
    }

    fn make_autolink(&mut self, url: &[u8], kind: AutolinkType) -> NodeId {
        let inl = self.make_inline(NodeValue::Link(NodeLink {
            url: strings::clean_autolink(url, kind),
            title: vec![],
        }));
        let text = self.make_inline(NodeValue::Text(entity::unescape_html(url)));
        self.tree.append(inl, text);
        inl
    }

    /// Consumes one token at the cursor, appending whatever inline it
    /// produces to `node`. Returns false at the end of the buffer.
    pub fn parse_inline(&mut self, node: NodeId) -> bool {
        let Some(b) = self.peek_byte() else {
            return false;
        };

        if let Some(caret) = self.options.parse.caret_marker.as_deref() {
            if !caret.is_empty() && self.input[self.pos..].starts_with(caret.as_bytes()) {
                self.pos += caret.len();
                let inl = self.make_inline(NodeValue::Caret);
                self.tree.append(node, inl);
                return true;
            }
        }

        let new_inl: Option<NodeId> = match b {
            b'\r' | b'\n' => Some(self.handle_newline()),
            b'`' => Some(self.handle_backticks()),
            b'\\' => Some(self.handle_backslash()),
            b'&' => Some(self.handle_entity()),
            b'<' => Some(self.handle_pointy_brace()),
            b':' => {
                let mut res = None;

                if self.options.extension.autolink {
                    res = self.handle_autolink_with(node, autolink::url_match);
                }

                if res.is_none() && self.options.extension.emoji {
                    res = self.handle_emoji_colon();
                }

                if res.is_none() {
                    self.pos += 1;
                    res = Some(self.make_inline(NodeValue::Text(b":".to_vec())));
                }

                res
            }
            b'w' if self.options.extension.autolink => {
                match self.handle_autolink_with(node, autolink::www_match) {
                    Some(inl) => Some(inl),
                    None => {
                        self.pos += 1;
                        Some(self.make_inline(NodeValue::Text(b"w".to_vec())))
                    }
                }
            }
            b'*' | b'_' => Some(self.handle_delim(b)),
            b'~' if self.options.extension.strikethrough => Some(self.handle_delim(b'~')),
            b'[' => {
                self.pos += 1;
                let inl = self.make_inline(NodeValue::Text(b"[".to_vec()));
                self.push_bracket(false, inl);
                self.within_brackets = true;
                Some(inl)
            }
            b']' => {
                self.within_brackets = false;
                self.handle_close_bracket()
            }
            b'!' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'[') {
                    self.pos += 1;
                    let inl = self.make_inline(NodeValue::Text(b"![".to_vec()));
                    self.push_bracket(true, inl);
                    self.within_brackets = true;
                    Some(inl)
                } else {
                    Some(self.make_inline(NodeValue::Text(b"!".to_vec())))
                }
            }
            _ => {
                let mut endpos = self.find_special_char();
                let startpos = self.pos;
                // A special byte with no handler of its own (e.g. the first
                // byte of a configured caret marker that didn't match) must
                // still advance the cursor.
                if endpos == startpos {
                    endpos = startpos + 1;
                }
                self.pos = endpos;

                let mut contents = self.input[startpos..endpos].to_vec();

                if self.peek_byte().is_some_and(strings::is_line_end_char) {
                    let size_before = contents.len();
                    contents = strings::rtrim_slice(&contents).to_vec();
                    endpos -= size_before - contents.len();
                    let _ = endpos;
                }

                if !contents.is_empty() {
                    Some(self.make_inline(NodeValue::Text(contents)))
                } else {
                    None
                }
            }
        };

        if let Some(inl) = new_inl {
            self.tree.append(node, inl);
        }

        true
    }

    fn handle_newline(&mut self) -> NodeId {
        let nlpos = self.pos;
        if self.peek_byte() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'\n') {
            self.pos += 1;
        }

        let inl = if nlpos > 1 && self.input[nlpos - 1] == b' ' && self.input[nlpos - 2] == b' ' {
            self.make_inline(NodeValue::LineBreak)
        } else {
            self.make_inline(NodeValue::SoftBreak)
        };
        self.skip_spaces();
        inl
    }

    fn handle_backticks(&mut self) -> NodeId {
        let startpos = self.pos;
        let openticks = self.take_while(b'`');
        let endpos = self.scan_to_closing_backtick(openticks);

        match endpos {
            None => {
                self.pos = startpos + openticks;
                self.make_inline(NodeValue::Text(vec![b'`'; openticks]))
            }
            Some(endpos) => {
                let buf = &self.input[startpos + openticks..endpos - openticks];
                let code = NodeCode {
                    num_backticks: openticks,
                    literal: strings::normalize_code(buf),
                };
                self.make_inline(NodeValue::Code(code))
            }
        }
    }

    fn scan_to_closing_backtick(&mut self, openticklength: usize) -> Option<usize> {
        if openticklength > MAXBACKTICKS {
            return None;
        }

        if self.scanned_for_backticks && self.backticks[openticklength] <= self.pos {
            return None;
        }

        loop {
            while self.peek_byte().is_some_and(|b| b != b'`') {
                self.pos += 1;
            }
            if self.pos >= self.input.len() {
                self.scanned_for_backticks = true;
                return None;
            }
            let numticks = self.take_while(b'`');
            if numticks <= MAXBACKTICKS {
                self.backticks[numticks] = self.pos - numticks;
            }
            if numticks == openticklength {
                return Some(self.pos);
            }
        }
    }

    fn handle_backslash(&mut self) -> NodeId {
        self.pos += 1;

        if self.peek_byte().is_some_and(ispunct) {
            self.pos += 1;
            let ch = self.input[self.pos - 1];
            self.make_inline(NodeValue::Text(vec![ch]))
        } else if !self.eof() && self.skip_line_end() {
            let inl = self.make_inline(NodeValue::LineBreak);
            self.skip_spaces();
            inl
        } else {
            self.make_inline(NodeValue::Text(b"\\".to_vec()))
        }
    }

    fn handle_entity(&mut self) -> NodeId {
        self.pos += 1;

        match entity::unescape(&self.input[self.pos..]) {
            None => self.make_inline(NodeValue::Text(b"&".to_vec())),
            Some((entity, len)) => {
                self.pos += len;
                self.make_inline(NodeValue::Text(entity))
            }
        }
    }

    fn handle_pointy_brace(&mut self) -> NodeId {
        self.pos += 1;

        if let Some(matchlen) = scanners::autolink_uri(&self.input[self.pos..]) {
            self.pos += matchlen;
            return self.make_autolink_at(matchlen, AutolinkType::Uri);
        }

        if let Some(matchlen) = scanners::autolink_email(&self.input[self.pos..]) {
            self.pos += matchlen;
            return self.make_autolink_at(matchlen, AutolinkType::Email);
        }

        let mut matchlen: Option<usize> = None;

        if self.pos + 2 <= self.input.len() {
            let b = self.input[self.pos];
            if b == b'!' && !self.flags.comment {
                let b = self.input[self.pos + 1];
                if b == b'-' && self.peek_byte_n(2) == Some(b'-') {
                    if self.peek_byte_n(3) == Some(b'>') {
                        matchlen = Some(4);
                    } else if self.peek_byte_n(3) == Some(b'-') && self.peek_byte_n(4) == Some(b'>')
                    {
                        matchlen = Some(5);
                    } else if let Some(m) = scanners::html_comment(&self.input[self.pos + 1..]) {
                        matchlen = Some(m + 1);
                    } else {
                        self.flags.comment = true;
                    }
                } else if b == b'[' {
                    if !self.flags.cdata {
                        if let Some(m) = scanners::html_cdata(&self.input[self.pos + 2..]) {
                            matchlen = Some(m + 5);
                        } else {
                            self.flags.cdata = true;
                        }
                    }
                } else if !self.flags.declaration {
                    if let Some(m) = scanners::html_declaration(&self.input[self.pos + 1..]) {
                        matchlen = Some(m + 2);
                    } else {
                        self.flags.declaration = true;
                    }
                }
            } else if b == b'?' {
                if !self.flags.pi {
                    if let Some(m) =
                        scanners::html_processing_instruction(&self.input[self.pos + 1..])
                    {
                        matchlen = Some(m + 3);
                    } else {
                        self.flags.pi = true;
                    }
                }
            } else {
                matchlen = scanners::html_tag(&self.input[self.pos..]);
            }
        }

        if let Some(matchlen) = matchlen {
            let contents = self.input[self.pos - 1..self.pos + matchlen].to_vec();
            self.pos += matchlen;
            return self.make_inline(NodeValue::HtmlInline(contents));
        }

        self.make_inline(NodeValue::Text(b"<".to_vec()))
    }

    fn make_autolink_at(&mut self, matchlen: usize, kind: AutolinkType) -> NodeId {
        // The match length includes the closing `>`.
        let url = self.input[self.pos - matchlen..self.pos - 1].to_vec();
        self.make_autolink(&url, kind)
    }

    fn handle_autolink_with(
        &mut self,
        node: NodeId,
        f: fn(&mut Tree, &[u8], usize) -> Option<(NodeId, usize, usize)>,
    ) -> Option<NodeId> {
        if self.within_brackets {
            return None;
        }
        let (post, need_reverse, skip) = f(self.tree, &self.input, self.pos)?;

        self.pos += skip - need_reverse;

        // Rewind scheme bytes already emitted as text. They sit at the tail
        // of one or more preceding Text siblings.
        let mut reverse = need_reverse;
        while reverse > 0 {
            let last_child = self
                .tree
                .last_child(node)
                .expect("autolink rewind needs a preceding text node");
            match self.tree[last_child].value {
                NodeValue::Text(ref mut prev) => {
                    let prev_len = prev.len();
                    if reverse < prev_len {
                        prev.truncate(prev_len - reverse);
                        reverse = 0;
                    } else {
                        reverse -= prev_len;
                        self.tree.detach(last_child);
                    }
                }
                _ => panic!("expected text node before autolink scheme"),
            }
        }

        Some(post)
    }

    fn handle_emoji_colon(&mut self) -> Option<NodeId> {
        let matchlen = scanners::shortcode(&self.input[self.pos + 1..])?;
        let alias =
            String::from_utf8_lossy(&self.input[self.pos + 1..self.pos + matchlen]).into_owned();

        let emoji = NodeEmoji::resolve(&alias, self.options)?;
        self.pos += 1 + matchlen;

        Some(self.make_inline(NodeValue::Emoji(emoji)))
    }

    fn char_before(&self, pos: usize) -> char {
        if pos == 0 {
            return '\n';
        }
        let mut start = pos - 1;
        while start > 0 && self.input[start] >> 6 == 0b10 {
            start -= 1;
        }
        std::str::from_utf8(&self.input[start..pos])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or('\u{fffd}')
    }

    fn char_after(&self, pos: usize) -> char {
        if pos >= self.input.len() {
            return '\n';
        }
        let mut end = pos + 1;
        while end < self.input.len() && self.input[end] >> 6 == 0b10 {
            end += 1;
        }
        std::str::from_utf8(&self.input[pos..end])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or('\u{fffd}')
    }

    fn scan_delims(&mut self, b: u8) -> (usize, bool, bool) {
        let before_char = self.char_before(self.pos);

        let mut numdelims = 0;
        while self.peek_byte() == Some(b) {
            numdelims += 1;
            self.pos += 1;
        }

        let after_char = self.char_after(self.pos);

        let left_flanking = numdelims > 0
            && !after_char.is_whitespace()
            && (!is_flank_punct(after_char)
                || before_char.is_whitespace()
                || is_flank_punct(before_char));
        let right_flanking = numdelims > 0
            && !before_char.is_whitespace()
            && (!is_flank_punct(before_char)
                || after_char.is_whitespace()
                || is_flank_punct(after_char));

        if b == b'_' {
            (
                numdelims,
                left_flanking && (!right_flanking || is_flank_punct(before_char)),
                right_flanking && (!left_flanking || is_flank_punct(after_char)),
            )
        } else {
            (numdelims, left_flanking, right_flanking)
        }
    }

    fn handle_delim(&mut self, b: u8) -> NodeId {
        let (numdelims, can_open, can_close) = self.scan_delims(b);

        let contents = self.input[self.pos - numdelims..self.pos].to_vec();
        let inl = self.make_inline(NodeValue::Text(contents));

        // Strikethrough pairs only as exact double tildes.
        let delim_ok = b != b'~' || numdelims == 2;

        if (can_open || can_close) && delim_ok {
            self.push_delimiter(b, can_open, can_close, inl);
        }

        inl
    }

    fn push_delimiter(&mut self, delim_byte: u8, can_open: bool, can_close: bool, inl: NodeId) {
        let length = self.tree[inl].value.text().map_or(0, |t| t.len());
        let ix = self.delimiters.len();
        self.delimiters.push(Delimiter {
            inl,
            position: self.pos,
            length,
            delim_byte,
            can_open,
            can_close,
            prev: self.last_delimiter,
            next: None,
        });
        if let Some(last) = self.last_delimiter {
            self.delimiters[last].next = Some(ix);
        }
        self.last_delimiter = Some(ix);
    }

    fn remove_delimiter(&mut self, ix: usize) {
        let (prev, next) = (self.delimiters[ix].prev, self.delimiters[ix].next);
        match next {
            Some(n) => self.delimiters[n].prev = prev,
            None => {
                debug_assert!(self.last_delimiter == Some(ix));
                self.last_delimiter = prev;
            }
        }
        if let Some(p) = prev {
            self.delimiters[p].next = next;
        }
    }

    fn remove_delimiters(&mut self, stack_bottom: usize) {
        while let Some(last) = self.last_delimiter {
            if self.delimiters[last].position < stack_bottom {
                break;
            }
            self.remove_delimiter(last);
        }
    }

    /// Pairs delimiter runs above `stack_bottom` into emphasis, strong and
    /// strikethrough nodes. Closers scan down the stack for the nearest
    /// matching opener; `openers_bottom` remembers exhausted searches so
    /// pathological inputs stay linear in the delimiter count.
    pub fn process_emphasis(&mut self, stack_bottom: usize) {
        let mut openers_bottom: [usize; 8] = [stack_bottom; 8];

        // Walk down to the first delimiter at or above the bottom.
        let mut candidate = self.last_delimiter;
        let mut closer: Option<usize> = None;
        while let Some(c) = candidate {
            if self.delimiters[c].position < stack_bottom {
                break;
            }
            closer = Some(c);
            candidate = self.delimiters[c].prev;
        }

        while let Some(c) = closer {
            if !self.delimiters[c].can_close {
                closer = self.delimiters[c].next;
                continue;
            }

            let c_byte = self.delimiters[c].delim_byte;
            let c_len = self.delimiters[c].length;
            let c_can_open = self.delimiters[c].can_open;

            let ix = match c_byte {
                b'~' => 0,
                b'_' => 1,
                b'*' => 2 + (if c_can_open { 3 } else { 0 }) + c_len % 3,
                _ => unreachable!(),
            };

            let mut opener = self.delimiters[c].prev;
            let mut opener_found = false;
            let mut mod_three_rule_invoked = false;

            while let Some(o) = opener {
                if self.delimiters[o].position < openers_bottom[ix] {
                    break;
                }
                let od = &self.delimiters[o];
                if od.can_open && od.delim_byte == c_byte {
                    // The mod-3 rule: when a run can both open and close,
                    // skip pairings whose combined length is a multiple of
                    // three unless both are.
                    let odd_match = (c_can_open || od.can_close)
                        && ((od.length + c_len) % 3 == 0)
                        && !(od.length % 3 == 0 && c_len % 3 == 0);
                    if !odd_match {
                        opener_found = true;
                        break;
                    } else {
                        mod_three_rule_invoked = true;
                    }
                }
                opener = od.prev;
            }

            let old_c = c;

            if opener_found {
                closer = self.insert_emph(opener.unwrap(), c);
            } else {
                closer = self.delimiters[c].next;
            }

            if !opener_found {
                if !mod_three_rule_invoked {
                    openers_bottom[ix] = self.delimiters[old_c].position;
                }

                if !self.delimiters[old_c].can_open {
                    self.remove_delimiter(old_c);
                }
            }
        }

        self.remove_delimiters(stack_bottom);
    }

    /// Pairs `opener` and `closer`, moving the inlines between them into a
    /// fresh emphasis-family node. Longer runs are truncated in place and
    /// handed back for further matching.
    fn insert_emph(&mut self, opener: usize, closer: usize) -> Option<usize> {
        let opener_byte = self.delimiters[opener].delim_byte;
        let opener_inl = self.delimiters[opener].inl;
        let closer_inl = self.delimiters[closer].inl;

        let mut opener_num_bytes = self.tree[opener_inl].value.text().unwrap().len();
        let mut closer_num_bytes = self.tree[closer_inl].value.text().unwrap().len();
        let use_delims = if closer_num_bytes >= 2 && opener_num_bytes >= 2 {
            2
        } else {
            1
        };

        opener_num_bytes -= use_delims;
        closer_num_bytes -= use_delims;

        if opener_byte == b'~' && (opener_num_bytes != closer_num_bytes || opener_num_bytes > 0) {
            return None;
        }

        self.tree[opener_inl]
            .value
            .text_mut()
            .unwrap()
            .truncate(opener_num_bytes);
        self.tree[closer_inl]
            .value
            .text_mut()
            .unwrap()
            .truncate(closer_num_bytes);

        // Candidate delimiters between the pair have already been scanned;
        // none of them matched, so drop them.
        let mut prev = self.delimiters[closer].prev;
        while let Some(d) = prev {
            if d == opener {
                break;
            }
            let p = self.delimiters[d].prev;
            self.remove_delimiter(d);
            prev = p;
        }

        let emph = self.make_inline(if opener_byte == b'~' {
            NodeValue::Strikethrough
        } else if use_delims == 1 {
            NodeValue::Emph
        } else {
            NodeValue::Strong
        });

        let mut it = self.tree.next_sibling(opener_inl);
        while let Some(n) = it {
            if n == closer_inl {
                break;
            }
            let next = self.tree.next_sibling(n);
            self.tree.append(emph, n);
            it = next;
        }
        self.tree.insert_after(opener_inl, emph);

        if opener_num_bytes == 0 {
            self.tree.detach(opener_inl);
            self.remove_delimiter(opener);
        }

        if closer_num_bytes == 0 {
            self.tree.detach(closer_inl);
            let next = self.delimiters[closer].next;
            self.remove_delimiter(closer);
            next
        } else {
            Some(closer)
        }
    }

    fn push_bracket(&mut self, image: bool, inl_text: NodeId) {
        if let Some(last) = self.brackets.last_mut() {
            last.bracket_after = true;
        }
        self.brackets.push(Bracket {
            inl_text,
            position: self.pos,
            image,
            bracket_after: false,
        });
        if !image {
            self.no_link_openers = false;
        }
    }

    fn handle_close_bracket(&mut self) -> Option<NodeId> {
        self.pos += 1;
        let initial_pos = self.pos;

        let Some(last) = self.brackets.last() else {
            return Some(self.make_inline(NodeValue::Text(b"]".to_vec())));
        };

        let is_image = last.image;
        let bracket_after = last.bracket_after;
        let bracket_position = last.position;

        if !is_image && self.no_link_openers {
            self.brackets.pop();
            return Some(self.make_inline(NodeValue::Text(b"]".to_vec())));
        }

        // Inline form: destination in parens, optional title.
        if self.peek_byte() == Some(b'(') {
            let sps = scanners::spacechars(&self.input[self.pos + 1..]).unwrap_or(0);
            let offset = self.pos + 1 + sps;
            if offset < self.input.len() {
                if let Some((url_range, n)) = manual_scan_link_url(&self.input[offset..]) {
                    let starturl = offset;
                    let endurl = starturl + n;
                    let starttitle =
                        endurl + scanners::spacechars(&self.input[endurl..]).unwrap_or(0);
                    let endtitle = if starttitle == endurl {
                        starttitle
                    } else {
                        starttitle
                            + scanners::link_title(&self.input[starttitle..]).unwrap_or(0)
                    };
                    let endall =
                        endtitle + scanners::spacechars(&self.input[endtitle..]).unwrap_or(0);

                    if endall < self.input.len() && self.input[endall] == b')' {
                        self.pos = endall + 1;
                        let url = strings::clean_url(
                            &self.input[starturl + url_range.0..starturl + url_range.1],
                        );
                        let title =
                            strings::clean_title(&self.input[starttitle..endtitle]);
                        self.close_bracket_match(is_image, url, title);
                        return None;
                    } else {
                        self.pos = initial_pos;
                    }
                }
            }
        }

        // Reference form: explicit label, collapsed, or shortcut.
        let (mut lab, mut found_label) = match self.link_label() {
            Some(lab) => (lab, true),
            None => (vec![], false),
        };

        if !found_label {
            self.pos = initial_pos;
        }

        if (!found_label || lab.is_empty()) && !bracket_after {
            lab = self.input[bracket_position..initial_pos - 1].to_vec();
            found_label = true;
        }

        let reff = if found_label {
            self.refmap.lookup(&strings::normalize_label(&lab))
        } else {
            None
        };

        if let Some(reff) = reff {
            self.close_bracket_match(is_image, reff.url, reff.title);
            return None;
        }

        self.brackets.pop();
        self.pos = initial_pos;
        Some(self.make_inline(NodeValue::Text(b"]".to_vec())))
    }

    fn close_bracket_match(&mut self, is_image: bool, url: Vec<u8>, title: Vec<u8>) {
        let last = self.brackets.pop().unwrap();

        let nl = NodeLink { url, title };
        let inl = self.make_inline(if is_image {
            NodeValue::Image(nl)
        } else {
            NodeValue::Link(nl)
        });

        self.tree.insert_before(last.inl_text, inl);
        let mut itm = self.tree.next_sibling(last.inl_text);
        while let Some(it) = itm {
            itm = self.tree.next_sibling(it);
            self.tree.append(inl, it);
        }
        self.tree.detach(last.inl_text);
        self.process_emphasis(last.position);

        if !is_image {
            self.no_link_openers = true;
        }
    }

    pub fn pop_bracket(&mut self) -> bool {
        self.brackets.pop().is_some()
    }

    /// A `[label]` at the cursor; the cursor moves past the closing `]`
    /// only on a match.
    pub fn link_label(&mut self) -> Option<Vec<u8>> {
        let startpos = self.pos;

        if self.peek_byte() != Some(b'[') {
            return None;
        }
        self.pos += 1;

        let mut length = 0;
        while let Some(b) = self.peek_byte() {
            if b == b']' {
                let raw_label =
                    strings::trim_slice(&self.input[startpos + 1..self.pos]).to_vec();
                self.pos += 1;
                return Some(raw_label);
            }
            if b == b'[' {
                break;
            }
            if b == b'\\' {
                self.pos += 1;
                length += 1;
                if self.peek_byte().is_some_and(ispunct) {
                    self.pos += 1;
                    length += 1;
                }
            } else {
                self.pos += 1;
                length += 1;
            }
            if length > MAX_LINK_LABEL_LENGTH {
                break;
            }
        }

        self.pos = startpos;
        None
    }

    fn find_special_char(&self) -> usize {
        for n in self.pos..self.input.len() {
            if self.special_char_bytes[self.input[n] as usize] {
                return n;
            }
        }
        self.input.len()
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_byte_n(&self, n: usize) -> Option<u8> {
        self.input.get(self.pos + n).copied()
    }

    pub fn spnl(&mut self) {
        self.skip_spaces();
        if self.skip_line_end() {
            self.skip_spaces();
        }
    }

    pub fn skip_spaces(&mut self) -> bool {
        let mut skipped = false;
        while self
            .peek_byte()
            .is_some_and(|b| b == b' ' || b == b'\t')
        {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    pub fn skip_line_end(&mut self) -> bool {
        let old_pos = self.pos;
        if self.peek_byte() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'\n') {
            self.pos += 1;
        }
        self.pos > old_pos || self.eof()
    }

    fn take_while(&mut self, b: u8) -> usize {
        let start_pos = self.pos;
        while self.peek_byte() == Some(b) {
            self.pos += 1;
        }
        self.pos - start_pos
    }
}

fn is_flank_punct(c: char) -> bool {
    (c.is_ascii() && ispunct(c as u8)) || c.is_punctuation() || c.is_symbol()
}

/// Scans a link destination at the start of `input`: angle-bracketed (no
/// unescaped `<`, `>` or newlines) or bare (balanced parens, no whitespace
/// or controls). Returns the destination's byte range within `input` and
/// the total bytes consumed.
pub(crate) fn manual_scan_link_url(input: &[u8]) -> Option<((usize, usize), usize)> {
    let len = input.len();
    let mut i = 0;

    if i < len && input[i] == b'<' {
        i += 1;
        while i < len {
            let b = input[i];
            if b == b'>' {
                i += 1;
                break;
            } else if b == b'\\' {
                i += 2;
            } else if b == b'\n' || b == b'\r' || b == b'<' {
                return None;
            } else {
                i += 1;
            }
        }

        if i >= len || input[i - 1] != b'>' {
            None
        } else {
            Some(((1, i - 1), i))
        }
    } else {
        manual_scan_link_url_2(input)
    }
}

fn manual_scan_link_url_2(input: &[u8]) -> Option<((usize, usize), usize)> {
    let len = input.len();
    let mut i = 0;
    let mut nb_p = 0;

    while i < len {
        if input[i] == b'\\' && i + 1 < len && ispunct(input[i + 1]) {
            i += 2;
        } else if input[i] == b'(' {
            nb_p += 1;
            i += 1;
            if nb_p > 32 {
                return None;
            }
        } else if input[i] == b')' {
            if nb_p == 0 {
                break;
            }
            nb_p -= 1;
            i += 1;
        } else if isspace(input[i]) || input[i].is_ascii_control() {
            if i == 0 {
                return None;
            }
            break;
        } else {
            i += 1;
        }
    }

    if len == 0 || nb_p != 0 {
        None
    } else {
        Some(((0, i), i))
    }
}

/// A reference link's resolved details.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// The destination URL.
    pub url: Vec<u8>,

    /// The title, possibly empty.
    pub title: Vec<u8>,
}

/// The link-reference-definition map built during block parsing:
/// normalized label → destination and title. First definition wins.
#[derive(Default)]
pub struct RefMap {
    pub(crate) map: rustc_hash::FxHashMap<String, ResolvedReference>,
}

impl RefMap {
    pub(crate) fn new() -> Self {
        RefMap {
            map: rustc_hash::FxHashMap::default(),
        }
    }

    pub(crate) fn lookup(&self, label: &str) -> Option<ResolvedReference> {
        self.map.get(label).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_url_forms() {
        let ((s, e), n) = manual_scan_link_url(b"<a b>rest").unwrap();
        assert_eq!((s, e, n), (1, 4, 5));

        let ((s, e), n) = manual_scan_link_url(b"http://x(y)z \"t\"").unwrap();
        assert_eq!(&b"http://x(y)z"[..], &b"http://x(y)z"[s..e]);
        assert_eq!(n, 12);

        assert!(manual_scan_link_url(b"<a\nb>").is_none());
        assert!(manual_scan_link_url(b"a(b").is_none());
    }
}
