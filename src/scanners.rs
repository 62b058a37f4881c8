//! Line and token scanners. Each function inspects the start of its input
//! and returns how far the construct reaches (or its kind), without
//! allocating. First-byte rejection keeps the common no-match case cheap.

use crate::character_set::character_set;
use crate::ctype::{isalnum, isalpha, isspace, istagname};
use crate::strings::is_space_or_tab;

pub enum SetextChar {
    Equals,
    Hyphen,
}

fn is_line_end(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// ATX opening sequence: one to six `#`s followed by spaces/tabs or the end
/// of the line. Returns the number of bytes consumed including the
/// whitespace run.
pub fn atx_heading_start(line: &[u8]) -> Option<usize> {
    if line.is_empty() || line[0] != b'#' {
        return None;
    }

    let mut hashes = 0;
    while hashes < line.len() && line[hashes] == b'#' {
        hashes += 1;
    }
    if hashes > 6 {
        return None;
    }

    match line.get(hashes) {
        None => Some(hashes),
        Some(&b) if is_line_end(b) => Some(hashes + 1),
        Some(&b) if is_space_or_tab(b) => {
            let mut i = hashes;
            while i < line.len() && is_space_or_tab(line[i]) {
                i += 1;
            }
            Some(i)
        }
        _ => None,
    }
}

/// Setext underline: a run of `=` or `-`, optionally trailed by
/// spaces/tabs, filling the rest of the line.
pub fn setext_heading_line(line: &[u8]) -> Option<SetextChar> {
    if line.is_empty() || (line[0] != b'=' && line[0] != b'-') {
        return None;
    }

    let c = line[0];
    let mut i = 0;
    while i < line.len() && line[i] == c {
        i += 1;
    }
    while i < line.len() && is_space_or_tab(line[i]) {
        i += 1;
    }
    if i < line.len() && !is_line_end(line[i]) {
        return None;
    }

    Some(if c == b'=' {
        SetextChar::Equals
    } else {
        SetextChar::Hyphen
    })
}

/// Opening code fence: three or more identical backticks or tildes.
/// Backtick-fence info strings must not contain backticks. Returns the
/// fence length.
pub fn open_code_fence(line: &[u8]) -> Option<usize> {
    if line.is_empty() || (line[0] != b'`' && line[0] != b'~') {
        return None;
    }

    let c = line[0];
    let mut len = 0;
    while len < line.len() && line[len] == c {
        len += 1;
    }
    if len < 3 {
        return None;
    }

    if c == b'`' && line[len..].iter().take_while(|&&b| !is_line_end(b)).any(|&b| b == b'`') {
        return None;
    }

    Some(len)
}

/// Closing code fence: a run of the fence character with nothing but
/// spaces/tabs after it. Length comparison against the opener happens in
/// the block parser.
pub fn close_code_fence(line: &[u8]) -> Option<usize> {
    if line.is_empty() || (line[0] != b'`' && line[0] != b'~') {
        return None;
    }

    let c = line[0];
    let mut len = 0;
    while len < line.len() && line[len] == c {
        len += 1;
    }
    if len < 3 {
        return None;
    }

    let mut i = len;
    while i < line.len() && is_space_or_tab(line[i]) {
        i += 1;
    }
    if i < line.len() && !is_line_end(line[i]) {
        return None;
    }

    Some(len)
}

fn starts_with_ignore_case(line: &[u8], pat: &[u8]) -> bool {
    line.len() >= pat.len()
        && line
            .iter()
            .zip(pat.iter())
            .all(|(&a, &b)| a.to_ascii_lowercase() == b)
}

fn find_ignore_case(line: &[u8], pat: &[u8]) -> Option<usize> {
    if line.len() < pat.len() {
        return None;
    }
    (0..=line.len() - pat.len()).find(|&i| starts_with_ignore_case(&line[i..], pat))
}

const BLOCK_TAGS: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

fn tag_name_end(line: &[u8]) -> Option<usize> {
    if line.is_empty() || !isalpha(line[0]) {
        return None;
    }
    let mut i = 1;
    while i < line.len() && istagname(line[i]) {
        i += 1;
    }
    Some(i)
}

/// HTML block start conditions one through six; returns the block type.
/// Type seven (a lone complete tag) is separate because it may not
/// interrupt a paragraph.
pub fn html_block_start(line: &[u8]) -> Option<usize> {
    if line.is_empty() || line[0] != b'<' {
        return None;
    }

    let rest = &line[1..];

    for tag in ["script", "style", "pre"] {
        if starts_with_ignore_case(rest, tag.as_bytes()) {
            match rest.get(tag.len()) {
                Some(&b) if isspace(b) || b == b'>' => return Some(1),
                None => return Some(1),
                _ => {}
            }
        }
    }

    if rest.starts_with(b"!--") {
        return Some(2);
    }
    if rest.starts_with(b"?") {
        return Some(3);
    }
    if rest.starts_with(b"![CDATA[") {
        return Some(5);
    }
    if rest.starts_with(b"!") && rest.len() > 1 && isalpha(rest[1]) {
        return Some(4);
    }

    let name_start = if rest.starts_with(b"/") { 1 } else { 0 };
    if let Some(end) = tag_name_end(&rest[name_start..]) {
        let name = &rest[name_start..name_start + end];
        let lowered: Vec<u8> = name.iter().map(|b| b.to_ascii_lowercase()).collect();
        if BLOCK_TAGS
            .iter()
            .any(|t| t.as_bytes() == lowered.as_slice())
        {
            match rest.get(name_start + end) {
                None => return Some(6),
                Some(&b) if isspace(b) || b == b'>' => return Some(6),
                Some(&b'/') if rest.get(name_start + end + 1) == Some(&b'>') => return Some(6),
                _ => {}
            }
        }
    }

    None
}

/// Start condition seven: a complete open or close tag, alone on its line.
pub fn html_block_start_7(line: &[u8]) -> Option<usize> {
    if line.is_empty() || line[0] != b'<' {
        return None;
    }

    let len = html_tag(&line[1..])?;

    // A type-1 name here would already have matched condition one.
    let mut i = 1 + len;
    while i < line.len() && is_space_or_tab(line[i]) {
        i += 1;
    }
    if i < line.len() && !is_line_end(line[i]) {
        return None;
    }

    Some(7)
}

pub fn html_block_end_1(line: &[u8]) -> bool {
    find_ignore_case(line, b"</script>").is_some()
        || find_ignore_case(line, b"</pre>").is_some()
        || find_ignore_case(line, b"</style>").is_some()
}

pub fn html_block_end_2(line: &[u8]) -> bool {
    line.windows(3).any(|w| w == b"-->")
}

pub fn html_block_end_3(line: &[u8]) -> bool {
    line.windows(2).any(|w| w == b"?>")
}

pub fn html_block_end_4(line: &[u8]) -> bool {
    line.contains(&b'>')
}

pub fn html_block_end_5(line: &[u8]) -> bool {
    line.windows(3).any(|w| w == b"]]>")
}

/// A URI autolink body: scheme, colon, then non-space non-`<`/`>` bytes up
/// to the closing `>`. Input starts just past the opening `<`; the
/// returned length includes the closing `>`.
pub fn autolink_uri(line: &[u8]) -> Option<usize> {
    let colon = scheme(line)?;
    let mut i = colon;

    debug_assert!(line[i - 1] == b':');
    while i < line.len() {
        let b = line[i];
        if b == b'>' {
            return Some(i + 1);
        }
        if b == b'<' || b <= b' ' || b == 0x7f {
            return None;
        }
        i += 1;
    }
    None
}

/// An email autolink body per the CommonMark production; the returned
/// length includes the closing `>`.
pub fn autolink_email(line: &[u8]) -> Option<usize> {
    const LOCAL_OK: [bool; 256] =
        crate::character_set::character_set!(b".!#$%&'*+/=?^_`{|}~-");

    let mut i = 0;
    while i < line.len() && (isalnum(line[i]) || LOCAL_OK[line[i] as usize]) {
        i += 1;
    }
    if i == 0 || i >= line.len() || line[i] != b'@' {
        return None;
    }
    i += 1;

    loop {
        let label_start = i;
        if i >= line.len() || !isalnum(line[i]) {
            return None;
        }
        i += 1;
        while i < line.len() && (isalnum(line[i]) || line[i] == b'-') && i - label_start < 63 {
            i += 1;
        }
        if line[i - 1] == b'-' {
            return None;
        }
        match line.get(i) {
            Some(b'.') => i += 1,
            Some(b'>') => return Some(i + 1),
            _ => return None,
        }
    }
}

/// A URI scheme followed by a colon: an ASCII letter then up to 31
/// letters/digits/`+`/`.`/`-`. Returns the length including the colon.
pub fn scheme(line: &[u8]) -> Option<usize> {
    if line.is_empty() || !isalpha(line[0]) {
        return None;
    }
    let mut i = 1;
    while i < line.len() && (isalnum(line[i]) || matches!(line[i], b'+' | b'.' | b'-')) {
        i += 1;
        if i > 32 {
            return None;
        }
    }
    if i < 2 || line.get(i) != Some(&b':') {
        return None;
    }
    Some(i + 1)
}

fn attribute(line: &[u8]) -> Option<usize> {
    // whitespace, name, optional = value
    let mut i = 0;
    while i < line.len() && isspace(line[i]) {
        i += 1;
    }
    if i == 0 {
        return None;
    }
    if i >= line.len() || !(isalpha(line[i]) || line[i] == b'_' || line[i] == b':') {
        return None;
    }
    i += 1;
    while i < line.len()
        && (isalnum(line[i]) || matches!(line[i], b'_' | b':' | b'.' | b'-'))
    {
        i += 1;
    }

    let mut j = i;
    while j < line.len() && isspace(line[j]) {
        j += 1;
    }
    if j >= line.len() || line[j] != b'=' {
        return Some(i);
    }
    j += 1;
    while j < line.len() && isspace(line[j]) {
        j += 1;
    }

    match line.get(j) {
        Some(&q) if q == b'"' || q == b'\'' => {
            j += 1;
            while j < line.len() && line[j] != q {
                j += 1;
            }
            if j >= line.len() {
                None
            } else {
                Some(j + 1)
            }
        }
        Some(_) => {
            let start = j;
            while j < line.len()
                && !isspace(line[j])
                && !matches!(line[j], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            {
                j += 1;
            }
            if j == start {
                None
            } else {
                Some(j)
            }
        }
        None => None,
    }
}

/// An open or closing tag, starting just past the `<`. Returns the length
/// including the final `>`.
pub fn html_tag(line: &[u8]) -> Option<usize> {
    if line.starts_with(b"/") {
        let end = tag_name_end(&line[1..])?;
        let mut i = 1 + end;
        while i < line.len() && isspace(line[i]) {
            i += 1;
        }
        if line.get(i) == Some(&b'>') {
            return Some(i + 1);
        }
        return None;
    }

    let mut i = tag_name_end(line)?;
    while let Some(len) = attribute(&line[i..]) {
        i += len;
    }
    while i < line.len() && isspace(line[i]) {
        i += 1;
    }
    if line.get(i) == Some(&b'/') {
        i += 1;
    }
    if line.get(i) == Some(&b'>') {
        Some(i + 1)
    } else {
        None
    }
}

/// An HTML comment body, starting at the `--` just past `<!`. The interior
/// may not contain `--` except as part of the terminator. Returns the
/// length from the leading `--` through the closing `-->`.
pub fn html_comment(line: &[u8]) -> Option<usize> {
    if !line.starts_with(b"--") {
        return None;
    }
    let mut i = 2;
    while i + 1 < line.len() {
        if line[i] == b'-' && line[i + 1] == b'-' {
            return if line.get(i + 2) == Some(&b'>') {
                Some(i + 3)
            } else {
                None
            };
        }
        i += 1;
    }
    None
}

/// Processing-instruction content, starting just past `<?`; the returned
/// length excludes the `?>` terminator. Empty content is a valid match.
pub fn html_processing_instruction(line: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < line.len() {
        if line[i] == b'?' && line[i + 1] == b'>' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Declaration content, starting just past `<!`; one or more ASCII letters
/// then anything up to (excluding) the closing `>`.
pub fn html_declaration(line: &[u8]) -> Option<usize> {
    if line.is_empty() || !isalpha(line[0]) {
        return None;
    }
    let mut i = 1;
    while i < line.len() && isalpha(line[i]) {
        i += 1;
    }
    while i < line.len() {
        if line[i] == b'>' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// CDATA content, starting just past `<![`; matches `CDATA[` plus interior,
/// excluding the `]]>` terminator.
pub fn html_cdata(line: &[u8]) -> Option<usize> {
    if !line.starts_with(b"CDATA[") {
        return None;
    }
    let mut i = 6;
    while i + 2 < line.len() {
        if line[i] == b']' && line[i + 1] == b']' && line[i + 2] == b'>' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// A link title in any of its three quoting forms, with backslash escapes.
/// Returns the full length including both delimiters.
pub fn link_title(line: &[u8]) -> Option<usize> {
    if line.len() < 2 {
        return None;
    }
    let (open, close) = match line[0] {
        b'"' => (b'"', b'"'),
        b'\'' => (b'\'', b'\''),
        b'(' => (b'(', b')'),
        _ => return None,
    };

    let mut i = 1;
    while i < line.len() {
        let b = line[i];
        if b == b'\\' && i + 1 < line.len() {
            i += 2;
            continue;
        }
        if b == close {
            return Some(i + 1);
        }
        // A '(' inside a paren-delimited title ends the match.
        if open == b'(' && b == b'(' {
            return None;
        }
        i += 1;
    }
    None
}

/// A run of whitespace (spaces, tabs, line ends).
pub fn spacechars(line: &[u8]) -> Option<usize> {
    let n = line.iter().take_while(|&&b| isspace(b)).count();
    if n > 0 {
        Some(n)
    } else {
        None
    }
}

/// A task-list marker at the front of a paragraph's text: up to three
/// spaces, `[`, one of space/`x`/`X`, `]`, then whitespace or the end.
/// Returns the byte just past the `]` and the state symbol.
pub fn tasklist(line: &[u8]) -> Option<(usize, u8)> {
    let mut i = 0;
    while i < line.len() && line[i] == b' ' {
        if i == 3 {
            return None;
        }
        i += 1;
    }
    if line.get(i) != Some(&b'[') {
        return None;
    }
    let symbol = *line.get(i + 1)?;
    if !matches!(symbol, b' ' | b'x' | b'X') {
        return None;
    }
    if line.get(i + 2) != Some(&b']') {
        return None;
    }
    match line.get(i + 3) {
        None => Some((i + 3, symbol)),
        Some(&b) if isspace(b) => Some((i + 3, symbol)),
        _ => None,
    }
}

/// An emoji alias body, starting just past the opening `:`; letters,
/// digits, `_`, `+`, `-`, then the closing `:`. Returns the length
/// including the closing colon.
pub fn shortcode(line: &[u8]) -> Option<usize> {
    const MAX_SHORTCODE: usize = 64;
    let mut i = 0;
    while i < line.len() && i <= MAX_SHORTCODE {
        let b = line[i];
        if b == b':' {
            return if i > 0 { Some(i + 1) } else { None };
        }
        if !(isalnum(b) || matches!(b, b'_' | b'+' | b'-')) {
            return None;
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx() {
        assert_eq!(atx_heading_start(b"# x\n"), Some(2));
        assert_eq!(atx_heading_start(b"###   x\n"), Some(6));
        assert_eq!(atx_heading_start(b"#\n"), Some(2));
        assert_eq!(atx_heading_start(b"#######\n"), None);
        assert_eq!(atx_heading_start(b"#x\n"), None);
    }

    #[test]
    fn fences() {
        assert_eq!(open_code_fence(b"```rust\n"), Some(3));
        assert_eq!(open_code_fence(b"`` x\n"), None);
        assert_eq!(open_code_fence(b"```a`b\n"), None);
        assert_eq!(open_code_fence(b"~~~~ any ` info\n"), Some(4));
        assert_eq!(close_code_fence(b"````  \n"), Some(4));
        assert_eq!(close_code_fence(b"``` x\n"), None);
    }

    #[test]
    fn html_blocks() {
        assert_eq!(html_block_start(b"<script src=\"x\">\n"), Some(1));
        assert_eq!(html_block_start(b"<!-- c -->\n"), Some(2));
        assert_eq!(html_block_start(b"<?php\n"), Some(3));
        assert_eq!(html_block_start(b"<!DOCTYPE html>\n"), Some(4));
        assert_eq!(html_block_start(b"<![CDATA[x\n"), Some(5));
        assert_eq!(html_block_start(b"<div class=\"x\">\n"), Some(6));
        assert_eq!(html_block_start(b"</table>\n"), Some(6));
        assert_eq!(html_block_start(b"<xyz>\n"), None);
        assert_eq!(html_block_start_7(b"<xyz>\n"), Some(7));
        assert_eq!(html_block_start_7(b"<xyz> tail\n"), None);
    }

    #[test]
    fn autolinks() {
        assert_eq!(autolink_uri(b"http://x.y>"), Some(11));
        assert_eq!(autolink_uri(b"http://x y>"), None);
        assert_eq!(autolink_email(b"a@b.c>"), Some(6));
        assert_eq!(autolink_email(b"a@b->"), None);
    }

    #[test]
    fn tags() {
        assert_eq!(html_tag(b"a href='x'>"), Some(11));
        assert_eq!(html_tag(b"br/>"), Some(4));
        assert_eq!(html_tag(b"/div >"), Some(6));
        assert_eq!(html_tag(b"1a>"), None);
        assert_eq!(html_comment(b"-- hi -->"), Some(9));
        assert_eq!(html_comment(b"-- a -- b -->"), None);
    }

    #[test]
    fn titles_and_tasks() {
        assert_eq!(link_title(b"\"a b\" x"), Some(5));
        assert_eq!(link_title(b"'a\\'b'"), Some(6));
        assert_eq!(link_title(b"(a(b))"), None);
        assert_eq!(tasklist(b"[x] go"), Some((3, b'x')));
        assert_eq!(tasklist(b"[ ] go"), Some((3, b' ')));
        assert_eq!(tasklist(b"[y] go"), None);
        assert_eq!(tasklist(b"[x]go"), None);
    }
}
