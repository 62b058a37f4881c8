//! Byte-string utilities shared by the block parser, the inline parser and
//! the renderers. Everything here works on raw bytes; UTF-8 decoding happens
//! only where a rule genuinely needs characters (label folding, anchors).

use std::borrow::Cow;
use std::collections::HashSet;

use unicode_categories::UnicodeCategories;

use crate::character_set::character_set;
use crate::ctype::{isalnum, ispunct, isspace};
use crate::entity;
use crate::parser::AutolinkType;

pub fn is_line_end_char(ch: u8) -> bool {
    matches!(ch, b'\n' | b'\r')
}

pub fn is_space_or_tab(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t')
}

pub fn is_blank(s: &[u8]) -> bool {
    for &c in s {
        match c {
            b'\n' | b'\r' => return true,
            b' ' | b'\t' => (),
            _ => return false,
        }
    }
    true
}

pub fn ltrim(line: &mut Vec<u8>) {
    let skip = line.iter().take_while(|&&b| isspace(b)).count();
    if skip > 0 {
        line.drain(..skip);
    }
}

pub fn rtrim(line: &mut Vec<u8>) {
    let len = line.iter().rev().take_while(|&&b| isspace(b)).count();
    line.truncate(line.len() - len);
}

pub fn trim(line: &mut Vec<u8>) {
    ltrim(line);
    rtrim(line);
}

pub fn trim_slice(mut s: &[u8]) -> &[u8] {
    while !s.is_empty() && isspace(s[0]) {
        s = &s[1..];
    }
    while !s.is_empty() && isspace(s[s.len() - 1]) {
        s = &s[..s.len() - 1];
    }
    s
}

pub fn rtrim_slice(mut s: &[u8]) -> &[u8] {
    while !s.is_empty() && isspace(s[s.len() - 1]) {
        s = &s[..s.len() - 1];
    }
    s
}

/// Removes an ATX heading's optional closing sequence of `#`s, which only
/// counts when preceded by a space or tab (or makes up the whole line).
pub fn chop_trailing_hashtags(line: &mut Vec<u8>) {
    rtrim(line);

    if line.is_empty() {
        return;
    }

    let orig_n = line.len() - 1;
    let mut n = orig_n;
    while line[n] == b'#' {
        if n == 0 {
            return;
        }
        n -= 1;
    }

    if n != orig_n && is_space_or_tab(line[n]) {
        line.truncate(n);
        rtrim(line);
    }
}

pub fn remove_trailing_blank_lines(line: &mut Vec<u8>) {
    let mut i = line.len();
    while i > 0 {
        let c = line[i - 1];
        if c != b' ' && c != b'\t' && !is_line_end_char(c) {
            break;
        }
        i -= 1;
    }

    if i == 0 {
        line.clear();
        return;
    }

    for i in i..line.len() {
        if is_line_end_char(line[i]) {
            line.truncate(i);
            break;
        }
    }
}

/// Code-span normalization: line endings become spaces, and one space is
/// stripped from each end iff both ends carry one and the interior is not
/// all spaces.
pub fn normalize_code(s: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(s.len());
    let mut i = 0;
    let mut contains_nonspace = false;
    while i < s.len() {
        match s[i] {
            b'\r' => {
                if i + 1 == s.len() || s[i + 1] != b'\n' {
                    v.push(b' ');
                }
            }
            b'\n' => v.push(b' '),
            c => {
                v.push(c);
                if c != b' ' {
                    contains_nonspace = true;
                }
            }
        }
        i += 1;
    }

    if contains_nonspace && v.len() >= 2 && v[0] == b' ' && v[v.len() - 1] == b' ' {
        v.pop();
        v.remove(0);
    }

    v
}

/// Removes backslashes before ASCII punctuation, in place.
pub fn unescape(v: &mut Vec<u8>) {
    let mut r = 0;
    while r + 1 < v.len() {
        if v[r] == b'\\' && ispunct(v[r + 1]) {
            v.remove(r);
        }
        r += 1;
    }
}

/// Reference labels compare by Unicode case folding with interior
/// whitespace collapsed to single spaces.
pub fn normalize_label(s: &[u8]) -> String {
    let s = String::from_utf8_lossy(trim_slice(s));

    let mut collapsed = String::with_capacity(s.len());
    let mut last_was_whitespace = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_whitespace {
                collapsed.push(' ');
                last_was_whitespace = true;
            }
        } else {
            collapsed.push(c);
            last_was_whitespace = false;
        }
    }

    caseless::default_case_fold_str(&collapsed)
}

/// Bytes left literal by the destination encoder: unreserved plus the
/// reserved set links may legitimately carry.
#[rustfmt::skip]
const DEST_SAFE: [bool; 256] = character_set!(b"-_.~!*'();:@&=+$,/?#[]%");

/// Percent-encodes a link destination. Bytes outside the safe set are
/// escaped; well-formed existing `%XX` escapes pass through untouched, a
/// bare `%` is escaped.
pub fn encode_destination(url: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(url.len());
    let mut i = 0;
    while i < url.len() {
        let b = url[i];
        if b == b'%' {
            if i + 2 < url.len() && url[i + 1].is_ascii_hexdigit() && url[i + 2].is_ascii_hexdigit()
            {
                v.extend_from_slice(&url[i..i + 3]);
                i += 3;
                continue;
            }
            v.extend_from_slice(percent_encoding::percent_encode_byte(b).as_bytes());
        } else if isalnum(b) || DEST_SAFE[b as usize] {
            v.push(b);
        } else {
            v.extend_from_slice(percent_encoding::percent_encode_byte(b).as_bytes());
        }
        i += 1;
    }
    v
}

pub fn clean_url(url: &[u8]) -> Vec<u8> {
    let url = trim_slice(url);
    if url.is_empty() {
        return vec![];
    }

    let mut b = if url[0] == b'<' && url[url.len() - 1] == b'>' {
        entity::unescape_html(&url[1..url.len() - 1])
    } else {
        entity::unescape_html(url)
    };

    unescape(&mut b);
    encode_destination(&b)
}

pub fn clean_title(title: &[u8]) -> Vec<u8> {
    if title.is_empty() {
        return vec![];
    }

    let first = title[0];
    let last = title[title.len() - 1];

    let mut b = if (first == b'\'' && last == b'\'')
        || (first == b'(' && last == b')')
        || (first == b'"' && last == b'"')
    {
        entity::unescape_html(&title[1..title.len() - 1])
    } else {
        entity::unescape_html(title)
    };

    unescape(&mut b);
    b
}

pub fn clean_autolink(url: &[u8], kind: AutolinkType) -> Vec<u8> {
    let url = trim_slice(url);
    if url.is_empty() {
        return vec![];
    }

    let mut buf = vec![];
    if kind == AutolinkType::Email {
        buf.extend_from_slice(b"mailto:");
    }
    buf.extend_from_slice(&entity::unescape_html(url));
    encode_destination(&buf)
}

pub fn trim_start_match<'a>(s: &'a [u8], pat: &[u8]) -> &'a [u8] {
    s.strip_prefix(pat).unwrap_or(s)
}

/// Converts heading text to canonical, unique, still human-readable
/// anchors: lowercase, problem characters dropped, spaces to dashes, and a
/// `-N` suffix when the slug has been handed out before.
#[derive(Debug, Default)]
pub struct Anchorizer(HashSet<String>);

impl Anchorizer {
    pub fn new() -> Self {
        Anchorizer(HashSet::new())
    }

    pub fn anchorize(&mut self, header: &str) -> String {
        fn is_permitted_char(&c: &char) -> bool {
            c == ' '
                || c == '-'
                || c.is_letter()
                || c.is_mark()
                || c.is_number()
                || c.is_punctuation_connector()
        }

        let id: String = header
            .to_lowercase()
            .chars()
            .filter(is_permitted_char)
            .map(|c| if c == ' ' { '-' } else { c })
            .collect();

        let mut uniq = 0;
        let id = loop {
            let anchor = if uniq == 0 {
                Cow::from(&id)
            } else {
                Cow::from(format!("{}-{}", id, uniq))
            };

            if !self.0.contains(&*anchor) {
                break anchor.into_owned();
            }

            uniq += 1;
        };
        self.0.insert(id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_code_trims_one_space() {
        assert_eq!(normalize_code(b" foo "), b"foo");
        assert_eq!(normalize_code(b"  foo  "), b" foo ");
        assert_eq!(normalize_code(b"   "), b"   ");
        assert_eq!(normalize_code(b"a\nb"), b"a b");
    }

    #[test]
    fn labels_fold_case_and_whitespace() {
        assert_eq!(normalize_label(b"  FoO \t Bar  "), "foo bar");
        assert_eq!(normalize_label("Ma\u{df}e".as_bytes()), "masse");
    }

    #[test]
    fn destination_encoding() {
        assert_eq!(encode_destination(b"http://a/b?c=d#e"), b"http://a/b?c=d#e");
        assert_eq!(encode_destination(b"a b"), b"a%20b");
        assert_eq!(encode_destination(b"a%20b"), b"a%20b");
        assert_eq!(encode_destination(b"a%2x"), b"a%252x");
        assert_eq!(
            encode_destination("ö".as_bytes()),
            b"%C3%B6"
        );
    }

    #[test]
    fn anchors_dedupe() {
        let mut a = Anchorizer::new();
        assert_eq!(a.anchorize("Stuff"), "stuff");
        assert_eq!(a.anchorize("Stuff"), "stuff-1");
        assert_eq!(a.anchorize("Ticks aren't in"), "ticks-arent-in");
    }

    #[test]
    fn chop_hashtags() {
        let mut l = b"foo ###  ".to_vec();
        chop_trailing_hashtags(&mut l);
        assert_eq!(l, b"foo");

        let mut l = b"foo###".to_vec();
        chop_trailing_hashtags(&mut l);
        assert_eq!(l, b"foo###");
    }
}
