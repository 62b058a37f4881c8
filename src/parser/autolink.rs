//! Bare-URL, `www.` and email autolinks for the GFM autolink extension.
//! URL and `www.` forms are matched during the inline scan; emails are a
//! post-pass over finished text nodes.

use unicode_categories::UnicodeCategories;

use crate::arena_tree::{NodeId, Tree};
use crate::character_set::character_set;
use crate::ctype::{isalnum, isalpha, isspace};
use crate::nodes::{Ast, NodeLink, NodeValue};

fn make_inline(tree: &mut Tree, value: NodeValue) -> NodeId {
    tree.alloc(Ast::new(value))
}

fn make_link(tree: &mut Tree, url: Vec<u8>, text: Vec<u8>) -> NodeId {
    let link = make_inline(
        tree,
        NodeValue::Link(NodeLink {
            url,
            title: vec![],
        }),
    );
    let text = make_inline(tree, NodeValue::Text(text));
    tree.append(link, text);
    link
}

/// Scans for `www.`-prefixed links at `i`. On a match, returns the link
/// node, how many bytes of already-emitted text to rewind, and how many
/// input bytes the link consumes.
pub(crate) fn www_match(
    tree: &mut Tree,
    contents: &[u8],
    i: usize,
) -> Option<(NodeId, usize, usize)> {
    const WWW_DELIMS: [bool; 256] = character_set!(b"*_~([");

    if i > 0 && !isspace(contents[i - 1]) && !WWW_DELIMS[contents[i - 1] as usize] {
        return None;
    }

    if !contents[i..].starts_with(b"www.") {
        return None;
    }

    let mut link_end = check_domain(&contents[i..], false)?;

    while i + link_end < contents.len() && !isspace(contents[i + link_end]) {
        link_end += 1;
    }

    link_end = autolink_delim(&contents[i..], link_end);

    let mut url = b"http://".to_vec();
    url.extend_from_slice(&contents[i..link_end + i]);

    let text = contents[i..link_end + i].to_vec();
    Some((make_link(tree, url, text), 0, link_end))
}

/// Scans for scheme-prefixed links; `i` sits on the `:` that triggered the
/// check, with the scheme already emitted as text (hence the rewind).
pub(crate) fn url_match(
    tree: &mut Tree,
    contents: &[u8],
    i: usize,
) -> Option<(NodeId, usize, usize)> {
    const SCHEMES: [&[u8]; 3] = [b"http", b"https", b"ftp"];

    let size = contents.len();

    if size - i < 4 || contents[i + 1] != b'/' || contents[i + 2] != b'/' {
        return None;
    }

    let mut rewind = 0;
    while rewind < i && isalpha(contents[i - rewind - 1]) {
        rewind += 1;
    }

    if !SCHEMES
        .iter()
        .any(|s| size - i + rewind >= s.len() && &contents[i - rewind..i] == *s)
    {
        return None;
    }

    let mut link_end = check_domain(&contents[i + 3..], true)?;

    while link_end < size - i && !isspace(contents[i + link_end]) {
        link_end += 1;
    }

    link_end = autolink_delim(&contents[i..], link_end);

    let url = contents[i - rewind..i + link_end].to_vec();
    Some((make_link(tree, url.clone(), url), rewind, rewind + link_end))
}

/// Splits matched emails out of `node`, a finished `Text` node, rewriting
/// the tail into fresh siblings. Runs after inline parsing so reference
/// syntax has already consumed its brackets.
pub(crate) fn process_email_autolinks(tree: &mut Tree, node: NodeId) {
    let contents = match tree[node].value {
        NodeValue::Text(ref t) => t.clone(),
        _ => return,
    };
    let len = contents.len();
    let mut i = 0;

    let mut found = None;
    let mut bracket_opening: i32 = 0;

    // Links inside brackets are left for reference-link syntax.
    while i < len {
        match contents[i] {
            b'[' => bracket_opening += 1,
            b']' => bracket_opening -= 1,
            b'@' if bracket_opening <= 0 => {
                if let Some(m) = email_match(&contents, i) {
                    found = Some((i, m));
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }

    let Some((at, (rewind, link_end))) = found else {
        return;
    };

    let start = at - rewind;
    let end = at + link_end;

    let mut url = b"mailto:".to_vec();
    url.extend_from_slice(&contents[start..end]);
    let post = make_link(tree, url, contents[start..end].to_vec());
    tree.insert_after(node, post);

    if end < len {
        let after = make_inline(tree, NodeValue::Text(contents[end..].to_vec()));
        tree.insert_after(post, after);
        process_email_autolinks(tree, after);
    }

    match tree[node].value {
        NodeValue::Text(ref mut t) => {
            t.truncate(start);
            if t.is_empty() {
                tree.detach(node);
            }
        }
        _ => unreachable!(),
    }
}

/// On a match, yields how far before the `@` the address starts and how
/// far past it the domain runs.
fn email_match(contents: &[u8], i: usize) -> Option<(usize, usize)> {
    const EMAIL_OK_SET: [bool; 256] = character_set!(b".+-_");

    let size = contents.len();

    let mut rewind = 0;
    while rewind < i {
        let c = contents[i - rewind - 1];
        if isalnum(c) || EMAIL_OK_SET[c as usize] {
            rewind += 1;
            continue;
        }
        break;
    }

    if rewind == 0 {
        return None;
    }

    let mut link_end = 1;
    let mut np = 0;

    while link_end < size - i {
        let c = contents[i + link_end];

        if isalnum(c) {
            // still in the domain
        } else if c == b'@' {
            return None;
        } else if c == b'.' && link_end < size - i - 1 && isalnum(contents[i + link_end + 1]) {
            np += 1;
        } else if c != b'-' && c != b'_' {
            break;
        }

        link_end += 1;
    }

    if link_end < 2
        || np == 0
        || (!isalpha(contents[i + link_end - 1]) && contents[i + link_end - 1] != b'.')
    {
        return None;
    }

    let link_end = autolink_delim(&contents[i..], link_end);
    if link_end == 0 {
        return None;
    }

    Some((rewind, link_end))
}

fn is_valid_hostchar(ch: char) -> bool {
    !(ch.is_whitespace() || ch.is_punctuation() || ch.is_symbol())
}

/// Validates a hostname prefix: labels of host characters separated by
/// dots, underscores allowed only in all but the last two labels. Returns
/// how many bytes the domain spans.
fn check_domain(data: &[u8], allow_short: bool) -> Option<usize> {
    let mut np = 0;
    let mut uscore1 = 0;
    let mut uscore2 = 0;

    for (i, c) in String::from_utf8_lossy(data).char_indices() {
        if c == '_' {
            uscore2 += 1;
        } else if c == '.' {
            uscore1 = uscore2;
            uscore2 = 0;
            np += 1;
        } else if !is_valid_hostchar(c) && c != '-' {
            if uscore1 == 0 && uscore2 == 0 && (allow_short || np > 0) {
                return Some(i);
            }
            return None;
        }
    }

    if uscore1 > 0 || uscore2 > 0 {
        None
    } else if allow_short || np > 0 {
        Some(data.len())
    } else {
        None
    }
}

/// Trims trailing punctuation, unbalanced closing parens, entity-looking
/// tails, and everything from a `<` onward.
fn autolink_delim(data: &[u8], mut link_end: usize) -> usize {
    const LINK_END_ASSORTMENT: [bool; 256] = character_set!(b"?!.,:*_~'\"");

    for (i, &b) in data.iter().enumerate().take(link_end) {
        if b == b'<' {
            link_end = i;
            break;
        }
    }

    while link_end > 0 {
        let cclose = data[link_end - 1];

        if LINK_END_ASSORTMENT[cclose as usize] {
            link_end -= 1;
        } else if cclose == b';' {
            let mut new_end = link_end - 2;

            while new_end > 0 && isalpha(data[new_end]) {
                new_end -= 1;
            }

            if new_end < link_end - 2 && data[new_end] == b'&' {
                link_end = new_end;
            } else {
                link_end -= 1;
            }
        } else if cclose == b')' {
            let mut opening = 0;
            let mut closing = 0;
            for &b in data.iter().take(link_end) {
                if b == b'(' {
                    opening += 1;
                } else if b == b')' {
                    closing += 1;
                }
            }

            if closing <= opening {
                break;
            }

            link_end -= 1;
        } else {
            break;
        }
    }

    link_end
}
