use super::*;
use pretty_assertions::assert_eq;

#[test]
fn atx_headings() {
    ast("# Hello\n", r#"(document (heading[1] "Hello"))"#);
    ast("### Deep\n", r#"(document (heading[3] "Deep"))"#);
    ast(
        "# h1\nfoo\n## h2\n",
        r#"(document (heading[1] "h1") (paragraph "foo") (heading[2] "h2"))"#,
    );
    ast("#hello\n", r##"(document (paragraph "#hello"))"##);
    ast(
        "####### seven\n",
        r########"(document (paragraph "####### seven"))"########,
    );
    ast("# closed ##\n", r#"(document (heading[1] "closed"))"#);
}

#[test]
fn setext_headings() {
    ast("Hi\n==\n", r#"(document (heading[1] "Hi"))"#);
    ast("Ok\n-----\n", r#"(document (heading[2] "Ok"))"#);
    ast(
        "Header\n---\nthis\n",
        r#"(document (heading[2] "Header") (paragraph "this"))"#,
    );
}

#[test]
fn thematic_breaks() {
    ast(
        "---\n\n- - -\n\n___\n",
        "(document (thematic_break) (thematic_break) (thematic_break))",
    );
    // An underlined paragraph stays a setext heading, not a break.
    ast("Foo\n---\n", r#"(document (heading[2] "Foo"))"#);
    // Star breaks can't be setext, so they close the paragraph instead.
    ast(
        "Foo\n***\n",
        r#"(document (paragraph "Foo") (thematic_break))"#,
    );
}

#[test]
fn paragraphs_and_blank_lines() {
    ast(
        "one\n\ntwo\n",
        r#"(document (paragraph "one") (paragraph "two"))"#,
    );
    ast(
        "one\nstill one\n",
        r#"(document (paragraph "one" (softbreak) "still one"))"#,
    );
}

#[test]
fn block_quotes() {
    ast("> Yes.\n", r#"(document (block_quote (paragraph "Yes.")))"#);
    ast(
        "> a\n> b\n",
        r#"(document (block_quote (paragraph "a" (softbreak) "b")))"#,
    );
    ast(
        "> > deep\n",
        r#"(document (block_quote (block_quote (paragraph "deep"))))"#,
    );
}

#[test]
fn lazy_continuation() {
    ast(
        "> a\nb\n",
        r#"(document (block_quote (paragraph "a" (softbreak) "b")))"#,
    );
    ast(
        "> quote\n\nplain\n",
        r#"(document (block_quote (paragraph "quote")) (paragraph "plain"))"#,
    );
}

#[test]
fn bullet_lists() {
    ast(
        "- a\n- b\n",
        r#"(document (list[bullet,tight] (item (paragraph "a")) (item (paragraph "b"))))"#,
    );
    ast(
        "- a\n\n- b\n",
        r#"(document (list[bullet,loose] (item (paragraph "a")) (item (paragraph "b"))))"#,
    );
    // Different bullets start a new list.
    ast(
        "- a\n+ b\n",
        r#"(document (list[bullet,tight] (item (paragraph "a"))) (list[bullet,tight] (item (paragraph "b"))))"#,
    );
}

#[test]
fn ordered_lists() {
    ast(
        "2. Hello.\n3. Hi.\n",
        r#"(document (list[ordered start=2,tight] (item[2] (paragraph "Hello.")) (item[3] (paragraph "Hi."))))"#,
    );
    ast(
        "1) p\n",
        r#"(document (list[ordered start=1,tight] (item[1] (paragraph "p"))))"#,
    );
    // Only "1." can interrupt a paragraph.
    ast(
        "text\n2. no\n",
        r#"(document (paragraph "text" (softbreak) "2. no"))"#,
    );
}

#[test]
fn nested_lists() {
    ast(
        "- a\n  - b\n",
        r#"(document (list[bullet,tight] (item (paragraph "a") (list[bullet,tight] (item (paragraph "b"))))))"#,
    );
}

#[test]
fn list_item_with_two_blocks() {
    ast(
        "- foo\n\n\tbar\n",
        r#"(document (list[bullet,loose] (item (paragraph "foo") (paragraph "bar"))))"#,
    );
}

#[test]
fn indented_code() {
    ast("    hello\n", "(document (code_block[]\"hello\\n\"))");
    ast(
        "    a\n\n    b\n",
        "(document (code_block[]\"a\\n\\nb\\n\"))",
    );
    // Indented code can't interrupt a paragraph.
    ast(
        "para\n    still para\n",
        r#"(document (paragraph "para" (softbreak) "still para"))"#,
    );
}

#[test]
fn fenced_code() {
    ast(
        "```rust\nfn x();\n```\n",
        "(document (code_block[rust]\"fn x();\\n\"))",
    );
    ast("```\nx\n```\n", "(document (code_block[]\"x\\n\"))");
    // The closing fence must be at least as long as the opener.
    ast(
        "````\nx\n```\n````\n",
        "(document (code_block[]\"x\\n```\\n\"))",
    );
    // Backticks are forbidden in a backtick fence's info string (the
    // whole construct collapses to one paragraph-level code span); tildes
    // don't care.
    ast(
        "``` a`b\nx\n```\n",
        r#"(document (paragraph (code "a`b x")))"#,
    );
    ast("~~~ a`b\nx\n~~~\n", "(document (code_block[a`b]\"x\\n\"))");
    // Unclosed fences run to the end of the document.
    ast("```\nx\n", "(document (code_block[]\"x\\n\"))");
}

#[test]
fn html_blocks() {
    ast(
        "<div>\nx\n</div>\n",
        "(document (html_block\"<div>\\nx\\n</div>\\n\"))",
    );
    ast(
        "<!-- c -->\npara\n",
        "(document (html_block\"<!-- c -->\\n\") (paragraph \"para\"))",
    );
    ast(
        "<script>\nvar x = '*hi*';\n</script>\n",
        "(document (html_block\"<script>\\nvar x = '*hi*';\\n</script>\\n\"))",
    );
    // Condition six ends at a blank line.
    ast(
        "<div>\na\n\nb\n",
        "(document (html_block\"<div>\\na\\n\") (paragraph \"b\"))",
    );
    // A lone custom tag is condition seven and can't interrupt a
    // paragraph.
    ast("<xyz>\n", "(document (html_block\"<xyz>\\n\"))");
    ast(
        "para\n<xyz>\n",
        r#"(document (paragraph "para" (softbreak) (html_inline"<xyz>")))"#,
    );
}

#[test]
fn reference_links() {
    ast(
        "[x]\n\n[x]: /url \"t\"\n",
        r#"(document (paragraph (link[/url;t] "x")))"#,
    );
    ast(
        "[text][label]\n\n[label]: /dest\n",
        r#"(document (paragraph (link[/dest;] "text")))"#,
    );
    // Labels fold case and collapse interior whitespace.
    ast(
        "[Foo   Bar]\n\n[foo bar]: /u\n",
        r#"(document (paragraph (link[/u;] "Foo   Bar")))"#,
    );
    // Unresolved references stay literal.
    ast("[nope]\n", r#"(document (paragraph "[nope]"))"#);
}

#[test]
fn hard_and_soft_breaks() {
    ast(
        "a  \nb\n",
        r#"(document (paragraph "a" (linebreak) "b"))"#,
    );
    ast(
        "a\\\nb\n",
        r#"(document (paragraph "a" (linebreak) "b"))"#,
    );
    ast("a\nb\n", r#"(document (paragraph "a" (softbreak) "b"))"#);
}

#[test]
fn entities() {
    ast("&amp; &#65; &#x42;\n", r#"(document (paragraph "& A B"))"#);
    ast("&bogus123;\n", r#"(document (paragraph "&bogus123;"))"#);
}

#[test]
fn backslash_escapes() {
    ast("\\*not em\\*\n", r#"(document (paragraph "*not em*"))"#);
    ast("\\\\\n", r#"(document (paragraph "\\"))"#);
    // A backslash before a non-punctuation byte stays literal.
    ast("a\\b\n", r#"(document (paragraph "a\\b"))"#);
}

#[test]
fn code_spans() {
    ast("`a`\n", r#"(document (paragraph (code "a")))"#);
    ast("`` b ` c ``\n", r#"(document (paragraph (code "b ` c")))"#);
    ast("`unclosed\n", r#"(document (paragraph "`unclosed"))"#);
    ast("`a\nb`\n", r#"(document (paragraph (code "a b")))"#);
}

#[test]
fn emphasis_and_strong() {
    ast(
        "*foo **bar** baz*\n",
        r#"(document (paragraph (emph "foo " (strong "bar") " baz")))"#,
    );
    ast("**bold**\n", r#"(document (paragraph (strong "bold")))"#);
    ast("_under_\n", r#"(document (paragraph (emph "under")))"#);
    ast(
        "***both***\n",
        r#"(document (paragraph (emph (strong "both"))))"#,
    );
    ast(
        "foo_bar_baz\n",
        r#"(document (paragraph "foo_bar_baz"))"#,
    );
    ast(
        "foo*bar*baz\n",
        r#"(document (paragraph "foo" (emph "bar") "baz"))"#,
    );
    ast("* not emph *\n", r#"(document (list[bullet,tight] (item (paragraph "not emph *"))))"#);
    ast("a * b * c\n", r#"(document (paragraph "a * b * c"))"#);
}

#[test]
fn inline_links() {
    ast(
        "[x](http://a \"t\")\n",
        r#"(document (paragraph (link[http://a;t] "x")))"#,
    );
    ast(
        "[x](<my url>)\n",
        r#"(document (paragraph (link[my%20url;] "x")))"#,
    );
    ast(
        "[x](a(b)c)\n",
        r#"(document (paragraph (link[a(b)c;] "x")))"#,
    );
    ast("[x](a b)\n", r#"(document (paragraph "[x](a b)"))"#);
    ast(
        "[em *text*](/u)\n",
        r#"(document (paragraph (link[/u;] "em " (emph "text"))))"#,
    );
}

#[test]
fn images() {
    ast(
        "![alt](/img.png)\n",
        r#"(document (paragraph (image[/img.png;] "alt")))"#,
    );
    ast(
        "![alt](/i.png \"title\")\n",
        r#"(document (paragraph (image[/i.png;title] "alt")))"#,
    );
}

#[test]
fn core_autolinks() {
    ast(
        "<http://x.y>\n",
        r#"(document (paragraph (link[http://x.y;] "http://x.y")))"#,
    );
    ast(
        "<a@b.c>\n",
        r#"(document (paragraph (link[mailto:a@b.c;] "a@b.c")))"#,
    );
    ast("<not a link>\n", r#"(document (paragraph "<not a link>"))"#);
}

#[test]
fn inline_html() {
    ast(
        "a <b>x</b>\n",
        r#"(document (paragraph "a " (html_inline"<b>") "x" (html_inline"</b>")))"#,
    );
    ast(
        "a <!-- c --> b\n",
        r#"(document (paragraph "a " (html_inline"<!-- c -->") " b"))"#,
    );
    ast(
        "a <? pi ?> b\n",
        r#"(document (paragraph "a " (html_inline"<? pi ?>") " b"))"#,
    );
    ast(
        "a <img src=\"x\" alt='y'/> z\n",
        r#"(document (paragraph "a " (html_inline"<img src=\"x\" alt='y'/>") " z"))"#,
    );
    ast("a <5> b\n", r#"(document (paragraph "a <5> b"))"#);
    ast("5 < 6\n", r#"(document (paragraph "5 < 6"))"#);
}

#[test]
fn tabs() {
    ast("\tfoo\n", "(document (code_block[]\"foo\\n\"))");
    ast(
        "- a\n\tb\n",
        r#"(document (list[bullet,tight] (item (paragraph "a" (softbreak) "b"))))"#,
    );
}

#[test]
fn byte_order_mark() {
    ast("\u{feff}# x\n", r#"(document (heading[1] "x"))"#);
}

#[test]
fn nul_bytes_are_replaced() {
    ast("a\0b\n", "(document (paragraph \"a\u{fffd}b\"))");
}

#[test]
fn crlf_line_endings() {
    ast(
        "a\r\nb\r\n\r\n# h\r\n",
        r#"(document (paragraph "a" (softbreak) "b") (heading[1] "h"))"#,
    );
}

#[test]
fn empty_input() {
    ast("", "(document)");
    ast("\n\n\n", "(document)");
}

#[test]
fn tree_pointer_consistency() {
    let options = Options::default();
    let tree = parse_with("# h\n\n- a\n- *b*\n\n> q\n", &options);

    let root = tree.root();
    assert!(tree.parent(root).is_none());
    assert!(matches!(tree[root].value, NodeValue::Document));

    for id in tree.descendants(root) {
        if let Some(first) = tree.first_child(id) {
            assert!(tree.previous_sibling(first).is_none());
            assert_eq!(tree.parent(first), Some(id));
        }
        if let Some(last) = tree.last_child(id) {
            assert!(tree.next_sibling(last).is_none());
            assert_eq!(tree.parent(last), Some(id));
        }
        for child in tree.children(id) {
            assert_eq!(tree.parent(child), Some(id));
            if let Some(next) = tree.next_sibling(child) {
                assert_eq!(tree.previous_sibling(next), Some(child));
            }
        }
    }
}
