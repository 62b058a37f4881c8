use super::*;
use pretty_assertions::assert_eq;

#[track_caller]
fn h2m(html: &str, expected: &str) {
    let options = Options::default();
    let out = crate::html_to_markdown(html, &options).unwrap();
    pretty_assertions::assert_eq!(out, expected, "html: {:?}", html);
}

#[test]
fn headings() {
    h2m("<h1>Hello</h1>", "# Hello\n");
    h2m("<h3>Deep</h3>", "### Deep\n");
}

#[test]
fn paragraphs_and_inlines() {
    h2m("<p>a <em>b</em> <strong>c</strong></p>", "a *b* **c**\n");
    h2m("<div>block</div>", "block\n");
    h2m("<p>a<br>b</p>", "a\\\nb\n");
    h2m("<p>a <code>x + y</code> b</p>", "a `x + y` b\n");
    h2m("<p><del>gone</del></p>", "~~gone~~\n");
}

#[test]
fn nbsp_normalizes_to_space() {
    h2m("<p>a\u{a0}b</p>", "a b\n");
}

#[test]
fn links_and_images() {
    h2m("<p><a href=\"/u\" title=\"T\">x</a></p>", "[x](/u \"T\")\n");
    h2m("<p><a href=\"/a b\">x</a></p>", "[x](/a%20b)\n");
    h2m(
        "<p><img src=\"/i.png\" alt=\"pic\" title=\"T\"></p>",
        "![pic](/i.png \"T\")\n",
    );
}

#[test]
fn emoji_images() {
    h2m(
        "<p><img class=\"emoji\" alt=\"smile\" src=\"https://e/smile.png\"></p>",
        ":smile:\n",
    );
}

#[test]
fn bullet_lists() {
    h2m("<ul><li>x</li><li>y</li></ul>", "* x\n* y\n");
    h2m(
        "<ul><li>a<ul><li>b</li></ul></li></ul>",
        "* a\n  * b\n",
    );
}

#[test]
fn ordered_lists() {
    h2m("<ol><li>a</li><li>b</li></ol>", "1. a\n2. b\n");
    h2m("<ol start=\"3\"><li>a</li><li>b</li></ol>", "3. a\n4. b\n");
}

#[test]
fn data_marker_wins() {
    h2m("<ul><li data-marker=\"-\">x</li></ul>", "- x\n");
    h2m("<ol><li data-marker=\"7)\">x</li></ol>", "7) x\n");
}

#[test]
fn nested_list_hoisting() {
    // A list directly under a list gains a surrounding item.
    let options = Options::default();
    let tree = crate::html_to_tree("<ul><ul><li>x</li></ul></ul>", &options);
    assert_eq!(
        shape(&tree),
        concat!(
            "(document (list[bullet,tight] (item",
            " (list[bullet,tight] (item (paragraph \"x\"))))))"
        )
    );

    // And the rendered Markdown reparses to the same structure.
    let out = crate::html_to_markdown("<ul><ul><li>x</li></ul></ul>", &options).unwrap();
    let reparsed = parse_with(&out, &options);
    assert_eq!(shape(&tree), shape(&reparsed));
}

#[test]
fn nested_ordered_lists_restart_at_one() {
    h2m(
        "<ul><li>a<ol start=\"5\"><li>b</li></ol></li></ul>",
        "* a\n  1. b\n",
    );
}

#[test]
fn task_list_inputs() {
    h2m(
        "<ul><li><input type=\"checkbox\" checked>done</li></ul>",
        "* [x] done\n",
    );
    h2m(
        "<ul><li><input type=\"checkbox\">todo</li></ul>",
        "* [ ] todo\n",
    );
}

#[test]
fn block_quotes() {
    h2m("<blockquote><p>q</p></blockquote>", "> q\n");
}

#[test]
fn thematic_breaks() {
    h2m("<p>a</p><hr><p>b</p>", "a\n\n---\n\nb\n");
}

#[test]
fn code_blocks() {
    h2m(
        "<pre><code class=\"language-rust\">fn x() {}\n</code></pre>",
        "```rust\nfn x() {}\n```\n",
    );
    h2m("<pre><code>plain\n</code></pre>", "```\nplain\n```\n");
}

#[test]
fn pre_without_code_is_verbatim_html() {
    h2m("<pre>raw</pre>", "<pre>raw</pre>\n");
}

#[test]
fn tables() {
    h2m(
        concat!(
            "<table><thead><tr><th align=\"left\">a</th><th>b</th></tr></thead>",
            "<tbody><tr><td>1</td><td>2</td></tr></tbody></table>"
        ),
        "| a | b |\n| :-- | --- |\n| 1 | 2 |\n",
    );
}

#[test]
fn headerless_tables_emit_no_header_row() {
    let options = Options::default();
    let tree = crate::html_to_tree(
        "<table><tbody><tr><td>1</td><td>2</td></tr></tbody></table>",
        &options,
    );
    assert_eq!(
        shape(&tree),
        concat!(
            "(document (table[none,none]",
            " (table_row[body] (table_cell \"1\") (table_cell \"2\"))))"
        )
    );
}

#[test]
fn details_split_at_summary() {
    h2m(
        "<details><summary>t</summary><p>body</p></details>",
        "<details><summary>t</summary>\n\nbody\n\n</details>\n",
    );
}

#[test]
fn transparent_containers() {
    h2m("<p><font>x</font></p>", "x\n");
    h2m("<p><span>x</span> y</p>", "x y\n");
}

#[test]
fn skipped_nodes() {
    h2m("<div data-render=\"false\">x</div>", "");
    h2m("<!-- comment --><p>x</p>", "x\n");
}

#[test]
fn unknown_elements_stay_verbatim() {
    h2m("<center>x</center>", "<center>x</center>\n");
}

#[test]
fn lowering_matches_reparse_of_render() {
    let options = Options::default();
    for html in [
        "<h2>t</h2><p>a <em>b</em></p>",
        "<ul><li>one</li><li>two<ul><li>three</li></ul></li></ul>",
        "<blockquote><p>q</p></blockquote>",
        "<pre><code class=\"language-c\">x;\n</code></pre>",
    ] {
        let lowered = crate::html_to_tree(html, &options);
        let rendered = crate::html_to_markdown(html, &options).unwrap();
        let reparsed = parse_with(&rendered, &options);
        assert_eq!(shape(&lowered), shape(&reparsed), "html: {:?}", html);
    }
}
