use super::*;

use ntest::timeout;

fn parse_and_render(input: &str) {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    let tree = parse_with(input, &options);
    let _ = crate::render_markdown(&tree, &options);
}

#[test]
#[timeout(10000)]
fn nested_emphasis_runs() {
    parse_and_render(&format!(
        "{}{}",
        "*a **a ".repeat(2000),
        "b** a*".repeat(2000)
    ));
}

#[test]
#[timeout(10000)]
fn many_link_openers() {
    parse_and_render(&"[".repeat(20000));
}

#[test]
#[timeout(10000)]
fn nested_brackets() {
    parse_and_render(&format!(
        "{}a{}",
        "[".repeat(2000),
        "]".repeat(2000)
    ));
}

#[test]
#[timeout(10000)]
fn unclosed_backtick_runs() {
    parse_and_render(&"`a".repeat(5000));
}

#[test]
#[timeout(10000)]
fn many_emphasis_closers() {
    parse_and_render(&"a***b ".repeat(4000));
}

#[test]
#[timeout(10000)]
fn deep_block_quotes() {
    parse_and_render(&format!("{}a\n", "> ".repeat(2000)));
}

#[test]
#[timeout(10000)]
fn long_unmatched_tildes() {
    parse_and_render(&"~~x ".repeat(5000));
}
