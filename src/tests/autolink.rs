use super::*;

#[test]
fn www_links() {
    ast_opts(
        "www.commonmark.org\n",
        r#"(document (paragraph (link[http://www.commonmark.org;] "www.commonmark.org")))"#,
        |o| o.extension.autolink = true,
    );
    md_opts!(
        [extension.autolink],
        "www.commonmark.org\n",
        "[www.commonmark.org](http://www.commonmark.org)\n",
    );
}

#[test]
fn scheme_links() {
    ast_opts(
        "Visit https://example.com/now.\n",
        concat!(
            "(document (paragraph \"Visit \"",
            " (link[https://example.com/now;] \"https://example.com/now\") \".\"))"
        ),
        |o| o.extension.autolink = true,
    );
}

#[test]
fn trailing_punctuation_is_trimmed() {
    ast_opts(
        "see www.x.org, ok\n",
        r#"(document (paragraph "see " (link[http://www.x.org;] "www.x.org") ", ok"))"#,
        |o| o.extension.autolink = true,
    );
}

#[test]
fn unbalanced_paren_is_trimmed() {
    ast_opts(
        "(see www.x.org)\n",
        r#"(document (paragraph "(see " (link[http://www.x.org;] "www.x.org") ")"))"#,
        |o| o.extension.autolink = true,
    );
}

#[test]
fn email_addresses() {
    ast_opts(
        "mail foo@bar.baz please\n",
        r#"(document (paragraph "mail " (link[mailto:foo@bar.baz;] "foo@bar.baz") " please"))"#,
        |o| o.extension.autolink = true,
    );
    ast_opts(
        "foo@bar.baz\n",
        r#"(document (paragraph (link[mailto:foo@bar.baz;] "foo@bar.baz")))"#,
        |o| o.extension.autolink = true,
    );
}

#[test]
fn no_autolinks_inside_brackets() {
    ast_opts(
        "[https://x.com]\n",
        r#"(document (paragraph "[https://x.com]"))"#,
        |o| o.extension.autolink = true,
    );
}

#[test]
fn unknown_schemes_stay_text() {
    ast_opts(
        "gopher://x.y\n",
        r#"(document (paragraph "gopher://x.y"))"#,
        |o| o.extension.autolink = true,
    );
}

#[test]
fn disabled_by_default() {
    ast(
        "www.commonmark.org\n",
        r#"(document (paragraph "www.commonmark.org"))"#,
    );
    ast("a@b.cd\n", r#"(document (paragraph "a@b.cd"))"#);
}
