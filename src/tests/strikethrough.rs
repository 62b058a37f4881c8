use super::*;

#[test]
fn double_tildes_delimit() {
    ast_opts(
        "~~hi~~\n",
        r#"(document (paragraph (strikethrough "hi")))"#,
        |o| o.extension.strikethrough = true,
    );
    ast_opts(
        "a ~~b~~ c\n",
        r#"(document (paragraph "a " (strikethrough "b") " c"))"#,
        |o| o.extension.strikethrough = true,
    );
}

#[test]
fn single_tilde_never_delimits() {
    ast_opts(
        "~hi~\n",
        r#"(document (paragraph "~hi~"))"#,
        |o| o.extension.strikethrough = true,
    );
}

#[test]
fn longer_runs_stay_literal() {
    ast_opts(
        "a ~~~x~~~ b\n",
        r#"(document (paragraph "a ~~~x~~~ b"))"#,
        |o| o.extension.strikethrough = true,
    );
}

#[test]
fn nests_with_emphasis() {
    ast_opts(
        "~~a *b*~~\n",
        r#"(document (paragraph (strikethrough "a " (emph "b"))))"#,
        |o| o.extension.strikethrough = true,
    );
}

#[test]
fn disabled_by_default() {
    ast("~~hi~~\n", r#"(document (paragraph "~~hi~~"))"#);
}

#[test]
fn renders_double_tildes() {
    md_opts!([extension.strikethrough], "~~hi~~ there\n", "~~hi~~ there\n");
}
