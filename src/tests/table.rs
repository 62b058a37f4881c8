use super::*;

#[test]
fn basic_table() {
    ast_opts(
        "|a|b|\n|:-|-:|\n|1|2|\n",
        concat!(
            "(document (table[left,right]",
            " (table_row[header] (table_cell \"a\") (table_cell \"b\"))",
            " (table_row[body] (table_cell \"1\") (table_cell \"2\"))))"
        ),
        |o| o.extension.table = true,
    );
}

#[test]
fn alignment_variants() {
    ast_opts(
        "| a | b | c | d |\n| :-- | :-: | --: | --- |\n",
        concat!(
            "(document (table[left,center,right,none]",
            " (table_row[header] (table_cell \"a\") (table_cell \"b\")",
            " (table_cell \"c\") (table_cell \"d\"))))"
        ),
        |o| o.extension.table = true,
    );
}

#[test]
fn render_canonical() {
    md_opts!(
        [extension.table],
        "|a|b|\n|:-|-:|\n|1|2|\n",
        "| a | b |\n| :-- | --: |\n| 1 | 2 |\n",
    );
}

#[test]
fn cells_parse_inlines() {
    ast_opts(
        "|*a*|`b`|\n|-|-|\n",
        concat!(
            "(document (table[none,none]",
            " (table_row[header] (table_cell (emph \"a\")) (table_cell (code \"b\")))))"
        ),
        |o| o.extension.table = true,
    );
}

#[test]
fn escaped_pipes_stay_in_cells() {
    ast_opts(
        "|a\\|b|c|\n|-|-|\n",
        concat!(
            "(document (table[none,none]",
            " (table_row[header] (table_cell \"a|b\") (table_cell \"c\"))))"
        ),
        |o| o.extension.table = true,
    );
    md_opts!(
        [extension.table],
        "|a\\|b|c|\n|-|-|\n",
        "| a\\|b | c |\n| --- | --- |\n",
    );
}

#[test]
fn table_after_paragraph_lines() {
    ast_opts(
        "123\n456\n| a | b |\n| ---| --- |\nd | e\n",
        concat!(
            "(document (paragraph \"123\" (softbreak) \"456\")",
            " (table[none,none]",
            " (table_row[header] (table_cell \"a\") (table_cell \"b\"))",
            " (table_row[body] (table_cell \"d\") (table_cell \"e\"))))"
        ),
        |o| o.extension.table = true,
    );
}

#[test]
fn column_count_must_match() {
    ast_opts(
        "|a|\n|-|-|\n",
        r#"(document (paragraph "|a|" (softbreak) "|-|-|"))"#,
        |o| o.extension.table = true,
    );
}

#[test]
fn short_body_rows_pad_with_empty_cells() {
    ast_opts(
        "|a|b|\n|-|-|\n|c|\n",
        concat!(
            "(document (table[none,none]",
            " (table_row[header] (table_cell \"a\") (table_cell \"b\"))",
            " (table_row[body] (table_cell \"c\") (table_cell))))"
        ),
        |o| o.extension.table = true,
    );
}

#[test]
fn table_ends_at_non_row() {
    ast_opts(
        "|a|\n|-|\nplain text\n",
        concat!(
            "(document (table[none]",
            " (table_row[header] (table_cell \"a\")))",
            " (paragraph \"plain text\"))"
        ),
        |o| o.extension.table = true,
    );
}

#[test]
fn disabled_by_default() {
    ast(
        "|a|b|\n|-|-|\n",
        r#"(document (paragraph "|a|b|" (softbreak) "|-|-|"))"#,
    );
}
