use super::*;
use pretty_assertions::assert_eq;
use crate::nodes::NodeEmoji;

#[test]
fn shortcode_aliases_resolve() {
    ast_opts(
        "Happy Friday! :smile:\n",
        r#"(document (paragraph "Happy Friday! " (emoji[smile])))"#,
        |o| o.extension.emoji = true,
    );
}

#[test]
fn resolved_emoji_carry_unicode() {
    let mut options = Options::default();
    options.extension.emoji = true;
    let tree = parse_with(":smile:\n", &options);

    let emoji = tree
        .descendants(tree.root())
        .find_map(|id| match tree[id].value {
            NodeValue::Emoji(ref ne) => Some(ne.clone()),
            _ => None,
        })
        .expect("emoji node");
    assert!(emoji.unicode.is_some());
    assert!(emoji.img_url.is_none());
}

#[test]
fn alias_map_wins_and_maps_to_images() {
    let mut options = Options::default();
    options.extension.emoji = true;
    options
        .extension
        .emoji_aliases
        .insert("conga".to_string(), "https://e/conga.gif".to_string());
    let tree = parse_with(":conga:\n", &options);

    let emoji = tree
        .descendants(tree.root())
        .find_map(|id| match tree[id].value {
            NodeValue::Emoji(ref ne) => Some(ne.clone()),
            _ => None,
        })
        .expect("emoji node");
    assert_eq!(emoji, NodeEmoji {
        alias: "conga".to_string(),
        unicode: None,
        img_url: Some("https://e/conga.gif".to_string()),
    });
}

#[test]
fn unknown_aliases_stay_literal() {
    ast_opts(
        ":zzzqqq:\n",
        r#"(document (paragraph ":zzzqqq:"))"#,
        |o| o.extension.emoji = true,
    );
}

#[test]
fn disabled_by_default() {
    ast(":smile:\n", r#"(document (paragraph ":smile:"))"#);
}

#[test]
fn renders_back_to_aliases() {
    md_opts!([extension.emoji], "Hi :smile:!\n", "Hi :smile:!\n");
}
