use super::*;
use pretty_assertions::assert_eq;

use serde_json::Value;

fn render(input: &str, options: &Options) -> Value {
    let tree = parse_with(input, options);
    let bytes = crate::render_json(&tree).unwrap();
    serde_json::from_slice(&bytes).expect("render_json must emit valid JSON")
}

#[test]
fn document_structure() {
    let v = render("# Hello\n\npara *em*\n", &Options::default());

    assert_eq!(v["Type"], "document");
    let children = v["Children"].as_array().unwrap();
    assert_eq!(children.len(), 2);

    assert_eq!(children[0]["Type"], "heading");
    assert_eq!(children[0]["Properties"]["Level"], "1");
    assert_eq!(children[0]["Children"][0]["Type"], "text");
    assert_eq!(children[0]["Children"][0]["Data"], "Hello");

    assert_eq!(children[1]["Type"], "paragraph");
    assert_eq!(children[1]["Children"][1]["Type"], "emph");
    assert_eq!(children[1]["Children"][1]["Children"][0]["Data"], "em");
}

#[test]
fn leaves_have_no_children_key() {
    let v = render("---\n", &Options::default());
    let hr = &v["Children"][0];
    assert_eq!(hr["Type"], "thematic_break");
    assert!(hr.get("Children").is_none());
}

#[test]
fn links_and_code_blocks_carry_properties() {
    let v = render(
        "[x](/u \"t\")\n\n```rust\ncode\n```\n",
        &Options::default(),
    );

    let link = &v["Children"][0]["Children"][0];
    assert_eq!(link["Type"], "link");
    assert_eq!(link["Properties"]["Destination"], "/u");
    assert_eq!(link["Properties"]["Title"], "t");

    let code = &v["Children"][1];
    assert_eq!(code["Type"], "code_block");
    assert_eq!(code["Properties"]["Info"], "rust");
    assert_eq!(code["Data"], "code\n");
}

#[test]
fn tables_serialize_alignments() {
    let mut options = Options::default();
    options.extension.table = true;
    let v = render("|a|b|\n|:-|-:|\n", &options);

    let table = &v["Children"][0];
    assert_eq!(table["Type"], "table");
    assert_eq!(table["Properties"]["Aligns"], "left,right");
    assert_eq!(table["Children"][0]["Properties"]["Header"], "true");
}

#[test]
fn heading_anchors_show_up_as_properties() {
    let mut options = Options::default();
    options.extension.heading_anchor = true;
    let v = render("# My Title\n", &options);
    assert_eq!(v["Children"][0]["Properties"]["id"], "my-title");
}

#[test]
fn refcount_attributes_are_dropped() {
    let options = Options::default();
    let mut tree = parse_with("# A\n", &options);

    let heading = tree.first_child(tree.root()).unwrap();
    tree[heading]
        .attrs
        .push(("refcount".to_string(), "2".to_string()));
    tree[heading]
        .attrs
        .push(("custom".to_string(), "kept".to_string()));

    let bytes = crate::render_json(&tree).unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    let props = &v["Children"][0]["Properties"];
    assert!(props.get("refcount").is_none());
    assert_eq!(props["custom"], "kept");
}

#[test]
fn sibling_separation_is_valid_json() {
    // Three siblings of mixed kinds; serde_json::from_slice already
    // asserts well-formedness, this pins the order too.
    let v = render("a\n\n> b\n\n- c\n", &Options::default());
    let kinds: Vec<&str> = v["Children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["Type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["paragraph", "block_quote", "list"]);
}

#[test]
fn task_items_record_checked_state() {
    let mut options = Options::default();
    options.extension.tasklist = true;
    let v = render("- [x] a\n- [ ] b\n", &options);

    let list = &v["Children"][0];
    assert_eq!(list["Properties"]["TaskList"], "true");
    assert_eq!(list["Children"][0]["Properties"]["Checked"], "true");
    assert_eq!(list["Children"][1]["Properties"]["Checked"], "false");
}
