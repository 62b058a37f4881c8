//! A stable JSON serialization of the tree, written walker-style: each
//! node emits its fields on entry, a `"Children"` array spans its subtree,
//! and siblings are comma-separated. The output is valid JSON end to end.

use std::io::Write;

use serde_json::{Map, Value};

use crate::arena_tree::{NodeId, Tree};
use crate::nodes::{ListDelimType, ListType, NodeValue};
use crate::Error;

/// Serializes the tree rooted at its document node.
pub fn format_document(tree: &Tree, output: &mut dyn Write) -> Result<(), Error> {
    enum Phase {
        Pre,
        Post,
    }
    let mut stack = vec![(tree.root(), Phase::Pre)];

    while let Some((node, phase)) = stack.pop() {
        match phase {
            Phase::Pre => {
                if tree.previous_sibling(node).is_some() {
                    output.write_all(b",")?;
                }

                let fields = Value::Object(node_fields(tree, node));
                let serialized = serde_json::to_string(&fields)?;
                // Drop the closing brace; the children array goes inside.
                output.write_all(serialized[..serialized.len() - 1].as_bytes())?;

                if tree.first_child(node).is_some() {
                    output.write_all(b",\"Children\":[")?;
                } else {
                    output.write_all(b"}")?;
                }

                stack.push((node, Phase::Post));
                for ch in tree.reverse_children(node) {
                    stack.push((ch, Phase::Pre));
                }
            }
            Phase::Post => {
                if tree.first_child(node).is_some() {
                    output.write_all(b"]}")?;
                }
            }
        }
    }

    Ok(())
}

fn node_fields(tree: &Tree, node: NodeId) -> Map<String, Value> {
    let ast = &tree[node];
    let mut fields = Map::new();

    fields.insert(
        "Type".to_string(),
        Value::String(ast.value.type_name().to_string()),
    );

    let data = match ast.value {
        NodeValue::Text(ref t) | NodeValue::HtmlInline(ref t) => t.clone(),
        NodeValue::Code(ref code) => code.literal.clone(),
        NodeValue::CodeBlock(ref ncb) => ncb.literal.clone(),
        NodeValue::HtmlBlock(ref nhb) => nhb.literal.clone(),
        NodeValue::Emoji(ref ne) => ne.alias.as_bytes().to_vec(),
        _ => vec![],
    };
    if !data.is_empty() {
        fields.insert(
            "Data".to_string(),
            Value::String(String::from_utf8_lossy(&data).into_owned()),
        );
    }

    let mut props = properties(tree, node);
    for (k, v) in &ast.attrs {
        props.insert(k.clone(), Value::String(v.clone()));
    }
    props.remove("refcount");
    if !props.is_empty() {
        fields.insert("Properties".to_string(), Value::Object(props));
    }

    fields
}

fn list_properties(props: &mut Map<String, Value>, nl: &crate::nodes::NodeList) {
    props.insert(
        "ListType".to_string(),
        Value::String(
            match nl.list_type {
                ListType::Bullet => "bullet",
                ListType::Ordered => "ordered",
            }
            .to_string(),
        ),
    );
    if nl.list_type == ListType::Ordered {
        props.insert("Start".to_string(), Value::String(nl.start.to_string()));
        props.insert(
            "Delimiter".to_string(),
            Value::String(
                match nl.delimiter {
                    ListDelimType::Period => "period",
                    ListDelimType::Paren => "paren",
                }
                .to_string(),
            ),
        );
    } else if nl.bullet_char != 0 {
        props.insert(
            "BulletChar".to_string(),
            Value::String((nl.bullet_char as char).to_string()),
        );
    }
}

fn properties(tree: &Tree, node: NodeId) -> Map<String, Value> {
    let mut props = Map::new();

    match tree[node].value {
        NodeValue::Heading(ref nh) => {
            props.insert("Level".to_string(), Value::String(nh.level.to_string()));
            if nh.setext {
                props.insert("Setext".to_string(), Value::String("true".to_string()));
            }
        }
        NodeValue::List(ref nl) => {
            list_properties(&mut props, nl);
            props.insert("Tight".to_string(), Value::String(nl.tight.to_string()));
            if nl.is_task_list {
                props.insert("TaskList".to_string(), Value::String("true".to_string()));
            }
        }
        NodeValue::Item(ref nl) => {
            list_properties(&mut props, nl);
        }
        NodeValue::TaskItem(symbol) => {
            props.insert(
                "Checked".to_string(),
                Value::String(symbol.is_some().to_string()),
            );
        }
        NodeValue::CodeBlock(ref ncb) => {
            if !ncb.info.is_empty() {
                props.insert(
                    "Info".to_string(),
                    Value::String(String::from_utf8_lossy(&ncb.info).into_owned()),
                );
            }
            props.insert("Fenced".to_string(), Value::String(ncb.fenced.to_string()));
        }
        NodeValue::Link(ref nl) | NodeValue::Image(ref nl) => {
            props.insert(
                "Destination".to_string(),
                Value::String(String::from_utf8_lossy(&nl.url).into_owned()),
            );
            if !nl.title.is_empty() {
                props.insert(
                    "Title".to_string(),
                    Value::String(String::from_utf8_lossy(&nl.title).into_owned()),
                );
            }
        }
        NodeValue::Emoji(ref ne) => {
            if let Some(ref unicode) = ne.unicode {
                props.insert("Unicode".to_string(), Value::String(unicode.clone()));
            }
            if let Some(ref url) = ne.img_url {
                props.insert("ImgURL".to_string(), Value::String(url.clone()));
            }
        }
        NodeValue::Table(ref aligns) => {
            let names: Vec<&str> = aligns
                .iter()
                .map(|a| a.json_name().unwrap_or("none"))
                .collect();
            props.insert(
                "Aligns".to_string(),
                Value::String(names.join(",")),
            );
        }
        NodeValue::TableRow(header) => {
            if header {
                props.insert("Header".to_string(), Value::String("true".to_string()));
            }
        }
        NodeValue::TableCell(align) => {
            if let Some(name) = align.json_name() {
                props.insert("Align".to_string(), Value::String(name.to_string()));
            }
        }
        _ => {}
    }

    props
}
