//! HTML → Markdown: parse the HTML into a DOM, lower the DOM into a
//! Markdown AST, fix up list nesting, and hand the tree to the format
//! renderer. Unknown elements survive as verbatim HTML blocks.

use ego_tree::NodeRef;
use scraper::node::Node as DomNode;
use scraper::{ElementRef, Html};

use crate::arena_tree::{NodeId, Tree, WalkStatus};
use crate::cm;
use crate::nodes::{
    Ast, NodeCode, NodeCodeBlock, NodeEmoji, NodeHtmlBlock, NodeLink, NodeList, NodeValue,
    TableAlignment,
};
use crate::parser::Options;
use crate::strings;
use crate::Error;

/// Converts an HTML fragment to Markdown.
pub fn html_to_markdown(html: &str, options: &Options) -> Result<String, Error> {
    let tree = html_to_tree(html, options);

    let mut out = vec![];
    cm::format_document(&tree, options, &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Lowers an HTML fragment to a Markdown AST without rendering it.
pub fn html_to_tree(html: &str, options: &Options) -> Tree {
    let dom = Html::parse_fragment(html);
    for err in &dom.errors {
        log::debug!("DOM parse diagnostic: {}", err);
    }

    let mut lowering = Lowering {
        tree: Tree::new("", Ast::new(NodeValue::Document)),
        options,
    };

    let root = lowering.tree.root();
    for child in dom.tree.root().children() {
        lowering.lower_node(child, root);
    }

    let root = lowering.tree.root();
    lowering.fix_nested_lists(root);
    lowering.tree
}

struct Lowering<'o> {
    tree: Tree,
    #[allow(dead_code)]
    options: &'o Options,
}

impl<'o> Lowering<'o> {
    fn append(&mut self, tip: NodeId, value: NodeValue) -> NodeId {
        // Inline content arriving in a block container gets a paragraph;
        // HTML allows bare text in an `li`, Markdown does not.
        let tip = if !value.block() && self.needs_paragraph(tip) {
            self.paragraph_tip(tip)
        } else {
            tip
        };
        let node = self.tree.alloc(Ast::new(value));
        self.tree.append(tip, node);
        node
    }

    fn needs_paragraph(&self, tip: NodeId) -> bool {
        matches!(
            self.tree[tip].value,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::Item(..)
                | NodeValue::TaskItem(..)
        )
    }

    fn paragraph_tip(&mut self, tip: NodeId) -> NodeId {
        if let Some(last) = self.tree.last_child(tip) {
            if matches!(self.tree[last].value, NodeValue::Paragraph) {
                return last;
            }
        }
        let para = self.tree.alloc(Ast::new(NodeValue::Paragraph));
        self.tree.append(tip, para);
        para
    }

    fn lower_children(&mut self, n: NodeRef<DomNode>, tip: NodeId) {
        for child in n.children() {
            self.lower_node(child, tip);
        }
    }

    fn lower_node(&mut self, n: NodeRef<DomNode>, tip: NodeId) {
        match n.value() {
            DomNode::Text(t) => self.lower_text(&t.text, tip),
            DomNode::Element(..) => self.lower_element(n, tip),
            // Comments, doctypes and processing instructions are dropped.
            _ => {}
        }
    }

    fn lower_text(&mut self, text: &str, tip: NodeId) {
        let text = text.replace('\u{a0}', " ");

        // Inter-element whitespace in block containers is formatting noise,
        // not content.
        if text.trim().is_empty() && !self.accepts_text(tip) {
            return;
        }

        self.append(tip, NodeValue::Text(text.into_bytes()));
    }

    fn accepts_text(&self, tip: NodeId) -> bool {
        self.tree[tip].value.contains_inlines()
            || matches!(
                self.tree[tip].value,
                NodeValue::Emph
                    | NodeValue::Strong
                    | NodeValue::Strikethrough
                    | NodeValue::Link(..)
                    | NodeValue::Image(..)
            )
    }

    fn lower_element(&mut self, n: NodeRef<DomNode>, tip: NodeId) {
        let element = match n.value() {
            DomNode::Element(e) => e,
            _ => unreachable!(),
        };

        if element.attr("data-render") == Some("false") {
            return;
        }

        let name = element.name();
        log::trace!("lowering <{}>", name);

        match name {
            "html" | "body" | "span" | "font" | "thead" | "tbody" => {
                // Transparent containers: children lower into the current
                // tip.
                self.lower_children(n, tip);
            }
            "head" | "meta" | "summary" => {}
            "p" | "div" => {
                let node = self.append(tip, NodeValue::Paragraph);
                self.lower_children(n, node);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                let node = self.append(
                    tip,
                    NodeValue::Heading(crate::nodes::NodeHeading {
                        level,
                        setext: false,
                    }),
                );
                self.lower_children(n, node);
            }
            "hr" => {
                self.append(tip, NodeValue::ThematicBreak);
            }
            "blockquote" => {
                let node = self.append(tip, NodeValue::BlockQuote);
                self.lower_children(n, node);
            }
            "ul" | "ol" => {
                let ordered = name == "ol";
                let start = element
                    .attr("start")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1);
                let nl = NodeList {
                    list_type: if ordered {
                        crate::nodes::ListType::Ordered
                    } else {
                        crate::nodes::ListType::Bullet
                    },
                    start,
                    bullet_char: if ordered { 0 } else { b'*' },
                    tight: true,
                    ..NodeList::default()
                };
                let node = self.append(tip, NodeValue::List(nl));
                self.lower_children(n, node);
            }
            "li" => {
                let nl = self.item_list_data(n, element, tip);
                let node = self.append(tip, NodeValue::Item(nl));
                self.lower_children(n, node);
            }
            "pre" => self.lower_pre(n, tip),
            "em" | "i" => {
                let node = self.append(tip, NodeValue::Emph);
                self.lower_children(n, node);
            }
            "strong" | "b" => {
                let node = self.append(tip, NodeValue::Strong);
                self.lower_children(n, node);
            }
            "del" | "s" | "strike" => {
                let node = self.append(tip, NodeValue::Strikethrough);
                self.lower_children(n, node);
            }
            "code" => {
                let literal = element_text(n);
                if literal.is_empty() {
                    return;
                }
                self.append(
                    tip,
                    NodeValue::Code(NodeCode {
                        num_backticks: 1,
                        literal: literal.into_bytes(),
                    }),
                );
            }
            "br" => {
                self.append(tip, NodeValue::LineBreak);
            }
            "a" => {
                let url = strings::encode_destination(
                    element.attr("href").unwrap_or("").as_bytes(),
                );
                let title = element.attr("title").unwrap_or("").as_bytes().to_vec();
                let node = self.append(tip, NodeValue::Link(NodeLink { url, title }));
                self.lower_children(n, node);
            }
            "img" => self.lower_img(element, tip),
            "input" => {
                if element.attr("type") == Some("checkbox") {
                    self.mark_task_item(tip, element.attr("checked").is_some());
                }
            }
            "table" => self.lower_table(n, tip),
            "tr" => {
                let in_header = n
                    .parent()
                    .and_then(|p| ElementRef::wrap(p))
                    .is_some_and(|p| p.value().name() == "thead");
                let node = self.append(tip, NodeValue::TableRow(in_header));
                self.lower_children(n, node);
            }
            "th" | "td" => {
                let align = parse_align(element.attr("align"));
                let node = self.append(tip, NodeValue::TableCell(align));
                self.lower_children(n, node);
            }
            "details" => {
                let outer = outer_html(n);
                let head = match outer.find("</summary>") {
                    Some(ix) => &outer[..ix + "</summary>".len()],
                    None => &outer[..],
                };
                self.append(
                    tip,
                    NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal: head.as_bytes().to_vec(),
                    }),
                );
                self.lower_children(n, tip);
                self.append(
                    tip,
                    NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal: b"</details>".to_vec(),
                    }),
                );
            }
            _ => {
                log::debug!("unhandled <{}> kept as a verbatim HTML block", name);
                self.append(
                    tip,
                    NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal: outer_html(n).into_bytes(),
                    }),
                );
            }
        }
    }

    /// List data for an `li`: an explicit `data-marker` wins; otherwise
    /// the marker derives from the containing list, leaving ordered items
    /// unnumbered so the renderer counts them out.
    fn item_list_data(
        &self,
        _n: NodeRef<DomNode>,
        element: &scraper::node::Element,
        tip: NodeId,
    ) -> NodeList {
        let parent_list = match self.tree[tip].value {
            NodeValue::List(ref nl) => *nl,
            _ => NodeList {
                bullet_char: b'*',
                ..NodeList::default()
            },
        };

        let mut nl = NodeList {
            start: 0,
            ..parent_list
        };

        if let Some(marker) = element.attr("data-marker") {
            let marker = marker.as_bytes();
            match marker.first() {
                Some(b'*') | Some(b'-') | Some(b'+') => {
                    nl.list_type = crate::nodes::ListType::Bullet;
                    nl.bullet_char = marker[0];
                }
                Some(b'0'..=b'9') => {
                    nl.list_type = crate::nodes::ListType::Ordered;
                    let digits: Vec<u8> = marker
                        .iter()
                        .take_while(|b| b.is_ascii_digit())
                        .copied()
                        .collect();
                    nl.start = String::from_utf8_lossy(&digits).parse().unwrap_or(1);
                    nl.delimiter = if marker.last() == Some(&b')') {
                        crate::nodes::ListDelimType::Paren
                    } else {
                        crate::nodes::ListDelimType::Period
                    };
                }
                _ => {}
            }
        }

        nl
    }

    fn lower_pre(&mut self, n: NodeRef<DomNode>, tip: NodeId) {
        let code_child = n
            .children()
            .find_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "code");

        match code_child {
            Some(code) => {
                let mut info = vec![];
                if let Some(class) = code.value().attr("class") {
                    if let Some(lang) = class.strip_prefix("language-") {
                        info = lang.as_bytes().to_vec();
                    }
                }

                let literal = element_text(*code).into_bytes();
                self.append(
                    tip,
                    NodeValue::CodeBlock(NodeCodeBlock {
                        fenced: true,
                        fence_char: b'`',
                        fence_length: 3,
                        fence_offset: 0,
                        info,
                        literal,
                    }),
                );
            }
            None => {
                self.append(
                    tip,
                    NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal: outer_html(n).into_bytes(),
                    }),
                );
            }
        }
    }

    fn lower_img(&mut self, element: &scraper::node::Element, tip: NodeId) {
        let alt = element.attr("alt").unwrap_or("");
        let src = element.attr("src").unwrap_or("");

        if element.attr("class") == Some("emoji") {
            self.append(
                tip,
                NodeValue::Emoji(NodeEmoji {
                    alias: alt.to_string(),
                    unicode: None,
                    img_url: Some(src.to_string()),
                }),
            );
            return;
        }

        let url = strings::encode_destination(src.as_bytes());
        let title = element.attr("title").unwrap_or("").as_bytes().to_vec();
        let node = self.append(tip, NodeValue::Image(NodeLink { url, title }));
        if !alt.is_empty() {
            self.append(node, NodeValue::Text(alt.as_bytes().to_vec()));
        }
    }

    /// Converts the nearest enclosing list item into a task item.
    fn mark_task_item(&mut self, tip: NodeId, checked: bool) {
        let mut cur = Some(tip);
        while let Some(id) = cur {
            if let NodeValue::Item(..) = self.tree[id].value {
                self.tree[id].value =
                    NodeValue::TaskItem(if checked { Some(b'x') } else { None });

                let mut list = self.tree.parent(id);
                while let Some(l) = list {
                    if let NodeValue::List(ref mut nl) = self.tree[l].value {
                        nl.is_task_list = true;
                        break;
                    }
                    list = self.tree.parent(l);
                }
                return;
            }
            cur = self.tree.parent(id);
        }
    }

    fn lower_table(&mut self, n: NodeRef<DomNode>, tip: NodeId) {
        // Column alignments come from the first row's cells; without a
        // thead that row is a body row and no header row is produced.
        let mut aligns = vec![];
        if let Some(first_row) = find_first_row(n) {
            for cell in first_row.children().filter_map(ElementRef::wrap) {
                if matches!(cell.value().name(), "th" | "td") {
                    aligns.push(parse_align(cell.value().attr("align")));
                }
            }
        }

        let node = self.append(tip, NodeValue::Table(aligns));
        self.lower_children(n, node);
    }

    /// The structural post-pass: a list that ended up a direct child of
    /// another list moves under the preceding list item, and nested
    /// ordered lists restart at one.
    fn fix_nested_lists(&mut self, root: NodeId) {
        self.tree.walk(root, &mut |tree, id, entering| {
            if !entering {
                return WalkStatus::Continue;
            }

            if let NodeValue::List(..) = tree[id].value {
                let parent = tree.parent(id);
                if let Some(p) = parent.filter(|&p| matches!(tree[p].value, NodeValue::List(..))) {
                    let previous_item = tree.previous_sibling(id).filter(|&prev| {
                        matches!(
                            tree[prev].value,
                            NodeValue::Item(..) | NodeValue::TaskItem(..)
                        )
                    });
                    let item = previous_item.unwrap_or_else(|| {
                        let outer = match tree[p].value {
                            NodeValue::List(ref nl) => *nl,
                            _ => unreachable!(),
                        };
                        let item =
                            tree.alloc(Ast::new(NodeValue::Item(NodeList { start: 0, ..outer })));
                        tree.insert_before(id, item);
                        item
                    });
                    tree.detach(id);
                    tree.append(item, id);
                }

                let nested = tree
                    .ancestors(id)
                    .skip(1)
                    .any(|a| matches!(tree[a].value, NodeValue::List(..)));
                if nested {
                    let renumber = match tree[id].value {
                        NodeValue::List(ref mut nl)
                            if nl.list_type == crate::nodes::ListType::Ordered
                                && nl.start != 1 =>
                        {
                            nl.start = 1;
                            true
                        }
                        _ => false,
                    };
                    if renumber {
                        let items: Vec<NodeId> = tree.children(id).collect();
                        for item in items {
                            if let NodeValue::Item(ref mut inl) = tree[item].value {
                                inl.start = 0;
                            }
                        }
                    }
                }
            }

            WalkStatus::Continue
        });
    }
}

fn parse_align(attr: Option<&str>) -> TableAlignment {
    match attr {
        Some("left") => TableAlignment::Left,
        Some("center") => TableAlignment::Center,
        Some("right") => TableAlignment::Right,
        _ => TableAlignment::None,
    }
}

fn find_first_row<'a>(table: NodeRef<'a, DomNode>) -> Option<NodeRef<'a, DomNode>> {
    for child in table.children() {
        let Some(e) = ElementRef::wrap(child) else {
            continue;
        };
        match e.value().name() {
            "tr" => return Some(child),
            "thead" | "tbody" => {
                for sub in child.children() {
                    if ElementRef::wrap(sub).is_some_and(|s| s.value().name() == "tr") {
                        return Some(sub);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn element_text(n: NodeRef<DomNode>) -> String {
    match ElementRef::wrap(n) {
        Some(e) => e.text().collect(),
        None => String::new(),
    }
}

fn outer_html(n: NodeRef<DomNode>) -> String {
    match ElementRef::wrap(n) {
        Some(e) => e.html(),
        None => String::new(),
    }
}
