//! The node arena. All nodes of a document live contiguously in one `Vec`
//! owned by the [`Tree`]; structural links are integer handles rather than
//! references, so parent/sibling cycles never materialize at the pointer
//! level. Unlinking a node fixes exactly four links and preserves the
//! parent's remaining child chain.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::nodes::Ast;

/// Integer handle to a node in a [`Tree`]. Handles are only meaningful for
/// the tree that allocated them and stay valid for the tree's lifetime,
/// even after the node is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Links {
    parent: Option<NodeId>,
    previous_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

struct NodeSlot {
    ast: Ast,
    links: Links,
}

/// Visitor verdict for [`Tree::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    /// Keep going.
    Continue,
    /// Don't descend into this node's children (entering visits only).
    SkipChildren,
    /// Abort the walk.
    Stop,
}

/// The document tree: a root node, the arena of all nodes, and the document
/// name handed to `parse`.
pub struct Tree {
    nodes: Vec<NodeSlot>,
    root: NodeId,
    pub name: String,
}

impl Tree {
    pub fn new(name: &str, root: Ast) -> Tree {
        let mut tree = Tree {
            nodes: Vec::with_capacity(32),
            root: NodeId(0),
            name: name.to_string(),
        };
        tree.root = tree.alloc(root);
        tree
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocates a detached node.
    pub fn alloc(&mut self, ast: Ast) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(NodeSlot {
            ast,
            links: Links {
                parent: None,
                previous_sibling: None,
                next_sibling: None,
                first_child: None,
                last_child: None,
            },
        });
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].links.parent
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].links.previous_sibling
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].links.next_sibling
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].links.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].links.last_child
    }

    /// Detaches `id` from its parent and siblings; children travel with it.
    pub fn detach(&mut self, id: NodeId) {
        let Links {
            parent,
            previous_sibling,
            next_sibling,
            ..
        } = self.nodes[id.index()].links;

        {
            let links = &mut self.nodes[id.index()].links;
            links.parent = None;
            links.previous_sibling = None;
            links.next_sibling = None;
        }

        if let Some(next) = next_sibling {
            self.nodes[next.index()].links.previous_sibling = previous_sibling;
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].links.last_child = previous_sibling;
        }

        if let Some(prev) = previous_sibling {
            self.nodes[prev.index()].links.next_sibling = next_sibling;
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].links.first_child = next_sibling;
        }
    }

    /// Appends `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(parent != child);
        self.detach(child);
        self.nodes[child.index()].links.parent = Some(parent);
        if let Some(last) = self.nodes[parent.index()].links.last_child.take() {
            self.nodes[child.index()].links.previous_sibling = Some(last);
            debug_assert!(self.nodes[last.index()].links.next_sibling.is_none());
            self.nodes[last.index()].links.next_sibling = Some(child);
        } else {
            debug_assert!(self.nodes[parent.index()].links.first_child.is_none());
            self.nodes[parent.index()].links.first_child = Some(child);
        }
        self.nodes[parent.index()].links.last_child = Some(child);
    }

    /// Prepends `child` as the first child of `parent`.
    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(parent != child);
        self.detach(child);
        self.nodes[child.index()].links.parent = Some(parent);
        if let Some(first) = self.nodes[parent.index()].links.first_child.take() {
            self.nodes[child.index()].links.next_sibling = Some(first);
            self.nodes[first.index()].links.previous_sibling = Some(child);
        } else {
            self.nodes[parent.index()].links.last_child = Some(child);
        }
        self.nodes[parent.index()].links.first_child = Some(child);
    }

    /// Inserts `sibling` directly after `id`.
    pub fn insert_after(&mut self, id: NodeId, sibling: NodeId) {
        debug_assert!(id != sibling);
        self.detach(sibling);
        let parent = self.nodes[id.index()].links.parent;
        self.nodes[sibling.index()].links.parent = parent;
        self.nodes[sibling.index()].links.previous_sibling = Some(id);
        if let Some(next) = self.nodes[id.index()].links.next_sibling.take() {
            self.nodes[next.index()].links.previous_sibling = Some(sibling);
            self.nodes[sibling.index()].links.next_sibling = Some(next);
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].links.last_child = Some(sibling);
        }
        self.nodes[id.index()].links.next_sibling = Some(sibling);
    }

    /// Inserts `sibling` directly before `id`.
    pub fn insert_before(&mut self, id: NodeId, sibling: NodeId) {
        debug_assert!(id != sibling);
        self.detach(sibling);
        let parent = self.nodes[id.index()].links.parent;
        self.nodes[sibling.index()].links.parent = parent;
        self.nodes[sibling.index()].links.next_sibling = Some(id);
        if let Some(prev) = self.nodes[id.index()].links.previous_sibling.take() {
            self.nodes[prev.index()].links.next_sibling = Some(sibling);
            self.nodes[sibling.index()].links.previous_sibling = Some(prev);
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].links.first_child = Some(sibling);
        }
        self.nodes[id.index()].links.previous_sibling = Some(sibling);
    }

    /// Iterates `id`'s children in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        AxisIter {
            tree: self,
            next: self.first_child(id),
            axis: Axis::NextSibling,
        }
    }

    /// Iterates `id`'s children in reverse order.
    pub fn reverse_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        AxisIter {
            tree: self,
            next: self.last_child(id),
            axis: Axis::PreviousSibling,
        }
    }

    /// Iterates `id` and its ancestors, root last.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        AxisIter {
            tree: self,
            next: Some(id),
            axis: Axis::Parent,
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` first. The
    /// tree must not be mutated while the iterator is live; use
    /// [`Tree::walk`] for mutating traversals.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![id];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            let kids: Vec<NodeId> = self.children(node).collect();
            stack.extend(kids.into_iter().rev());
            Some(node)
        })
    }

    /// Depth-first walk with entering and leaving visits.
    ///
    /// The child list is captured before descending, so the visitor may
    /// detach the node it is currently visiting (or restructure its own
    /// subtree) without derailing the traversal. Leaving visits are
    /// delivered for every node the walk entered, including after
    /// `SkipChildren`.
    pub fn walk<F>(&mut self, root: NodeId, f: &mut F)
    where
        F: FnMut(&mut Tree, NodeId, bool) -> WalkStatus,
    {
        enum Phase {
            Enter,
            Leave,
        }
        let mut stack = vec![(root, Phase::Enter)];

        while let Some((id, phase)) = stack.pop() {
            match phase {
                Phase::Enter => match f(self, id, true) {
                    WalkStatus::Stop => return,
                    WalkStatus::SkipChildren => stack.push((id, Phase::Leave)),
                    WalkStatus::Continue => {
                        stack.push((id, Phase::Leave));
                        let kids: Vec<NodeId> = self.children(id).collect();
                        for child in kids.into_iter().rev() {
                            stack.push((child, Phase::Enter));
                        }
                    }
                },
                Phase::Leave => {
                    if f(self, id, false) == WalkStatus::Stop {
                        return;
                    }
                }
            }
        }
    }
}

impl Index<NodeId> for Tree {
    type Output = Ast;

    fn index(&self, id: NodeId) -> &Ast {
        &self.nodes[id.index()].ast
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Ast {
        &mut self.nodes[id.index()].ast
    }
}

enum Axis {
    Parent,
    PreviousSibling,
    NextSibling,
}

struct AxisIter<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
    axis: Axis,
}

impl<'a> Iterator for AxisIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next.take()?;
        self.next = match self.axis {
            Axis::Parent => self.tree.parent(id),
            Axis::PreviousSibling => self.tree.previous_sibling(id),
            Axis::NextSibling => self.tree.next_sibling(id),
        };
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Ast, NodeValue};

    fn text(tree: &mut Tree, s: &str) -> NodeId {
        tree.alloc(Ast::new(NodeValue::Text(s.as_bytes().to_vec())))
    }

    #[test]
    fn structure_ops() {
        let mut tree = Tree::new("t", Ast::new(NodeValue::Document));
        let root = tree.root();

        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        let d = text(&mut tree, "d");

        tree.append(root, a);
        tree.append(root, c);
        tree.insert_after(a, b);
        tree.prepend(root, d);

        let order: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(order, vec![d, a, b, c]);

        tree.detach(b);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.previous_sibling(c), Some(a));
        assert_eq!(tree.last_child(root), Some(c));

        tree.insert_before(d, b);
        let order: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(order, vec![b, d, a, c]);
        assert_eq!(tree.first_child(root), Some(b));
    }

    #[test]
    fn walk_tolerates_detach() {
        let mut tree = Tree::new("t", Ast::new(NodeValue::Document));
        let root = tree.root();
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        tree.append(root, a);
        tree.append(root, b);
        tree.append(root, c);

        let mut seen = vec![];
        tree.walk(root, &mut |tree, id, entering| {
            if entering {
                if id == b {
                    tree.detach(id);
                }
                seen.push(id);
            }
            WalkStatus::Continue
        });

        assert_eq!(seen, vec![root, a, b, c]);
        let remaining: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(remaining, vec![a, c]);
    }

    #[test]
    fn walk_skip_and_stop() {
        let mut tree = Tree::new("t", Ast::new(NodeValue::Document));
        let root = tree.root();
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append(root, a);
        tree.append(a, b);

        let mut entered = vec![];
        tree.walk(root, &mut |_, id, entering| {
            if entering {
                entered.push(id);
                if id == a {
                    return WalkStatus::SkipChildren;
                }
            }
            WalkStatus::Continue
        });
        assert_eq!(entered, vec![root, a]);

        let mut entered = vec![];
        tree.walk(root, &mut |_, id, entering| {
            if entering {
                entered.push(id);
                if id == a {
                    return WalkStatus::Stop;
                }
            }
            WalkStatus::Continue
        });
        assert_eq!(entered, vec![root, a]);
    }
}
