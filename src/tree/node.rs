//! Node arena shared by the tree policies.
//!
//! Nodes live in a `SlotMap` and point at each other through `NodeId`
//! keys, so the tree is a strict ownership tree held by the arena with
//! parent back-references that are plain indices.

use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct NodeId;
}

#[derive(Clone, Debug)]
pub struct Node<K, V, M> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) meta: M,
}

#[derive(Clone, Debug)]
pub struct Arena<K, V, M> {
    pub(crate) nodes: SlotMap<NodeId, Node<K, V, M>>,
    pub(crate) root: Option<NodeId>,
}

impl<K, V, M> Arena<K, V, M> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    #[inline]
    pub(crate) fn left(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].left
    }

    #[inline]
    pub(crate) fn right(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].right
    }

    #[inline]
    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Points `parent`'s link to `old` (or the root) at `new`.
    pub(crate) fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.nodes[p].left == Some(old) {
                    self.nodes[p].left = new;
                } else {
                    self.nodes[p].right = new;
                }
            }
        }
    }

    /// Rotates `x` down to the left; returns the new subtree root.
    /// Policy metadata is left for the caller to fix.
    pub(crate) fn rotate_left(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.nodes[x].right else {
            return x;
        };
        let inner = self.nodes[y].left;
        self.nodes[x].right = inner;
        if let Some(b) = inner {
            self.nodes[b].parent = Some(x);
        }
        let p = self.nodes[x].parent;
        self.nodes[y].parent = p;
        self.replace_child(p, x, Some(y));
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
        y
    }

    /// Rotates `x` down to the right; returns the new subtree root.
    pub(crate) fn rotate_right(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.nodes[x].left else {
            return x;
        };
        let inner = self.nodes[y].right;
        self.nodes[x].left = inner;
        if let Some(b) = inner {
            self.nodes[b].parent = Some(x);
        }
        let p = self.nodes[x].parent;
        self.nodes[y].parent = p;
        self.replace_child(p, x, Some(y));
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
        y
    }

    pub(crate) fn min_of(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.nodes[id].left {
            id = l;
        }
        id
    }

    pub(crate) fn max_of(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.nodes[id].right {
            id = r;
        }
        id
    }

    pub(crate) fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.nodes[id].right {
            return Some(self.min_of(r));
        }
        let mut cur = id;
        let mut up = self.nodes[id].parent;
        while let Some(p) = up {
            if self.nodes[p].left == Some(cur) {
                return Some(p);
            }
            cur = p;
            up = self.nodes[p].parent;
        }
        None
    }

    pub(crate) fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(l) = self.nodes[id].left {
            return Some(self.max_of(l));
        }
        let mut cur = id;
        let mut up = self.nodes[id].parent;
        while let Some(p) = up {
            if self.nodes[p].right == Some(cur) {
                return Some(p);
            }
            cur = p;
            up = self.nodes[p].parent;
        }
        None
    }

    pub(crate) fn height_of(&self, id: Option<NodeId>) -> usize {
        match id {
            None => 0,
            Some(id) => {
                1 + self
                    .height_of(self.nodes[id].left)
                    .max(self.height_of(self.nodes[id].right))
            }
        }
    }
}
