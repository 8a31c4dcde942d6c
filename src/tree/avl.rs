//! AVL balancing: every node caches its subtree height and sibling
//! subtrees differ in height by at most one.

use super::node::{Arena, NodeId};
use super::Balance;

/// Height-balanced policy. Lookups touch at most ~1.44·log2(n) nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Avl;

#[inline]
fn height<K, V>(arena: &Arena<K, V, u32>, id: Option<NodeId>) -> u32 {
    id.map_or(0, |i| arena.nodes[i].meta)
}

fn update<K, V>(arena: &mut Arena<K, V, u32>, id: NodeId) {
    let h = 1 + height(arena, arena.left(id)).max(height(arena, arena.right(id)));
    arena.nodes[id].meta = h;
}

fn skew<K, V>(arena: &Arena<K, V, u32>, id: NodeId) -> i64 {
    height(arena, arena.left(id)) as i64 - height(arena, arena.right(id)) as i64
}

/// Restores the AVL condition at `id`; returns the subtree's new root.
fn rebalance<K, V>(arena: &mut Arena<K, V, u32>, id: NodeId) -> NodeId {
    update(arena, id);
    let s = skew(arena, id);
    if s > 1 {
        if let Some(l) = arena.left(id) {
            if skew(arena, l) < 0 {
                let top = arena.rotate_left(l);
                update(arena, l);
                update(arena, top);
            }
        }
        let top = arena.rotate_right(id);
        update(arena, id);
        update(arena, top);
        top
    } else if s < -1 {
        if let Some(r) = arena.right(id) {
            if skew(arena, r) > 0 {
                let top = arena.rotate_right(r);
                update(arena, r);
                update(arena, top);
            }
        }
        let top = arena.rotate_left(id);
        update(arena, id);
        update(arena, top);
        top
    } else {
        id
    }
}

/// Walks from `start` to the root, stopping once a subtree's height
/// comes out unchanged.
fn retrace<K, V>(arena: &mut Arena<K, V, u32>, start: Option<NodeId>) {
    let mut cur = start;
    while let Some(id) = cur {
        let before = arena.nodes[id].meta;
        let parent = arena.parent(id);
        let top = rebalance(arena, id);
        if arena.nodes[top].meta == before {
            break;
        }
        cur = parent;
    }
}

impl Balance for Avl {
    type Meta = u32;

    fn leaf_meta() -> u32 {
        1
    }

    fn after_insert<K, V>(arena: &mut Arena<K, V, u32>, node: NodeId) {
        let parent = arena.parent(node);
        retrace(arena, parent);
    }

    fn after_remove<K, V>(
        arena: &mut Arena<K, V, u32>,
        _child: Option<NodeId>,
        parent: Option<NodeId>,
        _removed: u32,
    ) {
        retrace(arena, parent);
    }

    fn check<K, V>(arena: &Arena<K, V, u32>) -> Result<(), String> {
        fn walk<K, V>(arena: &Arena<K, V, u32>, id: Option<NodeId>) -> Result<u32, String> {
            let Some(id) = id else { return Ok(0) };
            let l = walk(arena, arena.left(id))?;
            let r = walk(arena, arena.right(id))?;
            let h = 1 + l.max(r);
            if arena.nodes[id].meta != h {
                return Err(format!("cached height {} != actual {}", arena.nodes[id].meta, h));
            }
            if l.abs_diff(r) > 1 {
                return Err(format!("unbalanced node: left {l}, right {r}"));
            }
            Ok(h)
        }
        walk(arena, arena.root).map(|_| ())
    }
}
