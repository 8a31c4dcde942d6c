//! Red-black balancing: no red node has a red child and every root-to-leaf
//! path crosses the same number of black nodes.

use super::node::{Arena, NodeId};
use super::Balance;

/// Color-balanced policy. Updates do fewer rotations than AVL; paths may
/// be up to twice the minimum length.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedBlack;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[inline]
fn color<K, V>(arena: &Arena<K, V, Color>, id: Option<NodeId>) -> Color {
    id.map_or(Color::Black, |i| arena.nodes[i].meta)
}

#[inline]
fn paint<K, V>(arena: &mut Arena<K, V, Color>, id: Option<NodeId>, c: Color) {
    if let Some(i) = id {
        arena.nodes[i].meta = c;
    }
}

impl Balance for RedBlack {
    type Meta = Color;

    fn leaf_meta() -> Color {
        Color::Red
    }

    fn after_insert<K, V>(arena: &mut Arena<K, V, Color>, node: NodeId) {
        let mut x = node;
        while let Some(mut p) = arena.parent(x) {
            if arena.nodes[p].meta == Color::Black {
                break;
            }
            let Some(g) = arena.parent(p) else { break };
            if arena.left(g) == Some(p) {
                let uncle = arena.right(g);
                if color(arena, uncle) == Color::Red {
                    paint(arena, Some(p), Color::Black);
                    paint(arena, uncle, Color::Black);
                    paint(arena, Some(g), Color::Red);
                    x = g;
                    continue;
                }
                if arena.right(p) == Some(x) {
                    arena.rotate_left(p);
                    core::mem::swap(&mut x, &mut p);
                }
                paint(arena, Some(p), Color::Black);
                paint(arena, Some(g), Color::Red);
                arena.rotate_right(g);
            } else {
                let uncle = arena.left(g);
                if color(arena, uncle) == Color::Red {
                    paint(arena, Some(p), Color::Black);
                    paint(arena, uncle, Color::Black);
                    paint(arena, Some(g), Color::Red);
                    x = g;
                    continue;
                }
                if arena.left(p) == Some(x) {
                    arena.rotate_right(p);
                    core::mem::swap(&mut x, &mut p);
                }
                paint(arena, Some(p), Color::Black);
                paint(arena, Some(g), Color::Red);
                arena.rotate_left(g);
            }
            break;
        }
        let root = arena.root;
        paint(arena, root, Color::Black);
    }

    fn after_remove<K, V>(
        arena: &mut Arena<K, V, Color>,
        child: Option<NodeId>,
        parent: Option<NodeId>,
        removed: Color,
    ) {
        if removed == Color::Red {
            return;
        }
        let mut x = child;
        let mut xp = parent;
        while x != arena.root && color(arena, x) == Color::Black {
            let Some(p) = xp else { break };
            if arena.left(p) == x {
                let Some(mut w) = arena.right(p) else { break };
                if arena.nodes[w].meta == Color::Red {
                    paint(arena, Some(w), Color::Black);
                    paint(arena, Some(p), Color::Red);
                    arena.rotate_left(p);
                    match arena.right(p) {
                        Some(n) => w = n,
                        None => break,
                    }
                }
                if color(arena, arena.left(w)) == Color::Black
                    && color(arena, arena.right(w)) == Color::Black
                {
                    paint(arena, Some(w), Color::Red);
                    x = Some(p);
                    xp = arena.parent(p);
                } else {
                    if color(arena, arena.right(w)) == Color::Black {
                        let wl = arena.left(w);
                        paint(arena, wl, Color::Black);
                        paint(arena, Some(w), Color::Red);
                        arena.rotate_right(w);
                        match arena.right(p) {
                            Some(n) => w = n,
                            None => break,
                        }
                    }
                    let pc = arena.nodes[p].meta;
                    paint(arena, Some(w), pc);
                    paint(arena, Some(p), Color::Black);
                    let wr = arena.right(w);
                    paint(arena, wr, Color::Black);
                    arena.rotate_left(p);
                    x = arena.root;
                    break;
                }
            } else {
                let Some(mut w) = arena.left(p) else { break };
                if arena.nodes[w].meta == Color::Red {
                    paint(arena, Some(w), Color::Black);
                    paint(arena, Some(p), Color::Red);
                    arena.rotate_right(p);
                    match arena.left(p) {
                        Some(n) => w = n,
                        None => break,
                    }
                }
                if color(arena, arena.left(w)) == Color::Black
                    && color(arena, arena.right(w)) == Color::Black
                {
                    paint(arena, Some(w), Color::Red);
                    x = Some(p);
                    xp = arena.parent(p);
                } else {
                    if color(arena, arena.left(w)) == Color::Black {
                        let wr = arena.right(w);
                        paint(arena, wr, Color::Black);
                        paint(arena, Some(w), Color::Red);
                        arena.rotate_left(w);
                        match arena.left(p) {
                            Some(n) => w = n,
                            None => break,
                        }
                    }
                    let pc = arena.nodes[p].meta;
                    paint(arena, Some(w), pc);
                    paint(arena, Some(p), Color::Black);
                    let wl = arena.left(w);
                    paint(arena, wl, Color::Black);
                    arena.rotate_right(p);
                    x = arena.root;
                    break;
                }
            }
        }
        paint(arena, x, Color::Black);
    }

    fn check<K, V>(arena: &Arena<K, V, Color>) -> Result<(), String> {
        fn walk<K, V>(arena: &Arena<K, V, Color>, id: Option<NodeId>) -> Result<usize, String> {
            let Some(id) = id else { return Ok(1) };
            let c = arena.nodes[id].meta;
            if c == Color::Red
                && (color(arena, arena.left(id)) == Color::Red
                    || color(arena, arena.right(id)) == Color::Red)
            {
                return Err("red node with red child".to_string());
            }
            let l = walk(arena, arena.left(id))?;
            let r = walk(arena, arena.right(id))?;
            if l != r {
                return Err(format!("black heights differ: {l} vs {r}"));
            }
            Ok(l + usize::from(c == Color::Black))
        }
        if color(arena, arena.root) != Color::Black {
            return Err("red root".to_string());
        }
        walk(arena, arena.root).map(|_| ())
    }
}
