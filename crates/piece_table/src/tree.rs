use std::ops::{Index, IndexMut};

use crate::buffer::StringBuffer;
use crate::error::{PieceTableError, Result};
use crate::piece::Piece;

/// Handle of a node inside the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Red,
    Black,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    piece: Piece,
    color: NodeColor,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    // left subtree only
    size_left: usize,
    lf_left: usize,
    // left subtree + own piece + right subtree
    size_total: usize,
    lf_total: usize,
}

impl TreeNode {
    fn new(piece: Piece) -> Self {
        let size_total = piece.length();
        let lf_total = piece.line_count();
        Self {
            piece,
            color: NodeColor::Red,
            parent: None,
            left: None,
            right: None,
            size_left: 0,
            lf_left: 0,
            size_total,
            lf_total,
        }
    }
}

/// Result of an offset lookup: the node holding the offset, where that
/// node's piece starts in the document and how many line feeds precede it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePosition {
    pub node: NodeId,
    pub offset: usize,
    pub line_feeds: usize,
}

/// Result of a line lookup: the node in which line `n` begins.
///
/// `local_line` is the number of the piece's own line feeds that come
/// before the line start (0 means the line starts at or before the piece
/// start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub node: NodeId,
    pub offset: usize,
    pub local_line: usize,
}

/// Red-black tree of pieces in document order. There are no keys: a node's
/// position is implied by the cached sizes of the subtrees around it.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. Freed slots
/// are recycled by later inserts.
#[derive(Debug, Clone, Default)]
pub struct PieceTree {
    nodes: Vec<TreeNode>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
}

impl Index<NodeId> for PieceTree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for PieceTree {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }
}

impl PieceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.size_total(self.root)
    }

    pub fn line_feed_count(&self) -> usize {
        self.lf_total(self.root)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn piece(&self, node: NodeId) -> &Piece {
        &self[node].piece
    }

    fn alloc(&mut self, piece: Piece) -> NodeId {
        let node = TreeNode::new(piece);
        match self.free.pop() {
            Some(id) => {
                self[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let node = &mut self[id];
        node.parent = None;
        node.left = None;
        node.right = None;
        self.free.push(id);
    }

    fn color(&self, node: Option<NodeId>) -> NodeColor {
        node.map_or(NodeColor::Black, |id| self[id].color)
    }

    fn size_total(&self, node: Option<NodeId>) -> usize {
        node.map_or(0, |id| self[id].size_total)
    }

    fn lf_total(&self, node: Option<NodeId>) -> usize {
        node.map_or(0, |id| self[id].lf_total)
    }

    fn leftmost(&self, mut x: NodeId) -> NodeId {
        while let Some(left) = self[x].left {
            x = left;
        }
        x
    }

    fn rightmost(&self, mut x: NodeId) -> NodeId {
        while let Some(right) = self[x].right {
            x = right;
        }
        x
    }

    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|root| self.leftmost(root))
    }

    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|root| self.rightmost(root))
    }

    pub fn successor(&self, node: NodeId) -> Option<NodeId> {
        if let Some(right) = self[node].right {
            return Some(self.leftmost(right));
        }
        let mut cur = node;
        while let Some(parent) = self[cur].parent {
            if self[parent].left == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    pub fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        if let Some(left) = self[node].left {
            return Some(self.rightmost(left));
        }
        let mut cur = node;
        while let Some(parent) = self[cur].parent {
            if self[parent].right == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    /// Visit pieces in document order until `f` returns `false`.
    pub fn for_each_inorder<F: FnMut(NodeId, &Piece) -> bool>(&self, mut f: F) {
        let mut stack: Vec<NodeId> = Vec::new();
        let mut cur = self.root;

        while cur.is_some() || !stack.is_empty() {
            while let Some(c) = cur {
                stack.push(c);
                cur = self[c].left;
            }

            let Some(node) = stack.pop() else { break };
            if !f(node, &self[node].piece) {
                break;
            }
            cur = self[node].right;
        }
    }

    /// Find the piece covering `offset`. Ranges are half-open, so an offset
    /// equal to a piece's end belongs to the next piece, and `len()` itself
    /// is not found.
    pub fn locate_by_offset(&self, mut offset: usize) -> Option<NodePosition> {
        let mut x = self.root;
        let mut node_start = 0;
        let mut line_feeds = 0;

        while let Some(id) = x {
            let node = &self[id];
            let length = node.piece.length();
            if offset < node.size_left {
                x = node.left;
            } else if offset < node.size_left + length {
                return Some(NodePosition {
                    node: id,
                    offset: node_start + node.size_left,
                    line_feeds: line_feeds + node.lf_left,
                });
            } else {
                offset -= node.size_left + length;
                node_start += node.size_left + length;
                line_feeds += node.lf_left + node.piece.line_count();
                x = node.right;
            }
        }
        None
    }

    /// Find the piece in which line `line` (0-based) begins, i.e. the piece
    /// holding the `line`-th line feed, or the first piece for line 0.
    pub fn locate_by_line(&self, mut line: usize) -> Option<LinePosition> {
        if line == 0 {
            return self.first().map(|node| LinePosition {
                node,
                offset: 0,
                local_line: 0,
            });
        }

        let mut x = self.root;
        let mut node_start = 0;

        while let Some(id) = x {
            let node = &self[id];
            let line_feeds = node.piece.line_count();
            if line <= node.lf_left {
                x = node.left;
            } else if line <= node.lf_left + line_feeds {
                return Some(LinePosition {
                    node: id,
                    offset: node_start + node.size_left,
                    local_line: line - node.lf_left,
                });
            } else {
                line -= node.lf_left + line_feeds;
                node_start += node.size_left + node.piece.length();
                x = node.right;
            }
        }
        None
    }

    /// Append `piece` at the end of the document.
    pub fn push_back(&mut self, piece: Piece) -> NodeId {
        match self.last() {
            Some(last) => self.insert_after(last, piece),
            None => {
                let z = self.alloc(piece);
                self[z].color = NodeColor::Black;
                self.root = Some(z);
                z
            }
        }
    }

    /// Attach `piece` as the in-order successor of `node`.
    pub fn insert_after(&mut self, node: NodeId, piece: Piece) -> NodeId {
        let z = self.alloc(piece);

        // attach to node.right if empty, otherwise as left of the left-most
        // node in node.right
        match self[node].right {
            None => {
                self[node].right = Some(z);
                self[z].parent = Some(node);
            }
            Some(right) => {
                let next = self.leftmost(right);
                self[next].left = Some(z);
                self[z].parent = Some(next);
            }
        }

        self.propagate_metadata(z);
        self.fix_insert(z);
        z
    }

    /// Attach `piece` as the in-order predecessor of `node`.
    pub fn insert_before(&mut self, node: NodeId, piece: Piece) -> NodeId {
        let z = self.alloc(piece);

        match self[node].left {
            None => {
                self[node].left = Some(z);
                self[z].parent = Some(node);
            }
            Some(left) => {
                let prev = self.rightmost(left);
                self[prev].right = Some(z);
                self[z].parent = Some(prev);
            }
        }

        self.propagate_metadata(z);
        self.fix_insert(z);
        z
    }

    /// Cut `node` at `local_offset`. The node keeps the left part and a new
    /// successor node receives the rest. Returns `None` without touching the
    /// tree when either part would be empty.
    pub fn split(
        &mut self,
        node: NodeId,
        local_offset: usize,
        buffer: &StringBuffer,
    ) -> Option<NodeId> {
        let (left, right) = self[node].piece.split_at(buffer, local_offset)?;
        self[node].piece = left;
        self.propagate_metadata(node);
        Some(self.insert_after(node, right))
    }

    /// Remove `node` from the tree.
    ///
    /// A node with two children takes over its successor's piece and the
    /// successor is unlinked instead, so after this call the handle `node`
    /// may still be live but hold a different piece.
    pub fn delete(&mut self, node: NodeId) {
        let target = match (self[node].left, self[node].right) {
            (Some(_), Some(right)) => {
                let successor = self.leftmost(right);
                let piece = self[successor].piece.clone();
                self[node].piece = piece;
                successor
            }
            _ => node,
        };

        let child = self[target].left.or(self[target].right);
        let parent = self[target].parent;
        let removed_color = self[target].color;

        self.replace_child(parent, target, child);
        if let Some(p) = parent {
            self.propagate_metadata(p);
        }

        if removed_color == NodeColor::Black {
            self.fix_delete(child, parent);
        }
        self.release(target);
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self[p].left == Some(old) {
                    self[p].left = new;
                } else {
                    self[p].right = new;
                }
            }
        }
        if let Some(n) = new {
            self[n].parent = parent;
        }
    }

    /// Recompute every cached aggregate of `id` from its children.
    /// Returns whether anything changed.
    fn refresh(&mut self, id: NodeId) -> bool {
        let (left, right) = (self[id].left, self[id].right);
        let size_left = self.size_total(left);
        let lf_left = self.lf_total(left);
        let size_total = size_left + self[id].piece.length() + self.size_total(right);
        let lf_total = lf_left + self[id].piece.line_count() + self.lf_total(right);

        let node = &mut self[id];
        let changed = (node.size_left, node.lf_left, node.size_total, node.lf_total)
            != (size_left, lf_left, size_total, lf_total);
        node.size_left = size_left;
        node.lf_left = lf_left;
        node.size_total = size_total;
        node.lf_total = lf_total;
        changed
    }

    fn refresh_totals(&mut self, id: NodeId) {
        let right = self[id].right;
        let size_right = self.size_total(right);
        let lf_right = self.lf_total(right);
        let node = &mut self[id];
        node.size_total = node.size_left + node.piece.length() + size_right;
        node.lf_total = node.lf_left + node.piece.line_count() + lf_right;
    }

    /// After a local size change at `node`, walk towards the root fixing
    /// cached aggregates, stopping at the first ancestor that does not
    /// change.
    fn propagate_metadata(&mut self, node: NodeId) {
        self.refresh(node);
        let mut cur = self[node].parent;
        while let Some(p) = cur {
            if !self.refresh(p) {
                break;
            }
            cur = self[p].parent;
        }
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self[x].right else {
            return;
        };

        // x and its whole left subtree end up under y.left
        let (x_size_left, x_lf_left, x_piece_len, x_piece_lf) = {
            let xn = &self[x];
            (
                xn.size_left,
                xn.lf_left,
                xn.piece.length(),
                xn.piece.line_count(),
            )
        };
        {
            let yn = &mut self[y];
            yn.size_left += x_size_left + x_piece_len;
            yn.lf_left += x_lf_left + x_piece_lf;
        }

        let y_left = self[y].left;
        self[x].right = y_left;
        if let Some(yl) = y_left {
            self[yl].parent = Some(x);
        }

        let x_parent = self[x].parent;
        self.replace_child(x_parent, x, Some(y));

        self[y].left = Some(x);
        self[x].parent = Some(y);

        self.refresh_totals(x);
        self.refresh_totals(y);
    }

    fn rotate_right(&mut self, y: NodeId) {
        let Some(x) = self[y].left else {
            return;
        };

        let (x_size_left, x_lf_left, x_piece_len, x_piece_lf) = {
            let xn = &self[x];
            (
                xn.size_left,
                xn.lf_left,
                xn.piece.length(),
                xn.piece.line_count(),
            )
        };

        let x_right = self[x].right;
        self[y].left = x_right;
        if let Some(xr) = x_right {
            self[xr].parent = Some(y);
        }

        let y_parent = self[y].parent;
        self.replace_child(y_parent, y, Some(x));

        // y.left is now only x's former right subtree
        {
            let yn = &mut self[y];
            yn.size_left -= x_size_left + x_piece_len;
            yn.lf_left -= x_lf_left + x_piece_lf;
        }

        self[x].right = Some(y);
        self[y].parent = Some(x);

        self.refresh_totals(y);
        self.refresh_totals(x);
    }

    fn fix_insert(&mut self, mut x: NodeId) {
        while let Some(parent) = self[x].parent {
            if self[parent].color != NodeColor::Red {
                break;
            }
            // a red parent is never the root
            let Some(grand) = self[parent].parent else {
                break;
            };

            if self[grand].left == Some(parent) {
                let uncle = self[grand].right;
                if self.color(uncle) == NodeColor::Red {
                    self[parent].color = NodeColor::Black;
                    if let Some(u) = uncle {
                        self[u].color = NodeColor::Black;
                    }
                    self[grand].color = NodeColor::Red;
                    x = grand;
                } else {
                    let (mut child, mut parent) = (x, parent);
                    if self[parent].right == Some(child) {
                        self.rotate_left(parent);
                        std::mem::swap(&mut child, &mut parent);
                    }
                    self[parent].color = NodeColor::Black;
                    self[grand].color = NodeColor::Red;
                    self.rotate_right(grand);
                    x = child;
                }
            } else {
                let uncle = self[grand].left;
                if self.color(uncle) == NodeColor::Red {
                    self[parent].color = NodeColor::Black;
                    if let Some(u) = uncle {
                        self[u].color = NodeColor::Black;
                    }
                    self[grand].color = NodeColor::Red;
                    x = grand;
                } else {
                    let (mut child, mut parent) = (x, parent);
                    if self[parent].left == Some(child) {
                        self.rotate_right(parent);
                        std::mem::swap(&mut child, &mut parent);
                    }
                    self[parent].color = NodeColor::Black;
                    self[grand].color = NodeColor::Red;
                    self.rotate_left(grand);
                    x = child;
                }
            }
        }

        if let Some(root) = self.root {
            self[root].color = NodeColor::Black;
        }
    }

    /// Restore the black height after a black node was unlinked. `x` is the
    /// node that took its place (possibly none) and `parent` is x's parent.
    fn fix_delete(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color(x) == NodeColor::Black {
            let Some(p) = parent else {
                break;
            };

            if self[p].left == x {
                let Some(mut w) = self[p].right else {
                    break;
                };
                if self[w].color == NodeColor::Red {
                    self[w].color = NodeColor::Black;
                    self[p].color = NodeColor::Red;
                    self.rotate_left(p);
                    match self[p].right {
                        Some(sibling) => w = sibling,
                        None => break,
                    }
                }
                if self.color(self[w].left) == NodeColor::Black
                    && self.color(self[w].right) == NodeColor::Black
                {
                    self[w].color = NodeColor::Red;
                    x = Some(p);
                    parent = self[p].parent;
                } else {
                    if self.color(self[w].right) == NodeColor::Black {
                        if let Some(wl) = self[w].left {
                            self[wl].color = NodeColor::Black;
                        }
                        self[w].color = NodeColor::Red;
                        self.rotate_right(w);
                        match self[p].right {
                            Some(sibling) => w = sibling,
                            None => break,
                        }
                    }
                    self[w].color = self[p].color;
                    self[p].color = NodeColor::Black;
                    if let Some(wr) = self[w].right {
                        self[wr].color = NodeColor::Black;
                    }
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self[p].left else {
                    break;
                };
                if self[w].color == NodeColor::Red {
                    self[w].color = NodeColor::Black;
                    self[p].color = NodeColor::Red;
                    self.rotate_right(p);
                    match self[p].left {
                        Some(sibling) => w = sibling,
                        None => break,
                    }
                }
                if self.color(self[w].left) == NodeColor::Black
                    && self.color(self[w].right) == NodeColor::Black
                {
                    self[w].color = NodeColor::Red;
                    x = Some(p);
                    parent = self[p].parent;
                } else {
                    if self.color(self[w].left) == NodeColor::Black {
                        if let Some(wr) = self[w].right {
                            self[wr].color = NodeColor::Black;
                        }
                        self[w].color = NodeColor::Red;
                        self.rotate_left(w);
                        match self[p].left {
                            Some(sibling) => w = sibling,
                            None => break,
                        }
                    }
                    self[w].color = self[p].color;
                    self[p].color = NodeColor::Black;
                    if let Some(wl) = self[w].left {
                        self[wl].color = NodeColor::Black;
                    }
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }

        if let Some(x) = x {
            self[x].color = NodeColor::Black;
        }
    }

    /// Verify the red-black properties, parent links, cached aggregates and
    /// the absence of empty pieces.
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        if self[root].color != NodeColor::Black {
            return Err(violation("root is red"));
        }
        if self[root].parent.is_some() {
            return Err(violation("root has a parent"));
        }
        self.check_subtree(root).map(|_| ())
    }

    /// Returns (black height, total length, total line feeds) of the subtree.
    fn check_subtree(&self, id: NodeId) -> Result<(usize, usize, usize)> {
        let node = &self[id];
        if node.piece.length() == 0 {
            return Err(violation(format!("{id:?} holds an empty piece")));
        }

        let mut sides = [(1, 0, 0); 2];
        for (side, child) in [node.left, node.right].into_iter().enumerate() {
            let Some(child) = child else { continue };
            if self[child].parent != Some(id) {
                return Err(violation(format!("{child:?} does not point back to {id:?}")));
            }
            if node.color == NodeColor::Red && self[child].color == NodeColor::Red {
                return Err(violation(format!("red {id:?} has red child {child:?}")));
            }
            sides[side] = self.check_subtree(child)?;
        }
        let [(left_bh, left_size, left_lf), (right_bh, right_size, right_lf)] = sides;

        if left_bh != right_bh {
            return Err(violation(format!(
                "black heights differ under {id:?}: {left_bh} vs {right_bh}"
            )));
        }
        if node.size_left != left_size || node.lf_left != left_lf {
            return Err(violation(format!(
                "{id:?} caches left ({}, {}) but subtree has ({left_size}, {left_lf})",
                node.size_left, node.lf_left
            )));
        }

        let size = left_size + node.piece.length() + right_size;
        let lf = left_lf + node.piece.line_count() + right_lf;
        if node.size_total != size || node.lf_total != lf {
            return Err(violation(format!(
                "{id:?} caches total ({}, {}) but subtree has ({size}, {lf})",
                node.size_total, node.lf_total
            )));
        }

        let black = usize::from(node.color == NodeColor::Black);
        Ok((left_bh + black, size, lf))
    }
}

fn violation(message: impl Into<String>) -> PieceTableError {
    PieceTableError::InvariantViolation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;

    fn piece(pool: &mut BufferPool, text: &str) -> Piece {
        let id = pool.create(text.to_string());
        Piece::whole(id, pool.get(id))
    }

    fn collect(tree: &PieceTree, pool: &BufferPool) -> String {
        let mut out = String::new();
        tree.for_each_inorder(|_, p| {
            out.push_str(p.text(pool.get(p.buffer_idx())));
            true
        });
        out
    }

    // sums computed from scratch, independent of colors
    fn assert_metadata(tree: &PieceTree, id: Option<NodeId>) -> (usize, usize) {
        let Some(id) = id else { return (0, 0) };
        let (ls, llf) = assert_metadata(tree, tree[id].left);
        let (rs, rlf) = assert_metadata(tree, tree[id].right);
        assert_eq!(tree[id].size_left, ls, "size_left of {id:?}");
        assert_eq!(tree[id].lf_left, llf, "lf_left of {id:?}");
        let piece = &tree[id].piece;
        (ls + piece.length() + rs, llf + piece.line_count() + rlf)
    }

    /// Builds        a
    ///              / \
    ///             b   c
    ///                / \
    ///               d   e
    fn hand_built(pool: &mut BufferPool) -> (PieceTree, [NodeId; 5]) {
        let mut tree = PieceTree::new();
        let ids = ["b\n", "a", "d\n\n", "c", "e\n"].map(|t| {
            let p = piece(pool, t);
            tree.alloc(p)
        });
        let [b, a, d, c, e] = ids;
        tree.root = Some(a);
        for (parent, left, right) in [(a, b, c), (c, d, e)] {
            tree[parent].left = Some(left);
            tree[parent].right = Some(right);
            tree[left].parent = Some(parent);
            tree[right].parent = Some(parent);
        }
        for id in [b, d, e, c, a] {
            tree.refresh(id);
        }
        (tree, [a, b, c, d, e])
    }

    #[test]
    fn rotate_left_transfers_left_totals() {
        let mut pool = BufferPool::new();
        let (mut tree, [a, b, c, d, e]) = hand_built(&mut pool);
        let before = collect(&tree, &pool);

        tree.rotate_left(a);

        assert_eq!(tree.root, Some(c));
        assert_eq!(tree[c].left, Some(a));
        assert_eq!(tree[a].right, Some(d));
        assert_eq!(tree[a].left, Some(b));
        assert_eq!(tree[c].right, Some(e));
        // c now has a, b and d on its left
        assert_eq!(tree[c].size_left, 2 + 1 + 3);
        assert_eq!(tree[c].lf_left, 1 + 0 + 2);
        assert_eq!(tree[a].size_left, 2);
        assert_metadata(&tree, tree.root);
        assert_eq!(tree[c].size_total, tree.len());
        assert_eq!(collect(&tree, &pool), before);
    }

    #[test]
    fn rotate_right_undoes_rotate_left() {
        let mut pool = BufferPool::new();
        let (mut tree, [a, _, c, _, _]) = hand_built(&mut pool);
        let snapshot: Vec<_> = tree.nodes.iter().map(|n| (n.size_left, n.lf_left)).collect();

        tree.rotate_left(a);
        tree.rotate_right(c);

        assert_eq!(tree.root, Some(a));
        let after: Vec<_> = tree.nodes.iter().map(|n| (n.size_left, n.lf_left)).collect();
        assert_eq!(after, snapshot);
        assert_metadata(&tree, tree.root);
    }

    #[test]
    fn push_back_keeps_balance() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        let mut expected = String::new();
        for i in 0..200 {
            let text = format!("{i}\n");
            expected.push_str(&text);
            let p = piece(&mut pool, &text);
            tree.push_back(p);
            tree.check_invariants().unwrap();
        }
        assert_eq!(collect(&tree, &pool), expected);
        assert_eq!(tree.len(), expected.len());
        assert_eq!(tree.line_feed_count(), 200);
        assert_eq!(tree.node_count(), 200);
    }

    #[test]
    fn insert_before_builds_reverse_order() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        let p = piece(&mut pool, "z");
        let mut head = tree.push_back(p);
        for c in ('a'..'z').rev() {
            let p = piece(&mut pool, &c.to_string());
            head = tree.insert_before(head, p);
            tree.check_invariants().unwrap();
        }
        assert_eq!(collect(&tree, &pool), "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(tree.first(), Some(head));
    }

    #[test]
    fn delete_every_shape() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        let mut texts = Vec::new();
        for i in 0..128 {
            let text = format!("<{i}>");
            let p = piece(&mut pool, &text);
            tree.push_back(p);
            texts.push(text);
        }

        // pseudo-random deletion order
        let mut seed: usize = 7;
        while !texts.is_empty() {
            seed = (seed * 1103515245 + 12345) % (1 << 31);
            let victim = seed % texts.len();
            let offset: usize = texts[..victim].iter().map(|t| t.len()).sum();

            let position = tree.locate_by_offset(offset).unwrap();
            assert_eq!(position.offset, offset);
            tree.delete(position.node);
            texts.remove(victim);

            tree.check_invariants().unwrap();
            assert_eq!(collect(&tree, &pool), texts.concat());
        }
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        for t in ["a", "b", "c"] {
            let p = piece(&mut pool, t);
            tree.push_back(p);
        }
        let first = tree.first().unwrap();
        tree.delete(first);
        let p = piece(&mut pool, "d");
        let reused = tree.push_back(p);
        assert_eq!(reused, first);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(collect(&tree, &pool), "bcd");
    }

    #[test]
    fn locate_by_offset_is_half_open() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        for t in ["ab", "c\nd", "ef"] {
            let p = piece(&mut pool, t);
            tree.push_back(p);
        }

        let at = |o| {
            let pos = tree.locate_by_offset(o).unwrap();
            (pos.offset, pos.line_feeds, tree.piece(pos.node).length())
        };
        assert_eq!(at(0), (0, 0, 2));
        assert_eq!(at(1), (0, 0, 2));
        // end of "ab" is the start of "c\nd"
        assert_eq!(at(2), (2, 0, 3));
        assert_eq!(at(5), (5, 1, 2));
        assert_eq!(at(6), (5, 1, 2));
        assert!(tree.locate_by_offset(7).is_none());
        assert!(PieceTree::new().locate_by_offset(0).is_none());
    }

    #[test]
    fn locate_by_line_finds_line_feed_owner() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        for t in ["a\nb", "cd", "\ne\nf"] {
            let p = piece(&mut pool, t);
            tree.push_back(p);
        }

        let at = |l| {
            let pos = tree.locate_by_line(l).unwrap();
            (pos.offset, pos.local_line)
        };
        assert_eq!(at(0), (0, 0));
        assert_eq!(at(1), (0, 1));
        assert_eq!(at(2), (5, 1));
        assert_eq!(at(3), (5, 2));
        assert!(tree.locate_by_line(4).is_none());
    }

    #[test]
    fn split_creates_successor() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        let p = piece(&mut pool, "hello\nworld");
        let node = tree.push_back(p);

        let buffer = pool.get(tree.piece(node).buffer_idx()).clone();
        assert!(tree.split(node, 0, &buffer).is_none());
        assert!(tree.split(node, 11, &buffer).is_none());

        let right = tree.split(node, 6, &buffer).unwrap();
        assert_eq!(tree.successor(node), Some(right));
        assert_eq!(tree.predecessor(right), Some(node));
        assert_eq!(tree.piece(node).text(&buffer), "hello\n");
        assert_eq!(tree.piece(right).text(&buffer), "world");
        assert_eq!(tree.len(), 11);
        assert_eq!(tree.line_feed_count(), 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn checker_reports_corrupted_metadata() {
        let mut pool = BufferPool::new();
        let mut tree = PieceTree::new();
        for t in ["a", "b", "c"] {
            let p = piece(&mut pool, t);
            tree.push_back(p);
        }
        let root = tree.root.unwrap();
        tree[root].size_left += 1;
        assert!(matches!(
            tree.check_invariants(),
            Err(PieceTableError::InvariantViolation(_))
        ));
    }
}
