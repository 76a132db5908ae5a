//! Red-black tree over an index arena.
//!
//! Nodes live in a `Vec` and refer to each other through [`NodeId`]s: child
//! links are owning in the logical sense, parent links are plain back
//! references. Removing a node moves the last arena slot into the hole so the
//! arena stays dense.

use std::cmp::Ordering;
use std::mem;

use crate::errors::TreeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena slots past `u32::MAX` have no id.
    fn new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(NodeId)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct RedBlackTree<K, V> {
    nodes: Vec<Node<K, V>>,
    root: Option<NodeId>,
}

impl<K: Ord, V> Default for RedBlackTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> RedBlackTree<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.node(id).value)
    }

    /// Mutable access to the value stored under `key`. The key itself is
    /// never exposed mutably, so ordering can't be broken through it.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find(key)?;
        Some(&mut self.node_mut(id).value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts a new entry. An existing key is rejected and the tree is left
    /// untouched.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        let mut parent = None;
        let mut went_left = false;
        let mut current = self.root;

        while let Some(id) = current {
            parent = Some(id);
            match key.cmp(&self.node(id).key) {
                Ordering::Less => {
                    went_left = true;
                    current = self.left(id);
                }
                Ordering::Greater => {
                    went_left = false;
                    current = self.right(id);
                }
                Ordering::Equal => return Err(TreeError::DuplicateKey),
            }
        }

        let id = NodeId::new(self.nodes.len()).ok_or(TreeError::ArenaFull)?;
        self.nodes.push(Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        });

        match parent {
            None => self.root = Some(id),
            Some(parent) if went_left => self.node_mut(parent).left = Some(id),
            Some(parent) => self.node_mut(parent).right = Some(id),
        }

        self.fix_insert(id);
        Ok(())
    }

    /// Removes `key` and returns its value, or `None` if it isn't present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.find(key)?;
        Some(self.delete_node(id))
    }

    /// Entries with `low <= key <= high`, in ascending key order.
    pub fn range(&self, low: &K, high: &K) -> Vec<(&K, &V)> {
        let mut entries = Vec::new();
        self.collect_range(self.root, low, high, &mut entries);
        entries
    }

    /// In-order iterator over all entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: self,
            next: self.root.map(|root| self.leftmost(root)),
        }
    }

    /// Checks ordering, coloring and parent links of the whole tree and
    /// returns its black height (nil leaves count as one).
    pub fn check_invariants(&self) -> Result<usize, String> {
        if let Some(root) = self.root {
            if self.color(root) != Color::Black {
                return Err("root is red".to_owned());
            }
        }

        let mut visited = 0;
        let height = self.check_subtree(self.root, None, None, None, &mut visited)?;
        if visited != self.nodes.len() {
            return Err(format!(
                "{} nodes reachable from the root, {} allocated",
                visited,
                self.nodes.len()
            ));
        }
        Ok(height)
    }

    fn find(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            current = match key.cmp(&self.node(id).key) {
                Ordering::Less => self.left(id),
                Ordering::Greater => self.right(id),
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    fn collect_range<'a>(
        &'a self,
        id: Option<NodeId>,
        low: &K,
        high: &K,
        entries: &mut Vec<(&'a K, &'a V)>,
    ) {
        let Some(id) = id else {
            return;
        };
        let node = self.node(id);

        if *low < node.key {
            self.collect_range(node.left, low, high, entries);
        }
        if *low <= node.key && node.key <= *high {
            entries.push((&node.key, &node.value));
        }
        if *high > node.key {
            self.collect_range(node.right, low, high, entries);
        }
    }

    // ===== Node access =====

    #[inline(always)]
    fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    #[inline(always)]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    #[inline(always)]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline(always)]
    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    #[inline(always)]
    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    #[inline(always)]
    fn color(&self, id: NodeId) -> Color {
        self.node(id).color
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    /// Missing children are black.
    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.map_or(false, |id| self.color(id) == Color::Red)
    }

    fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if self.left(parent) == Some(id) {
            self.right(parent)
        } else {
            self.left(parent)
        }
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.left(id) {
            id = left;
        }
        id
    }

    /// Points `parent`'s link to `old` (or the root) at `new`.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                if self.left(parent) == Some(old) {
                    self.node_mut(parent).left = new;
                } else {
                    self.node_mut(parent).right = new;
                }
            }
        }
        if let Some(new) = new {
            self.node_mut(new).parent = parent;
        }
    }

    fn swap_payload(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let (low, high) = if a.index() < b.index() {
            (a.index(), b.index())
        } else {
            (b.index(), a.index())
        };
        let (head, tail) = self.nodes.split_at_mut(high);
        let (x, y) = (&mut head[low], &mut tail[0]);
        mem::swap(&mut x.key, &mut y.key);
        mem::swap(&mut x.value, &mut y.value);
    }

    /// Frees the arena slot of a node that is no longer linked into the tree.
    fn release(&mut self, id: NodeId) -> V {
        // insert never grows the arena past the last addressable slot
        let last = self.nodes.len().checked_sub(1).and_then(NodeId::new);
        if let Some(last) = last.filter(|&last| last != id) {
            // the last node is about to move into `id`'s slot
            let parent = self.parent(last);
            match parent {
                None => self.root = Some(id),
                Some(parent) => {
                    if self.left(parent) == Some(last) {
                        self.node_mut(parent).left = Some(id);
                    } else {
                        self.node_mut(parent).right = Some(id);
                    }
                }
            }
            if let Some(left) = self.left(last) {
                self.node_mut(left).parent = Some(id);
            }
            if let Some(right) = self.right(last) {
                self.node_mut(right).parent = Some(id);
            }
        }
        self.nodes.swap_remove(id.index()).value
    }

    // ===== Rotations =====

    /*
          A                       B
         / \    rotate left A    / \
        C   B       ->          A   E
           / \                 / \
          D   E               C   D
    */
    fn rotate_left(&mut self, node: NodeId) {
        let Some(pivot) = self.right(node) else {
            return;
        };

        let inner = self.left(pivot);
        self.node_mut(node).right = inner;
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(node);
        }

        let parent = self.parent(node);
        self.replace_child(parent, node, Some(pivot));

        self.node_mut(pivot).left = Some(node);
        self.node_mut(node).parent = Some(pivot);
    }

    /*
            B                       A
           / \   rotate right B    / \
          A   E       ->          C   B
         / \                         / \
        C   D                       D   E
    */
    fn rotate_right(&mut self, node: NodeId) {
        let Some(pivot) = self.left(node) else {
            return;
        };

        let inner = self.right(pivot);
        self.node_mut(node).left = inner;
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(node);
        }

        let parent = self.parent(node);
        self.replace_child(parent, node, Some(pivot));

        self.node_mut(pivot).right = Some(node);
        self.node_mut(node).parent = Some(pivot);
    }

    // ===== Insert =====

    /// Repairs a red node whose parent may also be red.
    fn fix_insert(&mut self, mut node: NodeId) {
        loop {
            let Some(parent) = self.parent(node) else {
                self.set_color(node, Color::Black);
                return;
            };
            if self.color(parent) == Color::Black {
                return;
            }
            let Some(grandparent) = self.parent(parent) else {
                self.set_color(parent, Color::Black);
                return;
            };

            let parent_is_left = self.left(grandparent) == Some(parent);
            let uncle = if parent_is_left {
                self.right(grandparent)
            } else {
                self.left(grandparent)
            };

            if let Some(uncle) = uncle.filter(|&uncle| self.color(uncle) == Color::Red) {
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                node = grandparent;
                continue;
            }

            // inner grandchild: straighten into the outer shape first
            if parent_is_left && self.right(parent) == Some(node) {
                self.rotate_left(parent);
                node = parent;
            } else if !parent_is_left && self.left(parent) == Some(node) {
                self.rotate_right(parent);
                node = parent;
            }

            let Some(parent) = self.parent(node) else {
                return;
            };
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            if parent_is_left {
                self.rotate_right(grandparent);
            } else {
                self.rotate_left(grandparent);
            }
            return;
        }
    }

    // ===== Delete =====

    fn delete_node(&mut self, mut target: NodeId) -> V {
        // With two children, trade payloads with the in-order successor and
        // remove the successor's node instead; it has no left child.
        if let (Some(_), Some(right)) = (self.left(target), self.right(target)) {
            let successor = self.leftmost(right);
            self.swap_payload(target, successor);
            target = successor;
        }

        let replacement = self.left(target).or(self.right(target));
        let both_black = !self.is_red(replacement) && self.color(target) == Color::Black;

        match replacement {
            None => {
                if both_black && self.parent(target).is_some() {
                    self.fix_double_black(target);
                }
                // rotations above may have moved the target
                let parent = self.parent(target);
                self.replace_child(parent, target, None);
            }
            Some(child) => {
                let parent = self.parent(target);
                self.replace_child(parent, target, Some(child));
                if both_black {
                    self.fix_double_black(child);
                } else {
                    self.set_color(child, Color::Black);
                }
            }
        }

        self.release(target)
    }

    /// Restores black height along paths through `node`, which is one black
    /// short of its sibling's side.
    fn fix_double_black(&mut self, mut node: NodeId) {
        loop {
            let Some(parent) = self.parent(node) else {
                return;
            };
            let Some(sibling) = self.sibling(node) else {
                node = parent;
                continue;
            };
            let sibling_is_left = self.left(parent) == Some(sibling);

            if self.color(sibling) == Color::Red {
                if sibling_is_left {
                    self.rotate_right(parent);
                } else {
                    self.rotate_left(parent);
                }
                self.set_color(parent, Color::Red);
                self.set_color(sibling, Color::Black);
                continue;
            }

            let (outer, inner) = if sibling_is_left {
                (self.left(sibling), self.right(sibling))
            } else {
                (self.right(sibling), self.left(sibling))
            };

            if let Some(outer) = outer.filter(|&outer| self.color(outer) == Color::Red) {
                // LL / RR
                self.set_color(outer, Color::Black);
                self.set_color(sibling, self.color(parent));
                if sibling_is_left {
                    self.rotate_right(parent);
                } else {
                    self.rotate_left(parent);
                }
                self.set_color(parent, Color::Black);
                return;
            }

            if let Some(inner) = inner.filter(|&inner| self.color(inner) == Color::Red) {
                // LR / RL
                self.set_color(inner, self.color(parent));
                if sibling_is_left {
                    self.rotate_left(sibling);
                    self.rotate_right(parent);
                } else {
                    self.rotate_right(sibling);
                    self.rotate_left(parent);
                }
                self.set_color(parent, Color::Black);
                return;
            }

            self.set_color(sibling, Color::Red);
            if self.color(parent) == Color::Black {
                node = parent;
                continue;
            }
            self.set_color(parent, Color::Black);
            return;
        }
    }

    fn check_subtree(
        &self,
        id: Option<NodeId>,
        parent: Option<NodeId>,
        low: Option<&K>,
        high: Option<&K>,
        visited: &mut usize,
    ) -> Result<usize, String> {
        let Some(id) = id else {
            return Ok(1);
        };
        let node = self.node(id);
        *visited += 1;
        if *visited > self.nodes.len() {
            return Err("cycle in child links".to_owned());
        }

        if node.parent != parent {
            return Err(format!("node {} has a stale parent link", id.0));
        }
        if low.map_or(false, |low| node.key <= *low) || high.map_or(false, |high| node.key >= *high)
        {
            return Err(format!("node {} is out of key order", id.0));
        }
        if node.color == Color::Red && (self.is_red(node.left) || self.is_red(node.right)) {
            return Err(format!("red node {} has a red child", id.0));
        }

        let left = self.check_subtree(node.left, Some(id), low, Some(&node.key), visited)?;
        let right = self.check_subtree(node.right, Some(id), Some(&node.key), high, visited)?;
        if left != right {
            return Err(format!(
                "node {} has black heights {} and {}",
                id.0, left, right
            ));
        }
        Ok(left + usize::from(node.color == Color::Black))
    }
}

pub struct Iter<'a, K, V> {
    tree: &'a RedBlackTree<K, V>,
    next: Option<NodeId>,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let id = self.next?;

        self.next = match tree.right(id) {
            Some(right) => Some(tree.leftmost(right)),
            None => {
                let mut child = id;
                let mut parent = tree.parent(id);
                while let Some(p) = parent {
                    if tree.left(p) == Some(child) {
                        break;
                    }
                    child = p;
                    parent = tree.parent(p);
                }
                parent
            }
        };

        let node = tree.node(id);
        Some((&node.key, &node.value))
    }
}
