// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Node Store
//!
//! Every node of a tree lives in one dense `Vec`. Links are `Option<Idx>`
//! owning slots: a node is owned by exactly one slot, either the root slot or
//! the left/right link of its parent.
//!
//! Freed nodes are removed with `swap_remove`, so the arena never holds
//! tombstones. The node that moves into the freed index is found again by a
//! key descent from the root, and the slot that owned it is re-pointed.

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Node index type. u32 saves space vs usize on 64-bit.
pub(crate) type Idx = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// The place a subtree hangs from: the tree root, or a child link of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Root,
    Child(Idx, Side),
}

#[derive(Debug)]
pub(crate) struct Node<K> {
    pub(crate) key: K,
    pub(crate) left: Option<Idx>,
    pub(crate) right: Option<Idx>,
    /// Number of nodes in the subtree rooted here, including this one.
    pub(crate) weight: usize,
}

impl<K> Node<K> {
    fn new(key: K) -> Self {
        Node {
            key,
            left: None,
            right: None,
            weight: 1,
        }
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Option<Idx> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    fn child_mut(&mut self, side: Side) -> &mut Option<Idx> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

#[derive(Debug)]
pub(crate) struct NodeStore<K> {
    nodes: Vec<Node<K>>,
    root: Option<Idx>,
}

impl<K> NodeStore<K> {
    pub(crate) fn new() -> Self {
        NodeStore {
            nodes: Vec::new(),
            root: None,
        }
    }

    // --- Node access helpers ---

    #[inline]
    pub(crate) fn node(&self, idx: Idx) -> &Node<K> {
        &self.nodes[idx as usize]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, idx: Idx) -> &mut Node<K> {
        &mut self.nodes[idx as usize]
    }

    /// The whole arena, for read-only traversals that fan out across threads.
    #[inline]
    pub(crate) fn nodes(&self) -> &[Node<K>] {
        &self.nodes
    }

    #[inline]
    pub(crate) fn root(&self) -> Option<Idx> {
        self.root
    }

    /// Weight of a possibly empty subtree.
    #[inline]
    pub(crate) fn weight(&self, subtree: Option<Idx>) -> usize {
        subtree.map_or(0, |idx| self.node(idx).weight)
    }

    pub(crate) fn get(&self, slot: Slot) -> Option<Idx> {
        match slot {
            Slot::Root => self.root,
            Slot::Child(parent, side) => self.node(parent).child(side),
        }
    }

    pub(crate) fn set(&mut self, slot: Slot, subtree: Option<Idx>) {
        match slot {
            Slot::Root => self.root = subtree,
            Slot::Child(parent, side) => *self.node_mut(parent).child_mut(side) = subtree,
        }
    }

    /// Allocate a detached node of weight 1.
    pub(crate) fn alloc(&mut self, key: K) -> Idx {
        let idx = next_idx(self.nodes.len());
        self.nodes.push(Node::new(key));
        idx
    }

    /// Exchange the keys of two distinct nodes, leaving links and weights alone.
    pub(crate) fn swap_keys(&mut self, a: Idx, b: Idx) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi as usize);
        std::mem::swap(&mut head[lo as usize].key, &mut tail[0].key);
    }

    /// Drop every node.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub(crate) fn height(&self, subtree: Option<Idx>) -> usize {
        match subtree {
            None => 0,
            Some(idx) => {
                let node = self.node(idx);
                1 + self.height(node.left).max(self.height(node.right))
            }
        }
    }

    /// In-order walk over a subtree.
    pub(crate) fn for_each_in_order<'a>(
        &'a self,
        subtree: Option<Idx>,
        mut visit: impl FnMut(&'a Node<K>),
    ) {
        let mut stack: Vec<Idx> = Vec::new();
        let mut cursor = subtree;
        loop {
            while let Some(idx) = cursor {
                stack.push(idx);
                cursor = self.node(idx).left;
            }
            let Some(idx) = stack.pop() else { break };
            let node = self.node(idx);
            visit(node);
            cursor = node.right;
        }
    }

    /// Recompute the size of every subtree and compare it with the stored weight.
    fn check_weights(&self, subtree: Option<Idx>) -> Result<usize> {
        let Some(idx) = subtree else { return Ok(0) };
        let node = self.node(idx);
        let actual = 1 + self.check_weights(node.left)? + self.check_weights(node.right)?;
        if actual != node.weight {
            return Err(Error::WeightMismatch { stored: node.weight, actual });
        }
        Ok(actual)
    }
}

impl<K: Ord> NodeStore<K> {
    /// Remove a node that no slot references any more, returning its key.
    pub(crate) fn release(&mut self, idx: Idx) -> K {
        let last = (self.nodes.len() - 1) as Idx;
        let removed = self.nodes.swap_remove(idx as usize);
        if idx != last {
            // The former last node now lives at `idx`.
            match self.owner_of(last, &self.nodes[idx as usize].key) {
                Some(slot) => self.set(slot, Some(idx)),
                None => debug_assert!(false, "moved node {} has no owning slot", last),
            }
        }
        removed.key
    }

    /// Find the slot that currently points at `target`, descending by `key`.
    /// `target` itself is never dereferenced, so it may be a stale index.
    fn owner_of(&self, target: Idx, key: &K) -> Option<Slot> {
        let mut slot = Slot::Root;
        while let Some(idx) = self.get(slot) {
            if idx == target {
                return Some(slot);
            }
            let side = match key.cmp(&self.node(idx).key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return None,
            };
            slot = Slot::Child(idx, side);
        }
        None
    }

    /// Check the weight and ordering invariants of the whole tree, and that
    /// every node in the arena is reachable from the root.
    pub(crate) fn validate(&self) -> Result<()> {
        let total = self.check_weights(self.root)?;
        if total != self.nodes.len() {
            return Err(Error::Unreachable {
                reachable: total,
                allocated: self.nodes.len(),
            });
        }

        let mut previous: Option<&K> = None;
        let mut position = 0usize;
        let mut violation = None;
        self.for_each_in_order(self.root, |node| {
            if violation.is_none() && previous.is_some_and(|p| *p >= node.key) {
                violation = Some(position);
            }
            previous = Some(&node.key);
            position += 1;
        });
        match violation {
            Some(position) => Err(Error::OrderViolation { position }),
            None => Ok(()),
        }
    }
}

/// Index of the node pushed after `len` others.
#[inline]
fn next_idx(len: usize) -> Idx {
    debug_assert!(len < Idx::MAX as usize, "arena is full at {} nodes", len);
    len as Idx
}
