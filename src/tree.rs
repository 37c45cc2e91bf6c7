// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Balanced Tree
//!
//! An ordered set kept balanced by rebuilding whole subtrees instead of
//! rotating. Mutations descend iteratively and record the path they took;
//! on the way back up every ancestor's weight is adjusted and the
//! [`BalancePolicy`] picks at most one ancestor whose subtree is rebuilt.
//!
//! # Operations
//!
//! - `contains(key)`: O(height), read-only
//! - `insert(key)` / `remove(key)`: O(height) plus amortized rebuild cost
//! - `rebuild()`: O(n), leaves a tree of height `ceil(log2(n + 1))`
//! - `clear()`: O(n)
//!
//! # Concurrency
//!
//! A tree is mutated by one caller at a time (`&mut self`). Rebuilds may fan
//! out onto other threads internally, but every task has joined before the
//! mutation returns. Shared references can be read from many threads.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;
use tracing::debug;

use crate::error::Result;
use crate::node::{Idx, NodeStore, Side, Slot};
use crate::policy::{BalancePolicy, ScapegoatPolicy, WeightBalancePolicy, Weights};
use crate::rebuild::Rebuilder;

/// Descents deeper than this spill onto the heap.
const INLINE_PATH: usize = 64;

/// A node passed on a descent, and the side taken below it.
#[derive(Debug, Clone, Copy)]
struct Step {
    idx: Idx,
    side: Side,
}

type Path = SmallVec<[Step; INLINE_PATH]>;

/// An ordered set of unique keys.
pub struct BalancedTree<K, P> {
    store: NodeStore<K>,
    policy: P,
    rebuilder: Rebuilder,
}

/// Tree rebuilt at a scapegoat when an insert lands too deep, and in full
/// once removals halve it.
pub type ScapegoatTree<K> = BalancedTree<K, ScapegoatPolicy>;

/// Tree rebuilt at the deepest ancestor whose children's weights drift apart.
pub type WeightBalancedTree<K> = BalancedTree<K, WeightBalancePolicy>;

impl<K, P: BalancePolicy> BalancedTree<K, P> {
    /// An empty tree that rebuilds sequentially.
    pub fn with_policy(policy: P) -> Self {
        Self::with_rebuilder(policy, Rebuilder::sequential())
    }

    pub fn with_rebuilder(policy: P, rebuilder: Rebuilder) -> Self {
        BalancedTree {
            store: NodeStore::new(),
            policy,
            rebuilder,
        }
    }

    /// Drop every key.
    pub fn clear(&mut self) {
        self.store.clear();
        self.policy.reset(0);
    }
}

impl<K, P> BalancedTree<K, P> {
    pub fn len(&self) -> usize {
        self.store.weight(self.store.root())
    }

    pub fn is_empty(&self) -> bool {
        self.store.root().is_none()
    }

    /// Number of nodes on the longest root-to-leaf path; 0 when empty.
    pub fn height(&self) -> usize {
        self.store.height(self.store.root())
    }

    /// Stored weight of the root node, `None` when empty.
    pub fn root_weight(&self) -> Option<usize> {
        self.store.root().map(|root| self.store.node(root).weight)
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn rebuilder(&self) -> &Rebuilder {
        &self.rebuilder
    }

    /// Every key, in increasing order.
    pub fn keys(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len());
        self.store.for_each_in_order(self.store.root(), |node| keys.push(&node.key));
        keys
    }

    /// Every key with the weight of the subtree it roots, in key order.
    pub fn entries(&self) -> Vec<(&K, usize)> {
        let mut entries = Vec::with_capacity(self.len());
        self.store
            .for_each_in_order(self.store.root(), |node| entries.push((&node.key, node.weight)));
        entries
    }

    /// Slot holding the node of `path[i]`.
    fn slot_of(path: &[Step], i: usize) -> Slot {
        match i {
            0 => Slot::Root,
            _ => Slot::Child(path[i - 1].idx, path[i - 1].side),
        }
    }

    /// Slot the descent recorded in `path` ended at.
    fn slot_below(path: &[Step]) -> Slot {
        path.last()
            .map_or(Slot::Root, |step| Slot::Child(step.idx, step.side))
    }

    fn weights(&self, step: Step) -> Weights {
        let node = self.store.node(step.idx);
        let left = self.store.weight(node.left);
        let right = self.store.weight(node.right);
        Weights {
            weight: node.weight,
            left,
            right,
            on_path: match step.side {
                Side::Left => left,
                Side::Right => right,
            },
        }
    }
}

impl<K: Ord, P> BalancedTree<K, P> {
    /// Whether `key` is in the set.
    pub fn contains(&self, key: &K) -> bool {
        let mut cursor = self.store.root();
        while let Some(idx) = cursor {
            let node = self.store.node(idx);
            cursor = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return true,
            };
        }
        false
    }

    /// Check that every weight matches its subtree's size and keys are
    /// strictly increasing in order.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()
    }

    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        if let Err(err) = self.validate() {
            panic!("INVARIANT VIOLATED: {}", err);
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_invariants(&self) {}
}

impl<K: Ord + Sync, P: BalancePolicy> BalancedTree<K, P> {
    /// Add `key`. Returns `false`, leaving the tree untouched, if it is
    /// already present.
    pub fn insert(&mut self, key: K) -> bool {
        let mut path = Path::new();
        let mut cursor = self.store.root();
        while let Some(idx) = cursor {
            let node = self.store.node(idx);
            let side = match key.cmp(&node.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return false,
            };
            path.push(Step { idx, side });
            cursor = node.child(side);
        }

        let fresh = self.store.alloc(key);
        self.store.set(Self::slot_below(&path), Some(fresh));
        for step in &path {
            self.store.node_mut(step.idx).weight += 1;
        }

        // Read after attaching, so an empty tree never looks at a prior root.
        let size = self.len();
        if self.policy.check_insert(path.len(), size) {
            self.rebuild_on_path(&path);
        }
        self.check_invariants();
        true
    }

    /// Remove `key`. Returns `false` if it was absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let mut path = Path::new();
        let mut cursor = self.store.root();
        let found = loop {
            let Some(idx) = cursor else { return false };
            let node = self.store.node(idx);
            let side = match key.cmp(&node.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => break idx,
            };
            path.push(Step { idx, side });
            cursor = node.child(side);
        };

        // With two children, the in-order predecessor gives up its key and
        // its node is unlinked instead. It has no right child.
        let node = self.store.node(found);
        let unlinked = match (node.left, node.right) {
            (Some(left), Some(_)) => {
                path.push(Step { idx: found, side: Side::Left });
                let mut pred = left;
                while let Some(right) = self.store.node(pred).right {
                    path.push(Step { idx: pred, side: Side::Right });
                    pred = right;
                }
                self.store.swap_keys(found, pred);
                pred
            }
            _ => found,
        };

        let node = self.store.node(unlinked);
        let orphan = node.left.or(node.right);
        self.store.set(Self::slot_below(&path), orphan);
        for step in &path {
            self.store.node_mut(step.idx).weight -= 1;
        }

        if self.policy.check_remove() {
            self.rebuild_on_path(&path);
        }
        self.store.release(unlinked);

        let size = self.len();
        if self.policy.check_shrink(size) {
            debug!(size, "tree shrank past its high-water mark");
            self.rebuild_slot(Slot::Root);
            self.policy.reset(size);
        }
        self.check_invariants();
        true
    }

    /// Rebuild the whole tree into one of minimal height.
    pub fn rebuild(&mut self) {
        self.rebuild_slot(Slot::Root);
        self.policy.reset(self.len());
        self.check_invariants();
    }

    /// Rebuild the deepest ancestor on `path` the policy flags, if any.
    fn rebuild_on_path(&mut self, path: &[Step]) {
        let flagged = path
            .iter()
            .rposition(|&step| self.policy.needs_rebuild(&self.weights(step)));
        if let Some(i) = flagged {
            debug!(depth = i, size = self.store.node(path[i].idx).weight, "unbalanced ancestor");
            self.rebuild_slot(Self::slot_of(path, i));
        }
    }

    fn rebuild_slot(&mut self, slot: Slot) {
        if let Some(root) = self.store.get(slot) {
            let new_root = self.rebuilder.rebuild(&mut self.store, root);
            self.store.set(slot, Some(new_root));
        }
    }
}

impl<K> ScapegoatTree<K> {
    pub fn new() -> Self {
        Self::with_policy(ScapegoatPolicy::default())
    }

    /// Fails unless `0.5 < alpha < 1.0`.
    pub fn with_alpha(alpha: f64) -> Result<Self> {
        Ok(Self::with_policy(ScapegoatPolicy::new(alpha)?))
    }
}

impl<K> WeightBalancedTree<K> {
    pub fn new() -> Self {
        Self::with_policy(WeightBalancePolicy::default())
    }

    /// Fails unless `0.0 < alpha < 0.5`.
    pub fn with_alpha(alpha: f64) -> Result<Self> {
        Ok(Self::with_policy(WeightBalancePolicy::new(alpha)?))
    }
}

impl<K, P: BalancePolicy + Default> Default for BalancedTree<K, P> {
    fn default() -> Self {
        Self::with_policy(P::default())
    }
}

impl<K: fmt::Debug, P: fmt::Debug> fmt::Debug for BalancedTree<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalancedTree")
            .field("len", &self.len())
            .field("height", &self.height())
            .field("policy", &self.policy)
            .field("keys", &self.keys())
            .finish()
    }
}

impl<K: Ord + Sync, P: BalancePolicy> Extend<K> for BalancedTree<K, P> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + Sync, P: BalancePolicy + Default> FromIterator<K> for BalancedTree<K, P> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn keys(tree: &BalancedTree<u32, impl BalancePolicy>) -> Vec<u32> {
        tree.keys().into_iter().copied().collect()
    }

    #[test]
    fn empty_tree() {
        let tree: ScapegoatTree<u32> = ScapegoatTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root_weight(), None);
        assert!(!tree.contains(&1));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn insert_into_empty_tree() {
        let mut tree = ScapegoatTree::new();
        assert!(tree.insert(5u32));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_weight(), Some(1));
        assert_eq!(tree.policy().high_water(), 1);
        assert!(tree.contains(&5));
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut tree = WeightBalancedTree::new();
        assert!(tree.insert(1u32));
        assert!(tree.insert(2));
        assert!(!tree.insert(1));
        assert_eq!(tree.len(), 2);
        assert_eq!(keys(&tree), vec![1, 2]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut tree: ScapegoatTree<u32> = (1..=5).collect();
        assert!(!tree.remove(&9));
        assert_eq!(tree.len(), 5);
        let mut empty: WeightBalancedTree<u32> = WeightBalancedTree::new();
        assert!(!empty.remove(&1));
    }

    #[test]
    fn bad_alpha_builds_nothing() {
        assert!(matches!(
            ScapegoatTree::<u32>::with_alpha(0.5),
            Err(Error::InvalidAlpha { .. })
        ));
        assert!(matches!(
            WeightBalancedTree::<u32>::with_alpha(0.5),
            Err(Error::InvalidAlpha { .. })
        ));
        assert_eq!(ScapegoatTree::<u32>::with_alpha(0.7).unwrap().policy().alpha(), 0.7);
    }

    fn concrete_scenario<P: BalancePolicy>(mut tree: BalancedTree<u32, P>) {
        for key in 1..=7 {
            assert!(tree.insert(key));
        }
        assert!(tree.contains(&4));
        assert!(!tree.contains(&8));

        tree.rebuild();
        assert_eq!(tree.height(), 3);
        assert_eq!(keys(&tree), vec![1, 2, 3, 4, 5, 6, 7]);

        assert!(tree.remove(&4));
        assert!(!tree.contains(&4));
        assert_eq!(tree.root_weight(), Some(6));
    }

    #[test]
    fn concrete_scenario_scapegoat() {
        concrete_scenario(ScapegoatTree::new());
    }

    #[test]
    fn concrete_scenario_weight_balance() {
        concrete_scenario(WeightBalancedTree::new());
    }

    #[test]
    fn remove_node_with_two_children() {
        let mut tree: WeightBalancedTree<u32> = (1..=7).collect();
        tree.rebuild();
        // Root is 4; its predecessor 3 takes its place.
        assert!(tree.remove(&4));
        assert_eq!(keys(&tree), vec![1, 2, 3, 5, 6, 7]);
        assert_eq!(tree.entries()[2], (&3, 6));
    }

    #[test]
    fn remove_leaf_and_single_child() {
        let mut tree: ScapegoatTree<u32> = [4, 2, 6, 1].into_iter().collect();
        assert!(tree.remove(&2));
        assert_eq!(keys(&tree), vec![1, 4, 6]);
        assert!(tree.remove(&6));
        assert_eq!(keys(&tree), vec![1, 4]);
        assert!(tree.remove(&4));
        assert!(tree.remove(&1));
        assert!(tree.is_empty());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn scapegoat_shrink_rebuilds_whole_tree() {
        let mut tree: ScapegoatTree<u32> = (1..=8).collect();
        assert_eq!(tree.policy().high_water(), 8);
        for key in 1..=3 {
            tree.remove(&key);
        }
        assert_eq!(tree.policy().high_water(), 8);
        tree.remove(&4);
        assert_eq!(tree.policy().high_water(), 4);
        assert_eq!(tree.height(), 3);
        assert_eq!(keys(&tree), vec![5, 6, 7, 8]);
    }

    #[test]
    fn forced_rebuild_resets_high_water() {
        let mut tree: ScapegoatTree<u32> = (1..=10).collect();
        tree.remove(&1);
        tree.rebuild();
        assert_eq!(tree.policy().high_water(), 9);
    }

    #[test]
    fn sequential_inserts_stay_shallow() {
        let mut scapegoat = ScapegoatTree::new();
        let mut weight = WeightBalancedTree::new();
        for key in 0..1000u32 {
            scapegoat.insert(key);
            weight.insert(key);
        }
        // A plain BST would be 1000 deep.
        assert!(scapegoat.height() <= 14, "height {}", scapegoat.height());
        assert!(weight.height() <= 20, "height {}", weight.height());
    }

    /// A right chain `1 -> 2 -> ... -> n` with exact weights, never rebuilt.
    fn right_chain<P: BalancePolicy>(policy: P, n: u32) -> BalancedTree<u32, P> {
        let mut tree = BalancedTree::with_policy(policy);
        let mut slot = Slot::Root;
        for key in 1..=n {
            let idx = tree.store.alloc(key);
            tree.store.node_mut(idx).weight = (n + 1 - key) as usize;
            tree.store.set(slot, Some(idx));
            slot = Slot::Child(idx, Side::Right);
        }
        assert!(tree.validate().is_ok());
        tree
    }

    fn tail(tree: &BalancedTree<u32, impl BalancePolicy>, from: usize) -> Vec<(u32, usize)> {
        tree.entries()[from..].iter().map(|&(k, w)| (*k, w)).collect()
    }

    // Every ancestor from 1 to 9 is flagged after inserting 11, but only the
    // subtree at 9 is rebuilt. The chain above it stays as it was.
    #[test]
    fn insert_rebuilds_deepest_flagged_ancestor_only() {
        let mut tree = right_chain(WeightBalancePolicy::default(), 10);
        assert!(tree.insert(11));
        assert_eq!(tree.height(), 10);
        assert_eq!(tail(&tree, 7), vec![(8, 4), (9, 1), (10, 3), (11, 1)]);

        let mut tree = right_chain(ScapegoatPolicy::default(), 10);
        assert!(tree.insert(11));
        assert_eq!(tree.height(), 10);
        assert_eq!(tail(&tree, 7), vec![(8, 4), (9, 1), (10, 3), (11, 1)]);
        assert_eq!(keys(&tree), (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn descent_longer_than_inline_path() {
        let mut tree = right_chain(WeightBalancePolicy::default(), INLINE_PATH as u32 + 36);
        assert!(tree.insert(1_000));
        assert!(tree.remove(&(INLINE_PATH as u32)));
        assert_eq!(tree.len(), INLINE_PATH + 36);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn remove_rebuilds_deepest_flagged_ancestor_only() {
        let mut tree = right_chain(WeightBalancePolicy::default(), 10);
        assert!(tree.remove(&10));
        // 7 is the deepest ancestor out of balance; 1 through 6 stay a chain.
        assert_eq!(tree.height(), 8);
        assert_eq!(tail(&tree, 5), vec![(6, 4), (7, 1), (8, 3), (9, 1)]);
        assert_eq!(tree.root_weight(), Some(9));
    }

    #[test]
    fn clear_releases_everything() {
        let mut tree: ScapegoatTree<u32> = (0..50).collect();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.policy().high_water(), 0);
        assert!(tree.insert(3));
        assert_eq!(keys(&tree), vec![3]);
    }

    #[test]
    fn debug_lists_keys() {
        let tree: WeightBalancedTree<u32> = [2, 1].into_iter().collect();
        let text = format!("{:?}", tree);
        assert!(text.contains("keys: [1, 2]"), "{}", text);
    }
}
