// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Rebuild Engine
//!
//! Turns an arbitrary subtree into a perfectly balanced one in two passes:
//!
//! 1. **Flatten**: write the subtree's node indices into an array in key
//!    order. A node's position is its left subtree's weight past the start
//!    of its range, so every call is handed the exact sub-slice its subtree
//!    fills before it starts writing.
//! 2. **Build**: the middle element of a range (right of centre on even
//!    lengths) becomes the root, the halves become its children. Each
//!    position's new `(left, right, weight)` is written into a link array
//!    parallel to the order array, then committed to the arena.
//!
//! Both passes split their output with `split_at_mut`, so concurrent calls
//! own disjoint slices and no locking is needed. The only precondition is
//! that every stored weight is exact when a rebuild starts.
//!
//! ```text
//! order: [ a b c | d | e f g ]      d = order[len / 2]
//!          ^^^^^       ^^^^^
//!          left call   right call (may run on another thread)
//! ```
//!
//! Recursive calls fork while the subtree holds at least
//! `min_subtree_size_for_parallelism` nodes and the recursion sits above
//! `max_fork_depth`; below that the sequential passes take over. Every forked
//! call is joined before its parent returns.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, instrument, trace};

use crate::config::{ExecutionMode, RebuildConfig};
use crate::error::Result;
use crate::node::{Idx, Node, NodeStore};

/// New shape of one node, produced by the build pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) left: Option<Idx>,
    pub(crate) right: Option<Idx>,
    pub(crate) weight: usize,
}

#[derive(Debug, Clone)]
enum Executor {
    Inline,
    /// One scoped thread per fork.
    Spawn,
    Pool(Arc<ThreadPool>),
}

impl Executor {
    /// Run `a` and `b`, possibly in parallel, and wait for both.
    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        match self {
            Executor::Inline => (a(), b()),
            Executor::Spawn => {
                let joined = crossbeam::thread::scope(|scope| {
                    let handle = scope.spawn(|_| a());
                    let rb = b();
                    (handle.join(), rb)
                });
                match joined {
                    Ok((Ok(ra), rb)) => (ra, rb),
                    Ok((Err(payload), _)) | Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            // Only reached inside `ThreadPool::install`, so this runs on the pool.
            Executor::Pool(_) => rayon::join(a, b),
        }
    }
}

/// Decides whether a call forks, and runs the fork.
struct Fork<'a> {
    config: &'a RebuildConfig,
    executor: &'a Executor,
}

/// Rebuilds subtrees with a configured execution strategy.
#[derive(Debug, Clone)]
pub struct Rebuilder {
    config: RebuildConfig,
    executor: Executor,
}

impl Rebuilder {
    /// Builds the worker pool up front for [`ExecutionMode::Pool`].
    pub fn new(config: RebuildConfig) -> Result<Self> {
        let executor = match config.mode {
            ExecutionMode::Sequential => Executor::Inline,
            ExecutionMode::ForkJoin => Executor::Spawn,
            ExecutionMode::Pool => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(config.pool_width)
                    .thread_name(|i| format!("reforest-rebuild-{}", i))
                    .build()?;
                Executor::Pool(Arc::new(pool))
            }
        };
        Ok(Rebuilder { config, executor })
    }

    /// Rebuild on an existing pool, which may be shared with other trees.
    /// The config's mode is forced to [`ExecutionMode::Pool`] and its
    /// `pool_width` is replaced by the pool's. A sequential config never
    /// forks, so it takes the thresholds of [`RebuildConfig::pool`].
    pub fn with_pool(config: RebuildConfig, pool: Arc<ThreadPool>) -> Self {
        let config = match config.mode {
            ExecutionMode::Sequential => RebuildConfig::pool(),
            _ => config,
        };
        let config = RebuildConfig {
            mode: ExecutionMode::Pool,
            pool_width: pool.current_num_threads(),
            ..config
        };
        Rebuilder {
            config,
            executor: Executor::Pool(pool),
        }
    }

    pub fn sequential() -> Self {
        Rebuilder {
            config: RebuildConfig::sequential(),
            executor: Executor::Inline,
        }
    }

    pub fn config(&self) -> &RebuildConfig {
        &self.config
    }

    pub fn pool(&self) -> Option<&Arc<ThreadPool>> {
        match &self.executor {
            Executor::Pool(pool) => Some(pool),
            _ => None,
        }
    }

    /// Rebuild the subtree rooted at `root` in place and return its new root.
    /// No node is allocated or freed; only links and weights change.
    #[instrument(
        level = "debug",
        skip_all,
        fields(mode = ?self.config.mode, size = tracing::field::Empty)
    )]
    pub(crate) fn rebuild<K: Sync>(&self, store: &mut NodeStore<K>, root: Idx) -> Idx {
        let size = store.node(root).weight;
        tracing::Span::current().record("size", size);
        debug!("rebuilding subtree");

        let order = self.flatten(store, root);
        let (new_root, links) = self.build(&order);
        for (&idx, link) in order.iter().zip(&links) {
            let node = store.node_mut(idx);
            node.left = link.left;
            node.right = link.right;
            node.weight = link.weight;
        }

        debug!(new_root = order[size / 2], "rebuilt subtree");
        new_root.unwrap_or(root)
    }

    /// Node indices of the subtree rooted at `root`, in key order.
    pub(crate) fn flatten<K: Sync>(&self, store: &NodeStore<K>, root: Idx) -> Vec<Idx> {
        let nodes = store.nodes();
        let mut order = vec![0; nodes[root as usize].weight];
        let fork = self.fork();
        self.run(|| flatten_par(&fork, nodes, root, &mut order, 0));
        order
    }

    /// Balanced links for the nodes in `order`, and the root they hang from.
    pub(crate) fn build(&self, order: &[Idx]) -> (Option<Idx>, Vec<Link>) {
        let mut links = vec![Link::default(); order.len()];
        let fork = self.fork();
        let root = self.run(|| build_par(&fork, order, &mut links, 0));
        (root, links)
    }

    fn fork(&self) -> Fork<'_> {
        Fork {
            config: &self.config,
            executor: &self.executor,
        }
    }

    fn run<R: Send>(&self, work: impl FnOnce() -> R + Send) -> R {
        match &self.executor {
            Executor::Pool(pool) => pool.install(work),
            _ => work(),
        }
    }
}

impl Default for Rebuilder {
    fn default() -> Self {
        Self::sequential()
    }
}

fn flatten_seq<K>(nodes: &[Node<K>], idx: Idx, out: &mut [Idx]) {
    let node = &nodes[idx as usize];
    debug_assert_eq!(out.len(), node.weight, "weight of node {} is stale", idx);
    let left_weight = node.left.map_or(0, |left| nodes[left as usize].weight);
    let (left_out, rest) = out.split_at_mut(left_weight);
    let (here, right_out) = rest.split_at_mut(1);
    here[0] = idx;
    if let Some(left) = node.left {
        flatten_seq(nodes, left, left_out);
    }
    if let Some(right) = node.right {
        flatten_seq(nodes, right, right_out);
    }
}

fn flatten_par<K: Sync>(
    fork: &Fork<'_>,
    nodes: &[Node<K>],
    idx: Idx,
    out: &mut [Idx],
    depth: u32,
) {
    let node = &nodes[idx as usize];
    if !fork.config.should_fork(node.weight, depth) {
        return flatten_seq(nodes, idx, out);
    }

    debug_assert_eq!(out.len(), node.weight, "weight of node {} is stale", idx);
    trace!(idx, size = node.weight, depth, "fork flatten");
    let left_weight = node.left.map_or(0, |left| nodes[left as usize].weight);
    let (left_out, rest) = out.split_at_mut(left_weight);
    let (here, right_out) = rest.split_at_mut(1);
    here[0] = idx;
    let (left, right) = (node.left, node.right);
    fork.executor.join(
        || {
            if let Some(left) = left {
                flatten_par(fork, nodes, left, left_out, depth + 1);
            }
        },
        || {
            if let Some(right) = right {
                flatten_par(fork, nodes, right, right_out, depth + 1);
            }
        },
    );
}

fn build_seq(order: &[Idx], links: &mut [Link]) -> Option<Idx> {
    if order.is_empty() {
        return None;
    }
    let mid = order.len() / 2;
    let (left_links, rest) = links.split_at_mut(mid);
    let (here, right_links) = rest.split_at_mut(1);
    let left = build_seq(&order[..mid], left_links);
    let right = build_seq(&order[mid + 1..], right_links);
    here[0] = Link {
        left,
        right,
        weight: order.len(),
    };
    Some(order[mid])
}

fn build_par(fork: &Fork<'_>, order: &[Idx], links: &mut [Link], depth: u32) -> Option<Idx> {
    if order.is_empty() || !fork.config.should_fork(order.len(), depth) {
        return build_seq(order, links);
    }

    trace!(size = order.len(), depth, "fork build");
    let mid = order.len() / 2;
    let (left_links, rest) = links.split_at_mut(mid);
    let (here, right_links) = rest.split_at_mut(1);
    let (left, right) = fork.executor.join(
        || build_par(fork, &order[..mid], left_links, depth + 1),
        || build_par(fork, &order[mid + 1..], right_links, depth + 1),
    );
    here[0] = Link {
        left,
        right,
        weight: order.len(),
    };
    Some(order[mid])
}
