// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Tuning for the rebuild engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a rebuild runs its recursive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExecutionMode {
    /// Every call runs inline on the caller's thread.
    #[default]
    Sequential,
    /// Forked calls run on freshly spawned scoped threads.
    ForkJoin,
    /// Forked calls run on a fixed-size worker pool.
    Pool,
}

/// Thresholds that decide when a recursive rebuild call forks.
///
/// A call forks only if its subtree holds at least
/// `min_subtree_size_for_parallelism` nodes and it sits above
/// `max_fork_depth`, so at most `2^max_fork_depth` tasks run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RebuildConfig {
    pub mode: ExecutionMode,
    pub min_subtree_size_for_parallelism: usize,
    pub max_fork_depth: u32,
    /// Worker count for [`ExecutionMode::Pool`]. Zero lets the pool pick one
    /// worker per CPU. Ignored by the other modes.
    pub pool_width: usize,
}

impl RebuildConfig {
    pub const FORK_JOIN_MIN_SIZE: usize = 70_000;
    pub const FORK_JOIN_MAX_DEPTH: u32 = 5;
    pub const POOL_MIN_SIZE: usize = 6_000;
    pub const POOL_MAX_DEPTH: u32 = 3;
    pub const POOL_WIDTH: usize = 7;

    pub fn sequential() -> Self {
        RebuildConfig {
            mode: ExecutionMode::Sequential,
            min_subtree_size_for_parallelism: usize::MAX,
            max_fork_depth: 0,
            pool_width: 0,
        }
    }

    /// Spawning a thread is expensive, so only large subtrees fork.
    pub fn fork_join() -> Self {
        RebuildConfig {
            mode: ExecutionMode::ForkJoin,
            min_subtree_size_for_parallelism: Self::FORK_JOIN_MIN_SIZE,
            max_fork_depth: Self::FORK_JOIN_MAX_DEPTH,
            pool_width: 0,
        }
    }

    pub fn pool() -> Self {
        RebuildConfig {
            mode: ExecutionMode::Pool,
            min_subtree_size_for_parallelism: Self::POOL_MIN_SIZE,
            max_fork_depth: Self::POOL_MAX_DEPTH,
            pool_width: Self::POOL_WIDTH,
        }
    }

    pub fn with_min_subtree_size(mut self, size: usize) -> Self {
        self.min_subtree_size_for_parallelism = size;
        self
    }

    pub fn with_max_fork_depth(mut self, depth: u32) -> Self {
        self.max_fork_depth = depth;
        self
    }

    pub fn with_pool_width(mut self, width: usize) -> Self {
        self.pool_width = width;
        self
    }

    /// Whether a call over `size` nodes at recursion `depth` should fork.
    #[inline]
    pub fn should_fork(&self, size: usize, depth: u32) -> bool {
        self.mode != ExecutionMode::Sequential
            && size >= self.min_subtree_size_for_parallelism
            && depth < self.max_fork_depth
    }
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self::sequential()
    }
}
