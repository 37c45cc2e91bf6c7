// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Balance Policies
//!
//! A policy never touches nodes. The tree reports each structural change to
//! it and asks, for every ancestor on the mutated path, whether that ancestor
//! is out of balance. The deepest ancestor the policy flags is rebuilt.
//!
//! - [`ScapegoatPolicy`]: an insert only looks for a rebuild point when the
//!   new node landed deeper than `log_{1/alpha}(size) + 1`. Removals never
//!   rebuild locally; once the tree shrinks to half of its high-water-mark
//!   the whole tree is rebuilt.
//! - [`WeightBalancePolicy`]: every insert and remove checks each ancestor's
//!   weight ratio, with no global state.

use crate::error::{Error, Result};

/// Default `alpha` for [`ScapegoatPolicy`] (9/16).
pub const DEFAULT_SCAPEGOAT_ALPHA: f64 = 0.5625;

/// Default `alpha` for [`WeightBalancePolicy`].
pub const DEFAULT_WEIGHT_BALANCE_ALPHA: f64 = 0.32;

/// Weights around one ancestor on a mutated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    /// Weight of the ancestor itself.
    pub weight: usize,
    pub left: usize,
    pub right: usize,
    /// Weight of the child the mutated path went through.
    pub on_path: usize,
}

/// Decides when and where a tree has to be rebuilt.
pub trait BalancePolicy {
    /// The tuning parameter this policy was built with.
    fn alpha(&self) -> f64;

    /// Called once an insert attached a new node at `depth` (the root sits at
    /// depth 0) and the tree holds `size` keys. Returns whether the insertion
    /// path should be searched for an ancestor to rebuild.
    fn check_insert(&mut self, depth: usize, size: usize) -> bool;

    /// Called once a removal unlinked a node. Returns whether the removal
    /// path should be searched for an ancestor to rebuild.
    fn check_remove(&mut self) -> bool;

    /// Whether this ancestor is out of balance.
    fn needs_rebuild(&self, weights: &Weights) -> bool;

    /// Called after a successful removal has finished, with the new size.
    /// Returns whether the whole tree should be rebuilt.
    fn check_shrink(&mut self, _size: usize) -> bool {
        false
    }

    /// Called after the whole tree was rebuilt or cleared.
    fn reset(&mut self, _size: usize) {}
}

fn check_alpha(alpha: f64, min: f64, max: f64) -> Result<f64> {
    if alpha > min && alpha < max {
        Ok(alpha)
    } else {
        Err(Error::InvalidAlpha { alpha, min, max })
    }
}

/// Size/depth triggered rebuilding with a global rebuild on shrink.
#[derive(Debug, Clone)]
pub struct ScapegoatPolicy {
    alpha: f64,
    /// `ln(1 / alpha)`, the log base of the depth bound.
    log_base: f64,
    /// Largest size reached since the last full rebuild.
    high_water: usize,
}

impl ScapegoatPolicy {
    /// Fails unless `0.5 < alpha < 1.0`.
    pub fn new(alpha: f64) -> Result<Self> {
        let alpha = check_alpha(alpha, 0.5, 1.0)?;
        Ok(ScapegoatPolicy {
            alpha,
            log_base: (1.0 / alpha).ln(),
            high_water: 0,
        })
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Deepest depth a node may sit at in a tree of `size` keys.
    pub fn depth_limit(&self, size: usize) -> usize {
        if size <= 1 {
            return 1;
        }
        ((size as f64).ln() / self.log_base).floor() as usize + 1
    }
}

impl Default for ScapegoatPolicy {
    fn default() -> Self {
        ScapegoatPolicy {
            alpha: DEFAULT_SCAPEGOAT_ALPHA,
            log_base: (1.0 / DEFAULT_SCAPEGOAT_ALPHA).ln(),
            high_water: 0,
        }
    }
}

impl BalancePolicy for ScapegoatPolicy {
    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn check_insert(&mut self, depth: usize, size: usize) -> bool {
        self.high_water = self.high_water.max(size);
        depth > self.depth_limit(size)
    }

    fn check_remove(&mut self) -> bool {
        false
    }

    fn needs_rebuild(&self, weights: &Weights) -> bool {
        weights.on_path as f64 > self.alpha * weights.weight as f64
    }

    fn check_shrink(&mut self, size: usize) -> bool {
        size <= self.high_water / 2
    }

    fn reset(&mut self, size: usize) {
        self.high_water = size;
    }
}

/// Per-node weight-ratio rebuilding.
#[derive(Debug, Clone)]
pub struct WeightBalancePolicy {
    alpha: f64,
}

impl WeightBalancePolicy {
    /// Fails unless `0.0 < alpha < 0.5`.
    pub fn new(alpha: f64) -> Result<Self> {
        Ok(WeightBalancePolicy {
            alpha: check_alpha(alpha, 0.0, 0.5)?,
        })
    }
}

impl Default for WeightBalancePolicy {
    fn default() -> Self {
        WeightBalancePolicy {
            alpha: DEFAULT_WEIGHT_BALANCE_ALPHA,
        }
    }
}

impl BalancePolicy for WeightBalancePolicy {
    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn check_insert(&mut self, _depth: usize, _size: usize) -> bool {
        true
    }

    fn check_remove(&mut self) -> bool {
        true
    }

    /// A missing child has weight 0, so it is compared as `1` like any other.
    fn needs_rebuild(&self, weights: &Weights) -> bool {
        let threshold = self.alpha * (weights.weight + 1) as f64;
        ((weights.left + 1) as f64) < threshold || ((weights.right + 1) as f64) < threshold
    }
}
