// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Reforest - ordered sets balanced by rebuilding whole subtrees.
//!
//! Instead of rotating after every change, these trees let small imbalances
//! accumulate and then rebuild an entire subtree into a perfectly balanced
//! one. Two policies decide when:
//!
//! - [`ScapegoatTree`]: rebuild at a scapegoat when an insert lands too deep,
//!   and rebuild everything once removals halve the tree.
//! - [`WeightBalancedTree`]: rebuild the deepest ancestor whose children's
//!   weights drift too far apart, after inserts and removals alike.
//!
//! Rebuilds flatten a subtree into key order and rebuild it from the middle
//! out. Both passes split cleanly, so large rebuilds can run across scoped
//! threads or a fixed worker pool, configured through [`RebuildConfig`].
//!
//! # Quick Start
//!
//! ```
//! use reforest::{
//!     RebuildConfig, Rebuilder, ScapegoatTree, WeightBalancePolicy, WeightBalancedTree,
//! };
//!
//! let mut tree = ScapegoatTree::new();
//! for key in 1..=7 {
//!     tree.insert(key);
//! }
//! assert!(tree.contains(&4));
//! tree.rebuild();
//! assert_eq!(tree.height(), 3);
//!
//! // Large rebuilds fan out onto a pool of worker threads.
//! let rebuilder = Rebuilder::new(RebuildConfig::pool()).unwrap();
//! let mut tree: WeightBalancedTree<u64> =
//!     WeightBalancedTree::with_rebuilder(WeightBalancePolicy::default(), rebuilder);
//! tree.extend(0..10_000);
//! assert_eq!(tree.len(), 10_000);
//! ```

pub mod config;
pub mod error;
mod node;
pub mod policy;
pub mod rebuild;
pub mod tree;

pub use config::{ExecutionMode, RebuildConfig};
pub use error::{Error, Result};
pub use policy::{BalancePolicy, ScapegoatPolicy, WeightBalancePolicy, Weights};
pub use rebuild::Rebuilder;
pub use tree::{BalancedTree, ScapegoatTree, WeightBalancedTree};
