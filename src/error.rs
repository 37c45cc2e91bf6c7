// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Errors reported by tree construction and validation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// `alpha` fell outside the open interval `(min, max)` of its policy.
    #[error("alpha must satisfy {min} < alpha < {max}, got {alpha}")]
    InvalidAlpha { alpha: f64, min: f64, max: f64 },

    #[error("failed to build rebuild thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A node's stored weight disagrees with the size of its subtree.
    #[error("node weight {stored} does not match subtree size {actual}")]
    WeightMismatch { stored: usize, actual: usize },

    /// Some arena nodes cannot be reached from the root.
    #[error("{reachable} of {allocated} allocated nodes are reachable from the root")]
    Unreachable { reachable: usize, allocated: usize },

    /// An in-order traversal found two keys out of order.
    #[error("keys out of order at in-order position {position}")]
    OrderViolation { position: usize },
}
