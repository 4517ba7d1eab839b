//! Stake-weighted selection.
//!
//! [`SortitionTree`] keeps `(key, weight)` entries in a complete binary tree
//! laid out in a flat array: leaves hold entry weights, every internal node
//! holds the sum of its subtree. Inserting, re-weighting and drawing are
//! `O(log n)`; the total weight is read from the root in `O(1)`.
//!
//! A draw maps a value in `[0, total)` onto the key whose cumulative weight
//! interval contains it, so a uniformly distributed value selects each key
//! with probability `weight / total`.

pub mod error;
pub mod seed;
pub mod tree;

pub use error::{Result, SortitionError};
pub use seed::reduce_seed;
pub use tree::SortitionTree;
