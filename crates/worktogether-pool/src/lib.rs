//! Lottery pools.
//!
//! A [`Pool`] accepts stake during its entry window, then asks a
//! [`RandomnessSource`](worktogether_rng::RandomnessSource) for a seed and
//! pays its whole reward balance to one entrant drawn with probability
//! proportional to stake. [`PoolRegistry`] creates pools and looks them up by
//! sequential id.

pub mod error;
pub mod pool;
pub mod registry;
pub mod window;

pub use error::{PoolError, Result};
pub use pool::{Pool, PoolContext, PoolId, PoolInfo, PoolParams, PoolStatus};
pub use registry::PoolRegistry;
pub use window::EntryWindow;
