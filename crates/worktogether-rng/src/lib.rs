//! Commit/reveal randomness for lottery draws.
//!
//! A requester first records a ticket bound to a future block. Once that
//! block is mined, and while its hash is still retrievable, the ticket can be
//! revealed into a 32-byte seed. The seed is cached so later reveals agree.

pub mod blockhash;
pub mod error;
pub mod request;
pub mod source;

pub use blockhash::{derive_seed, BlockhashRng};
pub use error::{Result, RngError};
pub use request::{RandomnessRequest, RandomnessTicket, RequestId, RequestState};
pub use source::{RandomnessSource, RngConfig};
