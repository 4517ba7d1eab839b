pub mod access;
pub mod address;
pub mod amount;
pub mod chain;
pub mod error;
pub mod events;

pub use access::{AccessControl, Role, RoleTable};
pub use address::AccountAddress;
pub use amount::TokenAmount;
pub use chain::{ChainClock, SimulatedChain, DEFAULT_BLOCK_HASH_WINDOW};
pub use error::ErrorKind;
pub use events::{EventBus, WorkTogetherEvent};
