use crate::{RandomnessTicket, RequestId, Result, RngError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use worktogether_types::{AccountAddress, DEFAULT_BLOCK_HASH_WINDOW};

/// Two-phase randomness primitive consumed by pools.
#[async_trait]
pub trait RandomnessSource: Send + Sync {
    /// Record a request bound to a future block.
    async fn request(&self, requester: AccountAddress) -> Result<RandomnessTicket>;

    /// Seed for `request_id`. Repeated calls return the same seed.
    async fn reveal(&self, request_id: RequestId) -> Result<[u8; 32]>;

    /// Whether `reveal` would currently succeed.
    async fn is_ready(&self, request_id: RequestId) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngConfig {
    /// Blocks between the request and the block whose hash seeds the reveal.
    pub reveal_delay_blocks: u64,

    /// How many recent block hashes the chain keeps retrievable.
    pub block_hash_window: u64,
}

impl Default for RngConfig {
    fn default() -> Self {
        Self {
            reveal_delay_blocks: 1,
            block_hash_window: DEFAULT_BLOCK_HASH_WINDOW,
        }
    }
}

impl RngConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reveal_delay_blocks == 0 {
            return Err(RngError::InvalidConfiguration(
                "reveal_delay_blocks must be at least 1".to_string(),
            ));
        }
        if self.reveal_delay_blocks >= self.block_hash_window {
            return Err(RngError::InvalidConfiguration(format!(
                "reveal_delay_blocks ({}) must be smaller than block_hash_window ({})",
                self.reveal_delay_blocks, self.block_hash_window
            )));
        }
        Ok(())
    }
}
