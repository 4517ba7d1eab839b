use crate::{
    RandomnessRequest, RandomnessSource, RandomnessTicket, RequestId, RequestState, Result,
    RngConfig, RngError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use worktogether_types::{AccountAddress, ChainClock};

const SEED_DOMAIN: &str = "worktogether/rng/seed";

/// Seed for request `request_id` whose target block hashed to `target_hash`.
pub fn derive_seed(target_hash: &[u8; 32], request_id: RequestId) -> [u8; 32] {
    let mut input = Vec::with_capacity(SEED_DOMAIN.len() + 1 + 32 + 4);
    input.extend_from_slice(SEED_DOMAIN.as_bytes());
    input.push(0);
    input.extend_from_slice(target_hash);
    input.extend_from_slice(&request_id.to_be_bytes());
    *blake3::hash(&input).as_bytes()
}

#[derive(Default)]
struct RngState {
    requests: HashMap<RequestId, RandomnessRequest>,
    next_id: RequestId,
}

/// Randomness source seeded by the hash of a block mined after the request.
///
/// The hash is unknown when the request is made, so whoever chooses the
/// request time cannot steer the outcome. The reveal must happen while the
/// chain still serves that hash; afterwards the request is stale for good.
pub struct BlockhashRng {
    config: RngConfig,
    chain: Arc<dyn ChainClock>,
    state: Arc<RwLock<RngState>>,
}

impl BlockhashRng {
    pub fn new(config: RngConfig, chain: Arc<dyn ChainClock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            chain,
            state: Arc::new(RwLock::new(RngState {
                requests: HashMap::new(),
                next_id: 1,
            })),
        })
    }

    pub fn config(&self) -> &RngConfig {
        &self.config
    }

    pub async fn get_request(&self, request_id: RequestId) -> Option<RandomnessRequest> {
        self.state.read().await.requests.get(&request_id).cloned()
    }

    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    /// A mined target block whose hash the chain no longer serves.
    async fn is_stale(&self, target_block: u64, current_block: u64) -> bool {
        current_block >= target_block && self.chain.block_hash(target_block).await.is_none()
    }
}

#[async_trait]
impl RandomnessSource for BlockhashRng {
    async fn request(&self, requester: AccountAddress) -> Result<RandomnessTicket> {
        let mut state = self.state.write().await;
        let current_block = self.chain.block_number().await;

        let pending: Vec<(RequestId, u64)> = state
            .requests
            .values()
            .filter(|r| r.requester == requester && !r.is_revealed())
            .map(|r| (r.id, r.state.target_block()))
            .collect();
        for (request_id, target_block) in pending {
            if !self.is_stale(target_block, current_block).await {
                return Err(RngError::RequestPending {
                    requester,
                    request_id,
                });
            }
        }

        let request_id = state.next_id;
        state.next_id = request_id
            .checked_add(1)
            .ok_or_else(|| RngError::InvalidConfiguration("request ids exhausted".to_string()))?;

        let target_block = current_block.saturating_add(self.config.reveal_delay_blocks);
        let request = RandomnessRequest::new(request_id, requester, current_block, target_block);
        let ticket = request.ticket();
        state.requests.insert(request_id, request);

        info!(
            request_id,
            requester = %requester,
            current_block,
            target_block,
            "🎲 Randomness requested"
        );

        Ok(ticket)
    }

    async fn reveal(&self, request_id: RequestId) -> Result<[u8; 32]> {
        let mut state = self.state.write().await;
        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or(RngError::UnknownRequest(request_id))?;

        let target_block = match request.state {
            RequestState::Revealed { seed, .. } => {
                debug!(request_id, "Returning cached seed");
                return Ok(seed);
            }
            RequestState::Requested { target_block } => target_block,
        };

        let current_block = self.chain.block_number().await;
        if current_block < target_block {
            return Err(RngError::NotReady {
                request_id,
                target_block,
                current_block,
            });
        }

        let target_hash = match self.chain.block_hash(target_block).await {
            Some(hash) => hash,
            None => {
                warn!(
                    request_id,
                    target_block,
                    current_block,
                    window = self.config.block_hash_window,
                    "⌛ Reveal window elapsed, seed is unobtainable"
                );
                return Err(RngError::StaleBlock {
                    request_id,
                    target_block,
                });
            }
        };

        let seed = derive_seed(&target_hash, request_id);
        request.state = RequestState::Revealed { target_block, seed };

        info!(
            request_id,
            target_block,
            block_hash = hex::encode(&target_hash[..8]),
            seed = hex::encode(&seed[..8]),
            "🔓 Randomness revealed"
        );

        Ok(seed)
    }

    async fn is_ready(&self, request_id: RequestId) -> Result<bool> {
        let state = self.state.read().await;
        let request = state
            .requests
            .get(&request_id)
            .ok_or(RngError::UnknownRequest(request_id))?;

        match request.state {
            RequestState::Revealed { .. } => Ok(true),
            RequestState::Requested { target_block } => {
                let current_block = self.chain.block_number().await;
                Ok(current_block >= target_block
                    && self.chain.block_hash(target_block).await.is_some())
            }
        }
    }
}
