use async_trait::async_trait;
use blake3::Hasher;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Number of recent blocks whose hashes stay retrievable.
pub const DEFAULT_BLOCK_HASH_WINDOW: u64 = 256;

/// View of the external ledger's sequencing: block height, wall-clock time
/// and recent block hashes.
#[async_trait]
pub trait ChainClock: Send + Sync {
    /// Number of the latest mined block.
    async fn block_number(&self) -> u64;

    /// Timestamp (unix seconds) of the latest mined block.
    async fn timestamp(&self) -> i64;

    /// Hash of block `number`, or `None` when the block has not been mined
    /// yet or has fallen out of the retrievable window.
    async fn block_hash(&self, number: u64) -> Option<[u8; 32]>;
}

struct ChainState {
    timestamp: i64,
    hashes: Vec<[u8; 32]>,
}

impl ChainState {
    fn height(&self) -> u64 {
        (self.hashes.len() as u64).saturating_sub(1)
    }
}

/// Deterministic in-process chain used by tests, the simulator and any
/// embedding that has no real ledger behind it.
pub struct SimulatedChain {
    state: Arc<RwLock<ChainState>>,
    block_time_secs: u64,
    hash_window: u64,
    salt: [u8; 32],
}

impl SimulatedChain {
    pub fn new(genesis_timestamp: i64, block_time_secs: u64) -> Self {
        Self::with_block_hash_window(genesis_timestamp, block_time_secs, DEFAULT_BLOCK_HASH_WINDOW)
    }

    pub fn with_block_hash_window(
        genesis_timestamp: i64,
        block_time_secs: u64,
        hash_window: u64,
    ) -> Self {
        let salt = *blake3::hash(&genesis_timestamp.to_le_bytes()).as_bytes();
        let genesis_hash = Self::hash_block(&salt, &[0u8; 32], 0);

        Self {
            state: Arc::new(RwLock::new(ChainState {
                timestamp: genesis_timestamp,
                hashes: vec![genesis_hash],
            })),
            block_time_secs,
            hash_window: hash_window.max(1),
            salt,
        }
    }

    fn hash_block(salt: &[u8; 32], parent: &[u8; 32], number: u64) -> [u8; 32] {
        let mut hasher = Hasher::new();
        hasher.update(salt);
        hasher.update(parent);
        hasher.update(&number.to_le_bytes());
        *hasher.finalize().as_bytes()
    }

    fn mine(&self, state: &mut ChainState) {
        let number = state.hashes.len() as u64;
        let parent = state.hashes.last().copied().unwrap_or([0u8; 32]);
        state.hashes.push(Self::hash_block(&self.salt, &parent, number));
    }

    /// Mine `count` blocks, each `block_time_secs` after the previous one.
    pub async fn advance_blocks(&self, count: u64) {
        let mut state = self.state.write().await;
        for _ in 0..count {
            state.timestamp += self.block_time_secs as i64;
            self.mine(&mut state);
        }
        debug!(
            height = state.height(),
            timestamp = state.timestamp,
            mined = count,
            "⛏️ Blocks mined"
        );
    }

    /// Jump the clock forward by `secs` and mine one block at the new time.
    pub async fn advance_time(&self, secs: i64) {
        let mut state = self.state.write().await;
        state.timestamp += secs;
        self.mine(&mut state);
        debug!(
            height = state.height(),
            timestamp = state.timestamp,
            "⏩ Clock advanced"
        );
    }

    pub fn hash_window(&self) -> u64 {
        self.hash_window
    }
}

#[async_trait]
impl ChainClock for SimulatedChain {
    async fn block_number(&self) -> u64 {
        self.state.read().await.height()
    }

    async fn timestamp(&self) -> i64 {
        self.state.read().await.timestamp
    }

    async fn block_hash(&self, number: u64) -> Option<[u8; 32]> {
        let state = self.state.read().await;
        let height = state.height();
        if number > height || height - number >= self.hash_window {
            return None;
        }
        state.hashes.get(number as usize).copied()
    }
}
