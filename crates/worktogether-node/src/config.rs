use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use worktogether_rng::RngConfig;
use worktogether_types::DEFAULT_BLOCK_HASH_WINDOW;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub chain: ChainConfig,
    pub randomness: RandomnessConfig,
    pub pool: PoolConfig,
    pub fees: FeeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub block_time_secs: u64,
    /// Unix seconds of the genesis block; 0 means "now".
    pub genesis_timestamp: i64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            block_time_secs: 13,
            genesis_timestamp: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomnessConfig {
    pub reveal_delay_blocks: u64,
    pub block_hash_window: u64,
}

impl Default for RandomnessConfig {
    fn default() -> Self {
        Self {
            reveal_delay_blocks: 1,
            block_hash_window: DEFAULT_BLOCK_HASH_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub default_duration_secs: i64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 7 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub max_slippage_percent: u8,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            max_slippage_percent: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
    pub module_filters: HashMap<String, String>,
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            module_filters: HashMap::new(),
            file_output: None,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Overlay `WT_*` environment variables. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("WT_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(format) = env::var("WT_LOG_FORMAT") {
            if !format.is_empty() {
                self.logging.format = format;
            }
        }
        if let Ok(secs) = env::var("WT_BLOCK_TIME_SECS") {
            if let Ok(val) = secs.parse() {
                self.chain.block_time_secs = val;
            }
        }
        if let Ok(delay) = env::var("WT_REVEAL_DELAY_BLOCKS") {
            if let Ok(val) = delay.parse() {
                self.randomness.reveal_delay_blocks = val;
            }
        }
        if let Ok(window) = env::var("WT_BLOCK_HASH_WINDOW") {
            if let Ok(val) = window.parse() {
                self.randomness.block_hash_window = val;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain.block_time_secs == 0 {
            bail!("chain.block_time_secs must be positive");
        }
        if self.pool.default_duration_secs <= 0 {
            bail!("pool.default_duration_secs must be positive");
        }
        if self.fees.max_slippage_percent > 100 {
            bail!("fees.max_slippage_percent must be at most 100");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "compact" | "json") {
            bail!("logging.format must be pretty, compact or json");
        }
        self.rng_config().validate()?;
        Ok(())
    }

    pub fn rng_config(&self) -> RngConfig {
        RngConfig {
            reveal_delay_blocks: self.randomness.reveal_delay_blocks,
            block_hash_window: self.randomness.block_hash_window,
        }
    }

    pub fn genesis_timestamp(&self) -> i64 {
        if self.chain.genesis_timestamp == 0 {
            chrono::Utc::now().timestamp()
        } else {
            self.chain.genesis_timestamp
        }
    }
}
