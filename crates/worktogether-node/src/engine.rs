use crate::config::NodeConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use worktogether_fees::{DividendPool, FeeManager, StaticRouteResolver};
use worktogether_issues::IssueRegistry;
use worktogether_ledger::{MemoryStorage, Token, TokenLedger};
use worktogether_pool::{Pool, PoolContext, PoolParams, PoolRegistry};
use worktogether_rng::BlockhashRng;
use worktogether_types::{
    AccountAddress, ChainClock, EventBus, RoleTable, SimulatedChain, TokenAmount,
};

/// Every component of one deployment, wired against a simulated chain.
///
/// The stake token is controlled by the issue registry, so stake only comes
/// into existence through issue registration and `mint_to`. The reward and
/// fee tokens are controlled by the admin.
pub struct WorkTogetherEngine {
    pub config: NodeConfig,
    pub admin: AccountAddress,
    pub chain: Arc<SimulatedChain>,
    pub roles: Arc<RoleTable>,
    pub events: EventBus,
    pub stake_token: Arc<Token>,
    pub reward_token: Arc<Token>,
    pub fee_token: Arc<Token>,
    pub rng: Arc<BlockhashRng>,
    pub issues: Arc<IssueRegistry>,
    pub pools: Arc<PoolRegistry>,
    pub dividends: Arc<DividendPool>,
    pub fees: Arc<FeeManager>,
    /// Swap routes consulted by `swap_fees`.
    pub routes: Arc<StaticRouteResolver>,
}

impl WorkTogetherEngine {
    pub async fn new(config: NodeConfig, admin: AccountAddress) -> Result<Self> {
        config.validate()?;

        let chain = Arc::new(SimulatedChain::with_block_hash_window(
            config.genesis_timestamp(),
            config.chain.block_time_secs,
            config.randomness.block_hash_window,
        ));
        let roles = Arc::new(RoleTable::with_admin(admin).await);
        let events = EventBus::new();

        let issues_address = AccountAddress::derive("issues", 0);
        let stake_token = Arc::new(Token::new(
            "STAKE",
            AccountAddress::derive("token", 1),
            issues_address,
            Arc::new(MemoryStorage::new()),
        ));
        let reward_token = Arc::new(Token::new(
            "REWARD",
            AccountAddress::derive("token", 2),
            admin,
            Arc::new(MemoryStorage::new()),
        ));
        let fee_token = Arc::new(Token::new(
            "FEE",
            AccountAddress::derive("token", 3),
            admin,
            Arc::new(MemoryStorage::new()),
        ));

        let rng = Arc::new(
            BlockhashRng::new(config.rng_config(), chain.clone())
                .context("building randomness source")?,
        );
        let issues = Arc::new(IssueRegistry::new(
            issues_address,
            stake_token.clone(),
            roles.clone(),
            chain.clone(),
            events.clone(),
        ));
        let pools = Arc::new(PoolRegistry::new(PoolContext {
            access: roles.clone(),
            chain: chain.clone(),
            events: events.clone(),
        }));
        let dividends = Arc::new(DividendPool::new(AccountAddress::derive("dividends", 0)));
        let fees = Arc::new(FeeManager::new(
            AccountAddress::derive("fees", 0),
            reward_token.clone(),
            dividends.clone(),
            roles.clone(),
            events.clone(),
        ));

        info!(
            admin = %admin,
            genesis = chain.timestamp().await,
            block_time_secs = config.chain.block_time_secs,
            reveal_delay_blocks = config.randomness.reveal_delay_blocks,
            block_hash_window = config.randomness.block_hash_window,
            "✨ Engine initialized"
        );

        Ok(Self {
            config,
            admin,
            chain,
            roles,
            events,
            stake_token,
            reward_token,
            fee_token,
            rng,
            issues,
            pools,
            dividends,
            fees,
            routes: Arc::new(StaticRouteResolver::new()),
        })
    }

    /// Create a pool opening now and lasting `duration` seconds, or the
    /// configured default.
    pub async fn create_pool(&self, name: &str, duration: Option<i64>) -> Result<Arc<Pool>> {
        let params = PoolParams {
            name: name.to_string(),
            start_time: self.chain.timestamp().await,
            duration: duration.unwrap_or(self.config.pool.default_duration_secs),
        };
        let address = self
            .pools
            .create_token_reward_pool(
                self.admin,
                self.stake_token.clone(),
                self.reward_token.clone(),
                self.rng.clone(),
                params,
            )
            .await?;

        self.pools
            .get_pool_by_address(address)
            .await
            .with_context(|| format!("pool {} missing right after creation", address))
    }

    /// Approve the pool and enter it with `amount` of `account`'s stake.
    pub async fn enter_pool(
        &self,
        pool: &Pool,
        account: AccountAddress,
        amount: TokenAmount,
    ) -> Result<TokenAmount> {
        self.stake_token
            .approve(account, pool.address(), amount)
            .await?;
        Ok(pool.enter(account, amount).await?)
    }

    /// Mint `amount` reward tokens straight into the pool's custody.
    pub async fn fund_pool(&self, pool: &Pool, amount: TokenAmount) -> Result<()> {
        self.reward_token
            .mint(self.admin, pool.address(), amount)
            .await?;
        Ok(())
    }

    /// Swap `amount` of fees held by the fee manager into the reward token,
    /// along the route registered for `from_token`, within the configured
    /// slippage. Returns `None` without touching anything if no route exists.
    pub async fn swap_fees(
        &self,
        executor: AccountAddress,
        from_token: Arc<dyn TokenLedger>,
        amount: TokenAmount,
    ) -> Result<Option<TokenAmount>> {
        let received = self
            .fees
            .swap_with_resolver(
                executor,
                self.routes.as_ref(),
                from_token,
                amount,
                self.config.fees.max_slippage_percent,
            )
            .await?;
        Ok(received)
    }
}
