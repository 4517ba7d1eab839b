use crate::{Pool, PoolContext, PoolError, PoolId, PoolParams, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use worktogether_ledger::TokenLedger;
use worktogether_rng::RandomnessSource;
use worktogether_types::{AccountAddress, Role, WorkTogetherEvent};

#[derive(Default)]
struct RegistryState {
    pools: Vec<Arc<Pool>>,
    by_address: HashMap<AccountAddress, PoolId>,
}

/// Factory and id lookup for pools. Ids start at 1.
pub struct PoolRegistry {
    ctx: PoolContext,
    state: Arc<RwLock<RegistryState>>,
}

impl PoolRegistry {
    pub fn new(ctx: PoolContext) -> Self {
        Self {
            ctx,
            state: Arc::new(RwLock::new(RegistryState::default())),
        }
    }

    pub fn pool_address(id: PoolId) -> AccountAddress {
        AccountAddress::derive("pool", id)
    }

    pub async fn create_token_reward_pool(
        &self,
        caller: AccountAddress,
        stake_token: Arc<dyn TokenLedger>,
        reward_token: Arc<dyn TokenLedger>,
        rng: Arc<dyn RandomnessSource>,
        params: PoolParams,
    ) -> Result<AccountAddress> {
        if !self.ctx.access.has_role(Role::Admin, caller).await {
            return Err(PoolError::OnlyAdmin(caller));
        }

        let mut state = self.state.write().await;
        let id = state.pools.len() as PoolId + 1;
        let address = Self::pool_address(id);
        let pool = Pool::new(
            id,
            address,
            params,
            stake_token,
            reward_token,
            rng,
            self.ctx.clone(),
        )?;

        info!(
            pool_id = id,
            address = %address,
            name = pool.name(),
            start_time = pool.window().start_time,
            ends_at = pool.ends_at(),
            stake_token = pool.stake_token().symbol(),
            reward_token = pool.reward_token().symbol(),
            "🏊 Pool created"
        );

        state.pools.push(Arc::new(pool));
        state.by_address.insert(address, id);
        self.ctx
            .events
            .emit(WorkTogetherEvent::PoolCreated { pool_id: id, address });

        Ok(address)
    }

    /// Address of pool `id`, or `AccountAddress::ZERO` when there is none.
    pub async fn get_pool_address_of(&self, id: PoolId) -> AccountAddress {
        self.get_pool(id)
            .await
            .map(|pool| pool.address())
            .unwrap_or(AccountAddress::ZERO)
    }

    pub async fn get_size_of_pool(&self) -> u64 {
        self.state.read().await.pools.len() as u64
    }

    pub async fn get_pool(&self, id: PoolId) -> Option<Arc<Pool>> {
        let state = self.state.read().await;
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        let pool = state.pools.get(index).cloned();
        debug!(pool_id = id, found = pool.is_some(), "Pool lookup");
        pool
    }

    pub async fn get_pool_by_address(&self, address: AccountAddress) -> Option<Arc<Pool>> {
        let id = self.state.read().await.by_address.get(&address).copied()?;
        self.get_pool(id).await
    }

    pub async fn pools(&self) -> Vec<Arc<Pool>> {
        self.state.read().await.pools.clone()
    }
}
