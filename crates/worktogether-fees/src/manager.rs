use crate::{DividendSink, FeeError, Result, RouteQuery, RouteResolver, SwapRouter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use worktogether_ledger::TokenLedger;
use worktogether_types::{
    AccessControl, AccountAddress, EventBus, Role, TokenAmount, WorkTogetherEvent,
};

/// Swaps fee balances held at `address` into the reward token and forwards
/// the proceeds to a dividend sink.
pub struct FeeManager {
    address: AccountAddress,
    reward_token: Arc<dyn TokenLedger>,
    sink: Arc<dyn DividendSink>,
    access: Arc<dyn AccessControl>,
    events: EventBus,
    routers: Arc<RwLock<HashMap<AccountAddress, Arc<dyn SwapRouter>>>>,
    swap_lock: Mutex<()>,
}

impl FeeManager {
    pub fn new(
        address: AccountAddress,
        reward_token: Arc<dyn TokenLedger>,
        sink: Arc<dyn DividendSink>,
        access: Arc<dyn AccessControl>,
        events: EventBus,
    ) -> Self {
        Self {
            address,
            reward_token,
            sink,
            access,
            events,
            routers: Arc::new(RwLock::new(HashMap::new())),
            swap_lock: Mutex::new(()),
        }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// Make `router` callable. Swaps still require the router address to
    /// hold the router allow-list role.
    pub async fn register_router(
        &self,
        caller: AccountAddress,
        router: Arc<dyn SwapRouter>,
    ) -> Result<()> {
        if !self.access.has_role(Role::Admin, caller).await {
            return Err(FeeError::OnlyAdmin(caller));
        }
        let address = router.address();
        self.routers.write().await.insert(address, router);
        info!(router = %address, registered_by = %caller, "🔌 Router registered");
        Ok(())
    }

    pub async fn router_count(&self) -> usize {
        self.routers.read().await.len()
    }

    /// Swap `amount` of `from_token` through `router_address` and pay the
    /// reward tokens received to the dividend sink. Returns the amount paid.
    pub async fn swap(
        &self,
        executor: AccountAddress,
        router_address: AccountAddress,
        from_token: Arc<dyn TokenLedger>,
        amount: TokenAmount,
        payload: &[u8],
    ) -> Result<TokenAmount> {
        self.check_swap_request(executor, amount).await?;

        let _guard = self.swap_lock.lock().await;

        if from_token.address() == self.reward_token.address() {
            debug!(amount = amount.units(), "Fee already in reward token, skipping router");
            self.pay_sink(self.address, from_token.address(), amount, amount)
                .await?;
            return Ok(amount);
        }

        if !self
            .access
            .has_role(Role::RouterAllowlist, router_address)
            .await
        {
            return Err(FeeError::RouterNotAllowed(router_address));
        }
        let router = self
            .routers
            .read()
            .await
            .get(&router_address)
            .cloned()
            .ok_or(FeeError::UnknownRouter(router_address))?;

        let previous_allowance = from_token.allowance(self.address, router_address).await?;
        from_token
            .approve(self.address, router_address, amount)
            .await?;
        let before = self.reward_token.balance_of(self.address).await?;

        let reported = match router
            .execute(self.address, from_token.clone(), amount, payload)
            .await
        {
            Ok(out) => out,
            Err(e) => {
                warn!(router = %router_address, error = %e, "❌ Swap failed, restoring allowance");
                from_token
                    .approve(self.address, router_address, previous_allowance)
                    .await?;
                return Err(e);
            }
        };

        from_token
            .approve(self.address, router_address, TokenAmount::ZERO)
            .await?;
        let after = self.reward_token.balance_of(self.address).await?;
        let received = after.saturating_sub(before);
        if received != reported {
            warn!(
                router = %router_address,
                reported = reported.units(),
                received = received.units(),
                "⚠️ Router output differs from measured balance change"
            );
        }

        self.pay_sink(router_address, from_token.address(), amount, received)
            .await?;
        Ok(received)
    }

    /// Look the route up once and swap along it. The executor role is checked
    /// before the resolver is consulted; no route is a complete no-op and
    /// returns `Ok(None)`.
    pub async fn swap_with_resolver(
        &self,
        executor: AccountAddress,
        resolver: &dyn RouteResolver,
        from_token: Arc<dyn TokenLedger>,
        amount: TokenAmount,
        max_slippage_percent: u8,
    ) -> Result<Option<TokenAmount>> {
        self.check_swap_request(executor, amount).await?;

        let query = RouteQuery {
            from_token: from_token.address(),
            to_token: self.reward_token.address(),
            amount,
            from_account: self.address,
            max_slippage_percent,
        };

        let Some(route) = resolver.resolve(&query).await else {
            info!(
                from_token = from_token.symbol(),
                amount = amount.units(),
                max_slippage_percent,
                "🚫 No swap route, nothing done"
            );
            return Ok(None);
        };

        debug!(
            router = %route.target,
            payload_len = route.payload.len(),
            max_slippage_percent,
            "Swap route resolved"
        );
        let received = self
            .swap(executor, route.target, from_token, amount, &route.payload)
            .await?;
        Ok(Some(received))
    }

    async fn check_swap_request(&self, executor: AccountAddress, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(FeeError::ZeroAmount);
        }
        if !self.access.has_role(Role::Executor, executor).await {
            return Err(FeeError::OnlyExecutor(executor));
        }
        Ok(())
    }

    async fn pay_sink(
        &self,
        router: AccountAddress,
        from_token: AccountAddress,
        amount_in: TokenAmount,
        reward_out: TokenAmount,
    ) -> Result<()> {
        let sink = self.sink.address();
        self.reward_token
            .transfer(self.address, sink, reward_out)
            .await?;
        self.sink
            .distribute(self.reward_token.address(), reward_out)
            .await?;

        info!(
            router = %router,
            from_token = %from_token,
            amount_in = amount_in.units(),
            reward_out = reward_out.units(),
            sink = %sink,
            "💰 Fees distributed"
        );
        self.events.emit(WorkTogetherEvent::FeesDistributed {
            router,
            from_token,
            amount_in,
            reward_out,
        });
        Ok(())
    }
}
