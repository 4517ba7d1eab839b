use crate::{FeeError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use worktogether_ledger::TokenLedger;
use worktogether_types::{AccountAddress, TokenAmount};

/// Exchange that turns `from_token` into the reward token.
///
/// `execute` pulls `amount` of `from_token` from `caller` using the allowance
/// the caller granted to `address()`, and pays the proceeds back to `caller`.
/// A router that fails must leave the caller's balances unchanged.
#[async_trait]
pub trait SwapRouter: Send + Sync {
    fn address(&self) -> AccountAddress;

    async fn execute(
        &self,
        caller: AccountAddress,
        from_token: Arc<dyn TokenLedger>,
        amount: TokenAmount,
        payload: &[u8],
    ) -> Result<TokenAmount>;
}

/// Router quoting a constant `numerator / denominator` rate out of its own
/// reward-token inventory.
pub struct FixedRateRouter {
    address: AccountAddress,
    reward_token: Arc<dyn TokenLedger>,
    numerator: u64,
    denominator: u64,
    last_payload: RwLock<Option<Vec<u8>>>,
}

impl FixedRateRouter {
    pub fn new(
        address: AccountAddress,
        reward_token: Arc<dyn TokenLedger>,
        numerator: u64,
        denominator: u64,
    ) -> Self {
        Self {
            address,
            reward_token,
            numerator,
            denominator: denominator.max(1),
            last_payload: RwLock::new(None),
        }
    }

    pub fn quote(&self, amount: TokenAmount) -> Option<TokenAmount> {
        let out = amount.units() as u128 * self.numerator as u128 / self.denominator as u128;
        u64::try_from(out).ok().map(TokenAmount::from_units)
    }

    /// Payload received by the most recent `execute` call.
    pub async fn last_payload(&self) -> Option<Vec<u8>> {
        self.last_payload.read().await.clone()
    }
}

#[async_trait]
impl SwapRouter for FixedRateRouter {
    fn address(&self) -> AccountAddress {
        self.address
    }

    async fn execute(
        &self,
        caller: AccountAddress,
        from_token: Arc<dyn TokenLedger>,
        amount: TokenAmount,
        payload: &[u8],
    ) -> Result<TokenAmount> {
        *self.last_payload.write().await = Some(payload.to_vec());
        let out = self
            .quote(amount)
            .ok_or_else(|| FeeError::Router("quote overflow".to_string()))?;

        from_token
            .transfer_from(self.address, caller, self.address, amount)
            .await?;

        if let Err(e) = self.reward_token.transfer(self.address, caller, out).await {
            warn!(router = %self.address, error = %e, "↩️ Payout failed, refunding swap input");
            from_token.transfer(self.address, caller, amount).await?;
            return Err(FeeError::Router(e.to_string()));
        }

        debug!(payload = hex::encode(payload), "Router payload");
        info!(
            router = %self.address,
            from_token = from_token.symbol(),
            amount_in = amount.units(),
            amount_out = out.units(),
            "🔁 Swap executed"
        );
        Ok(out)
    }
}
