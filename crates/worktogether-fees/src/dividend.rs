use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use worktogether_types::{AccountAddress, TokenAmount};

/// Receiver of swapped fees. Funds are transferred to `address()` before
/// `distribute` is called.
#[async_trait]
pub trait DividendSink: Send + Sync {
    fn address(&self) -> AccountAddress;

    async fn distribute(&self, token: AccountAddress, amount: TokenAmount) -> Result<()>;
}

/// Sink that only books per-token totals.
pub struct DividendPool {
    address: AccountAddress,
    distributed: Arc<RwLock<HashMap<AccountAddress, TokenAmount>>>,
}

impl DividendPool {
    pub fn new(address: AccountAddress) -> Self {
        Self {
            address,
            distributed: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn total_distributed(&self, token: AccountAddress) -> TokenAmount {
        self.distributed
            .read()
            .await
            .get(&token)
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }
}

#[async_trait]
impl DividendSink for DividendPool {
    fn address(&self) -> AccountAddress {
        self.address
    }

    async fn distribute(&self, token: AccountAddress, amount: TokenAmount) -> Result<()> {
        let mut distributed = self.distributed.write().await;
        let total = distributed.entry(token).or_insert(TokenAmount::ZERO);
        *total = total.saturating_add(amount);
        info!(
            sink = %self.address,
            token = %token,
            amount = amount.units(),
            total = total.units(),
            "📦 Dividend booked"
        );
        Ok(())
    }
}
