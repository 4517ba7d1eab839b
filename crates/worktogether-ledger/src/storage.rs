use crate::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use worktogether_types::{AccountAddress, TokenAmount};

/// Committed movement of funds. `from == AccountAddress::ZERO` marks a mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub amount: TokenAmount,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
}

type BalanceMap = HashMap<AccountAddress, TokenAmount>;
type AllowanceMap = HashMap<(AccountAddress, AccountAddress), TokenAmount>;
type Snapshot = Option<(BalanceMap, AllowanceMap, TokenAmount)>;

#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount>;
    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()>;
    async fn get_allowance(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
    ) -> Result<TokenAmount>;
    async fn set_allowance(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()>;
    async fn get_total_supply(&self) -> Result<TokenAmount>;
    async fn set_total_supply(&self, supply: TokenAmount) -> Result<()>;
    async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;

    async fn record_transfer(&self, record: TransferRecord) -> Result<()>;
    async fn get_transfer_history(&self, address: AccountAddress) -> Result<Vec<TransferRecord>>;
}

pub struct MemoryStorage {
    balances: Arc<RwLock<BalanceMap>>,
    allowances: Arc<RwLock<AllowanceMap>>,
    total_supply: Arc<RwLock<TokenAmount>>,
    snapshot: Arc<RwLock<Snapshot>>,
    history: Arc<RwLock<Vec<TransferRecord>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            allowances: Arc::new(RwLock::new(HashMap::new())),
            total_supply: Arc::new(RwLock::new(TokenAmount::ZERO)),
            snapshot: Arc::new(RwLock::new(None)),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        let balances = self.balances.read().await;
        Ok(balances.get(&address).copied().unwrap_or(TokenAmount::ZERO))
    }

    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()> {
        let mut balances = self.balances.write().await;
        if balance.is_zero() {
            balances.remove(&address);
        } else {
            balances.insert(address, balance);
        }
        Ok(())
    }

    async fn get_allowance(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
    ) -> Result<TokenAmount> {
        let allowances = self.allowances.read().await;
        Ok(allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }

    async fn set_allowance(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        let mut allowances = self.allowances.write().await;
        if amount.is_zero() {
            allowances.remove(&(owner, spender));
        } else {
            allowances.insert((owner, spender), amount);
        }
        Ok(())
    }

    async fn get_total_supply(&self) -> Result<TokenAmount> {
        Ok(*self.total_supply.read().await)
    }

    async fn set_total_supply(&self, supply: TokenAmount) -> Result<()> {
        *self.total_supply.write().await = supply;
        Ok(())
    }

    async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>> {
        let balances = self.balances.read().await;
        let mut accounts: Vec<_> = balances.keys().copied().collect();
        accounts.sort();
        Ok(accounts)
    }

    async fn begin_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.is_some() {
            return Err(LedgerError::Storage(
                "transaction already in progress".to_string(),
            ));
        }

        let balances = self.balances.read().await;
        let allowances = self.allowances.read().await;
        let supply = *self.total_supply.read().await;
        *snapshot = Some((balances.clone(), allowances.clone(), supply));

        debug!(
            accounts_count = balances.len(),
            storage_type = "memory",
            "📝 Transaction began (snapshot created)"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.take().is_some() {
            debug!(
                storage_type = "memory",
                "✅ Transaction committed (snapshot discarded)"
            );
        }
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if let Some((balances_backup, allowances_backup, supply_backup)) = snapshot.take() {
            *self.balances.write().await = balances_backup;
            *self.allowances.write().await = allowances_backup;
            *self.total_supply.write().await = supply_backup;

            info!(
                storage_type = "memory",
                "❌ Transaction rolled back (snapshot restored)"
            );
        }
        Ok(())
    }

    async fn record_transfer(&self, record: TransferRecord) -> Result<()> {
        let mut history = self.history.write().await;
        history.push(record);
        Ok(())
    }

    async fn get_transfer_history(&self, address: AccountAddress) -> Result<Vec<TransferRecord>> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|r| r.from == address || r.to == address)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let storage = MemoryStorage::new();
        let addr = AccountAddress::from_bytes([1; 32]);
        let spender = AccountAddress::from_bytes([2; 32]);

        storage.set_balance(addr, TokenAmount::from_units(50)).await.unwrap();
        storage.begin_transaction().await.unwrap();
        storage.set_balance(addr, TokenAmount::from_units(10)).await.unwrap();
        storage
            .set_allowance(addr, spender, TokenAmount::from_units(5))
            .await
            .unwrap();
        storage.rollback_transaction().await.unwrap();

        assert_eq!(storage.get_balance(addr).await.unwrap(), TokenAmount::from_units(50));
        assert_eq!(
            storage.get_allowance(addr, spender).await.unwrap(),
            TokenAmount::ZERO
        );
    }

    #[tokio::test]
    async fn test_nested_transaction_rejected() {
        let storage = MemoryStorage::new();
        storage.begin_transaction().await.unwrap();
        assert!(matches!(
            storage.begin_transaction().await,
            Err(LedgerError::Storage(_))
        ));
        storage.commit_transaction().await.unwrap();
        storage.begin_transaction().await.unwrap();
    }
}
