use crate::storage::{LedgerStorage, TransferRecord};
use crate::{LedgerError, Result, TokenLedger};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use worktogether_types::{AccountAddress, TokenAmount};

/// Reference `TokenLedger` over a pluggable `LedgerStorage`.
///
/// Every mutating call runs inside a storage snapshot and under `op_lock`, so
/// a failed call leaves balances, allowances and supply exactly as they were.
pub struct Token {
    address: AccountAddress,
    symbol: String,
    controller: AccountAddress,
    storage: Arc<dyn LedgerStorage>,
    op_lock: Mutex<()>,
    nonce: AtomicU64,
}

impl Token {
    pub fn new(
        symbol: impl Into<String>,
        address: AccountAddress,
        controller: AccountAddress,
        storage: Arc<dyn LedgerStorage>,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            controller,
            storage,
            op_lock: Mutex::new(()),
            nonce: AtomicU64::new(0),
        }
    }

    pub fn controller(&self) -> AccountAddress {
        self.controller
    }

    pub async fn transfer_history(&self, account: AccountAddress) -> Result<Vec<TransferRecord>> {
        self.storage.get_transfer_history(account).await
    }

    pub async fn accounts(&self) -> Result<Vec<AccountAddress>> {
        self.storage.get_all_accounts().await
    }

    fn tx_hash(&self, from: AccountAddress, to: AccountAddress, amount: TokenAmount) -> String {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.address.as_bytes());
        hasher.update(from.as_bytes());
        hasher.update(to.as_bytes());
        hasher.update(&amount.units().to_le_bytes());
        hasher.update(&nonce.to_le_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }

    async fn move_funds(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<String> {
        let from_balance = self.storage.get_balance(from).await?;
        let new_from_balance =
            from_balance
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientBalance {
                    account: from,
                    available: from_balance,
                    needed: amount,
                })?;

        let to_balance = self.storage.get_balance(to).await?;
        let new_to_balance = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(to))?;

        self.storage.set_balance(from, new_from_balance).await?;
        self.storage.set_balance(to, new_to_balance).await?;

        let tx_hash = self.tx_hash(from, to, amount);
        self.storage
            .record_transfer(TransferRecord {
                from,
                to,
                amount,
                timestamp: Utc::now(),
                tx_hash: tx_hash.clone(),
            })
            .await?;

        Ok(tx_hash)
    }

    async fn spend_allowance(
        &self,
        spender: AccountAddress,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<String> {
        let approved = self.storage.get_allowance(from, spender).await?;
        let remaining = approved
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                owner: from,
                spender,
                approved,
                needed: amount,
            })?;

        let tx_hash = self.move_funds(from, to, amount).await?;
        self.storage.set_allowance(from, spender, remaining).await?;
        Ok(tx_hash)
    }

    async fn create_units(&self, to: AccountAddress, amount: TokenAmount) -> Result<String> {
        let supply = self.storage.get_total_supply().await?;
        let new_supply = supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(self.address))?;
        let balance = self.storage.get_balance(to).await?;
        let new_balance = balance.checked_add(amount).ok_or(LedgerError::Overflow(to))?;

        self.storage.set_total_supply(new_supply).await?;
        self.storage.set_balance(to, new_balance).await?;

        let tx_hash = self.tx_hash(AccountAddress::ZERO, to, amount);
        self.storage
            .record_transfer(TransferRecord {
                from: AccountAddress::ZERO,
                to,
                amount,
                timestamp: Utc::now(),
                tx_hash: tx_hash.clone(),
            })
            .await?;
        Ok(tx_hash)
    }

    /// Run `result` inside a storage transaction: commit on success, roll the
    /// snapshot back on failure.
    async fn settle(&self, result: Result<String>) -> Result<String> {
        match result {
            Ok(tx_hash) => {
                self.storage.commit_transaction().await?;
                Ok(tx_hash)
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl TokenLedger for Token {
    fn address(&self) -> AccountAddress {
        self.address
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn balance_of(&self, account: AccountAddress) -> Result<TokenAmount> {
        self.storage.get_balance(account).await
    }

    async fn total_supply(&self) -> Result<TokenAmount> {
        self.storage.get_total_supply().await
    }

    async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        if from == to {
            return Err(LedgerError::SelfTransfer(from));
        }

        let _guard = self.op_lock.lock().await;
        self.storage.begin_transaction().await?;
        let result = self.move_funds(from, to, amount).await;
        let tx_hash = self.settle(result).await?;

        info!(
            token = %self.symbol,
            from = %from,
            to = %to,
            amount = amount.units(),
            tx_hash = &tx_hash[..16],
            "💸 Transfer committed"
        );
        Ok(())
    }

    async fn approve(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        self.storage.set_allowance(owner, spender, amount).await?;

        debug!(
            token = %self.symbol,
            owner = %owner,
            spender = %spender,
            amount = amount.units(),
            "✍️ Allowance set"
        );
        Ok(())
    }

    async fn allowance(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
    ) -> Result<TokenAmount> {
        self.storage.get_allowance(owner, spender).await
    }

    async fn transfer_from(
        &self,
        spender: AccountAddress,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        if from == to {
            return Err(LedgerError::SelfTransfer(from));
        }

        let _guard = self.op_lock.lock().await;
        self.storage.begin_transaction().await?;
        let result = self.spend_allowance(spender, from, to, amount).await;
        let tx_hash = self.settle(result).await?;

        info!(
            token = %self.symbol,
            spender = %spender,
            from = %from,
            to = %to,
            amount = amount.units(),
            tx_hash = &tx_hash[..16],
            "💸 Delegated transfer committed"
        );
        Ok(())
    }

    async fn mint(
        &self,
        minter: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        if minter != self.controller {
            return Err(LedgerError::UnauthorizedMinter(minter));
        }
        if amount.is_zero() {
            return Ok(());
        }

        let _guard = self.op_lock.lock().await;
        self.storage.begin_transaction().await?;
        let result = self.create_units(to, amount).await;
        let tx_hash = self.settle(result).await?;

        info!(
            token = %self.symbol,
            to = %to,
            amount = amount.units(),
            tx_hash = &tx_hash[..16],
            "💰 Tokens minted"
        );
        Ok(())
    }
}
