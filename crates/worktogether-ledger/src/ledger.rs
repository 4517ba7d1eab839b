use crate::Result;
use async_trait::async_trait;
use worktogether_types::{AccountAddress, TokenAmount};

/// The fungible-balance contract the engine consumes.
///
/// The engine never looks behind this trait: any implementation that honours
/// these semantics (atomic transfers, allowance-gated `transfer_from`,
/// controller-gated `mint`) can stand in for the stake or reward currency.
/// The acting account is always passed explicitly.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Address identifying this token.
    fn address(&self) -> AccountAddress;

    fn symbol(&self) -> &str;

    async fn balance_of(&self, account: AccountAddress) -> Result<TokenAmount>;

    async fn total_supply(&self) -> Result<TokenAmount>;

    /// Move `amount` owned by `from` to `to`.
    async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()>;

    /// Set the amount `spender` may move out of `owner`'s balance.
    async fn approve(
        &self,
        owner: AccountAddress,
        spender: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()>;

    async fn allowance(&self, owner: AccountAddress, spender: AccountAddress)
        -> Result<TokenAmount>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    async fn transfer_from(
        &self,
        spender: AccountAddress,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()>;

    /// Create `amount` new units for `to`. Only the authorized minter succeeds.
    async fn mint(
        &self,
        minter: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()>;
}
