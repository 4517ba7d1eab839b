use crate::{Claim, Issue, IssueError, IssueId, IssueStatus, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use worktogether_ledger::{LedgerError, TokenLedger};
use worktogether_types::{
    AccessControl, AccountAddress, ChainClock, EventBus, Role, TokenAmount, WorkTogetherEvent,
};

#[derive(Default)]
struct RegistryState {
    issues: HashMap<IssueId, Issue>,
    minted: HashMap<IssueId, TokenAmount>,
    total_escrowed: TokenAmount,
}

/// Issue lifecycle registry.
///
/// The registry controls the stake token: bounties are minted into its own
/// custody address when an issue is registered, and stake weight reaches
/// resolvers through `mint_to` or `release_bounty`.
pub struct IssueRegistry {
    address: AccountAddress,
    stake_token: Arc<dyn TokenLedger>,
    access: Arc<dyn AccessControl>,
    chain: Arc<dyn ChainClock>,
    events: EventBus,
    state: Arc<RwLock<RegistryState>>,
}

impl IssueRegistry {
    pub fn new(
        address: AccountAddress,
        stake_token: Arc<dyn TokenLedger>,
        access: Arc<dyn AccessControl>,
        chain: Arc<dyn ChainClock>,
        events: EventBus,
    ) -> Self {
        Self {
            address,
            stake_token,
            access,
            chain,
            events,
            state: Arc::new(RwLock::new(RegistryState::default())),
        }
    }

    /// Custody address holding escrowed bounties.
    pub fn address(&self) -> AccountAddress {
        self.address
    }

    async fn require_admin(&self, caller: AccountAddress) -> Result<()> {
        if self.access.has_role(Role::Admin, caller).await {
            Ok(())
        } else {
            Err(IssueError::OnlyAdmin(caller))
        }
    }

    pub async fn register_issue(
        &self,
        caller: AccountAddress,
        id: IssueId,
        bounty: TokenAmount,
    ) -> Result<()> {
        self.require_admin(caller).await?;

        let mut state = self.state.write().await;
        if state.issues.contains_key(&id) {
            return Err(IssueError::DuplicateId(id));
        }
        let total_escrowed = state
            .total_escrowed
            .checked_add(bounty)
            .ok_or(LedgerError::Overflow(self.address))?;

        self.stake_token
            .mint(self.address, self.address, bounty)
            .await?;

        let block = self.chain.block_number().await;
        state.issues.insert(id, Issue::new(id, bounty, block));
        state.total_escrowed = total_escrowed;

        info!(
            issue_id = id,
            bounty = bounty.units(),
            total_escrowed = total_escrowed.units(),
            registered_by = %caller,
            "📌 Issue registered"
        );
        self.events.emit(WorkTogetherEvent::IssueRegistered {
            issue_id: id,
            bounty,
        });

        Ok(())
    }

    /// Record that `caller` claims to have resolved issue `id`. Any number of
    /// accounts may claim the same issue.
    pub async fn claim_resolve_issue(
        &self,
        caller: AccountAddress,
        id: IssueId,
        note: impl Into<String>,
    ) -> Result<()> {
        let note = note.into();
        let block = self.chain.block_number().await;

        let mut state = self.state.write().await;
        let issue = state
            .issues
            .get_mut(&id)
            .ok_or(IssueError::NotRegistered(id))?;

        issue.claims.push(Claim {
            claimant: caller,
            note: note.clone(),
            block,
        });

        info!(
            issue_id = id,
            claimant = %caller,
            claims = issue.claims.len(),
            "🙋 Issue claimed"
        );
        self.events.emit(WorkTogetherEvent::IssueClaimed {
            issue_id: id,
            claimant: caller,
            note,
        });

        Ok(())
    }

    /// Pick the resolver among the claimants. Terminal for the issue.
    pub async fn select_issue_resolver(
        &self,
        caller: AccountAddress,
        id: IssueId,
        account: AccountAddress,
    ) -> Result<()> {
        self.require_admin(caller).await?;

        let mut state = self.state.write().await;
        let issue = state
            .issues
            .get_mut(&id)
            .ok_or(IssueError::NotRegistered(id))?;

        if issue.is_resolved() {
            return Err(IssueError::AlreadyResolved(id));
        }
        if !issue.has_claimed(account) {
            return Err(IssueError::NeverClaimed {
                issue_id: id,
                account,
            });
        }

        issue.resolver = Some(account);
        issue.status = IssueStatus::Resolved;

        info!(
            issue_id = id,
            resolver = %account,
            claimants = issue.claimants().len(),
            "✅ Issue resolved"
        );
        self.events.emit(WorkTogetherEvent::IssueResolved {
            issue_id: id,
            resolver: account,
        });

        Ok(())
    }

    /// Mint `amount` stake tokens to `account` on account of issue `id`.
    ///
    /// Not bound to the issue's state or bounty: the call succeeds for any
    /// admin. Minted totals are tracked per issue and suspicious mints are
    /// logged.
    pub async fn mint_to(
        &self,
        caller: AccountAddress,
        id: IssueId,
        account: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        self.require_admin(caller).await?;

        let mut state = self.state.write().await;
        let minted_before = state.minted.get(&id).copied().unwrap_or(TokenAmount::ZERO);
        let minted_after = minted_before.saturating_add(amount);

        match state.issues.get(&id) {
            None => warn!(issue_id = id, to = %account, "⚠️ Minting for an unregistered issue"),
            Some(issue) if !issue.is_resolved() => {
                warn!(issue_id = id, to = %account, "⚠️ Minting for an unresolved issue")
            }
            Some(issue) if issue.resolver != Some(account) => {
                warn!(issue_id = id, to = %account, "⚠️ Minting to an account other than the resolver")
            }
            Some(_) => {}
        }
        if let Some(issue) = state.issues.get(&id) {
            if minted_after > issue.bounty {
                warn!(
                    issue_id = id,
                    bounty = issue.bounty.units(),
                    minted = minted_after.units(),
                    "⚠️ Minted total exceeds the issue bounty"
                );
            }
        }

        self.stake_token.mint(self.address, account, amount).await?;
        state.minted.insert(id, minted_after);

        info!(
            issue_id = id,
            to = %account,
            amount = amount.units(),
            minted_for_issue = minted_after.units(),
            "🪙 Stake minted"
        );

        Ok(())
    }

    /// Pay the escrowed bounty of a resolved issue to its resolver, once.
    pub async fn release_bounty(&self, caller: AccountAddress, id: IssueId) -> Result<TokenAmount> {
        self.require_admin(caller).await?;

        let mut state = self.state.write().await;
        let issue = state
            .issues
            .get(&id)
            .ok_or(IssueError::NotRegistered(id))?;
        let resolver = issue.resolver.ok_or(IssueError::NotResolved(id))?;
        if issue.bounty_released {
            return Err(IssueError::BountyAlreadyReleased(id));
        }
        let amount = issue.escrowed;

        self.stake_token
            .transfer(self.address, resolver, amount)
            .await?;

        state.total_escrowed = state.total_escrowed.saturating_sub(amount);
        if let Some(issue) = state.issues.get_mut(&id) {
            issue.bounty_released = true;
        }

        info!(
            issue_id = id,
            resolver = %resolver,
            amount = amount.units(),
            "🎁 Bounty released"
        );
        self.events.emit(WorkTogetherEvent::BountyReleased {
            issue_id: id,
            resolver,
            amount,
        });

        Ok(amount)
    }

    pub async fn issue(&self, id: IssueId) -> Option<Issue> {
        let state = self.state.read().await;
        debug!(issue_id = id, found = state.issues.contains_key(&id), "Issue lookup");
        state.issues.get(&id).cloned()
    }

    pub async fn issue_count(&self) -> usize {
        self.state.read().await.issues.len()
    }

    /// Sum of bounties registered and not yet released.
    pub async fn total_escrowed(&self) -> TokenAmount {
        self.state.read().await.total_escrowed
    }

    pub async fn minted_for(&self, id: IssueId) -> TokenAmount {
        self.state
            .read()
            .await
            .minted
            .get(&id)
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worktogether_ledger::{MemoryStorage, Token};
    use worktogether_types::{RoleTable, SimulatedChain};

    async fn setup() -> (IssueRegistry, Arc<Token>, AccountAddress) {
        let admin = AccountAddress::derive("admin", 0);
        let registry_address = AccountAddress::derive("issues", 0);
        let token = Arc::new(Token::new(
            "STAKE",
            AccountAddress::derive("token", 1),
            registry_address,
            Arc::new(MemoryStorage::new()),
        ));
        let registry = IssueRegistry::new(
            registry_address,
            token.clone(),
            Arc::new(RoleTable::with_admin(admin).await),
            Arc::new(SimulatedChain::new(0, 13)),
            EventBus::new(),
        );
        (registry, token, admin)
    }

    #[tokio::test]
    async fn test_register_mints_into_custody() {
        let (registry, token, admin) = setup().await;
        registry
            .register_issue(admin, 100, TokenAmount::from_units(10))
            .await
            .unwrap();

        assert_eq!(
            token.balance_of(registry.address()).await.unwrap(),
            TokenAmount::from_units(10)
        );
        let issue = registry.issue(100).await.unwrap();
        assert_eq!(issue.status, IssueStatus::Registered);
        assert_eq!(issue.escrowed, TokenAmount::from_units(10));
        assert!(issue.resolver.is_none());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_register() {
        let (registry, _token, _admin) = setup().await;
        let outsider = AccountAddress::derive("user", 7);
        let err = registry
            .register_issue(outsider, 1, TokenAmount::from_units(10))
            .await
            .unwrap_err();
        assert_eq!(err, IssueError::OnlyAdmin(outsider));
        assert_eq!(registry.issue_count().await, 0);
    }

    #[tokio::test]
    async fn test_mint_to_tracks_totals() {
        let (registry, token, admin) = setup().await;
        let dev = AccountAddress::derive("user", 1);
        registry.register_issue(admin, 1, TokenAmount::from_units(10)).await.unwrap();
        registry.claim_resolve_issue(dev, 1, "done").await.unwrap();
        registry.select_issue_resolver(admin, 1, dev).await.unwrap();

        registry.mint_to(admin, 1, dev, TokenAmount::from_units(10)).await.unwrap();
        // Unbound: a second mint for the same issue also goes through
        registry.mint_to(admin, 1, dev, TokenAmount::from_units(10)).await.unwrap();

        assert_eq!(registry.minted_for(1).await, TokenAmount::from_units(20));
        assert_eq!(token.balance_of(dev).await.unwrap(), TokenAmount::from_units(20));

        let err = registry
            .mint_to(dev, 1, dev, TokenAmount::from_units(1))
            .await
            .unwrap_err();
        assert_eq!(err, IssueError::OnlyAdmin(dev));
    }

    #[tokio::test]
    async fn test_release_bounty_once() {
        let (registry, token, admin) = setup().await;
        let dev = AccountAddress::derive("user", 1);
        registry.register_issue(admin, 5, TokenAmount::from_units(40)).await.unwrap();

        assert_eq!(
            registry.release_bounty(admin, 5).await.unwrap_err(),
            IssueError::NotResolved(5)
        );

        registry.claim_resolve_issue(dev, 5, "fixed").await.unwrap();
        registry.select_issue_resolver(admin, 5, dev).await.unwrap();
        assert_eq!(
            registry.release_bounty(admin, 5).await.unwrap(),
            TokenAmount::from_units(40)
        );
        assert_eq!(token.balance_of(dev).await.unwrap(), TokenAmount::from_units(40));
        assert_eq!(registry.total_escrowed().await, TokenAmount::ZERO);

        let err = registry.release_bounty(admin, 5).await.unwrap_err();
        assert_eq!(err, IssueError::BountyAlreadyReleased(5));
        assert_eq!(err.kind(), worktogether_types::ErrorKind::State);
    }
}
