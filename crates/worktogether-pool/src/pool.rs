use crate::{EntryWindow, PoolError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use worktogether_ledger::TokenLedger;
use worktogether_rng::{RandomnessSource, RandomnessTicket, RngError};
use worktogether_sortition::{SortitionError, SortitionTree};
use worktogether_types::{
    AccessControl, AccountAddress, ChainClock, EventBus, Role, TokenAmount, WorkTogetherEvent,
};

pub type PoolId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    Open,
    Ended,
    SeedRequested,
    Distributed,
}

/// Creation parameters of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub name: String,
    pub start_time: i64,
    pub duration: i64,
}

/// Collaborators every pool shares with its registry.
#[derive(Clone)]
pub struct PoolContext {
    pub access: Arc<dyn AccessControl>,
    pub chain: Arc<dyn ChainClock>,
    pub events: EventBus,
}

/// Read-only snapshot of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub id: PoolId,
    pub address: AccountAddress,
    pub name: String,
    pub window: EntryWindow,
    pub status: PoolStatus,
    pub total_weight: TokenAmount,
    pub entrants: usize,
    pub request: Option<RandomnessTicket>,
    pub winner: Option<AccountAddress>,
    pub reward_paid: Option<TokenAmount>,
}

/// Stored lifecycle phase. `Open` covers both `Open` and `Ended`, which only
/// differ by the clock.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Open,
    SeedRequested {
        ticket: RandomnessTicket,
    },
    Distributed {
        ticket: RandomnessTicket,
        winner: AccountAddress,
        amount: TokenAmount,
    },
}

struct PoolState {
    tree: SortitionTree<AccountAddress>,
    phase: Phase,
}

/// One lottery round.
///
/// Every operation holds the pool's write lock from its first check to its
/// last effect, so operations on one pool are serialized and a failed
/// precondition leaves nothing behind.
pub struct Pool {
    id: PoolId,
    address: AccountAddress,
    name: String,
    window: EntryWindow,
    stake_token: Arc<dyn TokenLedger>,
    reward_token: Arc<dyn TokenLedger>,
    rng: Arc<dyn RandomnessSource>,
    ctx: PoolContext,
    state: Arc<RwLock<PoolState>>,
}

impl Pool {
    pub fn new(
        id: PoolId,
        address: AccountAddress,
        params: PoolParams,
        stake_token: Arc<dyn TokenLedger>,
        reward_token: Arc<dyn TokenLedger>,
        rng: Arc<dyn RandomnessSource>,
        ctx: PoolContext,
    ) -> Result<Self> {
        if params.duration <= 0 {
            return Err(PoolError::InvalidDuration(params.duration));
        }

        Ok(Self {
            id,
            address,
            name: params.name,
            window: EntryWindow::new(params.start_time, params.duration),
            stake_token,
            reward_token,
            rng,
            ctx,
            state: Arc::new(RwLock::new(PoolState {
                tree: SortitionTree::new(),
                phase: Phase::Open,
            })),
        })
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> EntryWindow {
        self.window
    }

    pub fn ends_at(&self) -> i64 {
        self.window.ends_at()
    }

    pub fn stake_token(&self) -> &Arc<dyn TokenLedger> {
        &self.stake_token
    }

    pub fn reward_token(&self) -> &Arc<dyn TokenLedger> {
        &self.reward_token
    }

    async fn require_admin(&self, caller: AccountAddress) -> Result<()> {
        if self.ctx.access.has_role(Role::Admin, caller).await {
            Ok(())
        } else {
            Err(PoolError::OnlyAdmin(caller))
        }
    }

    fn status_at(&self, phase: &Phase, now: i64) -> PoolStatus {
        match phase {
            Phase::Open if self.window.has_ended(now) => PoolStatus::Ended,
            Phase::Open => PoolStatus::Open,
            Phase::SeedRequested { .. } => PoolStatus::SeedRequested,
            Phase::Distributed { .. } => PoolStatus::Distributed,
        }
    }

    pub async fn status(&self) -> PoolStatus {
        let now = self.ctx.chain.timestamp().await;
        let state = self.state.read().await;
        self.status_at(&state.phase, now)
    }

    /// Deposit `amount` stake from `caller` and add it to the caller's weight.
    ///
    /// The pool pulls the stake with `transfer_from`, so `caller` must have
    /// approved the pool's address first.
    pub async fn enter(&self, caller: AccountAddress, amount: TokenAmount) -> Result<TokenAmount> {
        if amount.is_zero() {
            return Err(PoolError::ZeroAmount);
        }

        let mut state = self.state.write().await;
        let now = self.ctx.chain.timestamp().await;
        if !matches!(state.phase, Phase::Open) || !self.window.accepts_entries(now) {
            return Err(PoolError::PoolEnded(self.id));
        }
        state
            .tree
            .total()
            .checked_add(amount.units())
            .ok_or(SortitionError::WeightOverflow)?;

        self.stake_token
            .transfer_from(self.address, caller, self.address, amount)
            .await?;
        let weight = TokenAmount::from_units(state.tree.add_weight(caller, amount.units())?);

        info!(
            pool_id = self.id,
            account = %caller,
            amount = amount.units(),
            weight = weight.units(),
            total_weight = state.tree.total(),
            closes_in_secs = self.window.remaining(now),
            "🎟️ Pool entered"
        );
        self.ctx.events.emit(WorkTogetherEvent::Entered {
            pool: self.address,
            account: caller,
            weight,
        });

        Ok(weight)
    }

    /// Current weight of `account`; the winning probability is this over
    /// `total_weight()`.
    pub async fn chance_of(&self, account: AccountAddress) -> TokenAmount {
        let state = self.state.read().await;
        TokenAmount::from_units(state.tree.weight_of(&account).unwrap_or(0))
    }

    pub async fn total_weight(&self) -> TokenAmount {
        TokenAmount::from_units(self.state.read().await.tree.total())
    }

    pub async fn entrants(&self) -> Vec<(AccountAddress, TokenAmount)> {
        let state = self.state.read().await;
        state
            .tree
            .iter()
            .map(|(account, weight)| (*account, TokenAmount::from_units(weight)))
            .collect()
    }

    pub async fn winner(&self) -> Option<AccountAddress> {
        match self.state.read().await.phase {
            Phase::Distributed { winner, .. } => Some(winner),
            _ => None,
        }
    }

    pub async fn request_random_number(&self, caller: AccountAddress) -> Result<RandomnessTicket> {
        self.require_admin(caller).await?;

        let mut state = self.state.write().await;
        if !matches!(state.phase, Phase::Open) {
            return Err(PoolError::AlreadyRequested(self.id));
        }
        let now = self.ctx.chain.timestamp().await;
        if !self.window.has_ended(now) {
            return Err(PoolError::TooEarly {
                now,
                ends_at: self.window.ends_at(),
            });
        }

        let ticket = self.rng.request(self.address).await?;
        state.phase = Phase::SeedRequested { ticket };

        info!(
            pool_id = self.id,
            request_id = ticket.request_id,
            target_block = ticket.target_block,
            entrants = state.tree.len(),
            total_weight = state.tree.total(),
            "🎲 Pool requested randomness"
        );
        self.ctx.events.emit(WorkTogetherEvent::SeedRequested {
            pool: self.address,
            request_id: ticket.request_id,
            target_block: ticket.target_block,
        });

        Ok(ticket)
    }

    /// Reveal the seed, draw the winner and pay out the pool's entire reward
    /// balance. Returns the winner and the amount paid.
    pub async fn distribute_reward(
        &self,
        caller: AccountAddress,
    ) -> Result<(AccountAddress, TokenAmount)> {
        self.require_admin(caller).await?;

        let mut state = self.state.write().await;
        let ticket = match state.phase {
            Phase::Distributed { .. } => return Err(PoolError::AlreadyDistributed(self.id)),
            Phase::Open => return Err(PoolError::SeedNotReady(self.id)),
            Phase::SeedRequested { ticket } => ticket,
        };
        if state.tree.total() == 0 {
            return Err(PoolError::NoEntrants(self.id));
        }

        let seed = match self.rng.reveal(ticket.request_id).await {
            Ok(seed) => seed,
            Err(RngError::NotReady { .. }) => return Err(PoolError::SeedNotReady(self.id)),
            Err(e @ RngError::StaleBlock { .. }) => {
                warn!(
                    pool_id = self.id,
                    request_id = ticket.request_id,
                    target_block = ticket.target_block,
                    "⌛ Seed unobtainable, pool is stuck in SeedRequested"
                );
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let winner = *state.tree.draw_with_seed(&seed)?;
        let amount = self.reward_token.balance_of(self.address).await?;
        self.reward_token
            .transfer(self.address, winner, amount)
            .await?;

        state.phase = Phase::Distributed {
            ticket,
            winner,
            amount,
        };

        info!(
            pool_id = self.id,
            winner = %winner,
            amount = amount.units(),
            winner_weight = state.tree.weight_of(&winner).unwrap_or(0),
            total_weight = state.tree.total(),
            seed = hex::encode(&seed[..8]),
            "🏆 Reward distributed"
        );
        self.ctx.events.emit(WorkTogetherEvent::RewardDistributed {
            pool: self.address,
            winner,
            amount,
        });

        Ok((winner, amount))
    }

    pub async fn info(&self) -> PoolInfo {
        let now = self.ctx.chain.timestamp().await;
        let state = self.state.read().await;
        let (request, winner, reward_paid) = match state.phase {
            Phase::Open => (None, None, None),
            Phase::SeedRequested { ticket } => (Some(ticket), None, None),
            Phase::Distributed {
                ticket,
                winner,
                amount,
            } => (Some(ticket), Some(winner), Some(amount)),
        };
        debug!(pool_id = self.id, "Pool info snapshot");

        PoolInfo {
            id: self.id,
            address: self.address,
            name: self.name.clone(),
            window: self.window,
            status: self.status_at(&state.phase, now),
            total_weight: TokenAmount::from_units(state.tree.total()),
            entrants: state.tree.len(),
            request,
            winner,
            reward_paid,
        }
    }
}
