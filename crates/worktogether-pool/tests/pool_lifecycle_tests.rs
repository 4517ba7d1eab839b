use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use worktogether_ledger::{MemoryStorage, Token, TokenLedger};
use worktogether_pool::{PoolContext, PoolError, PoolParams, PoolRegistry, PoolStatus};
use worktogether_rng::{
    BlockhashRng, RandomnessSource, RandomnessTicket, RequestId, RngConfig, RngError,
};
use worktogether_types::{
    AccountAddress, ErrorKind, EventBus, RoleTable, SimulatedChain, TokenAmount,
    WorkTogetherEvent,
};

const START: i64 = 1_700_000_000;
const DURATION: i64 = 3_600;

/// Randomness stub revealing a fixed seed once `ready` is set.
struct FixedSeedRng {
    seed: [u8; 32],
    ready: AtomicBool,
    next_id: AtomicU32,
}

impl FixedSeedRng {
    fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            ready: AtomicBool::new(false),
            next_id: AtomicU32::new(1),
        }
    }
}

#[async_trait]
impl RandomnessSource for FixedSeedRng {
    async fn request(&self, _requester: AccountAddress) -> worktogether_rng::Result<RandomnessTicket> {
        Ok(RandomnessTicket {
            request_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            target_block: 0,
        })
    }

    async fn reveal(&self, request_id: RequestId) -> worktogether_rng::Result<[u8; 32]> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(self.seed)
        } else {
            Err(RngError::NotReady {
                request_id,
                target_block: 0,
                current_block: 0,
            })
        }
    }

    async fn is_ready(&self, _request_id: RequestId) -> worktogether_rng::Result<bool> {
        Ok(self.ready.load(Ordering::SeqCst))
    }
}

struct World {
    chain: Arc<SimulatedChain>,
    registry: PoolRegistry,
    stake: Arc<Token>,
    reward: Arc<Token>,
    events: EventBus,
    admin: AccountAddress,
}

async fn world() -> World {
    let admin = AccountAddress::derive("admin", 0);
    let chain = Arc::new(SimulatedChain::new(START, 12));
    let events = EventBus::new();
    let ctx = PoolContext {
        access: Arc::new(RoleTable::with_admin(admin).await),
        chain: chain.clone(),
        events: events.clone(),
    };
    let stake = Arc::new(Token::new(
        "STAKE",
        AccountAddress::derive("token", 1),
        admin,
        Arc::new(MemoryStorage::new()),
    ));
    let reward = Arc::new(Token::new(
        "REWARD",
        AccountAddress::derive("token", 2),
        admin,
        Arc::new(MemoryStorage::new()),
    ));
    World {
        chain,
        registry: PoolRegistry::new(ctx),
        stake,
        reward,
        events,
        admin,
    }
}

fn user(n: u64) -> AccountAddress {
    AccountAddress::derive("user", n)
}

impl World {
    async fn create_pool(&self, rng: Arc<dyn RandomnessSource>) -> AccountAddress {
        self.registry
            .create_token_reward_pool(
                self.admin,
                self.stake.clone(),
                self.reward.clone(),
                rng,
                PoolParams {
                    name: "weekly".to_string(),
                    start_time: START,
                    duration: DURATION,
                },
            )
            .await
            .unwrap()
    }

    async fn fund_and_approve(&self, account: AccountAddress, pool: AccountAddress, amount: u64) {
        self.stake
            .mint(self.admin, account, TokenAmount::from_units(amount))
            .await
            .unwrap();
        self.stake
            .approve(account, pool, TokenAmount::from_units(amount))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_seed_119_of_120_selects_second_entrant() {
    let w = world().await;
    let mut seed = [0u8; 32];
    seed[31] = 119;
    let rng = Arc::new(FixedSeedRng::new(seed));
    let address = w.create_pool(rng.clone()).await;
    let pool = w.registry.get_pool(1).await.unwrap();
    assert_eq!(pool.address(), address);

    let (a, b) = (user(1), user(2));
    w.fund_and_approve(a, address, 100).await;
    w.fund_and_approve(b, address, 20).await;
    pool.enter(a, TokenAmount::from_units(100)).await.unwrap();
    pool.enter(b, TokenAmount::from_units(20)).await.unwrap();
    assert_eq!(pool.total_weight().await, TokenAmount::from_units(120));

    w.reward
        .mint(w.admin, address, TokenAmount::from_units(1_000))
        .await
        .unwrap();

    w.chain.advance_time(DURATION).await;
    pool.request_random_number(w.admin).await.unwrap();

    let err = pool.distribute_reward(w.admin).await.unwrap_err();
    assert_eq!(err, PoolError::SeedNotReady(1));
    assert_eq!(err.kind(), ErrorKind::State);

    rng.ready.store(true, Ordering::SeqCst);
    let (winner, amount) = pool.distribute_reward(w.admin).await.unwrap();
    assert_eq!(winner, b);
    assert_eq!(amount, TokenAmount::from_units(1_000));
    assert_eq!(w.reward.balance_of(b).await.unwrap(), TokenAmount::from_units(1_000));
    assert_eq!(w.reward.balance_of(address).await.unwrap(), TokenAmount::ZERO);
    assert_eq!(pool.status().await, PoolStatus::Distributed);
    assert_eq!(pool.winner().await, Some(b));

    let err = pool.distribute_reward(w.admin).await.unwrap_err();
    assert_eq!(err, PoolError::AlreadyDistributed(1));
    assert_eq!(w.reward.balance_of(b).await.unwrap(), TokenAmount::from_units(1_000));
}

#[tokio::test]
async fn test_round_emits_pool_events_in_order() {
    let w = world().await;
    let mut rx = w.events.subscribe();
    let rng = Arc::new(FixedSeedRng::new([0u8; 32]));
    let pool_address = w.create_pool(rng.clone()).await;
    let pool = w.registry.get_pool(1).await.unwrap();

    let a = user(1);
    w.fund_and_approve(a, pool_address, 30).await;
    pool.enter(a, TokenAmount::from_units(10)).await.unwrap();
    pool.enter(a, TokenAmount::from_units(20)).await.unwrap();
    w.reward
        .mint(w.admin, pool_address, TokenAmount::from_units(7))
        .await
        .unwrap();

    w.chain.advance_time(DURATION).await;
    pool.request_random_number(w.admin).await.unwrap();
    rng.ready.store(true, Ordering::SeqCst);
    pool.distribute_reward(w.admin).await.unwrap();

    let expected = vec![
        WorkTogetherEvent::PoolCreated {
            pool_id: 1,
            address: pool_address,
        },
        // Entered carries the cumulative weight, not the deposit
        WorkTogetherEvent::Entered {
            pool: pool_address,
            account: a,
            weight: TokenAmount::from_units(10),
        },
        WorkTogetherEvent::Entered {
            pool: pool_address,
            account: a,
            weight: TokenAmount::from_units(30),
        },
        WorkTogetherEvent::SeedRequested {
            pool: pool_address,
            request_id: 1,
            target_block: 0,
        },
        WorkTogetherEvent::RewardDistributed {
            pool: pool_address,
            winner: a,
            amount: TokenAmount::from_units(7),
        },
    ];
    for event in expected {
        assert_eq!(rx.try_recv().unwrap(), event);
    }
    assert!(rx.try_recv().is_err());
    assert_eq!(w.events.total_events_emitted(), 5);
}

#[tokio::test]
async fn test_entries_accumulate_and_close_at_window_end() {
    let w = world().await;
    let address = w.create_pool(Arc::new(FixedSeedRng::new([0; 32]))).await;
    let pool = w.registry.get_pool(1).await.unwrap();

    let a = user(1);
    w.fund_and_approve(a, address, 100).await;
    assert_eq!(
        pool.enter(a, TokenAmount::from_units(30)).await.unwrap(),
        TokenAmount::from_units(30)
    );
    assert_eq!(
        pool.enter(a, TokenAmount::from_units(45)).await.unwrap(),
        TokenAmount::from_units(75)
    );
    assert_eq!(pool.chance_of(a).await, TokenAmount::from_units(75));
    assert_eq!(pool.chance_of(user(9)).await, TokenAmount::ZERO);
    assert_eq!(w.stake.balance_of(address).await.unwrap(), TokenAmount::from_units(75));

    // Exactly at start + duration the pool is closed
    w.chain.advance_time(DURATION).await;
    let err = pool.enter(a, TokenAmount::from_units(10)).await.unwrap_err();
    assert_eq!(err, PoolError::PoolEnded(1));
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(pool.chance_of(a).await, TokenAmount::from_units(75));
    assert_eq!(w.stake.balance_of(a).await.unwrap(), TokenAmount::from_units(25));
}

#[tokio::test]
async fn test_failed_pull_leaves_no_weight() {
    let w = world().await;
    let address = w.create_pool(Arc::new(FixedSeedRng::new([0; 32]))).await;
    let pool = w.registry.get_pool(1).await.unwrap();

    // Funded but never approved
    w.stake
        .mint(w.admin, user(1), TokenAmount::from_units(50))
        .await
        .unwrap();
    let err = pool.enter(user(1), TokenAmount::from_units(50)).await.unwrap_err();
    assert!(matches!(err, PoolError::Ledger(_)));
    assert_eq!(err.kind(), ErrorKind::Ledger);
    assert_eq!(pool.total_weight().await, TokenAmount::ZERO);
    assert_eq!(w.stake.balance_of(address).await.unwrap(), TokenAmount::ZERO);
}

#[tokio::test]
async fn test_request_guards() {
    let w = world().await;
    w.create_pool(Arc::new(FixedSeedRng::new([0; 32]))).await;
    let pool = w.registry.get_pool(1).await.unwrap();

    let err = pool.request_random_number(w.admin).await.unwrap_err();
    assert_eq!(
        err,
        PoolError::TooEarly {
            now: START,
            ends_at: START + DURATION
        }
    );

    w.chain.advance_time(DURATION).await;
    let err = pool.request_random_number(user(1)).await.unwrap_err();
    assert_eq!(err, PoolError::OnlyAdmin(user(1)));
    assert_eq!(err.kind(), ErrorKind::Authorization);

    pool.request_random_number(w.admin).await.unwrap();
    assert_eq!(
        pool.request_random_number(w.admin).await.unwrap_err(),
        PoolError::AlreadyRequested(1)
    );
}

#[tokio::test]
async fn test_stale_reveal_leaves_pool_stuck() {
    let w = world().await;
    let rng = Arc::new(
        BlockhashRng::new(
            RngConfig {
                reveal_delay_blocks: 1,
                block_hash_window: 256,
            },
            w.chain.clone(),
        )
        .unwrap(),
    );
    let address = w.create_pool(rng).await;
    let pool = w.registry.get_pool(1).await.unwrap();

    w.fund_and_approve(user(1), address, 10).await;
    pool.enter(user(1), TokenAmount::from_units(10)).await.unwrap();

    w.chain.advance_time(DURATION).await;
    pool.request_random_number(w.admin).await.unwrap();
    w.chain.advance_blocks(300).await;

    let err = pool.distribute_reward(w.admin).await.unwrap_err();
    assert!(matches!(err, PoolError::Randomness(RngError::StaleBlock { .. })));
    assert_eq!(err.kind(), ErrorKind::TransientUnavailable);
    assert_eq!(pool.status().await, PoolStatus::SeedRequested);
    assert_eq!(pool.winner().await, None);
}

#[tokio::test]
async fn test_full_round_with_blockhash_randomness() {
    let w = world().await;
    let rng = Arc::new(BlockhashRng::new(RngConfig::default(), w.chain.clone()).unwrap());
    let address = w.create_pool(rng).await;
    let pool = w.registry.get_pool(1).await.unwrap();

    for n in 1..=4u64 {
        w.fund_and_approve(user(n), address, n * 25).await;
        pool.enter(user(n), TokenAmount::from_units(n * 25)).await.unwrap();
    }
    w.reward
        .mint(w.admin, address, TokenAmount::from_units(500))
        .await
        .unwrap();

    w.chain.advance_time(DURATION).await;
    let ticket = pool.request_random_number(w.admin).await.unwrap();
    assert!(matches!(
        pool.distribute_reward(w.admin).await,
        Err(PoolError::SeedNotReady(1))
    ));

    w.chain.advance_blocks(1).await;
    let (winner, amount) = pool.distribute_reward(w.admin).await.unwrap();
    println!("request {} won by {}", ticket.request_id, winner);

    assert!((1..=4u64).any(|n| user(n) == winner));
    assert_eq!(amount, TokenAmount::from_units(500));
    assert_eq!(w.reward.balance_of(winner).await.unwrap(), TokenAmount::from_units(500));

    let info = pool.info().await;
    assert_eq!(info.status, PoolStatus::Distributed);
    assert_eq!(info.entrants, 4);
    assert_eq!(info.total_weight, TokenAmount::from_units(250));
    assert_eq!(info.reward_paid, Some(TokenAmount::from_units(500)));
    println!("{}", serde_json::to_string_pretty(&info).unwrap());
}

#[tokio::test]
async fn test_registry_ids_and_lookup() {
    let w = world().await;
    assert_eq!(w.registry.get_size_of_pool().await, 0);
    assert_eq!(w.registry.get_pool_address_of(1).await, AccountAddress::ZERO);

    let first = w.create_pool(Arc::new(FixedSeedRng::new([0; 32]))).await;
    let second = w.create_pool(Arc::new(FixedSeedRng::new([0; 32]))).await;
    assert_ne!(first, second);
    assert_eq!(w.registry.get_size_of_pool().await, 2);
    assert_eq!(w.registry.get_pool_address_of(1).await, first);
    assert_eq!(w.registry.get_pool_address_of(2).await, second);
    assert_eq!(
        w.registry.get_pool_address_of(w.registry.get_size_of_pool().await).await,
        second
    );
    assert_eq!(w.registry.get_pool_address_of(0).await, AccountAddress::ZERO);
    assert_eq!(w.registry.get_pool_address_of(3).await, AccountAddress::ZERO);
    assert_eq!(
        w.registry.get_pool_by_address(second).await.unwrap().id(),
        2
    );

    let err = w
        .registry
        .create_token_reward_pool(
            w.admin,
            w.stake.clone(),
            w.reward.clone(),
            Arc::new(FixedSeedRng::new([0; 32])),
            PoolParams {
                name: "broken".to_string(),
                start_time: START,
                duration: -5,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, PoolError::InvalidDuration(-5));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(w.registry.get_size_of_pool().await, 2);

    let err = w
        .registry
        .create_token_reward_pool(
            user(1),
            w.stake.clone(),
            w.reward.clone(),
            Arc::new(FixedSeedRng::new([0; 32])),
            PoolParams {
                name: "rogue".to_string(),
                start_time: START,
                duration: 60,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, PoolError::OnlyAdmin(user(1)));
}
