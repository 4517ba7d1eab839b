use std::sync::Arc;
use worktogether_fees::{
    DividendPool, DividendSink, FeeError, FeeManager, FixedRateRouter, StaticRouteResolver,
    SwapRoute, SwapRouter,
};
use worktogether_ledger::{MemoryStorage, Token, TokenLedger};
use worktogether_types::{
    AccountAddress, ErrorKind, EventBus, Role, RoleTable, TokenAmount, WorkTogetherEvent,
};

struct Setup {
    admin: AccountAddress,
    executor: AccountAddress,
    roles: Arc<RoleTable>,
    fee_token: Arc<Token>,
    reward_token: Arc<Token>,
    router: Arc<FixedRateRouter>,
    sink: Arc<DividendPool>,
    manager: FeeManager,
    events: EventBus,
}

fn token(symbol: &str, index: u64, controller: AccountAddress) -> Arc<Token> {
    Arc::new(Token::new(
        symbol,
        AccountAddress::derive("token", index),
        controller,
        Arc::new(MemoryStorage::new()),
    ))
}

async fn setup(router_inventory: u64) -> Setup {
    let admin = AccountAddress::derive("admin", 0);
    let executor = AccountAddress::derive("executor", 0);
    let roles = Arc::new(RoleTable::with_admin(admin).await);
    roles.grant_role(Role::Executor, executor).await;

    let fee_token = token("WETH", 10, admin);
    let reward_token = token("DAI", 11, admin);

    let router_address = AccountAddress::derive("router", 1);
    let router = Arc::new(FixedRateRouter::new(
        router_address,
        reward_token.clone(),
        2_000,
        1,
    ));
    reward_token
        .mint(admin, router_address, TokenAmount::from_units(router_inventory))
        .await
        .unwrap();
    roles.grant_role(Role::RouterAllowlist, router_address).await;

    let sink = Arc::new(DividendPool::new(AccountAddress::derive("dividends", 0)));
    let events = EventBus::new();
    let manager = FeeManager::new(
        AccountAddress::derive("fees", 0),
        reward_token.clone(),
        sink.clone(),
        roles.clone(),
        events.clone(),
    );
    manager.register_router(admin, router.clone()).await.unwrap();
    fee_token
        .mint(admin, manager.address(), TokenAmount::from_units(100))
        .await
        .unwrap();

    Setup {
        admin,
        executor,
        roles,
        fee_token,
        reward_token,
        router,
        sink,
        manager,
        events,
    }
}

#[tokio::test]
async fn test_swap_pays_dividend_sink() {
    let s = setup(1_000_000).await;
    let mut rx = s.events.subscribe();
    let payload = vec![0xde, 0xad, 0xbe, 0xef];

    let received = s
        .manager
        .swap(
            s.executor,
            s.router.address(),
            s.fee_token.clone(),
            TokenAmount::from_units(1),
            &payload,
        )
        .await
        .unwrap();

    assert_eq!(received, TokenAmount::from_units(2_000));
    assert_eq!(
        s.sink.total_distributed(s.reward_token.address()).await,
        TokenAmount::from_units(2_000)
    );
    assert_eq!(
        s.reward_token.balance_of(s.sink.address()).await.unwrap(),
        TokenAmount::from_units(2_000)
    );
    assert_eq!(
        s.fee_token.balance_of(s.manager.address()).await.unwrap(),
        TokenAmount::from_units(99)
    );
    assert_eq!(
        s.fee_token
            .allowance(s.manager.address(), s.router.address())
            .await
            .unwrap(),
        TokenAmount::ZERO
    );
    assert_eq!(s.router.last_payload().await, Some(payload));

    match rx.recv().await.unwrap() {
        WorkTogetherEvent::FeesDistributed { reward_out, .. } => {
            assert_eq!(reward_out, TokenAmount::from_units(2_000))
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_swap_requires_executor_and_allowlisted_router() {
    let s = setup(1_000_000).await;

    let err = s
        .manager
        .swap(
            s.admin,
            s.router.address(),
            s.fee_token.clone(),
            TokenAmount::from_units(1),
            &[],
        )
        .await
        .unwrap_err();
    assert_eq!(err, FeeError::OnlyExecutor(s.admin));
    assert_eq!(err.kind(), ErrorKind::Authorization);

    s.roles
        .revoke_role(Role::RouterAllowlist, s.router.address())
        .await;
    let err = s
        .manager
        .swap(
            s.executor,
            s.router.address(),
            s.fee_token.clone(),
            TokenAmount::from_units(1),
            &[],
        )
        .await
        .unwrap_err();
    assert_eq!(err, FeeError::RouterNotAllowed(s.router.address()));

    // Allow-listed but never registered
    let stranger = AccountAddress::derive("router", 99);
    s.roles.grant_role(Role::RouterAllowlist, stranger).await;
    let err = s
        .manager
        .swap(
            s.executor,
            stranger,
            s.fee_token.clone(),
            TokenAmount::from_units(1),
            &[],
        )
        .await
        .unwrap_err();
    assert_eq!(err, FeeError::UnknownRouter(stranger));
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(
        s.fee_token.balance_of(s.manager.address()).await.unwrap(),
        TokenAmount::from_units(100)
    );
}

#[tokio::test]
async fn test_failed_router_leaves_balances_untouched() {
    // Router has no reward inventory to pay out
    let s = setup(0).await;

    let err = s
        .manager
        .swap(
            s.executor,
            s.router.address(),
            s.fee_token.clone(),
            TokenAmount::from_units(5),
            &[1, 2, 3],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FeeError::Router(_)));
    assert_eq!(err.kind(), ErrorKind::Ledger);

    assert_eq!(
        s.fee_token.balance_of(s.manager.address()).await.unwrap(),
        TokenAmount::from_units(100)
    );
    assert_eq!(
        s.fee_token
            .allowance(s.manager.address(), s.router.address())
            .await
            .unwrap(),
        TokenAmount::ZERO
    );
    assert_eq!(
        s.sink.total_distributed(s.reward_token.address()).await,
        TokenAmount::ZERO
    );
}

#[tokio::test]
async fn test_missing_route_is_a_no_op() {
    let s = setup(1_000_000).await;
    let resolver = StaticRouteResolver::new();

    let result = s
        .manager
        .swap_with_resolver(
            s.executor,
            &resolver,
            s.fee_token.clone(),
            TokenAmount::from_units(10),
            1,
        )
        .await
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(
        s.fee_token.balance_of(s.manager.address()).await.unwrap(),
        TokenAmount::from_units(100)
    );
    assert_eq!(s.router.last_payload().await, None);
    assert_eq!(s.events.total_events_emitted(), 0);
}

#[tokio::test]
async fn test_resolved_route_payload_is_forwarded() {
    let s = setup(1_000_000).await;
    let resolver = StaticRouteResolver::new();
    let payload = b"route:WETH->DAI".to_vec();
    resolver
        .insert(
            s.fee_token.address(),
            s.reward_token.address(),
            SwapRoute {
                target: s.router.address(),
                payload: payload.clone(),
            },
        )
        .await;

    let result = s
        .manager
        .swap_with_resolver(
            s.executor,
            &resolver,
            s.fee_token.clone(),
            TokenAmount::from_units(3),
            1,
        )
        .await
        .unwrap();
    assert_eq!(result, Some(TokenAmount::from_units(6_000)));
    assert_eq!(s.router.last_payload().await, Some(payload));
}

#[tokio::test]
async fn test_reward_token_fees_skip_router() {
    let s = setup(0).await;
    s.reward_token
        .mint(s.admin, s.manager.address(), TokenAmount::from_units(250))
        .await
        .unwrap();

    let received = s
        .manager
        .swap(
            s.executor,
            s.router.address(),
            s.reward_token.clone(),
            TokenAmount::from_units(250),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(received, TokenAmount::from_units(250));
    assert_eq!(
        s.sink.total_distributed(s.reward_token.address()).await,
        TokenAmount::from_units(250)
    );
    assert_eq!(s.router.last_payload().await, None);
}

#[tokio::test]
async fn test_resolver_swap_checks_executor_before_lookup() {
    let s = setup(1_000_000).await;
    let resolver = StaticRouteResolver::new();

    // Same rejection whether or not a route exists
    let err = s
        .manager
        .swap_with_resolver(
            s.admin,
            &resolver,
            s.fee_token.clone(),
            TokenAmount::from_units(1),
            1,
        )
        .await
        .unwrap_err();
    assert_eq!(err, FeeError::OnlyExecutor(s.admin));
    assert_eq!(err.kind(), ErrorKind::Authorization);

    resolver
        .insert(
            s.fee_token.address(),
            s.reward_token.address(),
            SwapRoute {
                target: s.router.address(),
                payload: vec![7],
            },
        )
        .await;
    let err = s
        .manager
        .swap_with_resolver(
            s.admin,
            &resolver,
            s.fee_token.clone(),
            TokenAmount::from_units(1),
            1,
        )
        .await
        .unwrap_err();
    assert_eq!(err, FeeError::OnlyExecutor(s.admin));

    let err = s
        .manager
        .swap_with_resolver(s.executor, &resolver, s.fee_token.clone(), TokenAmount::ZERO, 1)
        .await
        .unwrap_err();
    assert_eq!(err, FeeError::ZeroAmount);

    assert_eq!(s.router.last_payload().await, None);
    assert_eq!(s.events.total_events_emitted(), 0);
}
