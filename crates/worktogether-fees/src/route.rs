use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use worktogether_types::{AccountAddress, TokenAmount};

/// Parameters of one route lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub from_token: AccountAddress,
    pub to_token: AccountAddress,
    pub amount: TokenAmount,
    pub from_account: AccountAddress,
    pub max_slippage_percent: u8,
}

/// Router to call and the instruction payload to hand it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub target: AccountAddress,
    pub payload: Vec<u8>,
}

/// External price/route lookup. `None` means no route exists.
#[async_trait]
pub trait RouteResolver: Send + Sync {
    async fn resolve(&self, query: &RouteQuery) -> Option<SwapRoute>;
}

/// Resolver answering from a fixed `(from_token, to_token)` table.
#[derive(Default)]
pub struct StaticRouteResolver {
    routes: Arc<RwLock<HashMap<(AccountAddress, AccountAddress), SwapRoute>>>,
}

impl StaticRouteResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, from_token: AccountAddress, to_token: AccountAddress, route: SwapRoute) {
        self.routes.write().await.insert((from_token, to_token), route);
    }
}

#[async_trait]
impl RouteResolver for StaticRouteResolver {
    async fn resolve(&self, query: &RouteQuery) -> Option<SwapRoute> {
        self.routes
            .read()
            .await
            .get(&(query.from_token, query.to_token))
            .cloned()
    }
}
