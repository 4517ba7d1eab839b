use crate::AccountAddress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Capabilities checked by the engine on every privileged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Issue registration/resolution/minting, pool creation and draws.
    Admin,
    /// Fee swap execution.
    Executor,
    /// Router targets a fee swap may be forwarded to.
    RouterAllowlist,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "ADMIN",
            Role::Executor => "EXECUTOR",
            Role::RouterAllowlist => "ROUTER_ALLOWLIST",
        };
        f.write_str(name)
    }
}

/// Role membership oracle. Components hold an `Arc<dyn AccessControl>` and
/// query it per call instead of keeping their own role tables.
#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn has_role(&self, role: Role, account: AccountAddress) -> bool;
}

/// In-memory role table.
#[derive(Default)]
pub struct RoleTable {
    members: Arc<RwLock<HashMap<Role, HashSet<AccountAddress>>>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a single account holding `Role::Admin`.
    pub async fn with_admin(admin: AccountAddress) -> Self {
        let table = Self::new();
        table.grant_role(Role::Admin, admin).await;
        table
    }

    pub async fn grant_role(&self, role: Role, account: AccountAddress) {
        let mut members = self.members.write().await;
        if members.entry(role).or_default().insert(account) {
            info!(role = %role, account = %account, "🔑 Role granted");
        }
    }

    pub async fn revoke_role(&self, role: Role, account: AccountAddress) {
        let mut members = self.members.write().await;
        let removed = members
            .get_mut(&role)
            .map(|set| set.remove(&account))
            .unwrap_or(false);
        if removed {
            info!(role = %role, account = %account, "🔒 Role revoked");
        }
    }

    pub async fn members_of(&self, role: Role) -> Vec<AccountAddress> {
        let members = self.members.read().await;
        let mut list: Vec<_> = members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        list.sort();
        list
    }
}

#[async_trait]
impl AccessControl for RoleTable {
    async fn has_role(&self, role: Role, account: AccountAddress) -> bool {
        let members = self.members.read().await;
        members
            .get(&role)
            .map(|set| set.contains(&account))
            .unwrap_or(false)
    }
}
