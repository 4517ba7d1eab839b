use serde::{Deserialize, Serialize};
use worktogether_types::{AccountAddress, TokenAmount};

pub type IssueId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
    Registered,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claimant: AccountAddress,
    pub note: String,
    pub block: u64,
}

/// Bounty-backed unit of work.
///
/// `resolver` is `Some` exactly when `status` is `Resolved`. `escrowed` is
/// fixed at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub bounty: TokenAmount,
    pub escrowed: TokenAmount,
    pub claims: Vec<Claim>,
    pub resolver: Option<AccountAddress>,
    pub status: IssueStatus,
    pub bounty_released: bool,
    pub registered_at_block: u64,
}

impl Issue {
    pub fn new(id: IssueId, bounty: TokenAmount, registered_at_block: u64) -> Self {
        Self {
            id,
            bounty,
            escrowed: bounty,
            claims: Vec::new(),
            resolver: None,
            status: IssueStatus::Registered,
            bounty_released: false,
            registered_at_block,
        }
    }

    /// Distinct claimants in first-claim order.
    pub fn claimants(&self) -> Vec<AccountAddress> {
        let mut seen = Vec::new();
        for claim in &self.claims {
            if !seen.contains(&claim.claimant) {
                seen.push(claim.claimant);
            }
        }
        seen
    }

    pub fn has_claimed(&self, account: AccountAddress) -> bool {
        self.claims.iter().any(|c| c.claimant == account)
    }

    pub fn is_resolved(&self) -> bool {
        self.status == IssueStatus::Resolved
    }
}
