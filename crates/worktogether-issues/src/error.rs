use crate::IssueId;
use thiserror::Error;
use worktogether_ledger::LedgerError;
use worktogether_types::{AccountAddress, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("Issue {0} already registered")]
    DuplicateId(IssueId),

    #[error("Issue {0} not registered")]
    NotRegistered(IssueId),

    #[error("{account} never claimed issue {issue_id}")]
    NeverClaimed {
        issue_id: IssueId,
        account: AccountAddress,
    },

    #[error("Issue {0} already resolved")]
    AlreadyResolved(IssueId),

    #[error("Only an admin may do this, {0} is not one")]
    OnlyAdmin(AccountAddress),

    #[error("Issue {0} has no resolver yet")]
    NotResolved(IssueId),

    #[error("Bounty of issue {0} already released")]
    BountyAlreadyReleased(IssueId),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl IssueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IssueError::DuplicateId(_) => ErrorKind::Validation,
            IssueError::NotRegistered(_)
            | IssueError::AlreadyResolved(_)
            | IssueError::NotResolved(_)
            | IssueError::BountyAlreadyReleased(_) => ErrorKind::State,
            IssueError::OnlyAdmin(_) | IssueError::NeverClaimed { .. } => ErrorKind::Authorization,
            IssueError::Ledger(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IssueError>;
