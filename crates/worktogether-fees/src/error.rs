use thiserror::Error;
use worktogether_ledger::LedgerError;
use worktogether_types::{AccountAddress, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("{0} lacks the executor role")]
    OnlyExecutor(AccountAddress),

    #[error("Only an admin may do this, {0} is not one")]
    OnlyAdmin(AccountAddress),

    #[error("Router {0} is not allow-listed")]
    RouterNotAllowed(AccountAddress),

    #[error("No router registered at {0}")]
    UnknownRouter(AccountAddress),

    #[error("Swap amount must be positive")]
    ZeroAmount,

    #[error("Router rejected the swap: {0}")]
    Router(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl FeeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeeError::OnlyExecutor(_) | FeeError::OnlyAdmin(_) | FeeError::RouterNotAllowed(_) => {
                ErrorKind::Authorization
            }
            FeeError::UnknownRouter(_) | FeeError::ZeroAmount => ErrorKind::Validation,
            FeeError::Router(_) => ErrorKind::Ledger,
            FeeError::Ledger(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeeError>;
