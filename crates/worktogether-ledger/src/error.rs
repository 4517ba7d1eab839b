use thiserror::Error;
use worktogether_types::{AccountAddress, ErrorKind, TokenAmount};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account}: has {available}, needs {needed}")]
    InsufficientBalance {
        account: AccountAddress,
        available: TokenAmount,
        needed: TokenAmount,
    },

    #[error("Insufficient allowance from {owner} to {spender}: approved {approved}, needs {needed}")]
    InsufficientAllowance {
        owner: AccountAddress,
        spender: AccountAddress,
        approved: TokenAmount,
        needed: TokenAmount,
    },

    #[error("Balance overflow for {0}")]
    Overflow(AccountAddress),

    #[error("{0} is not allowed to mint")]
    UnauthorizedMinter(AccountAddress),

    #[error("Cannot transfer to the same address {0}")]
    SelfTransfer(AccountAddress),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::UnauthorizedMinter(_) => ErrorKind::Authorization,
            _ => ErrorKind::Ledger,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
