use crate::PoolId;
use thiserror::Error;
use worktogether_ledger::LedgerError;
use worktogether_rng::RngError;
use worktogether_sortition::SortitionError;
use worktogether_types::{AccountAddress, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool {0} already ended")]
    PoolEnded(PoolId),

    #[error("Entry window still open: now {now}, ends at {ends_at}")]
    TooEarly { now: i64, ends_at: i64 },

    #[error("Pool {0} already requested a random number")]
    AlreadyRequested(PoolId),

    #[error("Seed for pool {0} is not available yet")]
    SeedNotReady(PoolId),

    #[error("Pool {0} already distributed its reward")]
    AlreadyDistributed(PoolId),

    #[error("Pool {0} has no entrants")]
    NoEntrants(PoolId),

    #[error("Entry amount must be positive")]
    ZeroAmount,

    #[error("Only an admin may do this, {0} is not one")]
    OnlyAdmin(AccountAddress),

    #[error("Pool duration must be positive, got {0}")]
    InvalidDuration(i64),

    #[error("Sortition error: {0}")]
    Sortition(#[from] SortitionError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Randomness error: {0}")]
    Randomness(#[from] RngError),
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::PoolEnded(_)
            | PoolError::TooEarly { .. }
            | PoolError::AlreadyRequested(_)
            | PoolError::SeedNotReady(_)
            | PoolError::AlreadyDistributed(_)
            | PoolError::NoEntrants(_) => ErrorKind::State,
            PoolError::ZeroAmount | PoolError::InvalidDuration(_) => ErrorKind::Validation,
            PoolError::OnlyAdmin(_) => ErrorKind::Authorization,
            PoolError::Sortition(e) => e.kind(),
            PoolError::Ledger(e) => e.kind(),
            PoolError::Randomness(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
