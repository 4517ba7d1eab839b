pub mod error;
pub mod ledger;
pub mod storage;
pub mod token;

pub use error::{LedgerError, Result};
pub use ledger::TokenLedger;
pub use storage::{LedgerStorage, MemoryStorage, TransferRecord};
pub use token::Token;
