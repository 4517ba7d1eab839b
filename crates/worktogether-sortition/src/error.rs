use thiserror::Error;
use worktogether_types::ErrorKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortitionError {
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Key already present: {0}")]
    DuplicateKey(String),

    #[error("Cannot draw from an empty tree")]
    EmptyTree,

    #[error("Draw value {value} out of range for total weight {total}")]
    DrawOutOfRange { value: u64, total: u64 },

    #[error("Total weight would overflow")]
    WeightOverflow,
}

impl SortitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SortitionError::EmptyTree => ErrorKind::State,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, SortitionError>;
