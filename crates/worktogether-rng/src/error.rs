use crate::RequestId;
use thiserror::Error;
use worktogether_types::{AccountAddress, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RngError {
    #[error("Unknown randomness request {0}")]
    UnknownRequest(RequestId),

    #[error("Request {request_id} not ready: target block {target_block}, current block {current_block}")]
    NotReady {
        request_id: RequestId,
        target_block: u64,
        current_block: u64,
    },

    #[error("Request {request_id} is stale: hash of block {target_block} is no longer available")]
    StaleBlock {
        request_id: RequestId,
        target_block: u64,
    },

    #[error("{requester} already has pending request {request_id}")]
    RequestPending {
        requester: AccountAddress,
        request_id: RequestId,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RngError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RngError::StaleBlock { .. } => ErrorKind::TransientUnavailable,
            RngError::NotReady { .. } | RngError::RequestPending { .. } => ErrorKind::State,
            RngError::UnknownRequest(_) | RngError::InvalidConfiguration(_) => {
                ErrorKind::Validation
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RngError>;
