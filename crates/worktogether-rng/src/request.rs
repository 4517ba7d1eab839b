use serde::{Deserialize, Serialize};
use worktogether_types::AccountAddress;

/// Sequential request handle, starting at 1.
pub type RequestId = u32;

/// Handle returned to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessTicket {
    pub request_id: RequestId,
    pub target_block: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Requested { target_block: u64 },
    Revealed { target_block: u64, seed: [u8; 32] },
}

impl RequestState {
    pub fn target_block(&self) -> u64 {
        match *self {
            RequestState::Requested { target_block } => target_block,
            RequestState::Revealed { target_block, .. } => target_block,
        }
    }

    pub fn seed(&self) -> Option<[u8; 32]> {
        match *self {
            RequestState::Requested { .. } => None,
            RequestState::Revealed { seed, .. } => Some(seed),
        }
    }
}

/// Persisted request record. Moves from `Requested` to `Revealed` once and
/// never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub id: RequestId,
    pub requester: AccountAddress,
    pub requested_at_block: u64,
    pub state: RequestState,
}

impl RandomnessRequest {
    pub fn new(
        id: RequestId,
        requester: AccountAddress,
        requested_at_block: u64,
        target_block: u64,
    ) -> Self {
        Self {
            id,
            requester,
            requested_at_block,
            state: RequestState::Requested { target_block },
        }
    }

    pub fn ticket(&self) -> RandomnessTicket {
        RandomnessTicket {
            request_id: self.id,
            target_block: self.state.target_block(),
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self.state, RequestState::Revealed { .. })
    }
}
