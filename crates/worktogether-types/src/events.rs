//! Event bus for engine state changes
//!
//! Components emit a [`WorkTogetherEvent`] after every committed transition.
//! Consumers subscribe and poll; nothing is pushed back into the engine.

use crate::{AccountAddress, TokenAmount};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered per subscriber before the oldest are dropped
const EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkTogetherEvent {
    IssueRegistered {
        issue_id: u64,
        bounty: TokenAmount,
    },
    IssueClaimed {
        issue_id: u64,
        claimant: AccountAddress,
        note: String,
    },
    IssueResolved {
        issue_id: u64,
        resolver: AccountAddress,
    },
    BountyReleased {
        issue_id: u64,
        resolver: AccountAddress,
        amount: TokenAmount,
    },
    PoolCreated {
        pool_id: u64,
        address: AccountAddress,
    },
    Entered {
        pool: AccountAddress,
        account: AccountAddress,
        weight: TokenAmount,
    },
    SeedRequested {
        pool: AccountAddress,
        request_id: u32,
        target_block: u64,
    },
    RewardDistributed {
        pool: AccountAddress,
        winner: AccountAddress,
        amount: TokenAmount,
    },
    FeesDistributed {
        router: AccountAddress,
        from_token: AccountAddress,
        amount_in: TokenAmount,
        reward_out: TokenAmount,
    },
}

impl WorkTogetherEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkTogetherEvent::IssueRegistered { .. } => "IssueRegistered",
            WorkTogetherEvent::IssueClaimed { .. } => "IssueClaimed",
            WorkTogetherEvent::IssueResolved { .. } => "IssueResolved",
            WorkTogetherEvent::BountyReleased { .. } => "BountyReleased",
            WorkTogetherEvent::PoolCreated { .. } => "PoolCreated",
            WorkTogetherEvent::Entered { .. } => "Entered",
            WorkTogetherEvent::SeedRequested { .. } => "SeedRequested",
            WorkTogetherEvent::RewardDistributed { .. } => "RewardDistributed",
            WorkTogetherEvent::FeesDistributed { .. } => "FeesDistributed",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkTogetherEvent>,
    emitted: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sender,
            emitted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkTogetherEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers. With nobody listening the event is
    /// dropped, which is expected.
    pub fn emit(&self, event: WorkTogetherEvent) {
        let event_type = event.event_type();
        self.emitted.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(subscribers) => {
                debug!(event_type, subscribers, "Event emitted");
            }
            Err(_) => {
                debug!(event_type, "Event emitted but no subscribers listening");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn total_events_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
