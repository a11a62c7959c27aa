use challenge_common::types::{ChallengeId, EntryId, Timestamp, UserId, VideoId, VoteOutcome};
use serde::{Deserialize, Serialize};
use std::sync::{mpsc, Mutex, PoisonError};

/// Domain events for the notification collaborator. Published after the
/// corresponding write has committed.
///
/// A write with an event publishes it exactly once. Publication happens
/// outside the challenge lock, so events from concurrent calls on the same
/// challenge can arrive in a different order than their writes committed.
/// Subscribers that need the latest state read it back from the service
/// rather than replaying events in arrival order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChallengeEvent {
    ChallengeCreated {
        challenge_id: ChallengeId,
        creator_id: UserId,
        hashtag: String,
    },
    EntrySubmitted {
        challenge_id: ChallengeId,
        entry_id: EntryId,
        user_id: UserId,
        video_id: VideoId,
        submitted_at: Timestamp,
    },
    EntryRemoved {
        challenge_id: ChallengeId,
        entry_id: EntryId,
        user_id: UserId,
        removed_by: UserId,
        votes_removed: u32,
    },
    VoteCast {
        challenge_id: ChallengeId,
        entry_id: EntryId,
        user_id: UserId,
        outcome: VoteOutcome,
    },
    ChallengeFinalized {
        challenge_id: ChallengeId,
        winner_id: Option<UserId>,
        winning_entry_id: Option<EntryId>,
        ranked_entries: u32,
    },
    ChallengeCancelled {
        challenge_id: ChallengeId,
        cancelled_by: UserId,
    },
}

impl ChallengeEvent {
    pub fn challenge_id(&self) -> ChallengeId {
        match self {
            ChallengeEvent::ChallengeCreated { challenge_id, .. }
            | ChallengeEvent::EntrySubmitted { challenge_id, .. }
            | ChallengeEvent::EntryRemoved { challenge_id, .. }
            | ChallengeEvent::VoteCast { challenge_id, .. }
            | ChallengeEvent::ChallengeFinalized { challenge_id, .. }
            | ChallengeEvent::ChallengeCancelled { challenge_id, .. } => *challenge_id,
        }
    }
}

/// Subscriber side of the event stream.
///
/// Calls come from whichever thread ran the operation, with no lock held.
/// Arrival order is only guaranteed for operations issued one after another
/// by the same caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ChallengeEvent);
}

/// Drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: ChallengeEvent) {}
}

/// Keeps every event in memory, in publication order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChallengeEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChallengeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<ChallengeEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: ChallengeEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl EventSink for mpsc::Sender<ChallengeEvent> {
    fn publish(&self, event: ChallengeEvent) {
        if self.send(event).is_err() {
            tracing::debug!("event receiver dropped, discarding event");
        }
    }
}
