use crate::types::{Challenge, ChallengeStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// Effective lifecycle stage of a challenge, computed from its stored status
/// and timestamps at a given instant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Not open yet: never opened, or before `start_date`.
    Draft,
    AcceptingEntries,
    Voting,
    /// Past every window, waiting for finalization.
    Closed,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn accepts_entries(self) -> bool {
        self == Phase::AcceptingEntries
    }

    /// Whether votes are admitted. `entry_window_votes` enables the legacy rule
    /// that also admits votes while entries are still being accepted.
    pub fn accepts_votes(self, entry_window_votes: bool) -> bool {
        match self {
            Phase::Voting => true,
            Phase::AcceptingEntries => entry_window_votes,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled)
    }
}

/// Resolve the effective phase of `challenge` at `now`.
///
/// Explicit terminal status always wins over time. A challenge left `Active`
/// past its `end_date` flows into voting on its own while `now` is within
/// `voting_end_date`, without anyone storing the `Voting` status.
pub fn resolve_phase(challenge: &Challenge, now: Timestamp) -> Phase {
    match challenge.status {
        ChallengeStatus::Cancelled => return Phase::Cancelled,
        ChallengeStatus::Completed => return Phase::Completed,
        ChallengeStatus::Draft => return Phase::Draft,
        ChallengeStatus::Active | ChallengeStatus::Voting => {}
    }

    if now < challenge.start_date {
        return Phase::Draft;
    }

    let active = challenge.status == ChallengeStatus::Active;
    if active && now <= challenge.end_date {
        return Phase::AcceptingEntries;
    }

    let in_grace = active
        && now > challenge.end_date
        && challenge.voting_end_date.is_some_and(|end| now <= end);
    if challenge.status == ChallengeStatus::Voting || in_grace {
        return Phase::Voting;
    }

    Phase::Closed
}
