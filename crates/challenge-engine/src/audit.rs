use crate::snapshot::StoreSnapshot;
use challenge_common::types::*;
use std::collections::{BTreeMap, HashSet};

/// A broken store invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("challenge {0} ends before it starts")]
    EndBeforeStart(ChallengeId),
    #[error("challenge {0} voting ends before entries close")]
    VotingEndBeforeEnd(ChallengeId),
    #[error("challenge {0} reuses hashtag #{1}")]
    DuplicateHashtag(ChallengeId, String),
    #[error("challenge id {0} appears twice")]
    DuplicateChallengeId(ChallengeId),
    #[error("challenge {challenge} caches {cached} entries but holds {actual}")]
    EntriesCount {
        challenge: ChallengeId,
        cached: u32,
        actual: u32,
    },
    #[error("entry {entry} caches {cached} votes but holds {actual}")]
    VotesCount {
        entry: EntryId,
        cached: u32,
        actual: u32,
    },
    #[error("entry id {0} appears twice")]
    DuplicateEntryId(EntryId),
    #[error("entry {0} is filed under another challenge")]
    MisfiledEntry(EntryId),
    #[error("user {1} holds several entries in challenge {0}")]
    DuplicateEntry(ChallengeId, UserId),
    #[error("user {1} holds several votes in challenge {0}")]
    DuplicateVote(ChallengeId, UserId),
    #[error("vote of user {1} in challenge {0} points at a missing entry")]
    DanglingVote(ChallengeId, UserId),
    #[error("challenge {0} winner disagrees with its finalization")]
    WinnerMismatch(ChallengeId),
    #[error("id counter {0} is behind allocated ids")]
    StaleCounter(&'static str),
}

/// Check every store invariant over a snapshot. An empty result means consistent.
pub fn audit(snapshot: &StoreSnapshot) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut hashtags = HashSet::new();
    let mut challenge_ids = HashSet::new();
    let mut entry_ids = HashSet::new();
    let mut max_challenge = 0;
    let mut max_entry = 0;

    for record in &snapshot.challenges {
        let c = &record.challenge;
        max_challenge = max_challenge.max(c.id.0);

        if !challenge_ids.insert(c.id) {
            violations.push(Violation::DuplicateChallengeId(c.id));
        }
        if c.end_date <= c.start_date {
            violations.push(Violation::EndBeforeStart(c.id));
        }
        if c.voting_end_date.is_some_and(|v| v <= c.end_date) {
            violations.push(Violation::VotingEndBeforeEnd(c.id));
        }
        if !hashtags.insert(c.hashtag.as_str()) {
            violations.push(Violation::DuplicateHashtag(c.id, c.hashtag.clone()));
        }

        let mut users = HashSet::new();
        let mut counted = 0u32;
        let mut votes_per_entry: BTreeMap<EntryId, u32> = BTreeMap::new();
        for entry in &record.entries {
            max_entry = max_entry.max(entry.id.0);
            if !entry_ids.insert(entry.id) {
                violations.push(Violation::DuplicateEntryId(entry.id));
            }
            if entry.challenge_id != c.id {
                violations.push(Violation::MisfiledEntry(entry.id));
            }
            if !users.insert(entry.user_id) {
                violations.push(Violation::DuplicateEntry(c.id, entry.user_id));
            }
            if entry.status.is_counted() {
                counted += 1;
            }
            votes_per_entry.insert(entry.id, 0);
        }
        if counted != c.entries_count {
            violations.push(Violation::EntriesCount {
                challenge: c.id,
                cached: c.entries_count,
                actual: counted,
            });
        }

        let mut voters = HashSet::new();
        for vote in &record.votes {
            if !voters.insert(vote.user_id) {
                violations.push(Violation::DuplicateVote(c.id, vote.user_id));
            }
            match votes_per_entry.get_mut(&vote.entry_id) {
                Some(n) if vote.challenge_id == c.id => *n += 1,
                _ => violations.push(Violation::DanglingVote(c.id, vote.user_id)),
            }
        }
        for entry in &record.entries {
            let actual = votes_per_entry.get(&entry.id).copied().unwrap_or_default();
            if actual != entry.votes_count {
                violations.push(Violation::VotesCount {
                    entry: entry.id,
                    cached: entry.votes_count,
                    actual,
                });
            }
        }

        if let Some(done) = &record.finalization {
            if done.winner_id != c.winner_id || c.status != ChallengeStatus::Completed {
                violations.push(Violation::WinnerMismatch(c.id));
            }
        }
    }

    if snapshot.next_challenge_id <= max_challenge {
        violations.push(Violation::StaleCounter("challenge"));
    }
    if snapshot.next_entry_id <= max_entry {
        violations.push(Violation::StaleCounter("entry"));
    }

    violations
}
