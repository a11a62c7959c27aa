//! Entity store for challenges, entries and votes.
//!
//! Every mutation that touches a counter is one store primitive executed under
//! the owning challenge's lock: the caller passes a closure that re-checks its
//! preconditions against the locked record, and the store then applies the
//! write together with the counter change. Closures never mutate; they either
//! reject or describe the write, so a rejected call leaves no partial state.
//!
//! Lock order: hashtag index, challenge table, challenge shard, entry index.

use crate::snapshot::{ChallengeRecord, SnapshotError, StoreSnapshot};
use challenge_common::error::Resource;
use challenge_common::types::*;
use challenge_common::{ChallengeError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Fields of an entry about to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEntry {
    pub video_id: VideoId,
    pub status: EntryStatus,
    pub submitted_at: Timestamp,
}

/// What a cascading entry removal deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedEntry {
    pub entry: Entry,
    pub votes_removed: u32,
}

/// Re-checks admission against the locked challenge and the caller's existing entry.
pub type AdmitEntry<'a> = dyn FnMut(&Challenge, Option<&Entry>) -> Result<NewEntry> + 'a;
/// Re-checks a lifecycle edit and returns the challenge to store.
pub type EditChallenge<'a> = dyn FnMut(&Challenge) -> Result<Challenge> + 'a;
/// Re-checks whether the caller may act on an entry.
pub type GuardEntry<'a> = dyn FnMut(&Challenge, &Entry) -> Result<()> + 'a;
/// Picks the new status of an entry.
pub type DecideStatus<'a> = dyn FnMut(&Challenge, &Entry) -> Result<EntryStatus> + 'a;
/// Re-checks whether votes are admitted.
pub type AdmitVote<'a> = dyn FnMut(&Challenge) -> Result<()> + 'a;
/// Ranks the locked entries of a challenge.
pub type RankChallenge<'a> = dyn FnMut(&Challenge, &[Entry]) -> Result<Finalization> + 'a;

/// Durable state behind the engine.
///
/// Implementations must make each method atomic with respect to the other
/// methods touching the same challenge, and enforce the (challenge, user)
/// uniqueness of entries and votes, the hashtag uniqueness, and the entry cap
/// themselves. A backend that can lose a race it cannot resolve (deadlock,
/// serialization failure) reports [`ChallengeError::Contention`].
pub trait ChallengeStore: Send + Sync {
    fn insert_challenge(
        &self,
        fields: NewChallenge,
        creator_id: UserId,
        created_at: Timestamp,
    ) -> Result<Challenge>;

    fn challenge(&self, id: ChallengeId) -> Result<Challenge>;

    fn challenges(&self) -> Result<Vec<Challenge>>;

    /// Replace the editable fields and status of a challenge. Ids, counters,
    /// and the creator survive whatever `edit` returns.
    fn update_challenge(&self, id: ChallengeId, edit: &mut EditChallenge<'_>) -> Result<Challenge>;

    /// Insert an entry and increment `entries_count` in one step.
    fn insert_entry(
        &self,
        challenge_id: ChallengeId,
        user_id: UserId,
        admit: &mut AdmitEntry<'_>,
    ) -> Result<Entry>;

    fn entry(&self, id: EntryId) -> Result<Entry>;

    fn entries(&self, challenge_id: ChallengeId) -> Result<Vec<Entry>>;

    fn user_entry(&self, challenge_id: ChallengeId, user_id: UserId) -> Result<Option<Entry>>;

    /// Delete an entry with all its votes and decrement `entries_count`.
    fn remove_entry(&self, id: EntryId, guard: &mut GuardEntry<'_>) -> Result<RemovedEntry>;

    /// Change an entry status, keeping `entries_count` in step with rejections.
    fn set_entry_status(&self, id: EntryId, decide: &mut DecideStatus<'_>) -> Result<Entry>;

    /// Record, switch, or withdraw the single vote of `user_id` in a challenge.
    fn switch_vote(
        &self,
        challenge_id: ChallengeId,
        entry_id: EntryId,
        user_id: UserId,
        now: Timestamp,
        admit: &mut AdmitVote<'_>,
    ) -> Result<VoteOutcome>;

    fn user_vote(&self, challenge_id: ChallengeId, user_id: UserId) -> Result<Option<Vote>>;

    fn votes(&self, challenge_id: ChallengeId) -> Result<Vec<Vote>>;

    fn finalization(&self, challenge_id: ChallengeId) -> Result<Option<Finalization>>;

    /// Rank and complete a challenge. If it is already completed the stored
    /// finalization is returned and `rank` is not called.
    fn complete(&self, challenge_id: ChallengeId, rank: &mut RankChallenge<'_>)
        -> Result<Finalization>;
}

#[derive(Clone, Debug)]
struct Shard {
    challenge: Challenge,
    entries: BTreeMap<EntryId, Entry>,
    entry_by_user: BTreeMap<UserId, EntryId>,
    votes: BTreeMap<UserId, Vote>,
    finalization: Option<Finalization>,
}

impl Shard {
    fn new(challenge: Challenge) -> Self {
        Self {
            challenge,
            entries: BTreeMap::new(),
            entry_by_user: BTreeMap::new(),
            votes: BTreeMap::new(),
            finalization: None,
        }
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut Entry> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| ChallengeError::not_found(Resource::Entry, id))
    }
}

/// In-process store: one mutex per challenge, plus global indices for
/// hashtags and entry ids.
#[derive(Debug)]
pub struct MemoryStore {
    hashtags: Mutex<BTreeMap<String, ChallengeId>>,
    challenges: RwLock<BTreeMap<ChallengeId, Arc<Mutex<Shard>>>>,
    entry_index: RwLock<BTreeMap<EntryId, ChallengeId>>,
    next_challenge_id: AtomicU64,
    next_entry_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// Every primitive validates before it mutates, so data behind a poisoned lock
// is still consistent.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            hashtags: Mutex::new(BTreeMap::new()),
            challenges: RwLock::new(BTreeMap::new()),
            entry_index: RwLock::new(BTreeMap::new()),
            next_challenge_id: AtomicU64::new(1),
            next_entry_id: AtomicU64::new(1),
        }
    }

    fn shard(&self, id: ChallengeId) -> Result<Arc<Mutex<Shard>>> {
        read(&self.challenges)
            .get(&id)
            .cloned()
            .ok_or_else(|| ChallengeError::not_found(Resource::Challenge, id))
    }

    fn shard_of_entry(&self, id: EntryId) -> Result<Arc<Mutex<Shard>>> {
        let challenge_id = read(&self.entry_index)
            .get(&id)
            .copied()
            .ok_or_else(|| ChallengeError::not_found(Resource::Entry, id))?;
        self.shard(challenge_id)
    }

    /// Copy out the whole store. Each challenge is copied under its own lock,
    /// so every record is internally consistent.
    pub fn snapshot(&self) -> StoreSnapshot {
        let shards: Vec<Arc<Mutex<Shard>>> = read(&self.challenges).values().cloned().collect();
        let challenges = shards
            .iter()
            .map(|shard| {
                let shard = lock(shard);
                ChallengeRecord {
                    challenge: shard.challenge.clone(),
                    entries: shard.entries.values().cloned().collect(),
                    votes: shard.votes.values().cloned().collect(),
                    finalization: shard.finalization.clone(),
                }
            })
            .collect();
        StoreSnapshot {
            challenges,
            next_challenge_id: self.next_challenge_id.load(Ordering::SeqCst),
            next_entry_id: self.next_entry_id.load(Ordering::SeqCst),
        }
    }

    /// Rebuild a store from a snapshot, refusing one that breaks an invariant.
    pub fn restore(snapshot: StoreSnapshot) -> Result<Self, SnapshotError> {
        let violations = crate::audit::audit(&snapshot);
        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), "refusing inconsistent snapshot");
            return Err(SnapshotError::Inconsistent(violations));
        }

        let mut hashtags = BTreeMap::new();
        let mut challenges = BTreeMap::new();
        let mut entry_index = BTreeMap::new();
        for record in snapshot.challenges {
            let id = record.challenge.id;
            hashtags.insert(record.challenge.hashtag.clone(), id);
            let mut shard = Shard::new(record.challenge);
            for entry in record.entries {
                entry_index.insert(entry.id, id);
                shard.entry_by_user.insert(entry.user_id, entry.id);
                shard.entries.insert(entry.id, entry);
            }
            for vote in record.votes {
                shard.votes.insert(vote.user_id, vote);
            }
            shard.finalization = record.finalization;
            challenges.insert(id, Arc::new(Mutex::new(shard)));
        }

        Ok(Self {
            hashtags: Mutex::new(hashtags),
            challenges: RwLock::new(challenges),
            entry_index: RwLock::new(entry_index),
            next_challenge_id: AtomicU64::new(snapshot.next_challenge_id),
            next_entry_id: AtomicU64::new(snapshot.next_entry_id),
        })
    }
}

impl ChallengeStore for MemoryStore {
    fn insert_challenge(
        &self,
        fields: NewChallenge,
        creator_id: UserId,
        created_at: Timestamp,
    ) -> Result<Challenge> {
        let mut hashtags = lock(&self.hashtags);
        if hashtags.contains_key(&fields.hashtag) {
            return Err(ChallengeError::DuplicateHashtag {
                hashtag: fields.hashtag,
            });
        }

        let id = ChallengeId(self.next_challenge_id.fetch_add(1, Ordering::SeqCst));
        let challenge = Challenge {
            id,
            title: fields.title,
            description: fields.description,
            rules: fields.rules,
            category: fields.category,
            hashtag: fields.hashtag,
            prize: fields.prize,
            prize_amount: fields.prize_amount,
            status: ChallengeStatus::Draft,
            start_date: fields.start_date,
            end_date: fields.end_date,
            voting_end_date: fields.voting_end_date,
            min_duration: fields.min_duration,
            max_duration: fields.max_duration,
            max_entries: fields.max_entries,
            entries_count: 0,
            creator_id,
            winner_id: None,
            created_at,
        };

        write(&self.challenges).insert(id, Arc::new(Mutex::new(Shard::new(challenge.clone()))));
        hashtags.insert(challenge.hashtag.clone(), id);
        Ok(challenge)
    }

    fn challenge(&self, id: ChallengeId) -> Result<Challenge> {
        let shard = self.shard(id)?;
        let shard = lock(&shard);
        Ok(shard.challenge.clone())
    }

    fn challenges(&self) -> Result<Vec<Challenge>> {
        let shards: Vec<Arc<Mutex<Shard>>> = read(&self.challenges).values().cloned().collect();
        Ok(shards.iter().map(|s| lock(s).challenge.clone()).collect())
    }

    fn update_challenge(&self, id: ChallengeId, edit: &mut EditChallenge<'_>) -> Result<Challenge> {
        let mut hashtags = lock(&self.hashtags);
        let shard = self.shard(id)?;
        let mut shard = lock(&shard);

        let mut updated = edit(&shard.challenge)?;
        let current = &shard.challenge;
        if updated.hashtag != current.hashtag {
            if hashtags.contains_key(&updated.hashtag) {
                return Err(ChallengeError::DuplicateHashtag {
                    hashtag: updated.hashtag,
                });
            }
            hashtags.remove(&current.hashtag);
            hashtags.insert(updated.hashtag.clone(), id);
        }

        updated.id = current.id;
        updated.entries_count = current.entries_count;
        updated.creator_id = current.creator_id;
        updated.created_at = current.created_at;
        updated.winner_id = current.winner_id;
        shard.challenge = updated.clone();
        Ok(updated)
    }

    fn insert_entry(
        &self,
        challenge_id: ChallengeId,
        user_id: UserId,
        admit: &mut AdmitEntry<'_>,
    ) -> Result<Entry> {
        let shard = self.shard(challenge_id)?;
        let mut shard = lock(&shard);

        let existing = shard
            .entry_by_user
            .get(&user_id)
            .and_then(|id| shard.entries.get(id));
        let new = admit(&shard.challenge, existing)?;

        // Constraints hold regardless of what the admission closure checked.
        if shard.entry_by_user.contains_key(&user_id) {
            return Err(ChallengeError::DuplicateEntry {
                challenge_id,
                user_id,
            });
        }
        let counted = new.status.is_counted();
        if counted && !shard.challenge.has_capacity() {
            return Err(ChallengeError::CapacityReached {
                challenge_id,
                max_entries: shard.challenge.max_entries.unwrap_or_default(),
            });
        }

        let id = EntryId(self.next_entry_id.fetch_add(1, Ordering::SeqCst));
        let entry = Entry {
            id,
            challenge_id,
            video_id: new.video_id,
            user_id,
            status: new.status,
            votes_count: 0,
            rank: None,
            submitted_at: new.submitted_at,
        };
        shard.entries.insert(id, entry.clone());
        shard.entry_by_user.insert(user_id, id);
        if counted {
            shard.challenge.entries_count += 1;
        }
        write(&self.entry_index).insert(id, challenge_id);
        Ok(entry)
    }

    fn entry(&self, id: EntryId) -> Result<Entry> {
        let shard = self.shard_of_entry(id)?;
        let shard = lock(&shard);
        shard
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| ChallengeError::not_found(Resource::Entry, id))
    }

    fn entries(&self, challenge_id: ChallengeId) -> Result<Vec<Entry>> {
        let shard = self.shard(challenge_id)?;
        let shard = lock(&shard);
        Ok(shard.entries.values().cloned().collect())
    }

    fn user_entry(&self, challenge_id: ChallengeId, user_id: UserId) -> Result<Option<Entry>> {
        let shard = self.shard(challenge_id)?;
        let shard = lock(&shard);
        Ok(shard
            .entry_by_user
            .get(&user_id)
            .and_then(|id| shard.entries.get(id))
            .cloned())
    }

    fn remove_entry(&self, id: EntryId, guard: &mut GuardEntry<'_>) -> Result<RemovedEntry> {
        let shard = self.shard_of_entry(id)?;
        let mut shard = lock(&shard);

        let entry = shard
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| ChallengeError::not_found(Resource::Entry, id))?;
        guard(&shard.challenge, &entry)?;

        let before = shard.votes.len();
        shard.votes.retain(|_, vote| vote.entry_id != id);
        let votes_removed = (before - shard.votes.len()) as u32;

        shard.entries.remove(&id);
        shard.entry_by_user.remove(&entry.user_id);
        if entry.status.is_counted() {
            shard.challenge.entries_count = shard.challenge.entries_count.saturating_sub(1);
        }
        write(&self.entry_index).remove(&id);

        Ok(RemovedEntry {
            entry,
            votes_removed,
        })
    }

    fn set_entry_status(&self, id: EntryId, decide: &mut DecideStatus<'_>) -> Result<Entry> {
        let shard = self.shard_of_entry(id)?;
        let mut shard = lock(&shard);

        let current = shard
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| ChallengeError::not_found(Resource::Entry, id))?;
        let status = decide(&shard.challenge, &current)?;

        let was_counted = current.status.is_counted();
        let counted = status.is_counted();
        if counted && !was_counted && !shard.challenge.has_capacity() {
            return Err(ChallengeError::CapacityReached {
                challenge_id: shard.challenge.id,
                max_entries: shard.challenge.max_entries.unwrap_or_default(),
            });
        }

        let challenge = &mut shard.challenge;
        match (was_counted, counted) {
            (true, false) => challenge.entries_count = challenge.entries_count.saturating_sub(1),
            (false, true) => challenge.entries_count += 1,
            _ => {}
        }
        let entry = shard.entry_mut(id)?;
        entry.status = status;
        Ok(entry.clone())
    }

    fn switch_vote(
        &self,
        challenge_id: ChallengeId,
        entry_id: EntryId,
        user_id: UserId,
        now: Timestamp,
        admit: &mut AdmitVote<'_>,
    ) -> Result<VoteOutcome> {
        let shard = self.shard(challenge_id)?;
        let mut shard = lock(&shard);

        admit(&shard.challenge)?;
        let target_eligible = shard
            .entries
            .get(&entry_id)
            .map(|e| e.status.is_counted())
            .ok_or_else(|| ChallengeError::not_found(Resource::Entry, entry_id))?;

        let previous = shard.votes.get(&user_id).map(|v| v.entry_id);
        match previous {
            Some(current) if current == entry_id => {
                shard.votes.remove(&user_id);
                let entry = shard.entry_mut(entry_id)?;
                entry.votes_count = entry.votes_count.saturating_sub(1);
                Ok(VoteOutcome::Removed)
            }
            _ if !target_eligible => Err(ChallengeError::EntryNotEligible { entry_id }),
            Some(from) => {
                if let Some(old) = shard.entries.get_mut(&from) {
                    old.votes_count = old.votes_count.saturating_sub(1);
                }
                shard.entry_mut(entry_id)?.votes_count += 1;
                if let Some(vote) = shard.votes.get_mut(&user_id) {
                    vote.entry_id = entry_id;
                    vote.created_at = now;
                }
                Ok(VoteOutcome::Switched { from })
            }
            None => {
                shard.entry_mut(entry_id)?.votes_count += 1;
                shard.votes.insert(
                    user_id,
                    Vote {
                        challenge_id,
                        entry_id,
                        user_id,
                        created_at: now,
                    },
                );
                Ok(VoteOutcome::Recorded)
            }
        }
    }

    fn user_vote(&self, challenge_id: ChallengeId, user_id: UserId) -> Result<Option<Vote>> {
        let shard = self.shard(challenge_id)?;
        let shard = lock(&shard);
        Ok(shard.votes.get(&user_id).cloned())
    }

    fn votes(&self, challenge_id: ChallengeId) -> Result<Vec<Vote>> {
        let shard = self.shard(challenge_id)?;
        let shard = lock(&shard);
        Ok(shard.votes.values().cloned().collect())
    }

    fn finalization(&self, challenge_id: ChallengeId) -> Result<Option<Finalization>> {
        let shard = self.shard(challenge_id)?;
        let shard = lock(&shard);
        Ok(shard.finalization.clone())
    }

    fn complete(
        &self,
        challenge_id: ChallengeId,
        rank: &mut RankChallenge<'_>,
    ) -> Result<Finalization> {
        let shard = self.shard(challenge_id)?;
        let mut shard = lock(&shard);

        if let Some(done) = &shard.finalization {
            return Ok(done.clone());
        }

        let entries: Vec<Entry> = shard.entries.values().cloned().collect();
        let finalization = rank(&shard.challenge, &entries)?;
        if let Some(unknown) = finalization
            .standings
            .iter()
            .find(|s| !shard.entries.contains_key(&s.entry_id))
        {
            return Err(ChallengeError::not_found(Resource::Entry, unknown.entry_id));
        }

        for standing in &finalization.standings {
            let entry = shard.entry_mut(standing.entry_id)?;
            entry.rank = Some(standing.rank);
            entry.status = standing.status;
        }
        shard.challenge.status = ChallengeStatus::Completed;
        shard.challenge.winner_id = finalization.winner_id;
        shard.finalization = Some(finalization.clone());
        Ok(finalization)
    }
}
