//! Entry admission: one eligible video per user per challenge.

use crate::events::ChallengeEvent;
use crate::service::{invalid_phase, ChallengeService};
use crate::store::{ChallengeStore, NewEntry, RemovedEntry};
use challenge_common::error::{Operation, Resource};
use challenge_common::types::*;
use challenge_common::{resolve_phase, ChallengeError, Result};

impl<S: ChallengeStore> ChallengeService<S> {
    /// Submit `video_id` as the entry of `user_id`.
    ///
    /// Checks run in a fixed order so the first failing one is reported:
    /// challenge, phase, capacity, duplicate, video, ownership, duration.
    /// Everything after the catalog lookup runs under the challenge lock, so
    /// concurrent submissions cannot overshoot `max_entries`.
    pub fn submit_entry(
        &self,
        challenge_id: ChallengeId,
        user_id: UserId,
        video_id: VideoId,
    ) -> Result<Entry> {
        let video = self.catalog.video(video_id);

        let entry = self.with_retry("submit_entry", || {
            let now = self.now();
            self.store
                .insert_entry(challenge_id, user_id, &mut |challenge, existing| {
                    let phase = resolve_phase(challenge, now);
                    if !phase.accepts_entries() {
                        return Err(invalid_phase(Operation::SubmitEntry, phase));
                    }
                    if !challenge.has_capacity() {
                        return Err(ChallengeError::CapacityReached {
                            challenge_id,
                            max_entries: challenge.max_entries.unwrap_or_default(),
                        });
                    }
                    if existing.is_some() {
                        return Err(ChallengeError::DuplicateEntry {
                            challenge_id,
                            user_id,
                        });
                    }
                    let video = video
                        .as_ref()
                        .ok_or_else(|| ChallengeError::not_found(Resource::Video, video_id))?;
                    if video.owner != user_id {
                        return Err(ChallengeError::NotOwner { video_id, user_id });
                    }
                    if let Some(duration) = video.duration_secs {
                        if !challenge.duration_allowed(duration) {
                            return Err(ChallengeError::DurationOutOfRange {
                                duration,
                                min: challenge.min_duration,
                                max: challenge.max_duration,
                            });
                        }
                    }
                    Ok(NewEntry {
                        video_id,
                        status: EntryStatus::Approved,
                        submitted_at: now,
                    })
                })
        })?;

        tracing::info!(
            challenge_id = %challenge_id,
            entry_id = %entry.id,
            user_id = %user_id,
            "entry submitted"
        );
        self.publish(ChallengeEvent::EntrySubmitted {
            challenge_id,
            entry_id: entry.id,
            user_id,
            video_id,
            submitted_at: entry.submitted_at,
        });
        Ok(entry)
    }

    /// Delete an entry together with every vote on it.
    ///
    /// Allowed for the entry's owner and for moderators. Once the challenge is
    /// completed or cancelled the entry is kept and `InvalidPhase` is returned.
    pub fn remove_entry(&self, entry_id: EntryId, caller: Caller) -> Result<RemovedEntry> {
        let now = self.now();
        let removed = self.with_retry("remove_entry", || {
            self.store.remove_entry(entry_id, &mut |challenge, entry| {
                if entry.user_id != caller.id && !caller.role.can_moderate() {
                    return Err(ChallengeError::Forbidden {
                        caller: caller.id,
                        action: "remove this entry",
                    });
                }
                let phase = resolve_phase(challenge, now);
                if phase.is_terminal() {
                    return Err(invalid_phase(Operation::RemoveEntry, phase));
                }
                Ok(())
            })
        })?;

        tracing::info!(
            challenge_id = %removed.entry.challenge_id,
            entry_id = %entry_id,
            votes_removed = removed.votes_removed,
            removed_by = %caller.id,
            "entry removed"
        );
        self.publish(ChallengeEvent::EntryRemoved {
            challenge_id: removed.entry.challenge_id,
            entry_id,
            user_id: removed.entry.user_id,
            removed_by: caller.id,
            votes_removed: removed.votes_removed,
        });
        Ok(removed)
    }

    /// Moderation: move an entry between `Pending`, `Approved` and `Rejected`.
    ///
    /// Rejected entries stop counting towards `entries_count` and leave the
    /// leaderboard; their existing votes are kept.
    pub fn moderate_entry(
        &self,
        entry_id: EntryId,
        caller: Caller,
        status: EntryStatus,
    ) -> Result<Entry> {
        if !caller.role.can_moderate() {
            return Err(ChallengeError::Forbidden {
                caller: caller.id,
                action: "moderate entries",
            });
        }
        if matches!(status, EntryStatus::Winner | EntryStatus::RunnerUp) {
            return Err(ChallengeError::validation(
                "status",
                "winner and runner-up are assigned at finalization",
            ));
        }

        let now = self.now();
        let entry = self.with_retry("moderate_entry", || {
            self.store.set_entry_status(entry_id, &mut |challenge, _entry| {
                let phase = resolve_phase(challenge, now);
                if phase.is_terminal() {
                    return Err(invalid_phase(Operation::Moderate, phase));
                }
                Ok(status)
            })
        })?;

        tracing::info!(entry_id = %entry_id, status = ?status, moderator = %caller.id, "entry moderated");
        Ok(entry)
    }

    pub fn entry(&self, entry_id: EntryId) -> Result<Entry> {
        self.store.entry(entry_id)
    }

    pub fn entries(&self, challenge_id: ChallengeId) -> Result<Vec<Entry>> {
        self.store.entries(challenge_id)
    }

    pub fn user_entry(&self, challenge_id: ChallengeId, user_id: UserId) -> Result<Option<Entry>> {
        self.store.user_entry(challenge_id, user_id)
    }
}
