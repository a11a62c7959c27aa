//! The single switchable vote per user per challenge.

use crate::events::ChallengeEvent;
use crate::service::{invalid_phase, ChallengeService};
use crate::store::ChallengeStore;
use challenge_common::error::Operation;
use challenge_common::types::*;
use challenge_common::{resolve_phase, Result};

impl<S: ChallengeStore> ChallengeService<S> {
    /// Vote for `entry_id`, move an existing vote to it, or withdraw the vote
    /// when it already points at it.
    ///
    /// This is the only way votes are created, moved or deleted outside of
    /// entry removal, which keeps every `votes_count` equal to its vote rows.
    pub fn cast_or_switch_vote(
        &self,
        challenge_id: ChallengeId,
        entry_id: EntryId,
        user_id: UserId,
    ) -> Result<VoteOutcome> {
        let entry_window_votes = self.config.votes_during_entry_window;
        let outcome = self.with_retry("cast_or_switch_vote", || {
            let now = self.now();
            self.store
                .switch_vote(challenge_id, entry_id, user_id, now, &mut |challenge| {
                    let phase = resolve_phase(challenge, now);
                    if phase.accepts_votes(entry_window_votes) {
                        Ok(())
                    } else {
                        Err(invalid_phase(Operation::Vote, phase))
                    }
                })
        })?;

        tracing::debug!(
            challenge_id = %challenge_id,
            entry_id = %entry_id,
            user_id = %user_id,
            outcome = ?outcome,
            "vote applied"
        );
        self.publish(ChallengeEvent::VoteCast {
            challenge_id,
            entry_id,
            user_id,
            outcome,
        });
        Ok(outcome)
    }

    /// The caller's current vote in a challenge, if any.
    pub fn user_vote(&self, challenge_id: ChallengeId, user_id: UserId) -> Result<Option<Vote>> {
        self.store.user_vote(challenge_id, user_id)
    }
}
