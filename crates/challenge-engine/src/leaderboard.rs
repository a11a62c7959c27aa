//! Leaderboard projection and final ranking.

use crate::events::ChallengeEvent;
use crate::service::{invalid_phase, ChallengeService};
use crate::store::ChallengeStore;
use challenge_common::error::Operation;
use challenge_common::ranking::{assign_standings, rank_entries};
use challenge_common::types::*;
use challenge_common::{resolve_phase, Phase, Result};

impl<S: ChallengeStore> ChallengeService<S> {
    /// Entries of a challenge in leaderboard order, rejected ones left out.
    ///
    /// `limit` falls back to the configured default and is capped by the
    /// configured maximum.
    pub fn leaderboard(&self, challenge_id: ChallengeId, limit: Option<u32>) -> Result<Vec<Entry>> {
        let limit = self.config.leaderboard_limit(limit);
        let mut ranked = rank_entries(self.store.entries(challenge_id)?);
        ranked.truncate(limit);
        tracing::debug!(challenge_id = %challenge_id, len = ranked.len(), "leaderboard");
        Ok(ranked)
    }

    /// Rank every entry, mark winner and runners-up, and complete the challenge.
    ///
    /// Runs once per challenge: if it already completed, the stored result is
    /// returned as is, even if votes would order differently now. The call that
    /// does the ranking publishes `ChallengeFinalized`; later calls publish
    /// nothing. Callers are authorized by [`Self::finalize`].
    pub(crate) fn rank_and_close(&self, challenge_id: ChallengeId) -> Result<Finalization> {
        let runner_up_count = self.config.runner_up_count;
        let mut ranked_here = false;
        let done = self.with_retry("rank_and_close", || {
            ranked_here = false;
            let now = self.now();
            self.store.complete(challenge_id, &mut |challenge, entries| {
                let phase = resolve_phase(challenge, now);
                if !matches!(phase, Phase::Voting | Phase::Closed) {
                    return Err(invalid_phase(Operation::Finalize, phase));
                }

                ranked_here = true;
                let ranked = rank_entries(entries.iter().cloned());
                let standings = assign_standings(&ranked, runner_up_count);
                let winner = ranked.first();
                Ok(Finalization {
                    challenge_id,
                    standings,
                    winner_id: winner.map(|e| e.user_id),
                    winning_entry_id: winner.map(|e| e.id),
                    finalized_at: now,
                })
            })
        })?;

        if ranked_here {
            tracing::info!(
                challenge_id = %challenge_id,
                winner = ?done.winner_id,
                ranked = done.standings.len(),
                "challenge finalized"
            );
            self.publish(ChallengeEvent::ChallengeFinalized {
                challenge_id,
                winner_id: done.winner_id,
                winning_entry_id: done.winning_entry_id,
                ranked_entries: done.standings.len() as u32,
            });
        }
        Ok(done)
    }
}
