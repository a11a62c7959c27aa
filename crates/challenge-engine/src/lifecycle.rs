//! Administrative state machine: Draft -> Active -> Voting -> Completed, with
//! Cancelled reachable from every non-terminal status.

use crate::config::EngineConfig;
use crate::events::ChallengeEvent;
use crate::service::{invalid_phase, require_owner_or_admin, ChallengeService};
use crate::store::ChallengeStore;
use challenge_common::error::Operation;
use challenge_common::normalization::{char_len, hashtag_problem, normalize_hashtag, normalize_text};
use challenge_common::types::*;
use challenge_common::{resolve_phase, ChallengeError, Phase, Result};
use serde::{Deserialize, Serialize};

/// A challenge together with its phase at the time of the query.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeView {
    pub challenge: Challenge,
    pub phase: Phase,
}

/// Validate organizer input and return it in stored form.
pub fn validate_fields(fields: &NewChallenge, config: &EngineConfig) -> Result<NewChallenge> {
    let mut clean = fields.clone();

    clean.title = normalize_text(&fields.title);
    if clean.title.is_empty() {
        return Err(ChallengeError::validation("title", "must not be empty"));
    }
    if char_len(&clean.title) > config.max_title_chars {
        return Err(ChallengeError::validation("title", "is too long"));
    }

    clean.description = fields.description.trim().to_string();
    if clean.description.is_empty() {
        return Err(ChallengeError::validation("description", "must not be empty"));
    }
    if char_len(&clean.description) > config.max_description_chars {
        return Err(ChallengeError::validation("description", "is too long"));
    }

    clean.rules = fields.rules.trim().to_string();
    if char_len(&clean.rules) > config.max_rules_chars {
        return Err(ChallengeError::validation("rules", "is too long"));
    }

    clean.category = fields
        .category
        .as_deref()
        .map(normalize_text)
        .filter(|c| !c.is_empty());
    clean.prize = fields
        .prize
        .as_deref()
        .map(normalize_text)
        .filter(|p| !p.is_empty());

    clean.hashtag = normalize_hashtag(&fields.hashtag);
    if let Some(problem) = hashtag_problem(&clean.hashtag, config.max_hashtag_chars) {
        return Err(ChallengeError::validation("hashtag", problem));
    }

    if clean.end_date <= clean.start_date {
        return Err(ChallengeError::validation("end_date", "must be after start_date"));
    }
    if clean.voting_end_date.is_some_and(|v| v <= clean.end_date) {
        return Err(ChallengeError::validation(
            "voting_end_date",
            "must be after end_date",
        ));
    }
    if let (Some(min), Some(max)) = (clean.min_duration, clean.max_duration) {
        if min > max {
            return Err(ChallengeError::validation(
                "min_duration",
                "must not exceed max_duration",
            ));
        }
    }
    if clean.max_entries == Some(0) {
        return Err(ChallengeError::validation("max_entries", "must be positive"));
    }

    Ok(clean)
}

impl<S: ChallengeStore> ChallengeService<S> {
    /// Create a challenge in `Draft`. Organizers and admins only.
    pub fn create_challenge(&self, caller: Caller, fields: NewChallenge) -> Result<Challenge> {
        if !caller.role.can_organize() {
            return Err(ChallengeError::Forbidden {
                caller: caller.id,
                action: "create challenges",
            });
        }
        let clean = validate_fields(&fields, &self.config)?;
        let challenge = self.with_retry("create_challenge", || {
            self.store
                .insert_challenge(clean.clone(), caller.id, self.now())
        })?;

        tracing::info!(
            challenge_id = %challenge.id,
            hashtag = %challenge.hashtag,
            creator = %caller.id,
            "challenge created"
        );
        self.publish(ChallengeEvent::ChallengeCreated {
            challenge_id: challenge.id,
            creator_id: caller.id,
            hashtag: challenge.hashtag.clone(),
        });
        Ok(challenge)
    }

    /// Edit a challenge that is still in `Draft`.
    pub fn update_details(
        &self,
        caller: Caller,
        challenge_id: ChallengeId,
        patch: ChallengePatch,
    ) -> Result<Challenge> {
        let config = &self.config;
        let updated = self.with_retry("update_details", || {
            self.store.update_challenge(challenge_id, &mut |current| {
                require_owner_or_admin(&caller, current, "edit this challenge")?;
                if current.status != ChallengeStatus::Draft {
                    return Err(invalid_phase(
                        Operation::Update,
                        resolve_phase(current, self.now()),
                    ));
                }
                let mut fields = NewChallenge::from(current);
                patch.apply_to(&mut fields);
                let clean = validate_fields(&fields, config)?;
                if let Some(cap) = clean.max_entries {
                    if cap < current.entries_count {
                        return Err(ChallengeError::validation(
                            "max_entries",
                            "is below the current number of entries",
                        ));
                    }
                }
                Ok(with_fields(current, clean))
            })
        })?;
        tracing::info!(challenge_id = %challenge_id, "challenge updated");
        Ok(updated)
    }

    /// Draft -> Active. Entries are admitted from `start_date` on.
    pub fn open(&self, caller: Caller, challenge_id: ChallengeId) -> Result<Challenge> {
        self.transition(
            caller,
            challenge_id,
            Operation::Open,
            &[ChallengeStatus::Draft],
            ChallengeStatus::Active,
        )
    }

    /// Active -> Voting, ending the entry window early.
    pub fn close_entries(&self, caller: Caller, challenge_id: ChallengeId) -> Result<Challenge> {
        self.transition(
            caller,
            challenge_id,
            Operation::CloseEntries,
            &[ChallengeStatus::Active],
            ChallengeStatus::Voting,
        )
    }

    /// Any non-terminal status -> Cancelled. Entries and votes are kept.
    pub fn cancel(&self, caller: Caller, challenge_id: ChallengeId) -> Result<Challenge> {
        let challenge = self.transition(
            caller,
            challenge_id,
            Operation::Cancel,
            &[
                ChallengeStatus::Draft,
                ChallengeStatus::Active,
                ChallengeStatus::Voting,
            ],
            ChallengeStatus::Cancelled,
        )?;
        self.publish(ChallengeEvent::ChallengeCancelled {
            challenge_id,
            cancelled_by: caller.id,
        });
        Ok(challenge)
    }

    /// Rank entries and complete the challenge. Allowed once voting is under
    /// way or every window has passed; calling it again returns the first result.
    pub fn finalize(&self, caller: Caller, challenge_id: ChallengeId) -> Result<Finalization> {
        let challenge = self.store.challenge(challenge_id)?;
        require_owner_or_admin(&caller, &challenge, "finalize this challenge")?;

        self.rank_and_close(challenge_id)
    }

    pub fn challenge(&self, challenge_id: ChallengeId) -> Result<Challenge> {
        self.store.challenge(challenge_id)
    }

    pub fn challenge_view(&self, challenge_id: ChallengeId) -> Result<ChallengeView> {
        let challenge = self.store.challenge(challenge_id)?;
        let phase = self.phase_of(&challenge);
        Ok(ChallengeView { challenge, phase })
    }

    /// All challenges, optionally only those currently in `phase`.
    pub fn challenges(&self, phase: Option<Phase>) -> Result<Vec<ChallengeView>> {
        let now = self.now();
        Ok(self
            .store
            .challenges()?
            .into_iter()
            .map(|challenge| ChallengeView {
                phase: resolve_phase(&challenge, now),
                challenge,
            })
            .filter(|view| phase.map_or(true, |p| view.phase == p))
            .collect())
    }

    /// The stored result of a completed challenge.
    pub fn finalization(&self, challenge_id: ChallengeId) -> Result<Option<Finalization>> {
        self.store.finalization(challenge_id)
    }

    fn transition(
        &self,
        caller: Caller,
        challenge_id: ChallengeId,
        operation: Operation,
        from: &[ChallengeStatus],
        to: ChallengeStatus,
    ) -> Result<Challenge> {
        let challenge = self.with_retry("transition", || {
            let now = self.now();
            self.store.update_challenge(challenge_id, &mut |current| {
                require_owner_or_admin(&caller, current, "change this challenge")?;
                if !from.contains(&current.status) {
                    return Err(invalid_phase(operation, resolve_phase(current, now)));
                }
                let mut next = current.clone();
                next.status = to;
                Ok(next)
            })
        })?;
        tracing::info!(
            challenge_id = %challenge_id,
            operation = %operation,
            status = ?to,
            "challenge transitioned"
        );
        Ok(challenge)
    }
}

fn with_fields(current: &Challenge, fields: NewChallenge) -> Challenge {
    Challenge {
        title: fields.title,
        description: fields.description,
        rules: fields.rules,
        category: fields.category,
        hashtag: fields.hashtag,
        prize: fields.prize,
        prize_amount: fields.prize_amount,
        start_date: fields.start_date,
        end_date: fields.end_date,
        voting_end_date: fields.voting_end_date,
        min_duration: fields.min_duration,
        max_duration: fields.max_duration,
        max_entries: fields.max_entries,
        ..current.clone()
    }
}
