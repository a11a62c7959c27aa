mod fixtures;

use challenge_common::error::{ErrorKind, Operation};
use challenge_common::types::*;
use challenge_common::{ChallengeError, Phase};
use challenge_engine::{ChallengeEvent, EngineConfig};
use fixtures::*;

fn ids(entries: &[Entry]) -> Vec<EntryId> {
    entries.iter().map(|e| e.id).collect()
}

/// Four entries with votes [5, 3, 3, 1]; of the two tied entries the one
/// submitted later has the lower id.
fn tied_board(h: &Harness) -> (ChallengeId, [EntryId; 4]) {
    let challenge = h.open_challenge(fields("dance"));
    let top = h.submit(challenge, 10).id;
    h.clock.advance(MINUTE);
    let late = h.submit(challenge, 11).id;
    let bottom = h.submit(challenge, 12).id;
    h.clock.advance(-2 * MINUTE);
    let early = h.submit(challenge, 13).id;
    h.clock.set(NOW);

    h.start_voting(challenge);
    h.votes_for(challenge, top, 100, 5);
    h.votes_for(challenge, late, 200, 3);
    h.votes_for(challenge, early, 300, 3);
    h.votes_for(challenge, bottom, 400, 1);
    (challenge, [top, early, late, bottom])
}

#[test]
fn orders_by_votes_then_submission() {
    let h = harness();
    let (challenge, expected) = tied_board(&h);

    let board = h.service.leaderboard(challenge, None).unwrap();
    assert_eq!(ids(&board), expected.to_vec());
    assert_eq!(
        board.iter().map(|e| e.votes_count).collect::<Vec<_>>(),
        vec![5, 3, 3, 1]
    );
}

#[test]
fn limit_truncates() {
    let h = harness();
    let (challenge, expected) = tied_board(&h);
    let board = h.service.leaderboard(challenge, Some(2)).unwrap();
    assert_eq!(ids(&board), expected[..2].to_vec());

    assert!(h.service.leaderboard(challenge, Some(0)).unwrap().is_empty());
}

#[test]
fn limit_is_capped_by_config() {
    let h = harness_with(EngineConfig {
        default_leaderboard_limit: 2,
        max_leaderboard_limit: 3,
        ..EngineConfig::default()
    });
    let (challenge, _) = tied_board(&h);

    assert_eq!(h.service.leaderboard(challenge, None).unwrap().len(), 2);
    assert_eq!(h.service.leaderboard(challenge, Some(100)).unwrap().len(), 3);
}

#[test]
fn leaderboard_reflects_switches() {
    let h = harness();
    let challenge = h.open_challenge(fields("dance"));
    let a = h.submit(challenge, 10).id;
    let b = h.submit(challenge, 11).id;
    h.start_voting(challenge);
    h.votes_for(challenge, a, 100, 2);
    h.vote(challenge, b, 300);
    assert_eq!(ids(&h.service.leaderboard(challenge, None).unwrap()), vec![a, b]);

    h.vote(challenge, b, 100);
    h.vote(challenge, b, 101);
    assert_eq!(ids(&h.service.leaderboard(challenge, None).unwrap()), vec![b, a]);
}

#[test]
fn unknown_challenge_has_no_leaderboard() {
    let h = harness();
    let err = h.service.leaderboard(ChallengeId(3), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn finalize_ranks_and_completes() {
    let h = harness();
    let (challenge, [top, early, late, bottom]) = tied_board(&h);
    h.clock.advance(HOUR);

    let done = h.service.finalize(ORGANIZER, challenge).unwrap();
    assert_eq!(done.winner_id, Some(UserId(10)));
    assert_eq!(done.winning_entry_id, Some(top));
    assert_eq!(done.finalized_at, NOW + HOUR);
    let ranks: Vec<(EntryId, u32)> = done.standings.iter().map(|s| (s.entry_id, s.rank)).collect();
    assert_eq!(ranks, vec![(top, 1), (early, 2), (late, 3), (bottom, 4)]);

    let stored = h.service.challenge(challenge).unwrap();
    assert_eq!(stored.status, ChallengeStatus::Completed);
    assert_eq!(stored.winner_id, Some(UserId(10)));

    let status = |id| h.service.entry(id).unwrap().status;
    let rank = |id| h.service.entry(id).unwrap().rank;
    assert_eq!(status(top), EntryStatus::Winner);
    assert_eq!(status(early), EntryStatus::RunnerUp);
    assert_eq!(status(late), EntryStatus::RunnerUp);
    assert_eq!(status(bottom), EntryStatus::Approved);
    assert_eq!(rank(top), Some(1));
    assert_eq!(rank(bottom), Some(4));

    assert_eq!(h.service.finalization(challenge).unwrap(), Some(done));
    h.assert_consistent();
}

#[test]
fn runner_up_count_is_configurable() {
    let h = harness_with(EngineConfig {
        runner_up_count: 0,
        ..EngineConfig::default()
    });
    let (challenge, [_, early, _, _]) = tied_board(&h);
    h.service.finalize(ORGANIZER, challenge).unwrap();
    assert_eq!(h.service.entry(early).unwrap().status, EntryStatus::Approved);
}

#[test]
fn rejected_entries_are_not_ranked() {
    let h = harness();
    let (challenge, [top, early, _, _]) = tied_board(&h);
    h.service
        .moderate_entry(top, MODERATOR, EntryStatus::Rejected)
        .unwrap();

    let done = h.service.finalize(ORGANIZER, challenge).unwrap();
    assert_eq!(done.standings.len(), 3);
    assert_eq!(done.winning_entry_id, Some(early));
    let rejected = h.service.entry(top).unwrap();
    assert_eq!(rejected.status, EntryStatus::Rejected);
    assert_eq!(rejected.rank, None);
}

#[test]
fn finalize_is_idempotent() {
    let h = harness();
    let (challenge, _) = tied_board(&h);

    let first = h.service.finalize(ORGANIZER, challenge).unwrap();
    h.clock.advance(HOUR);
    let second = h.service.finalize(ADMIN, challenge).unwrap();
    let third = h.service.finalize(ORGANIZER, challenge).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(first.fingerprint(), third.fingerprint());

    let finalized = h
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e, ChallengeEvent::ChallengeFinalized { .. }))
        .count();
    assert_eq!(finalized, 1);
}

#[test]
fn outsider_cannot_finalize_and_event_follows_the_real_finalize() {
    let h = harness();
    let (challenge, [top, ..]) = tied_board(&h);
    h.events.take();

    let err = h
        .service
        .finalize(Caller::member(UserId(10)), challenge)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let still_open = h.service.challenge(challenge).unwrap();
    assert_eq!(still_open.status, ChallengeStatus::Voting);
    assert_eq!(still_open.winner_id, None);
    assert_eq!(h.service.entry(top).unwrap().rank, None);
    assert!(h.events.events().is_empty());

    h.service.finalize(ADMIN, challenge).unwrap();
    h.service.finalize(ORGANIZER, challenge).unwrap();
    let finalized: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e, ChallengeEvent::ChallengeFinalized { .. }))
        .collect();
    assert_eq!(finalized.len(), 1);
    assert!(matches!(
        &finalized[0],
        ChallengeEvent::ChallengeFinalized { winning_entry_id: Some(id), .. } if *id == top
    ));
}

#[test]
fn finalize_publishes_the_winner() {
    let h = harness();
    let (challenge, [top, ..]) = tied_board(&h);
    h.events.take();

    h.service.finalize(ORGANIZER, challenge).unwrap();
    assert_eq!(
        h.events.events(),
        vec![ChallengeEvent::ChallengeFinalized {
            challenge_id: challenge,
            winner_id: Some(UserId(10)),
            winning_entry_id: Some(top),
            ranked_entries: 4,
        }]
    );
}

#[test]
fn empty_challenge_finalizes_without_winner() {
    let h = harness();
    let challenge = h.open_challenge(fields("dance"));
    h.start_voting(challenge);

    let done = h.service.finalize(ORGANIZER, challenge).unwrap();
    assert!(done.standings.is_empty());
    assert_eq!(done.winner_id, None);
    assert_eq!(
        h.service.challenge(challenge).unwrap().status,
        ChallengeStatus::Completed
    );
}

#[test]
fn finalize_after_every_window_passed() {
    let h = harness();
    let challenge = h.open_challenge(fields("dance"));
    h.submit(challenge, 10);

    h.clock.set(NOW + 3 * HOUR);
    assert_eq!(
        h.service.challenge_view(challenge).unwrap().phase,
        Phase::Closed
    );
    let done = h.service.finalize(ORGANIZER, challenge).unwrap();
    assert_eq!(done.winner_id, Some(UserId(10)));
}

#[test]
fn finalize_during_grace_period() {
    let h = harness();
    let challenge = h.open_challenge(fields("dance"));
    h.submit(challenge, 10);
    h.clock.set(NOW + HOUR + MINUTE);
    assert!(h.service.finalize(ORGANIZER, challenge).is_ok());
}

#[test]
fn finalize_refused_while_entries_are_open() {
    let h = harness();
    let challenge = h.open_challenge(fields("dance"));
    h.submit(challenge, 10);

    let err = h.service.finalize(ORGANIZER, challenge).unwrap_err();
    assert!(matches!(
        err,
        ChallengeError::InvalidPhase {
            operation: Operation::Finalize,
            phase: Phase::AcceptingEntries
        }
    ));
    assert_eq!(
        h.service.challenge(challenge).unwrap().status,
        ChallengeStatus::Active
    );
    assert_eq!(h.service.finalization(challenge).unwrap(), None);
}

#[test]
fn finalize_refused_for_draft_and_cancelled() {
    let h = harness();
    let draft = h.service.create_challenge(ORGANIZER, fields("dance")).unwrap();
    let err = h.service.finalize(ORGANIZER, draft.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let cancelled = h.open_challenge(fields("cooking"));
    h.start_voting(cancelled);
    h.service.cancel(ORGANIZER, cancelled).unwrap();
    let err = h.service.finalize(ORGANIZER, cancelled).unwrap_err();
    assert!(matches!(
        err,
        ChallengeError::InvalidPhase {
            phase: Phase::Cancelled,
            ..
        }
    ));
}

#[test]
fn only_creator_or_admin_finalizes() {
    let h = harness();
    let (challenge, _) = tied_board(&h);
    let err = h.service.finalize(MODERATOR, challenge).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(h.service.finalize(ADMIN, challenge).is_ok());
}
