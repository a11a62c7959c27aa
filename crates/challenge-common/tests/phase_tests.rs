mod fixtures;

use challenge_common::types::ChallengeStatus;
use challenge_common::{resolve_phase, Phase};
use fixtures::{challenge, HOUR, NOW};

#[test]
fn terminal_status_wins_over_time() {
    let mut c = challenge(ChallengeStatus::Cancelled);
    assert_eq!(resolve_phase(&c, NOW), Phase::Cancelled);
    assert_eq!(resolve_phase(&c, NOW - 10 * HOUR), Phase::Cancelled);

    c.status = ChallengeStatus::Completed;
    assert_eq!(resolve_phase(&c, NOW), Phase::Completed);
    assert_eq!(resolve_phase(&c, NOW + 10 * HOUR), Phase::Completed);
}

#[test]
fn draft_status_is_draft_inside_window() {
    let c = challenge(ChallengeStatus::Draft);
    assert_eq!(resolve_phase(&c, NOW), Phase::Draft);
}

#[test]
fn active_before_start_is_draft() {
    let c = challenge(ChallengeStatus::Active);
    assert_eq!(resolve_phase(&c, c.start_date - 1), Phase::Draft);
}

#[test]
fn active_inside_window_accepts_entries() {
    let c = challenge(ChallengeStatus::Active);
    assert_eq!(resolve_phase(&c, c.start_date), Phase::AcceptingEntries);
    assert_eq!(resolve_phase(&c, NOW), Phase::AcceptingEntries);
    assert_eq!(resolve_phase(&c, c.end_date), Phase::AcceptingEntries);
}

#[test]
fn active_past_end_flows_into_voting_grace() {
    let c = challenge(ChallengeStatus::Active);
    assert_eq!(resolve_phase(&c, c.end_date + 1), Phase::Voting);
    assert_eq!(resolve_phase(&c, c.voting_end_date.unwrap()), Phase::Voting);
    assert_eq!(resolve_phase(&c, c.voting_end_date.unwrap() + 1), Phase::Closed);
}

#[test]
fn active_past_end_without_voting_window_is_closed() {
    let mut c = challenge(ChallengeStatus::Active);
    c.voting_end_date = None;
    assert_eq!(resolve_phase(&c, c.end_date + 1), Phase::Closed);
}

#[test]
fn explicit_voting_status_is_voting() {
    let c = challenge(ChallengeStatus::Voting);
    assert_eq!(resolve_phase(&c, NOW), Phase::Voting);
    assert_eq!(resolve_phase(&c, NOW + 10 * HOUR), Phase::Voting);
}

#[test]
fn grace_period_scenario() {
    // Active, entries closed a minute ago, voting open for ten more minutes.
    let mut c = challenge(ChallengeStatus::Active);
    c.start_date = NOW - HOUR;
    c.end_date = NOW - 60;
    c.voting_end_date = Some(NOW + 600);
    let phase = resolve_phase(&c, NOW);
    assert_eq!(phase, Phase::Voting);
    assert!(phase.accepts_votes(false));
    assert!(!phase.accepts_entries());

    let later = resolve_phase(&c, NOW + 601);
    assert_eq!(later, Phase::Closed);
    assert!(!later.accepts_votes(true));
}

#[test]
fn entry_window_votes_only_with_legacy_rule() {
    let phase = resolve_phase(&challenge(ChallengeStatus::Active), NOW);
    assert_eq!(phase, Phase::AcceptingEntries);
    assert!(!phase.accepts_votes(false));
    assert!(phase.accepts_votes(true));
}

#[test]
fn terminal_predicate() {
    assert!(Phase::Completed.is_terminal());
    assert!(Phase::Cancelled.is_terminal());
    assert!(!Phase::Closed.is_terminal());
    assert!(!Phase::Voting.is_terminal());
}
