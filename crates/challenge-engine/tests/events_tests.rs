mod fixtures;

use challenge_common::types::*;
use challenge_engine::{ChallengeEvent, ChallengeService, FixedClock, InMemoryCatalog, MemoryStore};
use fixtures::*;
use std::sync::{mpsc, Arc};

#[test]
fn channel_receives_events_in_order() {
    let (tx, rx) = mpsc::channel::<ChallengeEvent>();
    let catalog = Arc::new(InMemoryCatalog::new().with_video(VideoId(1), UserId(10), None));
    let service = ChallengeService::new(MemoryStore::new(), catalog)
        .with_clock(Arc::new(FixedClock::new(NOW)))
        .with_events(Arc::new(tx));

    let challenge = service.create_challenge(ORGANIZER, fields("events")).unwrap().id;
    service.open(ORGANIZER, challenge).unwrap();
    let entry = service
        .submit_entry(challenge, UserId(10), VideoId(1))
        .unwrap()
        .id;
    service.close_entries(ORGANIZER, challenge).unwrap();
    service
        .cast_or_switch_vote(challenge, entry, UserId(20))
        .unwrap();
    service.finalize(ORGANIZER, challenge).unwrap();

    let kinds: Vec<&'static str> = rx
        .try_iter()
        .map(|event| {
            assert_eq!(event.challenge_id(), challenge);
            match event {
                ChallengeEvent::ChallengeCreated { .. } => "created",
                ChallengeEvent::EntrySubmitted { .. } => "submitted",
                ChallengeEvent::EntryRemoved { .. } => "removed",
                ChallengeEvent::VoteCast { .. } => "vote",
                ChallengeEvent::ChallengeFinalized { .. } => "finalized",
                ChallengeEvent::ChallengeCancelled { .. } => "cancelled",
            }
        })
        .collect();
    assert_eq!(kinds, vec!["created", "submitted", "vote", "finalized"]);
}

#[test]
fn dropped_receiver_does_not_fail_operations() {
    let (tx, rx) = mpsc::channel::<ChallengeEvent>();
    drop(rx);
    let service = ChallengeService::new(MemoryStore::new(), Arc::new(InMemoryCatalog::new()))
        .with_clock(Arc::new(FixedClock::new(NOW)))
        .with_events(Arc::new(tx));
    assert!(service.create_challenge(ORGANIZER, fields("events")).is_ok());
}

#[test]
fn rejected_operations_publish_nothing() {
    let h = harness();
    let challenge = h.open_challenge(fields("events"));
    h.events.take();

    assert!(h.service.open(ORGANIZER, challenge).is_err());
    assert!(h.service.finalize(ORGANIZER, challenge).is_err());
    assert!(h
        .service
        .submit_entry(challenge, UserId(10), VideoId(404))
        .is_err());
    assert!(h.events.events().is_empty());
}
