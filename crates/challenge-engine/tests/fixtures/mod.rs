#![allow(dead_code)]

use challenge_common::types::*;
use challenge_engine::{
    ChallengeService, EngineConfig, FixedClock, InMemoryCatalog, MemoryStore, RecordingSink,
    VideoInfo,
};
use std::sync::Arc;

pub const MINUTE: i64 = 60;
pub const HOUR: i64 = 3600;
pub const NOW: Timestamp = 1_700_000_000;

pub const ORGANIZER: Caller = Caller {
    id: UserId(1),
    role: Role::Organizer,
};
pub const ADMIN: Caller = Caller {
    id: UserId(2),
    role: Role::Admin,
};
pub const MODERATOR: Caller = Caller {
    id: UserId(3),
    role: Role::Moderator,
};

/// Duration of the videos registered by [`Harness::submit`].
pub const DEFAULT_DURATION: u32 = 30;

pub struct Harness {
    pub service: ChallengeService<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingSink>,
    pub catalog: Arc<InMemoryCatalog>,
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let clock = Arc::new(FixedClock::new(NOW));
    let events = Arc::new(RecordingSink::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let service = ChallengeService::new(MemoryStore::new(), catalog.clone())
        .with_clock(clock.clone())
        .with_events(events.clone())
        .with_config(config);
    Harness {
        service,
        clock,
        events,
        catalog,
    }
}

/// Entries open from an hour ago to an hour from now; voting for one more hour.
pub fn fields(hashtag: &str) -> NewChallenge {
    NewChallenge {
        title: format!("Challenge {hashtag}"),
        description: format!("Description for {hashtag}"),
        rules: "One video per person".to_string(),
        category: Some("music".to_string()),
        hashtag: hashtag.to_string(),
        prize: Some("Studio session".to_string()),
        prize_amount: Some(50_000),
        start_date: NOW - HOUR,
        end_date: NOW + HOUR,
        voting_end_date: Some(NOW + 2 * HOUR),
        min_duration: None,
        max_duration: None,
        max_entries: None,
    }
}

pub fn video_of(user: u64) -> VideoId {
    VideoId(user * 100)
}

impl Harness {
    /// Create a challenge as [`ORGANIZER`] and open it.
    pub fn open_challenge(&self, fields: NewChallenge) -> ChallengeId {
        let challenge = self
            .service
            .create_challenge(ORGANIZER, fields)
            .expect("create_challenge failed");
        self.service
            .open(ORGANIZER, challenge.id)
            .expect("open failed");
        challenge.id
    }

    pub fn add_video(&self, video: VideoId, owner: u64, duration_secs: Option<u32>) {
        self.catalog.insert(VideoInfo {
            id: video,
            owner: UserId(owner),
            duration_secs,
        });
    }

    /// Register a [`DEFAULT_DURATION`] video for `user` and submit it.
    pub fn submit(&self, challenge: ChallengeId, user: u64) -> Entry {
        self.add_video(video_of(user), user, Some(DEFAULT_DURATION));
        self.service
            .submit_entry(challenge, UserId(user), video_of(user))
            .expect("submit_entry failed")
    }

    pub fn start_voting(&self, challenge: ChallengeId) {
        self.service
            .close_entries(ORGANIZER, challenge)
            .expect("close_entries failed");
    }

    pub fn vote(&self, challenge: ChallengeId, entry: EntryId, user: u64) -> VoteOutcome {
        self.service
            .cast_or_switch_vote(challenge, entry, UserId(user))
            .expect("cast_or_switch_vote failed")
    }

    /// Give `entry` `count` votes from fresh users starting at `first_voter`.
    pub fn votes_for(&self, challenge: ChallengeId, entry: EntryId, first_voter: u64, count: u32) {
        for voter in first_voter..first_voter + count as u64 {
            assert_eq!(self.vote(challenge, entry, voter), VoteOutcome::Recorded);
        }
    }

    pub fn entries_count(&self, challenge: ChallengeId) -> u32 {
        self.service.challenge(challenge).unwrap().entries_count
    }

    pub fn votes_count(&self, entry: EntryId) -> u32 {
        self.service.entry(entry).unwrap().votes_count
    }

    pub fn assert_consistent(&self) {
        let violations = challenge_engine::audit::audit(&self.service.store().snapshot());
        assert!(violations.is_empty(), "store violations: {violations:?}");
    }
}
