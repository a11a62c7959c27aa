use challenge_common::types::*;

#[allow(dead_code)]
pub const HOUR: i64 = 3600;
pub const NOW: Timestamp = 1_700_000_000;

/// An active challenge open from one hour ago to one hour from now, voting
/// for a further hour.
#[allow(dead_code)]
pub fn challenge(status: ChallengeStatus) -> Challenge {
    Challenge {
        id: ChallengeId(1),
        title: "Best skate trick".to_string(),
        description: "Show us your best trick".to_string(),
        rules: "One take, no edits".to_string(),
        category: Some("sports".to_string()),
        hashtag: "skatetrick".to_string(),
        prize: None,
        prize_amount: None,
        status,
        start_date: NOW - HOUR,
        end_date: NOW + HOUR,
        voting_end_date: Some(NOW + 2 * HOUR),
        min_duration: None,
        max_duration: None,
        max_entries: None,
        entries_count: 0,
        creator_id: UserId(100),
        winner_id: None,
        created_at: NOW - 2 * HOUR,
    }
}

#[allow(dead_code)]
pub fn entry(id: u64, votes: u32, submitted_at: Timestamp) -> Entry {
    Entry {
        id: EntryId(id),
        challenge_id: ChallengeId(1),
        video_id: VideoId(id * 10),
        user_id: UserId(id + 1000),
        status: EntryStatus::Approved,
        votes_count: votes,
        rank: None,
        submitted_at,
    }
}
