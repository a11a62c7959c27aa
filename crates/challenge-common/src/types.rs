use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

id_type!(
    /// Store-allocated challenge identifier.
    ChallengeId
);
id_type!(
    /// Store-allocated entry identifier. Monotonic in submission order.
    EntryId
);
id_type!(
    /// Identity resolved by the auth collaborator.
    UserId
);
id_type!(
    /// Identity of a video in the media catalog.
    VideoId
);

/// Stored lifecycle status of a challenge.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChallengeStatus {
    #[default]
    Draft,
    Active,
    Voting,
    Completed,
    Cancelled,
}

impl ChallengeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Status of a single submission.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
    Winner,
    RunnerUp,
}

impl EntryStatus {
    /// Rejected entries are excluded from `entries_count` and the leaderboard.
    pub fn is_counted(self) -> bool {
        self != Self::Rejected
    }
}

/// Role of the caller, as resolved by the auth collaborator.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    Member,
    Organizer,
    Moderator,
    Admin,
}

impl Role {
    pub fn can_organize(self) -> bool {
        matches!(self, Self::Organizer | Self::Admin)
    }

    pub fn can_moderate(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

/// A resolved caller identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn member(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::Member)
    }
}

/// An organizer-created competition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub description: String,
    pub rules: String,
    pub category: Option<String>,
    /// Normalized form, see [`crate::normalization::normalize_hashtag`].
    pub hashtag: String,
    pub prize: Option<String>,
    /// Prize amount in minor currency units.
    pub prize_amount: Option<u64>,
    pub status: ChallengeStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub voting_end_date: Option<Timestamp>,
    /// Seconds.
    pub min_duration: Option<u32>,
    /// Seconds.
    pub max_duration: Option<u32>,
    pub max_entries: Option<u32>,
    pub entries_count: u32,
    pub creator_id: UserId,
    pub winner_id: Option<UserId>,
    pub created_at: Timestamp,
}

impl Challenge {
    /// Whether another entry can be counted without breaking `max_entries`.
    pub fn has_capacity(&self) -> bool {
        self.max_entries
            .map_or(true, |cap| self.entries_count < cap)
    }

    /// Whether `duration` lies inside the optional `[min_duration, max_duration]` bounds.
    pub fn duration_allowed(&self, duration: u32) -> bool {
        self.min_duration.map_or(true, |min| duration >= min)
            && self.max_duration.map_or(true, |max| duration <= max)
    }
}

/// Fields supplied by an organizer when creating a challenge.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub rules: String,
    pub category: Option<String>,
    pub hashtag: String,
    pub prize: Option<String>,
    pub prize_amount: Option<u64>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub voting_end_date: Option<Timestamp>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub max_entries: Option<u32>,
}

/// Partial update of a draft challenge. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub category: Option<Option<String>>,
    pub hashtag: Option<String>,
    pub prize: Option<Option<String>>,
    pub prize_amount: Option<Option<u64>>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub voting_end_date: Option<Option<Timestamp>>,
    pub min_duration: Option<Option<u32>>,
    pub max_duration: Option<Option<u32>>,
    pub max_entries: Option<Option<u32>>,
}

impl ChallengePatch {
    /// Apply the patch to the editable fields of `fields`.
    pub fn apply_to(&self, fields: &mut NewChallenge) {
        if let Some(v) = &self.title {
            fields.title = v.clone();
        }
        if let Some(v) = &self.description {
            fields.description = v.clone();
        }
        if let Some(v) = &self.rules {
            fields.rules = v.clone();
        }
        if let Some(v) = &self.category {
            fields.category = v.clone();
        }
        if let Some(v) = &self.hashtag {
            fields.hashtag = v.clone();
        }
        if let Some(v) = &self.prize {
            fields.prize = v.clone();
        }
        if let Some(v) = self.prize_amount {
            fields.prize_amount = v;
        }
        if let Some(v) = self.start_date {
            fields.start_date = v;
        }
        if let Some(v) = self.end_date {
            fields.end_date = v;
        }
        if let Some(v) = self.voting_end_date {
            fields.voting_end_date = v;
        }
        if let Some(v) = self.min_duration {
            fields.min_duration = v;
        }
        if let Some(v) = self.max_duration {
            fields.max_duration = v;
        }
        if let Some(v) = self.max_entries {
            fields.max_entries = v;
        }
    }
}

impl From<&Challenge> for NewChallenge {
    fn from(c: &Challenge) -> Self {
        NewChallenge {
            title: c.title.clone(),
            description: c.description.clone(),
            rules: c.rules.clone(),
            category: c.category.clone(),
            hashtag: c.hashtag.clone(),
            prize: c.prize.clone(),
            prize_amount: c.prize_amount,
            start_date: c.start_date,
            end_date: c.end_date,
            voting_end_date: c.voting_end_date,
            min_duration: c.min_duration,
            max_duration: c.max_duration,
            max_entries: c.max_entries,
        }
    }
}

/// One user's submission of one video to one challenge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub challenge_id: ChallengeId,
    pub video_id: VideoId,
    pub user_id: UserId,
    pub status: EntryStatus,
    pub votes_count: u32,
    pub rank: Option<u32>,
    pub submitted_at: Timestamp,
}

/// One user's endorsement of one entry. At most one per (challenge, user).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub challenge_id: ChallengeId,
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub created_at: Timestamp,
}

/// Result of the single vote switch operation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum VoteOutcome {
    /// No previous vote; a new one was created.
    Recorded,
    /// The previous vote pointed at `from` and now points at the target.
    Switched { from: EntryId },
    /// The previous vote pointed at the target and was withdrawn.
    Removed,
}

/// A ranked line of a finalized challenge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Standing {
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub votes_count: u32,
    pub rank: u32,
    pub status: EntryStatus,
}

/// Persisted outcome of ranking and closing a challenge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finalization {
    pub challenge_id: ChallengeId,
    pub standings: Vec<Standing>,
    pub winner_id: Option<UserId>,
    pub winning_entry_id: Option<EntryId>,
    pub finalized_at: Timestamp,
}

impl Finalization {
    /// Fingerprint of the standings table, see [`crate::hashing::standings_fingerprint`].
    pub fn fingerprint(&self) -> [u8; 32] {
        crate::hashing::standings_fingerprint(
            self.standings
                .iter()
                .map(|s| (s.entry_id.0, s.user_id.0, s.votes_count, s.rank)),
        )
    }
}
