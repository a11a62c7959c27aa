use crate::phase::Phase;
use crate::types::{ChallengeId, EntryId, UserId, VideoId};
use std::fmt;

pub type Result<T, E = ChallengeError> = std::result::Result<T, E>;

/// Coarse error category an adapter maps onto its own transport codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    State,
    Capacity,
    Ownership,
    Duration,
    Forbidden,
}

/// The kind of record a lookup failed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Challenge,
    Entry,
    Video,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Challenge => "challenge",
            Resource::Entry => "entry",
            Resource::Video => "video",
        };
        f.write_str(name)
    }
}

/// Operations whose admissibility depends on the challenge phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    SubmitEntry,
    Vote,
    Open,
    CloseEntries,
    Finalize,
    Cancel,
    Update,
    Moderate,
    RemoveEntry,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::SubmitEntry => "submit entry",
            Operation::Vote => "vote",
            Operation::Open => "open",
            Operation::CloseEntries => "close entries",
            Operation::Finalize => "finalize",
            Operation::Cancel => "cancel",
            Operation::Update => "update",
            Operation::Moderate => "moderate",
            Operation::RemoveEntry => "remove entry",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("{resource} {id} not found")]
    NotFound { resource: Resource, id: u64 },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("hashtag #{hashtag} is already taken")]
    DuplicateHashtag { hashtag: String },

    #[error("user {user_id} already has an entry in challenge {challenge_id}")]
    DuplicateEntry {
        challenge_id: ChallengeId,
        user_id: UserId,
    },

    #[error("cannot {operation} while challenge is {phase:?}")]
    InvalidPhase { operation: Operation, phase: Phase },

    #[error("entry {entry_id} is not eligible for votes")]
    EntryNotEligible { entry_id: EntryId },

    #[error("challenge {challenge_id} reached its cap of {max_entries} entries")]
    CapacityReached {
        challenge_id: ChallengeId,
        max_entries: u32,
    },

    #[error("video {video_id} does not belong to user {user_id}")]
    NotOwner { video_id: VideoId, user_id: UserId },

    #[error("video duration {duration}s is outside the allowed range {}", range(.min, .max))]
    DurationOutOfRange {
        duration: u32,
        min: Option<u32>,
        max: Option<u32>,
    },

    #[error("caller {caller} may not {action}")]
    Forbidden { caller: UserId, action: &'static str },

    #[error("concurrent update conflict, try again")]
    Contention,
}

fn range(min: &Option<u32>, max: &Option<u32>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{min}s, {max}s]"),
        (Some(min), None) => format!("[{min}s, ..)"),
        (None, Some(max)) => format!("(.., {max}s]"),
        (None, None) => "(..)".to_string(),
    }
}

impl ChallengeError {
    pub fn not_found(resource: Resource, id: impl Into<u64>) -> Self {
        ChallengeError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ChallengeError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChallengeError::NotFound { .. } => ErrorKind::NotFound,
            ChallengeError::Validation { .. } => ErrorKind::Validation,
            ChallengeError::DuplicateHashtag { .. }
            | ChallengeError::DuplicateEntry { .. }
            | ChallengeError::Contention => ErrorKind::Conflict,
            ChallengeError::InvalidPhase { .. } | ChallengeError::EntryNotEligible { .. } => {
                ErrorKind::State
            }
            ChallengeError::CapacityReached { .. } => ErrorKind::Capacity,
            ChallengeError::NotOwner { .. } => ErrorKind::Ownership,
            ChallengeError::DurationOutOfRange { .. } => ErrorKind::Duration,
            ChallengeError::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }

    /// Whether a retry of the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChallengeError::Contention)
    }
}
