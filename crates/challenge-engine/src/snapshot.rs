//! Checksummed CBOR image of a whole store.
//!
//! Format: `[magic "CHLG"][version: u16 BE][payload_len: u64 BE][payload: CBOR][sha256(payload)]`

use crate::audit::Violation;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use challenge_common::hashing::payload_checksum;
use challenge_common::types::{Challenge, Entry, Finalization, Vote};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

pub const MAGIC: [u8; 4] = *b"CHLG";
pub const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 8;
const CHECKSUM_LEN: usize = 32;

/// Everything stored about one challenge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub challenge: Challenge,
    pub entries: Vec<Entry>,
    pub votes: Vec<Vote>,
    pub finalization: Option<Finalization>,
}

/// Full contents of a store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub challenges: Vec<ChallengeRecord>,
    pub next_challenge_id: u64,
    pub next_entry_id: u64,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            challenges: Vec::new(),
            next_challenge_id: 1,
            next_entry_id: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot truncated: {0} bytes")]
    Truncated(usize),
    #[error("not a challenge snapshot")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
    #[error("snapshot payload: {0}")]
    Decode(String),
    #[error("snapshot encoding: {0}")]
    Encode(String),
    #[error("snapshot breaks {} invariant(s), first: {}", .0.len(), first(.0))]
    Inconsistent(Vec<Violation>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn first(violations: &[Violation]) -> String {
    violations
        .first()
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Serialize a snapshot into the framed, checksummed format.
pub fn encode(snapshot: &StoreSnapshot) -> Result<Vec<u8>, SnapshotError> {
    let mut payload = Vec::new();
    ciborium::ser::into_writer(snapshot, &mut payload)
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    out.extend_from_slice(&MAGIC);
    out.write_u16::<BigEndian>(FORMAT_VERSION)?;
    out.write_u64::<BigEndian>(payload.len() as u64)?;
    out.extend_from_slice(&payload);
    out.extend_from_slice(&payload_checksum(&payload));
    Ok(out)
}

/// Parse and verify the framed format. Does not check store invariants;
/// [`crate::store::MemoryStore::restore`] does.
pub fn decode(bytes: &[u8]) -> Result<StoreSnapshot, SnapshotError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(SnapshotError::Truncated(bytes.len()));
    }

    let mut reader = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let version = reader.read_u16::<BigEndian>()?;
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let payload_len = reader.read_u64::<BigEndian>()?;

    let payload_end = usize::try_from(payload_len)
        .ok()
        .and_then(|len| HEADER_LEN.checked_add(len))
        .filter(|end| end.checked_add(CHECKSUM_LEN) == Some(bytes.len()))
        .ok_or(SnapshotError::Truncated(bytes.len()))?;

    let payload = &bytes[HEADER_LEN..payload_end];
    let checksum = &bytes[payload_end..];
    if payload_checksum(payload).as_slice() != checksum {
        return Err(SnapshotError::ChecksumMismatch);
    }

    ciborium::de::from_reader(payload).map_err(|e| SnapshotError::Decode(e.to_string()))
}
