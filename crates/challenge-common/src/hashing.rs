use sha2::{Digest, Sha256};

/// SHA-256 of a snapshot payload, stored alongside it to detect corruption.
pub fn payload_checksum(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

/// Stable fingerprint of a finalized standings table:
/// sha256 over length-prefixed (entry_id, user_id, votes, rank) tuples.
///
/// Lets callers cheaply confirm that repeated finalization returned the same result.
pub fn standings_fingerprint(rows: impl IntoIterator<Item = (u64, u64, u32, u32)>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    let mut count: u64 = 0;
    for (entry_id, user_id, votes, rank) in rows {
        hasher.update(entry_id.to_be_bytes());
        hasher.update(user_id.to_be_bytes());
        hasher.update(votes.to_be_bytes());
        hasher.update(rank.to_be_bytes());
        count += 1;
    }
    hasher.update(count.to_be_bytes());
    hasher.finalize().into()
}
