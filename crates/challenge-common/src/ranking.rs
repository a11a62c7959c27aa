use crate::types::{Entry, EntryStatus, Standing};
use std::cmp::Ordering;

/// Leaderboard order: most votes first, then earliest `submitted_at`, then
/// lowest entry id. Entry ids are allocated in submission order, so the last
/// key only separates entries submitted within the same second.
pub fn leaderboard_order(a: &Entry, b: &Entry) -> Ordering {
    b.votes_count
        .cmp(&a.votes_count)
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Drop rejected entries and sort the rest into leaderboard order.
pub fn rank_entries(entries: impl IntoIterator<Item = Entry>) -> Vec<Entry> {
    let mut ranked: Vec<Entry> = entries
        .into_iter()
        .filter(|e| e.status.is_counted())
        .collect();
    ranked.sort_by(leaderboard_order);
    ranked
}

/// Assign final standings to entries already in leaderboard order.
///
/// Ranks are sequential (1..=N) because the order is total: of two entries with
/// equal votes the earlier submission takes the better rank. The first entry
/// becomes the winner and the next `runner_up_count` entries runners-up.
pub fn assign_standings(ranked: &[Entry], runner_up_count: u32) -> Vec<Standing> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let rank = idx as u32 + 1;
            let status = if rank == 1 {
                EntryStatus::Winner
            } else if rank <= 1 + runner_up_count {
                EntryStatus::RunnerUp
            } else {
                match entry.status {
                    EntryStatus::Pending => EntryStatus::Pending,
                    _ => EntryStatus::Approved,
                }
            };
            Standing {
                entry_id: entry.id,
                user_id: entry.user_id,
                votes_count: entry.votes_count,
                rank,
                status,
            }
        })
        .collect()
}
