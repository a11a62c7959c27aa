use serde::{Deserialize, Serialize};

/// Tunables of the engine. Every field has a default so partial TOML files load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries after the winner marked `RunnerUp` at finalization.
    pub runner_up_count: u32,
    /// Leaderboard length when the caller does not ask for one.
    pub default_leaderboard_limit: u32,
    pub max_leaderboard_limit: u32,
    /// Also admit votes while the challenge is still accepting entries.
    pub votes_during_entry_window: bool,
    pub max_title_chars: usize,
    pub max_description_chars: usize,
    pub max_rules_chars: usize,
    pub max_hashtag_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runner_up_count: 2,
            default_leaderboard_limit: 50,
            max_leaderboard_limit: 200,
            votes_during_entry_window: false,
            max_title_chars: 120,
            max_description_chars: 5000,
            max_rules_chars: 5000,
            max_hashtag_chars: 50,
        }
    }
}

impl EngineConfig {
    /// Resolve a requested leaderboard length against the configured bounds.
    pub fn leaderboard_limit(&self, requested: Option<u32>) -> usize {
        let limit = requested
            .unwrap_or(self.default_leaderboard_limit)
            .min(self.max_leaderboard_limit);
        limit as usize
    }
}
