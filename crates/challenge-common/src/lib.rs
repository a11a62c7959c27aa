//! Shared records, phase resolution, ranking order and errors for community challenges.
//!
//! Everything here is pure: no locks, no clocks, no I/O. The engine crate owns
//! state and concurrency and calls into these functions so that time-window
//! logic and leaderboard ordering live in exactly one place.

pub mod error;
pub mod hashing;
pub mod normalization;
pub mod phase;
pub mod ranking;
pub mod types;

pub use error::{ChallengeError, ErrorKind, Result};
pub use phase::{resolve_phase, Phase};
