//! Challenge lifecycle, entry admission, voting and leaderboard engine.
//!
//! [`ChallengeService`] is the facade an HTTP adapter calls. It resolves the
//! effective phase of a challenge on every call, delegates each counter
//! mutation to one atomic [`ChallengeStore`] primitive, and publishes
//! [`ChallengeEvent`]s for the notification collaborator. [`MemoryStore`]
//! keeps state in process and persists through checksummed CBOR snapshots.

pub mod admission;
pub mod audit;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod events;
pub mod leaderboard;
pub mod lifecycle;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod voting;

pub use catalog::{InMemoryCatalog, VideoCatalog, VideoInfo};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use events::{ChallengeEvent, EventSink, NullSink, RecordingSink};
pub use lifecycle::ChallengeView;
pub use service::ChallengeService;
pub use snapshot::{SnapshotError, StoreSnapshot};
pub use store::{ChallengeStore, MemoryStore, RemovedEntry};
