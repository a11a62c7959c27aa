use crate::catalog::VideoCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::events::{ChallengeEvent, EventSink, NullSink};
use crate::store::{ChallengeStore, MemoryStore};
use challenge_common::error::Operation;
use challenge_common::types::{Caller, Challenge, Timestamp};
use challenge_common::{resolve_phase, ChallengeError, Phase, Result};
use std::sync::Arc;

/// Entry point for the HTTP adapter: every challenge operation goes through here.
///
/// Cheap to share behind an `Arc`; all state lives in the store.
pub struct ChallengeService<S = MemoryStore> {
    pub(crate) store: S,
    pub(crate) catalog: Arc<dyn VideoCatalog>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) config: EngineConfig,
}

impl<S: ChallengeStore> ChallengeService<S> {
    pub fn new(store: S, catalog: Arc<dyn VideoCatalog>) -> Self {
        Self {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            events: Arc::new(NullSink),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Effective phase of a challenge right now.
    pub fn phase_of(&self, challenge: &Challenge) -> Phase {
        resolve_phase(challenge, self.now())
    }

    /// Only called once the store call has returned, never under a store lock.
    pub(crate) fn publish(&self, event: ChallengeEvent) {
        self.events.publish(event);
    }

    /// Run a store call, retrying once when the backend reports contention.
    /// A second contention is returned to the caller.
    pub(crate) fn with_retry<T>(
        &self,
        operation: &'static str,
        mut call: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        match call() {
            Err(e) if e.is_transient() => {
                tracing::warn!(operation, "store contention, retrying once");
                call()
            }
            other => other,
        }
    }
}

/// Reject `caller` unless they created the challenge or are an admin.
pub(crate) fn require_owner_or_admin(
    caller: &Caller,
    challenge: &Challenge,
    action: &'static str,
) -> Result<()> {
    if caller.id == challenge.creator_id || caller.role == challenge_common::types::Role::Admin {
        Ok(())
    } else {
        Err(ChallengeError::Forbidden {
            caller: caller.id,
            action,
        })
    }
}

pub(crate) fn invalid_phase(operation: Operation, phase: Phase) -> ChallengeError {
    ChallengeError::InvalidPhase { operation, phase }
}
