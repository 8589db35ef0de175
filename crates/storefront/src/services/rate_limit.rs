//! Per-identifier login throttling.
//!
//! Keeps the timestamps of recent failed attempts for each identifier
//! (registered or not). The order of operations matters:
//!
//! 1. prune timestamps older than the window
//! 2. if the remaining count has reached the threshold, refuse without
//!    recording, so probing does not extend the block
//! 3. on success clear the record, on failure append
//!
//! Each identifier's record sits behind its own async mutex, so concurrent
//! attempts against one identifier cannot lose updates.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tokio::sync::Mutex;

use fashion_hub_core::Identifier;

use crate::clock::{Clock, span};

type AttemptLog = Arc<Mutex<VecDeque<DateTime<Utc>>>>;

/// How an authentication attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// Whether an attempt may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Blocked,
}

/// Sliding-window limiter over failed login attempts.
#[derive(Clone)]
pub struct LoginRateLimiter {
    records: Cache<Identifier, AttemptLog>,
    window: chrono::Duration,
    max_failures: usize,
    clock: Arc<dyn Clock>,
}

impl LoginRateLimiter {
    /// Create a limiter allowing `max_failures` failures per `window`.
    #[must_use]
    pub fn new(window: Duration, max_failures: u32, clock: Arc<dyn Clock>) -> Self {
        // No size bound: evicting a live record would forget its failures.
        // A record idle for a whole window only holds prunable timestamps.
        let records = Cache::builder().time_to_idle(window).build();

        Self {
            records,
            window: span(window),
            max_failures: usize::try_from(max_failures).unwrap_or(usize::MAX),
            clock,
        }
    }

    /// Record an attempt and decide whether it was admitted.
    pub async fn check_and_record(
        &self,
        identifier: &Identifier,
        outcome: AttemptOutcome,
    ) -> Admission {
        let log = self
            .records
            .get_with(identifier.clone(), async { AttemptLog::default() })
            .await;
        let mut attempts = log.lock().await;
        let now = self.clock.now();
        self.prune(&mut attempts, now);

        if attempts.len() >= self.max_failures {
            tracing::warn!(identifier = %identifier, "login attempt blocked by rate limiter");
            return Admission::Blocked;
        }

        match outcome {
            AttemptOutcome::Success => attempts.clear(),
            AttemptOutcome::Failure => attempts.push_back(now),
        }
        Admission::Allowed
    }

    /// Whether the next attempt would be blocked. Records nothing.
    ///
    /// Lets callers skip the password hash entirely while blocked.
    pub async fn is_blocked(&self, identifier: &Identifier) -> bool {
        let Some(log) = self.records.get(identifier).await else {
            return false;
        };
        let mut attempts = log.lock().await;
        self.prune(&mut attempts, self.clock.now());
        attempts.len() >= self.max_failures
    }

    fn prune(&self, attempts: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return;
        };
        while attempts.front().is_some_and(|t| *t < cutoff) {
            attempts.pop_front();
        }
    }
}
