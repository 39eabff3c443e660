//! Deadline-bounded condition polling
//!
//! Waits for an asynchronous predicate evaluated against live external state
//! (rendered rows, a reachable URL, a sort indicator) to become true.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{Error, Result};

/// Default deadline for a poll (15 seconds)
pub const DEFAULT_DEADLINE_MS: u64 = 15_000;

/// Default interval between predicate evaluations
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Smallest interval a poll will sleep for
pub const MIN_INTERVAL_MS: u64 = 10;

/// Deadline and cadence for a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOptions {
    pub deadline: Duration,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
        }
    }
}

impl PollOptions {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Default::default()
        }
    }

    pub fn from_millis(deadline_ms: u64, interval_ms: u64) -> Self {
        Self {
            deadline: Duration::from_millis(deadline_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Outcome of a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    /// Whether the predicate became true before the deadline
    pub satisfied: bool,
    pub elapsed: Duration,
    pub attempts: u32,
    /// Most recent transient predicate error, if any
    pub last_error: Option<String>,
}

impl PollResult {
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Convert a timeout into [`Error::Timeout`] describing `what`
    pub fn into_result(self, what: &str) -> Result<Duration> {
        if self.satisfied {
            Ok(self.elapsed)
        } else {
            Err(Error::Timeout {
                what: what.to_string(),
                elapsed_ms: self.elapsed.as_millis() as u64,
                last_error: self.last_error,
            })
        }
    }
}

/// Attempt bookkeeping shared by the poll entry points
struct Attempts {
    start: Instant,
    deadline: Duration,
    interval: Duration,
    count: u32,
    last_error: Option<String>,
}

impl Attempts {
    fn new(options: PollOptions) -> Self {
        Self {
            start: Instant::now(),
            deadline: options.deadline,
            interval: options.interval.max(Duration::from_millis(MIN_INTERVAL_MS)),
            count: 0,
            last_error: None,
        }
    }

    /// Record one evaluation; `Some` once the poll is finished
    fn record<E: Display>(&mut self, outcome: std::result::Result<bool, E>) -> Option<PollResult> {
        self.count += 1;

        let satisfied = match outcome {
            Ok(value) => value,
            Err(e) => {
                debug!("Transient predicate error (attempt {}): {}", self.count, e);
                self.last_error = Some(e.to_string());
                false
            }
        };

        let elapsed = self.start.elapsed();
        if satisfied || elapsed >= self.deadline {
            debug!(
                "Condition {} after {} attempt(s) ({:?})",
                if satisfied { "met" } else { "not met" },
                self.count,
                elapsed
            );
            return Some(PollResult {
                satisfied,
                elapsed,
                attempts: self.count,
                last_error: self.last_error.take(),
            });
        }
        None
    }

    async fn pause(&self) {
        let elapsed = self.start.elapsed();
        sleep(self.interval.min(self.deadline.saturating_sub(elapsed))).await;
    }
}

/// Poll `predicate` until it returns `Ok(true)` or the deadline elapses
///
/// Errors from the predicate are treated as "not yet true". The predicate
/// is evaluated one final time at the deadline before the poll gives up.
pub async fn poll_until<F, Fut, E>(mut predicate: F, options: PollOptions) -> PollResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, E>>,
    E: Display,
{
    let mut attempts = Attempts::new(options);
    loop {
        if let Some(result) = attempts.record(predicate().await) {
            return result;
        }
        attempts.pause().await;
    }
}

/// Like [`poll_until`], lending `state` mutably to every evaluation
///
/// Used when the predicate queries a collaborator it must borrow, such as
/// a live page handle.
pub async fn poll_with<S, F, E>(state: &mut S, mut predicate: F, options: PollOptions) -> PollResult
where
    S: ?Sized,
    F: FnMut(&mut S) -> BoxFuture<'_, std::result::Result<bool, E>>,
    E: Display,
{
    let mut attempts = Attempts::new(options);
    loop {
        if let Some(result) = attempts.record(predicate(&mut *state).await) {
            return result;
        }
        attempts.pause().await;
    }
}
