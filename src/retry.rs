// src/retry.rs
//
// Bounded polling loop used to absorb delivery latency.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use std::fmt::Display;

use crate::cfg::policy::PollPolicy;
use crate::client_ops::Clock;
use crate::error::Transience;

/// What the final unsuccessful attempt saw.
#[derive(Debug)]
pub enum LastObservation<E> {
    Empty,
    Error(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    AttemptsSpent,
    DeadlineReached,
}

/// Result of `Poller::poll_until_non_empty`.
///
/// `Exhausted` means "could not be confirmed", never "did not happen".
#[must_use]
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success { items: Vec<T>, attempts: u32 },
    Exhausted {
        attempts: u32,
        last: LastObservation<E>,
        reason: ExhaustReason,
    },
    /// A non-transient error stopped polling before the budget ran out.
    Aborted { attempts: u32, error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Aborted { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }
}

pub struct Poller<C: Clock> {
    policy: PollPolicy,
    clock: C,
}

impl<C: Clock> Poller<C> {
    pub fn new(policy: PollPolicy, clock: C) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Invoke `operation` until it yields a non-empty sequence, the attempt
    /// budget is spent, the wall-clock budget would be crossed by the next
    /// wait, or it fails with a non-transient error. The wall-clock budget
    /// starts now.
    pub fn poll_until_non_empty<T, E, F>(&self, operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<Vec<T>, E>,
        E: Transience + Display,
    {
        let deadline = self.policy.deadline_from(self.clock.now());
        self.poll_until_non_empty_by(deadline, operation)
    }

    /// Like `poll_until_non_empty`, against a deadline fixed by the caller.
    /// No attempt is made once `deadline` has passed, and no wait is started
    /// that would end after it.
    pub fn poll_until_non_empty_by<T, E, F>(&self, deadline: DateTime<Utc>, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<Vec<T>, E>,
        E: Transience + Display,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last = LastObservation::Empty;

        if max_attempts > 0 && self.clock.now() > deadline {
            warn!("Scenario budget spent before polling started");
            return RetryOutcome::Exhausted {
                attempts: 0,
                last,
                reason: ExhaustReason::DeadlineReached,
            };
        }

        for attempt in 1..=max_attempts {
            match operation() {
                Ok(items) if !items.is_empty() => {
                    debug!("Attempt {}/{} returned {} items", attempt, max_attempts, items.len());
                    return RetryOutcome::Success { items, attempts: attempt };
                }
                Ok(_) => {
                    debug!("Attempt {}/{} returned nothing", attempt, max_attempts);
                    last = LastObservation::Empty;
                }
                Err(error) if !error.is_transient() => {
                    warn!("Attempt {}/{} failed permanently: {}", attempt, max_attempts, error);
                    return RetryOutcome::Aborted { attempts: attempt, error };
                }
                Err(error) => {
                    warn!("Attempt {}/{} failed: {}", attempt, max_attempts, error);
                    last = LastObservation::Error(error);
                }
            }

            if attempt == max_attempts {
                break;
            }

            let delay = self.policy.delay_after(attempt);
            let resumes_at = ChronoDuration::from_std(delay)
                .ok()
                .and_then(|wait| self.clock.now().checked_add_signed(wait));
            if !matches!(resumes_at, Some(at) if at <= deadline) {
                warn!(
                    "Giving up after {} attempts: next wait of {:?} would pass the {:?} scenario budget",
                    attempt, delay, self.policy.scenario_timeout
                );
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last,
                    reason: ExhaustReason::DeadlineReached,
                };
            }

            info!("retrying in {:?}...", delay);
            self.clock.sleep(delay);
        }

        RetryOutcome::Exhausted {
            attempts: max_attempts,
            last,
            reason: ExhaustReason::AttemptsSpent,
        }
    }
}
