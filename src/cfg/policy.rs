// src/cfg/policy.rs
//
// Verification policies. Defaults reproduce the lenient reference behavior.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::utils::deserialize_duration;

/// How a located message's recipients are compared to the expected address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipientMatch {
    #[default]
    Substring,
    Exact,
}

/// Whether a line-count difference counts as a mismatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthPolicy {
    /// Only the overlapping line range is compared.
    #[default]
    Prefix,
    Strict,
}

/// What an exhausted poll means for the scenario verdict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnExhausted {
    #[default]
    Skip,
    Fail,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backoff {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PollPolicy {
    pub max_attempts: u32,

    #[serde(deserialize_with = "deserialize_duration")]
    pub delay: Duration,

    pub backoff: Backoff,

    #[serde(deserialize_with = "deserialize_duration")]
    pub max_delay: Duration,

    /// Wall-clock budget for a whole scenario, from reset through fetch.
    #[serde(deserialize_with = "deserialize_duration")]
    pub scenario_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
            max_delay: Duration::from_secs(30),
            scenario_timeout: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// Wait before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt.max(1)),
            Backoff::Exponential => {
                let shift = attempt.saturating_sub(1).min(16);
                self.delay.saturating_mul(1u32 << shift)
            }
        };
        delay.min(self.max_delay)
    }

    /// Instant by which a scenario started at `start` must be done.
    pub fn deadline_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        ChronoDuration::from_std(self.scenario_timeout)
            .ok()
            .and_then(|budget| start.checked_add_signed(budget))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
