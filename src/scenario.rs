// src/scenario.rs
//
// Per-notification verification pipeline:
// reset → trigger → poll → locate → fetch → compare.

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use globset::{Glob, GlobSetBuilder};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cfg::policy::{LengthPolicy, OnExhausted, PollPolicy, RecipientMatch};
use crate::client_ops::{Clock, MailboxClient};
use crate::error::MailboxError;
use crate::golden::{ComparisonResult, Comparator, GoldenDocument};
use crate::message::{locate, MessageSummary};
use crate::notification::{Notification, NotificationEvent, NotificationKind, NotificationService};
use crate::retry::{ExhaustReason, LastObservation, Poller, RetryOutcome};
use crate::utils::{mailbox_name, unique_recipient};

pub const REFERENCE_RECIPIENT: &str = "test@example.com";
pub const REFERENCE_SITE_URL: &str = "site_url";

/// One end-to-end verification for a single notification kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub notification: Notification,
    pub golden: PathBuf,
}

impl Scenario {
    pub fn new(notification: Notification, golden: impl Into<PathBuf>) -> Self {
        Self {
            notification,
            golden: golden.into(),
        }
    }

    /// The reference payload for `kind`, with its golden under `golden_dir`.
    pub fn reference(kind: NotificationKind, recipient: &str, golden_dir: &Path) -> Self {
        Self::new(
            Notification {
                recipient: recipient.to_string(),
                locale: String::new(),
                site_url: REFERENCE_SITE_URL.to_string(),
                event: NotificationEvent::reference(kind),
            },
            golden_dir.join(kind.golden_file()),
        )
    }

    pub fn reference_suite(recipient: &str, golden_dir: &Path) -> Vec<Self> {
        NotificationKind::ALL
            .iter()
            .map(|kind| Self::reference(*kind, recipient, golden_dir))
            .collect()
    }

    pub fn kind(&self) -> NotificationKind {
        self.notification.kind()
    }

    pub fn address(&self) -> &str {
        &self.notification.recipient
    }

    /// Move this scenario onto its own `{local}-{kind}@{domain}` mailbox.
    pub fn with_unique_recipient(mut self) -> Self {
        self.notification.recipient = unique_recipient(&self.notification.recipient, &self.kind().to_string());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Reset,
    Triggered,
    Polling,
    Located,
    Fetched,
    Compared,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reset => "reset",
            Stage::Triggered => "trigger",
            Stage::Polling => "polling",
            Stage::Located => "locate",
            Stage::Fetched => "fetch",
            Stage::Compared => "compare",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScenarioOutcome {
    Passed {
        message_id: String,
        lines_compared: usize,
    },
    /// Nothing observed within the poll budget.
    DeliveryNotConfirmed { attempts: u32, detail: String },
    /// The capture service could not be used; says nothing about the system under test.
    EnvironmentFailure { stage: Stage, detail: String },
    WrongRecipient { address: String, recipients: Vec<String> },
    ContentMismatch {
        index: usize,
        expected: Option<String>,
        actual: Option<String>,
    },
    GoldenUnavailable { path: PathBuf, detail: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Skipped,
    EnvironmentError,
    Failed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Verdict::Passed => "PASS",
            Verdict::Skipped => "SKIP",
            Verdict::EnvironmentError => "ENV",
            Verdict::Failed => "FAIL",
        };
        f.write_str(tag)
    }
}

impl ScenarioOutcome {
    pub fn verdict(&self, on_exhausted: OnExhausted) -> Verdict {
        match self {
            ScenarioOutcome::Passed { .. } => Verdict::Passed,
            ScenarioOutcome::DeliveryNotConfirmed { .. } => match on_exhausted {
                OnExhausted::Skip => Verdict::Skipped,
                OnExhausted::Fail => Verdict::Failed,
            },
            ScenarioOutcome::EnvironmentFailure { .. } => Verdict::EnvironmentError,
            ScenarioOutcome::WrongRecipient { .. }
            | ScenarioOutcome::ContentMismatch { .. }
            | ScenarioOutcome::GoldenUnavailable { .. } => Verdict::Failed,
        }
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioOutcome::Passed { message_id, lines_compared } => {
                write!(f, "message {} matched {} lines", message_id, lines_compared)
            }
            ScenarioOutcome::DeliveryNotConfirmed { attempts, detail } => {
                write!(f, "delivery not confirmed after {} attempts: {}", attempts, detail)
            }
            ScenarioOutcome::EnvironmentFailure { stage, detail } => {
                write!(f, "environment failure during {}: {}", stage, detail)
            }
            ScenarioOutcome::WrongRecipient { address, recipients } => {
                write!(f, "wrong To recipient: expected {}, saw {:?}", address, recipients)
            }
            ScenarioOutcome::ContentMismatch { index, expected, actual } => write!(
                f,
                "{}",
                ComparisonResult::Mismatch {
                    index: *index,
                    expected: expected.clone(),
                    actual: actual.clone(),
                }
            ),
            ScenarioOutcome::GoldenUnavailable { path, detail } => {
                write!(f, "golden {} unavailable: {}", path.display(), detail)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub kind: NotificationKind,
    pub address: String,
    /// Last stage reached.
    pub stage: Stage,
    pub outcome: ScenarioOutcome,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} <{}>: {} ({:.1}s)",
            self.verdict,
            self.kind,
            self.address,
            self.outcome,
            self.elapsed.as_secs_f64()
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub skipped: usize,
    pub environment: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn of(reports: &[ScenarioReport]) -> Self {
        let mut summary = RunSummary::default();
        for report in reports {
            match report.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Skipped => summary.skipped += 1,
                Verdict::EnvironmentError => summary.environment += 1,
                Verdict::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} skipped, {} environment errors, {} failed",
            self.passed, self.skipped, self.environment, self.failed
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverSettings {
    pub poll: PollPolicy,
    pub on_exhausted: OnExhausted,
    pub recipient_match: RecipientMatch,
    pub length_policy: LengthPolicy,
    /// Best-effort purge of the mailbox when a scenario ends without passing.
    pub reset_on_exit: bool,
}

/// Runs scenarios against injected collaborators.
pub struct ScenarioDriver<M, N, C> {
    mailbox: M,
    notifier: N,
    clock: C,
    settings: DriverSettings,
}

impl<M, N, C> ScenarioDriver<M, N, C>
where
    M: MailboxClient,
    N: NotificationService,
    C: Clock,
{
    pub fn new(mailbox: M, notifier: N, clock: C, settings: DriverSettings) -> Self {
        Self {
            mailbox,
            notifier,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Full pipeline for one scenario.
    pub fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started = self.clock.now();
        let deadline = self.settings.poll.deadline_from(started);
        let address = scenario.address();
        info!("▶ {} → {}", scenario.kind(), address);

        debug!("{}: entering {}", scenario.kind(), Stage::Reset);
        if let Err(e) = self.mailbox.reset(address) {
            error!("Could not reset mailbox for {}: {}", address, e);
            return self.report(
                scenario,
                started,
                Stage::Reset,
                ScenarioOutcome::EnvironmentFailure {
                    stage: Stage::Reset,
                    detail: e.to_string(),
                },
            );
        }

        debug!("{}: entering {}", scenario.kind(), Stage::Triggered);
        if let Err(e) = scenario.notification.send(&self.notifier) {
            // verdicts come from the mailbox only
            warn!("{} notification call returned an error: {}", scenario.kind(), e);
        }

        let (stage, outcome) = self.observe(scenario, deadline);
        if self.settings.reset_on_exit && !matches!(outcome, ScenarioOutcome::Passed { .. }) {
            self.reset_quietly(address);
        }
        self.report(scenario, started, stage, outcome)
    }

    /// Verify a message that was already delivered: no reset, no trigger.
    pub fn verify_delivered(&self, scenario: &Scenario) -> ScenarioReport {
        let started = self.clock.now();
        let deadline = self.settings.poll.deadline_from(started);
        let (stage, outcome) = self.observe(scenario, deadline);
        self.report(scenario, started, stage, outcome)
    }

    /// Run every scenario on its own thread. Scenarios must not share a mailbox.
    pub fn run_all(&self, scenarios: &[Scenario]) -> Result<Vec<ScenarioReport>> {
        ensure_distinct_mailboxes(scenarios)?;
        std::thread::scope(|scope| {
            let handles: Vec<_> = scenarios
                .iter()
                .map(|scenario| scope.spawn(move || self.run(scenario)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().map_err(|_| eyre!("scenario thread panicked")))
                .collect()
        })
    }

    pub fn run_sequential(&self, scenarios: &[Scenario]) -> Vec<ScenarioReport> {
        scenarios.iter().map(|scenario| self.run(scenario)).collect()
    }

    /// Poll, locate, fetch and compare; nothing starts after `deadline`.
    fn observe(&self, scenario: &Scenario, deadline: DateTime<Utc>) -> (Stage, ScenarioOutcome) {
        let kind = scenario.kind();
        let address = scenario.address();

        debug!("{}: entering {}", kind, Stage::Polling);
        let poller = Poller::new(self.settings.poll.clone(), self.clock.clone());
        let summaries = match poller.poll_until_non_empty_by(deadline, || self.mailbox.list(address)) {
            RetryOutcome::Success { items, attempts } => {
                info!("📬 {} message(s) for {} after {} attempt(s)", items.len(), address, attempts);
                items
            }
            RetryOutcome::Exhausted { attempts, last, reason } => {
                return (Stage::Polling, exhausted_outcome(attempts, last, reason, address));
            }
            RetryOutcome::Aborted { error, .. } => {
                error!("Polling {} aborted: {}", address, error);
                return (
                    Stage::Polling,
                    ScenarioOutcome::EnvironmentFailure {
                        stage: Stage::Polling,
                        detail: error.to_string(),
                    },
                );
            }
        };

        debug!("{}: entering {}", kind, Stage::Located);
        let located = match locate(&summaries, address, self.settings.recipient_match) {
            Some(summary) => summary,
            None => {
                let recipients = all_recipients(&summaries);
                error!("Wrong To recipient for {}: {:?}", address, recipients);
                return (
                    Stage::Located,
                    ScenarioOutcome::WrongRecipient {
                        address: address.to_string(),
                        recipients,
                    },
                );
            }
        };

        debug!("{}: entering {}", kind, Stage::Fetched);
        if self.clock.now() > deadline {
            error!("Scenario budget for {} spent before fetching {}", address, located.id);
            return (
                Stage::Fetched,
                ScenarioOutcome::EnvironmentFailure {
                    stage: Stage::Fetched,
                    detail: format!(
                        "scenario timeout of {:?} reached before message {} could be fetched",
                        self.settings.poll.scenario_timeout, located.id
                    ),
                },
            );
        }
        let content = match self.mailbox.fetch(address, &located.id) {
            Ok(content) => content,
            Err(e) => {
                error!("Could not fetch message {} for {}: {}", located.id, address, e);
                return (
                    Stage::Fetched,
                    ScenarioOutcome::EnvironmentFailure {
                        stage: Stage::Fetched,
                        detail: e.to_string(),
                    },
                );
            }
        };

        debug!("{}: entering {}", kind, Stage::Compared);
        let golden = match GoldenDocument::load(&scenario.golden) {
            Ok(golden) => golden,
            Err(e) => {
                error!("{}", e);
                return (
                    Stage::Compared,
                    ScenarioOutcome::GoldenUnavailable {
                        path: scenario.golden.clone(),
                        detail: e.to_string(),
                    },
                );
            }
        };
        let outcome = match Comparator::new(self.settings.length_policy).compare(&golden, &content.body.html) {
            ComparisonResult::Match { lines_compared } => ScenarioOutcome::Passed {
                message_id: content.id,
                lines_compared,
            },
            ComparisonResult::Mismatch { index, expected, actual } => {
                error!("{} content mismatch at line {}", kind, index + 1);
                ScenarioOutcome::ContentMismatch { index, expected, actual }
            }
        };
        (Stage::Done, outcome)
    }

    fn reset_quietly(&self, address: &str) {
        if let Err(e) = self.mailbox.reset(address) {
            warn!("Best-effort reset of {} failed: {}", address, e);
        }
    }

    fn report(
        &self,
        scenario: &Scenario,
        started: DateTime<Utc>,
        stage: Stage,
        outcome: ScenarioOutcome,
    ) -> ScenarioReport {
        let elapsed = self
            .clock
            .now()
            .signed_duration_since(started)
            .to_std()
            .unwrap_or_default();
        let verdict = outcome.verdict(self.settings.on_exhausted);
        match verdict {
            Verdict::Passed => info!("✅ {}: {}", scenario.kind(), outcome),
            Verdict::Skipped => warn!("{}: {}; skipping verification", scenario.kind(), outcome),
            Verdict::EnvironmentError => error!("{}: {}", scenario.kind(), outcome),
            Verdict::Failed => error!("❌ {}: {}", scenario.kind(), outcome),
        }
        ScenarioReport {
            kind: scenario.kind(),
            address: scenario.address().to_string(),
            stage,
            outcome,
            verdict,
            elapsed,
        }
    }
}

fn exhausted_outcome(
    attempts: u32,
    last: LastObservation<MailboxError>,
    reason: ExhaustReason,
    address: &str,
) -> ScenarioOutcome {
    match last {
        LastObservation::Error(MailboxError::Unreachable(detail)) => ScenarioOutcome::EnvironmentFailure {
            stage: Stage::Polling,
            detail,
        },
        LastObservation::Error(e) => ScenarioOutcome::DeliveryNotConfirmed {
            attempts,
            detail: format!("last error: {}", e),
        },
        LastObservation::Empty => {
            let detail = match reason {
                ExhaustReason::AttemptsSpent => format!("mailbox for {} stayed empty", address),
                ExhaustReason::DeadlineReached => {
                    format!("mailbox for {} stayed empty until the scenario timeout", address)
                }
            };
            ScenarioOutcome::DeliveryNotConfirmed { attempts, detail }
        }
    }
}

fn all_recipients(summaries: &[MessageSummary]) -> Vec<String> {
    summaries.iter().flat_map(|s| s.to.iter().cloned()).collect()
}

/// Reject scenario sets where two scenarios would race on one mailbox.
pub fn ensure_distinct_mailboxes(scenarios: &[Scenario]) -> Result<()> {
    let mut seen: HashMap<String, NotificationKind> = HashMap::new();
    for scenario in scenarios {
        let key = mailbox_name(scenario.address()).to_lowercase();
        if let Some(previous) = seen.insert(key.clone(), scenario.kind()) {
            return Err(eyre!(
                "Scenarios {} and {} share mailbox '{}'; use distinct recipients to run them concurrently",
                previous,
                scenario.kind(),
                key
            ));
        }
    }
    Ok(())
}

/// Keep scenarios whose kind name matches any of `patterns`; no patterns keeps all.
pub fn filter_by_kind(scenarios: Vec<Scenario>, patterns: &[String]) -> Result<Vec<Scenario>> {
    if patterns.is_empty() {
        return Ok(scenarios);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| eyre!("Invalid pattern '{}': {}", pattern, e))?);
    }
    let set = builder.build()?;
    Ok(scenarios
        .into_iter()
        .filter(|s| set.is_match(s.kind().to_string()))
        .collect())
}
