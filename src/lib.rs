// src/lib.rs
//
// Library entry point for mail-harness.
// Re-exports modules needed by the binary and integration tests.

pub mod cfg;
pub mod client_ops;
pub mod error;
pub mod golden;
pub mod inbucket;
pub mod message;
pub mod notification;
pub mod notifier;
pub mod retry;
pub mod scenario;
pub mod utils;

pub use client_ops::{Clock, MailboxClient, RealClock};
pub use error::{MailboxError, Transience};
pub use golden::{ComparisonResult, Comparator, GoldenDocument};
pub use inbucket::InbucketClient;
pub use message::{MessageContent, MessageSummary};
pub use notification::{Notification, NotificationEvent, NotificationKind, NotificationService, Token};
pub use retry::{Poller, RetryOutcome};
pub use scenario::{Scenario, ScenarioDriver, ScenarioOutcome, ScenarioReport, Verdict};
