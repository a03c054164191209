// src/client_ops.rs
//
// Trait abstraction for mail-capture operations and time.
// Allows the scenario driver to work with a real capture service or test mocks.

use chrono::{DateTime, Utc};

use crate::error::MailboxError;
use crate::message::{MessageContent, MessageSummary};

/// Trait for mail-capture service operations.
/// Implementations take `&self` so one client can serve concurrent scenarios.
pub trait MailboxClient: Send + Sync {
    /// Delete every message held for `address`.
    fn reset(&self, address: &str) -> Result<(), MailboxError>;

    /// List what is currently held for `address`. Empty is not an error.
    fn list(&self, address: &str) -> Result<Vec<MessageSummary>, MailboxError>;

    /// Fetch the full content of one message.
    fn fetch(&self, address: &str, id: &str) -> Result<MessageContent, MailboxError>;
}

impl<T: MailboxClient + ?Sized> MailboxClient for &T {
    fn reset(&self, address: &str) -> Result<(), MailboxError> {
        (**self).reset(address)
    }

    fn list(&self, address: &str) -> Result<Vec<MessageSummary>, MailboxError> {
        (**self).list(address)
    }

    fn fetch(&self, address: &str, id: &str) -> Result<MessageContent, MailboxError> {
        (**self).fetch(address, id)
    }
}

/// Trait for time providers.
/// Allows production code to use real time or virtual time for testing.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Block the caller for `duration`.
    fn sleep(&self, duration: std::time::Duration);
}

/// Real clock implementation using system time.
#[derive(Clone, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: std::time::Duration) {
        std::thread::sleep(duration);
    }
}
