// tests/harness/mock_client.rs
//
// Mock mail-capture client for testing.
// Records all actions for verification and operates against a VirtualMailbox.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use mail_harness::client_ops::{Clock, MailboxClient};
use mail_harness::error::MailboxError;
use mail_harness::message::{MessageContent, MessageSummary};
use mail_harness::utils::mailbox_name;

use crate::harness::virtual_clock::VirtualClock;
use crate::harness::virtual_mailbox::VirtualMailbox;

/// Recorded action types for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAction {
    /// Mailbox was purged
    Reset { mailbox: String },
    /// Mailbox was listed; `count` is how many summaries came back
    List { mailbox: String, count: usize },
    /// One message was fetched
    Fetch { mailbox: String, id: String },
}

impl RecordedAction {
    pub fn is_reset_of(&self, name: &str) -> bool {
        matches!(self, RecordedAction::Reset { mailbox } if mailbox == name)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, RecordedAction::List { .. })
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, RecordedAction::Fetch { .. })
    }
}

/// Failure modes the mock can inject in place of a real answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    /// Connection refused; transient.
    Unreachable,
    /// HTTP 503; transient.
    ServerError,
    /// HTTP 400; permanent.
    BadRequest,
    /// Listed message vanished before fetch.
    NotFound,
}

impl Fault {
    fn error(&self, mailbox: &str, id: &str) -> MailboxError {
        let url = format!("http://mock/api/v1/mailbox/{}", mailbox);
        match self {
            Fault::Unreachable => MailboxError::Unreachable("connection refused".to_string()),
            Fault::ServerError => MailboxError::Status {
                status: 503,
                url,
                body: "service unavailable".to_string(),
            },
            Fault::BadRequest => MailboxError::Status {
                status: 400,
                url,
                body: "bad mailbox name".to_string(),
            },
            Fault::NotFound => MailboxError::NotFound {
                mailbox: mailbox.to_string(),
                id: id.to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    reset: VecDeque<Option<Fault>>,
    list: VecDeque<Fault>,
    fetch: Option<Fault>,
}

/// Mock capture client for testing.
/// Clones share the mailbox, the action log and the fault queue.
#[derive(Clone)]
pub struct MockMailboxClient {
    mailbox: Arc<RwLock<VirtualMailbox>>,
    actions: Arc<RwLock<Vec<RecordedAction>>>,
    faults: Arc<RwLock<Faults>>,
    list_latency: Arc<RwLock<Duration>>,
    clock: VirtualClock,
}

impl MockMailboxClient {
    /// Create a new mock client with the given mailbox and clock.
    pub fn new(mailbox: Arc<RwLock<VirtualMailbox>>, clock: VirtualClock) -> Self {
        Self {
            mailbox,
            actions: Arc::new(RwLock::new(Vec::new())),
            faults: Arc::new(RwLock::new(Faults::default())),
            list_latency: Arc::new(RwLock::new(Duration::ZERO)),
            clock,
        }
    }

    /// Every listing takes this long on the virtual clock.
    pub fn set_list_latency(&self, latency: Duration) {
        *self.list_latency.write().unwrap() = latency;
    }

    // ===== Fault Injection =====

    /// The next `count` resets fail with `fault`.
    pub fn fail_resets(&self, count: usize, fault: Fault) {
        let mut faults = self.faults.write().unwrap();
        faults.reset.extend(std::iter::repeat(Some(fault)).take(count));
    }

    /// Let `count` resets through before any queued reset fault applies.
    pub fn pass_resets(&self, count: usize) {
        let mut faults = self.faults.write().unwrap();
        faults.reset.extend(std::iter::repeat(None).take(count));
    }

    /// The next `count` listings fail with `fault`.
    pub fn fail_lists(&self, count: usize, fault: Fault) {
        let mut faults = self.faults.write().unwrap();
        faults.list.extend(std::iter::repeat(fault).take(count));
    }

    /// Every fetch fails with `fault` from now on.
    pub fn fail_fetches(&self, fault: Fault) {
        self.faults.write().unwrap().fetch = Some(fault);
    }

    // ===== Action Inspection =====

    /// Get all recorded actions.
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.actions.read().unwrap().clone()
    }

    /// Clear all recorded actions.
    pub fn clear_actions(&self) {
        self.actions.write().unwrap().clear();
    }

    pub fn reset_count(&self) -> usize {
        self.actions().iter().filter(|a| matches!(a, RecordedAction::Reset { .. })).count()
    }

    pub fn list_count(&self) -> usize {
        self.actions().iter().filter(|a| a.is_list()).count()
    }

    pub fn fetch_count(&self) -> usize {
        self.actions().iter().filter(|a| a.is_fetch()).count()
    }

    fn record(&self, action: RecordedAction) {
        self.actions.write().unwrap().push(action);
    }
}

impl MailboxClient for MockMailboxClient {
    fn reset(&self, address: &str) -> Result<(), MailboxError> {
        let name = mailbox_name(address).to_lowercase();
        self.record(RecordedAction::Reset { mailbox: name.clone() });
        if let Some(Some(fault)) = self.faults.write().unwrap().reset.pop_front() {
            return Err(fault.error(&name, ""));
        }
        self.mailbox.write().unwrap().purge(address);
        Ok(())
    }

    fn list(&self, address: &str) -> Result<Vec<MessageSummary>, MailboxError> {
        let name = mailbox_name(address).to_lowercase();
        let latency = *self.list_latency.read().unwrap();
        if !latency.is_zero() {
            self.clock.sleep(latency);
        }
        let fault = self.faults.write().unwrap().list.pop_front();
        // a failed listing still lets in-flight mail progress
        let listing = self.mailbox.write().unwrap().list(address);
        if let Some(fault) = fault {
            self.record(RecordedAction::List { mailbox: name.clone(), count: 0 });
            return Err(fault.error(&name, ""));
        }
        self.record(RecordedAction::List {
            mailbox: name,
            count: listing.len(),
        });
        Ok(listing)
    }

    fn fetch(&self, address: &str, id: &str) -> Result<MessageContent, MailboxError> {
        let name = mailbox_name(address).to_lowercase();
        self.record(RecordedAction::Fetch {
            mailbox: name.clone(),
            id: id.to_string(),
        });
        if let Some(fault) = self.faults.read().unwrap().fetch {
            return Err(fault.error(&name, id));
        }
        self.mailbox
            .read()
            .unwrap()
            .get(address, id)
            .map(|message| message.content(&name))
            .ok_or_else(|| Fault::NotFound.error(&name, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::virtual_mailbox::StoredMessage;
    use mail_harness::error::Transience;

    fn client() -> MockMailboxClient {
        MockMailboxClient::new(Arc::new(RwLock::new(VirtualMailbox::new())), VirtualClock::new())
    }

    #[test]
    fn test_operations_are_recorded() {
        let client = client();
        let id = client
            .mailbox
            .write()
            .unwrap()
            .deliver("test@example.com", StoredMessage::new("<test@example.com>", "Hi", "<p>hi</p>"));

        client.list("test@example.com").unwrap();
        let content = client.fetch("test@example.com", &id).unwrap();
        client.reset("test@example.com").unwrap();

        assert_eq!(content.body.html, "<p>hi</p>");
        assert_eq!(
            client.actions(),
            vec![
                RecordedAction::List { mailbox: "test".into(), count: 1 },
                RecordedAction::Fetch { mailbox: "test".into(), id },
                RecordedAction::Reset { mailbox: "test".into() },
            ]
        );
        assert!(client.list("test@example.com").unwrap().is_empty());
    }

    #[test]
    fn test_list_faults_are_consumed_in_order() {
        let client = client();
        client.fail_lists(1, Fault::ServerError);
        client.fail_lists(1, Fault::BadRequest);

        assert!(client.list("test@example.com").unwrap_err().is_transient());
        assert!(!client.list("test@example.com").unwrap_err().is_transient());
        assert!(client.list("test@example.com").is_ok());
    }

    #[test]
    fn test_fetch_of_unknown_id_is_not_found() {
        let client = client();
        let err = client.fetch("test@example.com", "missing").unwrap_err();
        assert!(matches!(err, MailboxError::NotFound { .. }));
    }

    #[test]
    fn test_list_latency_advances_the_clock() {
        let client = client();
        let before = client.clock.now();
        client.set_list_latency(Duration::from_secs(3));
        client.list("test@example.com").unwrap();
        assert_eq!(client.clock.now() - before, chrono::Duration::seconds(3));
    }

    #[test]
    fn test_reset_fault() {
        let client = client();
        client.fail_resets(1, Fault::Unreachable);
        assert!(client.reset("test@example.com").is_err());
        assert!(client.reset("test@example.com").is_ok());
        assert_eq!(client.reset_count(), 2);
    }
}
