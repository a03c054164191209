// tests/harness/virtual_mailbox.rs
//
// In-memory mail-capture service for testing.
// Simulates an Inbucket-style store keyed by mailbox name, including
// deliveries that only become visible after a number of listings.

use std::collections::HashMap;

use mail_harness::message::{MessageContent, MessageSummary};
use mail_harness::utils::mailbox_name;

/// A message held by the virtual capture service.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub html: String,
}

impl StoredMessage {
    /// Create a message with the minimal fields the harness inspects.
    pub fn new(to: &str, subject: &str, html: &str) -> Self {
        Self {
            id: String::new(),
            to: vec![to.to_string()],
            from: "<noreply@example.com>".to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        }
    }

    pub fn summary(&self, mailbox: &str) -> MessageSummary {
        let mut summary = MessageSummary::new(&self.id, &[]);
        summary.to = self.to.clone();
        summary.mailbox = mailbox.to_string();
        summary.from = self.from.clone();
        summary.subject = self.subject.clone();
        summary.size = self.html.len() as u64;
        summary
    }

    pub fn content(&self, mailbox: &str) -> MessageContent {
        let mut content = MessageContent::with_html(&self.id, &self.html);
        content.mailbox = mailbox.to_string();
        content.to = self.to.clone();
        content.from = self.from.clone();
        content.subject = self.subject.clone();
        content
    }
}

#[derive(Debug)]
struct InFlight {
    mailbox: String,
    listings_left: u32,
    message: StoredMessage,
}

/// In-memory capture service state.
#[derive(Debug, Default)]
pub struct VirtualMailbox {
    boxes: HashMap<String, Vec<StoredMessage>>,
    in_flight: Vec<InFlight>,
    next_id: u32,
}

fn key(address: &str) -> String {
    mailbox_name(address).to_lowercase()
}

impl VirtualMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&mut self, message: &mut StoredMessage) -> String {
        self.next_id += 1;
        message.id = format!("20240115T100000-{:04}", self.next_id);
        message.id.clone()
    }

    /// Store a message in the mailbox for `address`, visible immediately.
    pub fn deliver(&mut self, address: &str, message: StoredMessage) -> String {
        self.deliver_after(address, 0, message)
    }

    /// Store a message that stays invisible for the next `listings` listings
    /// of that mailbox.
    pub fn deliver_after(&mut self, address: &str, listings: u32, mut message: StoredMessage) -> String {
        let id = self.assign_id(&mut message);
        if listings == 0 {
            self.boxes.entry(key(address)).or_default().push(message);
        } else {
            self.in_flight.push(InFlight {
                mailbox: key(address),
                listings_left: listings,
                message,
            });
        }
        id
    }

    /// One listing as the capture service would answer it. Advances in-flight
    /// deliveries for this mailbox.
    pub fn list(&mut self, address: &str) -> Vec<MessageSummary> {
        let mailbox = key(address);
        let mut still_in_flight = Vec::new();
        for mut flight in std::mem::take(&mut self.in_flight) {
            if flight.mailbox != mailbox {
                still_in_flight.push(flight);
            } else if flight.listings_left == 0 {
                self.boxes.entry(mailbox.clone()).or_default().push(flight.message);
            } else {
                flight.listings_left -= 1;
                still_in_flight.push(flight);
            }
        }
        self.in_flight = still_in_flight;

        self.boxes
            .get(&mailbox)
            .map(|msgs| msgs.iter().map(|m| m.summary(&mailbox)).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, address: &str, id: &str) -> Option<&StoredMessage> {
        self.boxes.get(&key(address))?.iter().find(|m| m.id == id)
    }

    /// Remove every visible message for `address`; returns how many.
    pub fn purge(&mut self, address: &str) -> usize {
        self.boxes.remove(&key(address)).map(|msgs| msgs.len()).unwrap_or(0)
    }

    /// Visible messages for `address`.
    pub fn message_count(&self, address: &str) -> usize {
        self.boxes.get(&key(address)).map(|msgs| msgs.len()).unwrap_or(0)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_and_list() {
        let mut mailbox = VirtualMailbox::new();
        let id = mailbox.deliver("test@example.com", StoredMessage::new("<test@example.com>", "Hi", "<p>hi</p>"));

        let listing = mailbox.list("test@example.com");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, id);
        assert_eq!(listing[0].mailbox, "test");
        assert_eq!(mailbox.get("test@example.com", &id).unwrap().html, "<p>hi</p>");
    }

    #[test]
    fn test_mailboxes_are_keyed_by_local_part() {
        let mut mailbox = VirtualMailbox::new();
        mailbox.deliver("test@other.org", StoredMessage::new("<test@other.org>", "Hi", ""));
        assert_eq!(mailbox.list("TEST@example.com").len(), 1);
    }

    #[test]
    fn test_delayed_delivery_becomes_visible() {
        let mut mailbox = VirtualMailbox::new();
        mailbox.deliver_after("test@example.com", 2, StoredMessage::new("<test@example.com>", "Hi", ""));

        assert!(mailbox.list("test@example.com").is_empty());
        assert!(mailbox.list("test@example.com").is_empty());
        assert_eq!(mailbox.list("test@example.com").len(), 1);
        assert_eq!(mailbox.in_flight_count(), 0);
    }

    #[test]
    fn test_listing_other_mailbox_does_not_advance_delivery() {
        let mut mailbox = VirtualMailbox::new();
        mailbox.deliver_after("a@example.com", 1, StoredMessage::new("<a@example.com>", "Hi", ""));

        assert!(mailbox.list("b@example.com").is_empty());
        assert!(mailbox.list("b@example.com").is_empty());
        assert_eq!(mailbox.in_flight_count(), 1);
        assert!(mailbox.list("a@example.com").is_empty());
        assert_eq!(mailbox.list("a@example.com").len(), 1);
    }

    #[test]
    fn test_purge() {
        let mut mailbox = VirtualMailbox::new();
        mailbox.deliver("test@example.com", StoredMessage::new("<test@example.com>", "1", ""));
        mailbox.deliver("test@example.com", StoredMessage::new("<test@example.com>", "2", ""));
        assert_eq!(mailbox.purge("test@example.com"), 2);
        assert_eq!(mailbox.message_count("test@example.com"), 0);
        assert_eq!(mailbox.purge("test@example.com"), 0);
    }
}
