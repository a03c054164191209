// tests/harness/mod.rs
//
// Integration testing harness for mail-harness.
// Provides an in-memory mail-capture service, a stub notification service
// and time control, so scenarios run without network access or real waits.

pub mod mock_client;
pub mod virtual_mailbox;

pub use fixtures::FixtureLoader;
pub use mock_client::{Fault, MockMailboxClient, RecordedAction};
pub use stub_notifier::{DeliveryMode, StubNotifier};
pub use test_harness::TestHarness;
pub use virtual_clock::VirtualClock;
pub use virtual_mailbox::{StoredMessage, VirtualMailbox};
