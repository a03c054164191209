// src/error.rs
//
// Error taxonomy for mail-capture service access.

use thiserror::Error;

/// Tells the poll engine whether an error is worth another attempt.
pub trait Transience {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Error)]
pub enum MailboxError {
    /// Connection refused, DNS failure, request timeout.
    #[error("mail-capture service unreachable: {0}")]
    Unreachable(String),

    /// Non-success HTTP status from the capture service.
    #[error("unexpected status {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("message {id} not found in mailbox {mailbox}")]
    NotFound { mailbox: String, id: String },
}

impl Transience for MailboxError {
    fn is_transient(&self) -> bool {
        match self {
            MailboxError::Unreachable(_) => true,
            MailboxError::Status { status, .. } => *status >= 500 || *status == 429,
            MailboxError::Decode { .. } => false,
            MailboxError::NotFound { .. } => false,
        }
    }
}

impl From<ureq::Error> for MailboxError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let url = response.get_url().to_string();
                let body = response.into_string().unwrap_or_default();
                MailboxError::Status { status, url, body }
            }
            ureq::Error::Transport(transport) => MailboxError::Unreachable(transport.to_string()),
        }
    }
}
