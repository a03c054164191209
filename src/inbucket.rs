// src/inbucket.rs
//
// HTTP client for an Inbucket-compatible mail-capture service.

use log::{debug, info};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::client_ops::MailboxClient;
use crate::error::MailboxError;
use crate::message::{MessageContent, MessageSummary};
use crate::utils::mailbox_name;

pub const MAILBOX_API: &str = "/api/v1/mailbox/";
pub const DEFAULT_HOST: &str = "dockerhost";
pub const DEFAULT_PORT: &str = "9000";

/// Base location assembled from `CI_HOST` and `CI_INBUCKET_PORT`.
pub fn base_url_from_env() -> String {
    let host = std::env::var("CI_HOST")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = std::env::var("CI_INBUCKET_PORT")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    format!("http://{}:{}", host, port)
}

pub struct InbucketClient {
    base_url: String,
    agent: ureq::Agent,
}

impl InbucketClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn mailbox_url(&self, address: &str) -> String {
        format!("{}{}{}", self.base_url, MAILBOX_API, mailbox_name(address))
    }

    fn message_url(&self, address: &str, id: &str) -> String {
        format!("{}/{}", self.mailbox_url(address), id)
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, MailboxError> {
    let body = response
        .into_string()
        .map_err(|e| MailboxError::Unreachable(format!("reading body from {}: {}", url, e)))?;
    serde_json::from_str(&body).map_err(|e| MailboxError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

impl MailboxClient for InbucketClient {
    fn reset(&self, address: &str) -> Result<(), MailboxError> {
        let url = self.mailbox_url(address);
        info!("Purging mailbox {}", url);
        match self.agent.delete(&url).call() {
            Ok(_) => Ok(()),
            // nothing to purge
            Err(ureq::Error::Status(404, _)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, address: &str) -> Result<Vec<MessageSummary>, MailboxError> {
        let url = self.mailbox_url(address);
        debug!("GET {}", url);
        match self.agent.get(&url).call() {
            Ok(response) => {
                let listing: Option<Vec<MessageSummary>> = decode(&url, response)?;
                let listing = listing.unwrap_or_default();
                debug!("Mailbox {} holds {} messages", url, listing.len());
                Ok(listing)
            }
            // mailbox not created yet
            Err(ureq::Error::Status(404, _)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch(&self, address: &str, id: &str) -> Result<MessageContent, MailboxError> {
        let url = self.message_url(address, id);
        debug!("GET {}", url);
        match self.agent.get(&url).call() {
            Ok(response) => decode(&url, response),
            Err(ureq::Error::Status(404, _)) => Err(MailboxError::NotFound {
                mailbox: mailbox_name(address).to_string(),
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
