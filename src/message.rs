// src/message.rs
//
// Mailbox data model as exposed by the mail-capture service.

use mailparse::{addrparse, MailAddr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cfg::policy::RecipientMatch;

/// One entry in a mailbox listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    #[serde(alias = "Id")]
    pub id: String,

    #[serde(default, alias = "To")]
    pub to: Vec<String>,

    #[serde(default, alias = "Mailbox")]
    pub mailbox: String,

    #[serde(default, alias = "From")]
    pub from: String,

    #[serde(default, alias = "Subject")]
    pub subject: String,

    #[serde(default, alias = "Date")]
    pub date: Option<String>,

    #[serde(default, alias = "Size")]
    pub size: u64,
}

impl MessageSummary {
    /// Minimal summary, mostly useful for stubs.
    pub fn new(id: &str, to: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
            mailbox: String::new(),
            from: String::new(),
            subject: String::new(),
            date: None,
            size: 0,
        }
    }

    /// True if any recipient entry names `address` under the given policy.
    pub fn addressed_to(&self, address: &str, policy: RecipientMatch) -> bool {
        self.to.iter().any(|entry| recipient_matches(entry, address, policy))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default, alias = "Text")]
    pub text: String,

    #[serde(default, alias = "Html")]
    pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, alias = "Filename")]
    pub filename: String,

    #[serde(default, rename = "content-type", alias = "ContentType")]
    pub content_type: String,

    #[serde(default, rename = "download-link", alias = "DownloadLink")]
    pub download_link: String,
}

/// A fully fetched message. Only `body.html` takes part in comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(alias = "Id")]
    pub id: String,

    #[serde(default, alias = "Mailbox")]
    pub mailbox: String,

    #[serde(default, alias = "From")]
    pub from: String,

    #[serde(default, alias = "To")]
    pub to: Vec<String>,

    #[serde(default, alias = "Subject")]
    pub subject: String,

    #[serde(default, alias = "Date")]
    pub date: Option<String>,

    #[serde(default, alias = "Header")]
    pub header: HashMap<String, Vec<String>>,

    #[serde(default, alias = "Body")]
    pub body: MessageBody,

    #[serde(default, alias = "Attachments")]
    pub attachments: Vec<Attachment>,
}

impl MessageContent {
    pub fn with_html(id: &str, html: &str) -> Self {
        Self {
            id: id.to_string(),
            mailbox: String::new(),
            from: String::new(),
            to: Vec::new(),
            subject: String::new(),
            date: None,
            header: HashMap::new(),
            body: MessageBody {
                text: String::new(),
                html: html.to_string(),
            },
            attachments: Vec::new(),
        }
    }
}

/// Index and summary of the first listing entry addressed to `address`.
pub fn locate<'a>(
    summaries: &'a [MessageSummary],
    address: &str,
    policy: RecipientMatch,
) -> Option<&'a MessageSummary> {
    summaries.iter().find(|s| s.addressed_to(address, policy))
}

/// Compare one recipient entry against the expected address.
///
/// `Substring` accepts `a@b.com` inside `prefix-a@b.com-suffix`.
/// `Exact` parses the entry as an address list and compares addresses
/// case-insensitively; unparseable entries never match.
pub fn recipient_matches(entry: &str, address: &str, policy: RecipientMatch) -> bool {
    match policy {
        RecipientMatch::Substring => entry.contains(address),
        RecipientMatch::Exact => parse_addrs(entry)
            .iter()
            .any(|addr| addr.eq_ignore_ascii_case(address.trim())),
    }
}

/// Owned parsing of an address header into bare addresses
fn parse_addrs(field: &str) -> Vec<String> {
    let mut result = Vec::new();
    if let Ok(addrs) = addrparse(field) {
        for addr in addrs.iter() {
            match addr {
                MailAddr::Single(info) => result.push(info.addr.clone()),
                MailAddr::Group(group) => {
                    for info in &group.addrs {
                        result.push(info.addr.clone());
                    }
                }
            }
        }
    }
    result
}
