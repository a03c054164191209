// src/utils.rs

use eyre::{eyre, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::time::Duration;

/// Parse a string like "500ms", "5s" or "2m" into a Duration.
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (num, unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "m")
    } else {
        (s, "s")
    };
    let value: u64 = num
        .trim()
        .parse()
        .map_err(|e| eyre!("Invalid duration '{}': {}", s, e))?;
    Ok(match unit {
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(
            value
                .checked_mul(60)
                .ok_or_else(|| eyre!("Invalid duration '{}': too many minutes", s))?,
        ),
        _ => Duration::from_secs(value),
    })
}

/// serde adapter for `parse_duration`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(de::Error::custom)
}

/// Capture-service mailbox key for an address: the local part.
pub fn mailbox_name(address: &str) -> &str {
    let address = address.trim();
    match address.split_once('@') {
        Some((local, _)) => local,
        None => address,
    }
}

/// Derive a per-kind address so concurrent scenarios never share a mailbox.
pub fn unique_recipient(address: &str, tag: &str) -> String {
    match address.trim().split_once('@') {
        Some((local, domain)) => format!("{}-{}@{}", local, tag, domain),
        None => format!("{}-{}", address.trim(), tag),
    }
}
