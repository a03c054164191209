// src/cfg/config.rs

use eyre::{eyre, Result};
use log::{debug, error};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::{from_value, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cfg::policy::{LengthPolicy, OnExhausted, PollPolicy, RecipientMatch};
use crate::inbucket::base_url_from_env;
use crate::notification::{Notification, NotificationEvent, NotificationKind, Token};
use crate::scenario::{DriverSettings, Scenario, REFERENCE_RECIPIENT, REFERENCE_SITE_URL};
use crate::utils::deserialize_duration;

pub const CONFIG_FILE: &str = "mail-harness.yml";
/// Where the shipped golden fixtures live, relative to the repository root.
pub const DEFAULT_GOLDEN_DIR: &str = "tests/fixtures/golden";

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Falls back to CI_HOST / CI_INBUCKET_PORT when unset.
    pub inbucket_url: Option<String>,

    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,

    pub poll: PollPolicy,
    pub on_exhausted: OnExhausted,
    pub recipient_match: RecipientMatch,
    pub length_policy: LengthPolicy,
    pub reset_on_exit: bool,

    pub golden_dir: PathBuf,
    pub notifier_url: Option<String>,

    pub recipient: String,
    pub locale: String,
    pub site_url: String,
    pub unique_recipients: bool,

    /// flatten kind + body into Vec<ScenarioEntry>; empty means the reference suite
    #[serde(deserialize_with = "deserialize_named_scenarios")]
    pub scenarios: Vec<ScenarioEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inbucket_url: None,
            request_timeout: Duration::from_secs(10),
            poll: PollPolicy::default(),
            on_exhausted: OnExhausted::default(),
            recipient_match: RecipientMatch::default(),
            length_policy: LengthPolicy::default(),
            reset_on_exit: true,
            golden_dir: PathBuf::from(DEFAULT_GOLDEN_DIR),
            notifier_url: None,
            recipient: REFERENCE_RECIPIENT.to_string(),
            locale: String::new(),
            site_url: REFERENCE_SITE_URL.to_string(),
            unique_recipients: false,
            scenarios: Vec::new(),
        }
    }
}

/// Per-scenario overrides on top of the reference payload for `kind`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScenarioEntry {
    #[serde(skip_deserializing)]
    pub kind: NotificationKind,
    pub recipient: Option<String>,
    pub locale: Option<String>,
    pub site_url: Option<String>,
    pub golden: Option<PathBuf>,
    pub old_username: Option<String>,
    pub new_username: Option<String>,
    pub new_email: Option<String>,
    pub method: Option<String>,
    pub token: Option<String>,
}

impl ScenarioEntry {
    fn event(&self) -> NotificationEvent {
        let mut event = NotificationEvent::reference(self.kind);
        match &mut event {
            NotificationEvent::ChangeUsername { old_username, new_username } => {
                if let Some(v) = &self.old_username {
                    *old_username = v.clone();
                }
                if let Some(v) = &self.new_username {
                    *new_username = v.clone();
                }
            }
            NotificationEvent::EmailChange { new_email } => {
                if let Some(v) = &self.new_email {
                    *new_email = v.clone();
                }
            }
            NotificationEvent::SignInChange { method } | NotificationEvent::PasswordChange { method } => {
                if let Some(v) = &self.method {
                    *method = v.clone();
                }
            }
            NotificationEvent::PasswordReset { token } => {
                if let Some(v) = &self.token {
                    *token = Token::new(v);
                }
            }
            NotificationEvent::UserAccessTokenAdded
            | NotificationEvent::MfaActivate
            | NotificationEvent::MfaDeactivate => {}
        }
        event
    }
}

impl Config {
    pub fn inbucket_base_url(&self) -> String {
        self.inbucket_url.clone().unwrap_or_else(base_url_from_env)
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            poll: self.poll.clone(),
            on_exhausted: self.on_exhausted,
            recipient_match: self.recipient_match,
            length_policy: self.length_policy,
            reset_on_exit: self.reset_on_exit,
        }
    }

    /// Configured scenarios, or the reference suite when none are listed.
    pub fn scenarios(&self) -> Vec<Scenario> {
        let scenarios: Vec<Scenario> = if self.scenarios.is_empty() {
            NotificationKind::ALL
                .iter()
                .map(|kind| self.build_scenario(&ScenarioEntry {
                    kind: *kind,
                    ..ScenarioEntry::default()
                }))
                .collect()
        } else {
            self.scenarios.iter().map(|entry| self.build_scenario(entry)).collect()
        };

        if self.unique_recipients {
            scenarios.into_iter().map(Scenario::with_unique_recipient).collect()
        } else {
            scenarios
        }
    }

    /// The scenario `run` would use for `kind`, optionally readdressed.
    /// Falls back to the reference payload when no entry lists the kind.
    pub fn scenario_for(&self, kind: NotificationKind, address: Option<&str>) -> Scenario {
        let mut scenario = self
            .scenarios()
            .into_iter()
            .find(|s| s.kind() == kind)
            .unwrap_or_else(|| {
                self.build_scenario(&ScenarioEntry {
                    kind,
                    ..ScenarioEntry::default()
                })
            });
        if let Some(address) = address {
            scenario.notification.recipient = address.to_string();
        }
        scenario
    }

    fn build_scenario(&self, entry: &ScenarioEntry) -> Scenario {
        let notification = Notification {
            recipient: entry.recipient.clone().unwrap_or_else(|| self.recipient.clone()),
            locale: entry.locale.clone().unwrap_or_else(|| self.locale.clone()),
            site_url: entry.site_url.clone().unwrap_or_else(|| self.site_url.clone()),
            event: entry.event(),
        };
        let golden = entry
            .golden
            .clone()
            .unwrap_or_else(|| self.golden_dir.join(entry.kind.golden_file()));
        Scenario::new(notification, golden)
    }
}

pub fn load_config(config_path: &Path) -> Result<Config> {
    debug!("Loading configuration from {:?}", config_path);

    let content = fs::read_to_string(config_path).map_err(|e| {
        error!("Failed to read config file {}: {}", config_path.display(), e);
        eyre!("Failed to read config file {}: {}", config_path.display(), e)
    })?;

    let cfg: Config = serde_yaml::from_str(&content).map_err(|e| {
        error!("Failed to parse YAML: {}", e);
        eyre!("Failed to parse YAML: {}", e)
    })?;

    debug!("Successfully loaded configuration");
    Ok(cfg)
}

/// Load `explicit` if given (it must exist), otherwise the first of
/// `./mail-harness.yml` and `<config dir>/mail-harness/mail-harness.yml`
/// that exists, otherwise defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("mail-harness").join(CONFIG_FILE));
    }
    for candidate in candidates {
        if candidate.is_file() {
            return load_config(&candidate);
        }
    }

    debug!("No configuration file found; using defaults");
    Ok(Config::default())
}

fn deserialize_named_scenarios<'de, D>(deserializer: D) -> Result<Vec<ScenarioEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer).map_err(de::Error::custom)?;
    let seq = match v {
        Value::Sequence(s) => s,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(de::Error::custom("`scenarios` must be a sequence")),
    };
    let mut out = Vec::new();
    for entry in seq {
        let (name, body) = match entry {
            Value::String(name) => (name, Value::Null),
            Value::Mapping(map) => {
                if map.len() != 1 {
                    return Err(de::Error::custom("Each scenario must have exactly one kind→body"));
                }
                match map.into_iter().next() {
                    Some((Value::String(name), body)) => (name, body),
                    _ => return Err(de::Error::custom("Scenario kind must be a string")),
                }
            }
            _ => return Err(de::Error::custom("Invalid entry in scenarios list")),
        };
        let kind: NotificationKind = name
            .parse()
            .map_err(|_| de::Error::custom(format!("Unknown notification kind '{}'", name)))?;
        let mut scenario: ScenarioEntry = if body.is_null() {
            ScenarioEntry::default()
        } else {
            from_value(body).map_err(de::Error::custom)?
        };
        scenario.kind = kind;
        out.push(scenario);
    }
    Ok(out)
}
