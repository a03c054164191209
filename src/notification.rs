// src/notification.rs
//
// Account-event notifications and the service that composes and sends them.

use eyre::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    #[default]
    ChangeUsername,
    EmailChange,
    SignInChange,
    PasswordChange,
    UserAccessTokenAdded,
    PasswordReset,
    MfaActivate,
    MfaDeactivate,
}

serde_plain::derive_display_from_serialize!(NotificationKind);
serde_plain::derive_fromstr_from_deserialize!(NotificationKind);

impl NotificationKind {
    pub const ALL: [NotificationKind; 8] = [
        NotificationKind::ChangeUsername,
        NotificationKind::EmailChange,
        NotificationKind::SignInChange,
        NotificationKind::PasswordChange,
        NotificationKind::UserAccessTokenAdded,
        NotificationKind::PasswordReset,
        NotificationKind::MfaActivate,
        NotificationKind::MfaDeactivate,
    ];

    /// File name of the golden rendering for this kind.
    pub fn golden_file(&self) -> &'static str {
        match self {
            NotificationKind::ChangeUsername => "test-email-changeUsernameEmail.html",
            NotificationKind::EmailChange => "test-email-emailChangeEmail.html",
            NotificationKind::SignInChange => "test-email-signinChangeEmail.html",
            NotificationKind::PasswordChange => "test-email-passwordChangeEmail.html",
            NotificationKind::UserAccessTokenAdded => "test-email-userAccessTokenAddedEmail.html",
            NotificationKind::PasswordReset => "test-email-passwordResetEmail.html",
            NotificationKind::MfaActivate => "test-email-mfaActivateEmail.html",
            NotificationKind::MfaDeactivate => "test-email-mfaDeactivateEmail.html",
        }
    }
}

/// Opaque token carried by a password-reset notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
}

impl Token {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

/// Kind-specific payload. The `kind` tag carries the `NotificationKind` name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotificationEvent {
    ChangeUsername { old_username: String, new_username: String },
    /// Sent to the old address.
    EmailChange { new_email: String },
    SignInChange { method: String },
    PasswordChange { method: String },
    UserAccessTokenAdded,
    PasswordReset { token: Token },
    MfaActivate,
    MfaDeactivate,
}

impl NotificationEvent {
    /// Payload the reference suite sends for each kind.
    pub fn reference(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::ChangeUsername => NotificationEvent::ChangeUsername {
                old_username: "old_username".into(),
                new_username: "new_username".into(),
            },
            NotificationKind::EmailChange => NotificationEvent::EmailChange {
                new_email: "new_email".into(),
            },
            NotificationKind::SignInChange => NotificationEvent::SignInChange {
                method: "method".into(),
            },
            NotificationKind::PasswordChange => NotificationEvent::PasswordChange {
                method: "method".into(),
            },
            NotificationKind::UserAccessTokenAdded => NotificationEvent::UserAccessTokenAdded,
            NotificationKind::PasswordReset => NotificationEvent::PasswordReset {
                token: Token::new("sample_token"),
            },
            NotificationKind::MfaActivate => NotificationEvent::MfaActivate,
            NotificationKind::MfaDeactivate => NotificationEvent::MfaDeactivate,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::ChangeUsername { .. } => NotificationKind::ChangeUsername,
            NotificationEvent::EmailChange { .. } => NotificationKind::EmailChange,
            NotificationEvent::SignInChange { .. } => NotificationKind::SignInChange,
            NotificationEvent::PasswordChange { .. } => NotificationKind::PasswordChange,
            NotificationEvent::UserAccessTokenAdded => NotificationKind::UserAccessTokenAdded,
            NotificationEvent::PasswordReset { .. } => NotificationKind::PasswordReset,
            NotificationEvent::MfaActivate => NotificationKind::MfaActivate,
            NotificationEvent::MfaDeactivate => NotificationKind::MfaDeactivate,
        }
    }
}

/// Everything needed to ask the composition service for one email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(flatten)]
    pub event: NotificationEvent,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        self.event.kind()
    }

    /// Dispatch to the matching composition call.
    pub fn send<N: NotificationService + ?Sized>(&self, service: &N) -> Result<()> {
        let (to, locale, site) = (self.recipient.as_str(), self.locale.as_str(), self.site_url.as_str());
        match &self.event {
            NotificationEvent::ChangeUsername { old_username, new_username } => {
                service.send_change_username_email(old_username, new_username, to, locale, site)
            }
            NotificationEvent::EmailChange { new_email } => {
                service.send_email_change_email(to, new_email, locale, site)
            }
            NotificationEvent::SignInChange { method } => {
                service.send_sign_in_change_email(to, method, locale, site)
            }
            NotificationEvent::PasswordChange { method } => {
                service.send_password_change_email(to, method, locale, site)
            }
            NotificationEvent::UserAccessTokenAdded => {
                service.send_user_access_token_added_email(to, locale, site)
            }
            NotificationEvent::PasswordReset { token } => {
                service.send_password_reset_email(to, token, locale, site)
            }
            NotificationEvent::MfaActivate => service.send_mfa_change_email(to, true, locale, site),
            NotificationEvent::MfaDeactivate => service.send_mfa_change_email(to, false, locale, site),
        }
    }
}

/// The notification-composition service under test.
/// Results are only logged; verdicts come from what lands in the mailbox.
pub trait NotificationService: Send + Sync {
    fn send_change_username_email(
        &self,
        old_username: &str,
        new_username: &str,
        email: &str,
        locale: &str,
        site_url: &str,
    ) -> Result<()>;

    fn send_email_change_email(&self, old_email: &str, new_email: &str, locale: &str, site_url: &str) -> Result<()>;

    fn send_sign_in_change_email(&self, email: &str, method: &str, locale: &str, site_url: &str) -> Result<()>;

    fn send_password_change_email(&self, email: &str, method: &str, locale: &str, site_url: &str) -> Result<()>;

    fn send_user_access_token_added_email(&self, email: &str, locale: &str, site_url: &str) -> Result<()>;

    fn send_password_reset_email(&self, email: &str, token: &Token, locale: &str, site_url: &str) -> Result<()>;

    fn send_mfa_change_email(&self, email: &str, activated: bool, locale: &str, site_url: &str) -> Result<()>;
}
