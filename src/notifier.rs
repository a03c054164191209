// src/notifier.rs
//
// NotificationService that forwards events to an HTTP endpoint of the
// system under test, which composes and sends the email itself.

use eyre::{eyre, Result};
use log::{debug, info};
use std::time::Duration;

use crate::notification::{Notification, NotificationEvent, NotificationService, Token};

pub struct WebhookNotifier {
    url: String,
    agent: ureq::Agent,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn post(&self, recipient: &str, locale: &str, site_url: &str, event: NotificationEvent) -> Result<()> {
        let notification = Notification {
            recipient: recipient.to_string(),
            locale: locale.to_string(),
            site_url: site_url.to_string(),
            event,
        };
        info!("Requesting {} notification for {}", notification.kind(), recipient);

        let response = self
            .agent
            .post(&self.url)
            .send_json(&notification)
            .map_err(|e| eyre!("Failed to trigger {} notification: {}", notification.kind(), e))?;
        debug!("Notifier answered {}", response.status());
        Ok(())
    }
}

impl NotificationService for WebhookNotifier {
    fn send_change_username_email(
        &self,
        old_username: &str,
        new_username: &str,
        email: &str,
        locale: &str,
        site_url: &str,
    ) -> Result<()> {
        self.post(
            email,
            locale,
            site_url,
            NotificationEvent::ChangeUsername {
                old_username: old_username.to_string(),
                new_username: new_username.to_string(),
            },
        )
    }

    fn send_email_change_email(&self, old_email: &str, new_email: &str, locale: &str, site_url: &str) -> Result<()> {
        self.post(
            old_email,
            locale,
            site_url,
            NotificationEvent::EmailChange {
                new_email: new_email.to_string(),
            },
        )
    }

    fn send_sign_in_change_email(&self, email: &str, method: &str, locale: &str, site_url: &str) -> Result<()> {
        self.post(
            email,
            locale,
            site_url,
            NotificationEvent::SignInChange {
                method: method.to_string(),
            },
        )
    }

    fn send_password_change_email(&self, email: &str, method: &str, locale: &str, site_url: &str) -> Result<()> {
        self.post(
            email,
            locale,
            site_url,
            NotificationEvent::PasswordChange {
                method: method.to_string(),
            },
        )
    }

    fn send_user_access_token_added_email(&self, email: &str, locale: &str, site_url: &str) -> Result<()> {
        self.post(email, locale, site_url, NotificationEvent::UserAccessTokenAdded)
    }

    fn send_password_reset_email(&self, email: &str, token: &Token, locale: &str, site_url: &str) -> Result<()> {
        self.post(
            email,
            locale,
            site_url,
            NotificationEvent::PasswordReset { token: token.clone() },
        )
    }

    fn send_mfa_change_email(&self, email: &str, activated: bool, locale: &str, site_url: &str) -> Result<()> {
        let event = if activated {
            NotificationEvent::MfaActivate
        } else {
            NotificationEvent::MfaDeactivate
        };
        self.post(email, locale, site_url, event)
    }
}

/// Stand-in when no notifier endpoint is configured; every call fails.
pub struct UnconfiguredNotifier;

impl UnconfiguredNotifier {
    fn refuse(&self, what: &str) -> Result<()> {
        Err(eyre!("No notifier configured; cannot trigger {} notification", what))
    }
}

impl NotificationService for UnconfiguredNotifier {
    fn send_change_username_email(&self, _: &str, _: &str, _: &str, _: &str, _: &str) -> Result<()> {
        self.refuse("change-username")
    }

    fn send_email_change_email(&self, _: &str, _: &str, _: &str, _: &str) -> Result<()> {
        self.refuse("email-change")
    }

    fn send_sign_in_change_email(&self, _: &str, _: &str, _: &str, _: &str) -> Result<()> {
        self.refuse("sign-in-change")
    }

    fn send_password_change_email(&self, _: &str, _: &str, _: &str, _: &str) -> Result<()> {
        self.refuse("password-change")
    }

    fn send_user_access_token_added_email(&self, _: &str, _: &str, _: &str) -> Result<()> {
        self.refuse("user-access-token-added")
    }

    fn send_password_reset_email(&self, _: &str, _: &Token, _: &str, _: &str) -> Result<()> {
        self.refuse("password-reset")
    }

    fn send_mfa_change_email(&self, _: &str, _: bool, _: &str, _: &str) -> Result<()> {
        self.refuse("mfa-change")
    }
}
