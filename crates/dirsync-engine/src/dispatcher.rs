//! Event to canned-message dispatch.

use std::sync::Arc;

use dirsync_notify::{CannedMessage, Mailer};
use tracing::{debug, warn};

use crate::model::AccountRole;

/// A committed directory change someone should hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent<'a> {
    AccountCreated { username: &'a str, role: AccountRole },
    MemberAdded { target: &'a str, tenant: bool },
    MemberRemoved { target: &'a str, tenant: bool },
    /// The project is ready; sent to administrative contacts.
    ProjectReady { admin_name: &'a str },
    AccountDisabled { username: &'a str, role: AccountRole },
}

impl NotificationEvent<'_> {
    pub fn template(&self) -> CannedMessage {
        match self {
            NotificationEvent::AccountCreated {
                role: AccountRole::Developer,
                ..
            } => CannedMessage::NewDeveloperAccount,
            NotificationEvent::AccountCreated {
                role: AccountRole::Partner,
                ..
            } => CannedMessage::NewPartnerAccount,
            NotificationEvent::MemberAdded { tenant: true, .. } => CannedMessage::AddedToTenant,
            NotificationEvent::MemberAdded { tenant: false, .. } => CannedMessage::AddedToProject,
            NotificationEvent::MemberRemoved { tenant: true, .. } => {
                CannedMessage::DeletedFromTenant
            }
            NotificationEvent::MemberRemoved { tenant: false, .. } => {
                CannedMessage::DeletedFromProject
            }
            NotificationEvent::ProjectReady { .. } => CannedMessage::NotifyAdminContact,
            NotificationEvent::AccountDisabled {
                role: AccountRole::Developer,
                ..
            } => CannedMessage::DeveloperAccountDisabled,
            NotificationEvent::AccountDisabled {
                role: AccountRole::Partner,
                ..
            } => CannedMessage::PartnerAccountDisabled,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            NotificationEvent::AccountCreated { username, .. }
            | NotificationEvent::AccountDisabled { username, .. } => username,
            NotificationEvent::MemberAdded { target, .. }
            | NotificationEvent::MemberRemoved { target, .. } => target,
            NotificationEvent::ProjectReady { admin_name } => admin_name,
        }
    }
}

/// Delivery counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: u32,
    pub failed: u32,
}

impl std::ops::AddAssign for Delivery {
    fn add_assign(&mut self, other: Self) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// Sends canned messages through a [`Mailer`].
///
/// Delivery failures are logged and counted, never propagated: the
/// directory change they announce has already committed.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send `template` with `token` to each address.
    pub async fn notify(
        &self,
        recipients: &[String],
        template: CannedMessage,
        token: &str,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        for to in recipients {
            let mail = template.to_mail(to.as_str(), token);
            match self.mailer.send(&mail).await {
                Ok(()) => {
                    debug!(to = %to, template = %template, "Notification sent");
                    delivery.sent += 1;
                }
                Err(e) => {
                    warn!(
                        to = %to,
                        template = %template,
                        error = %e,
                        "Notification delivery failed"
                    );
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    pub async fn dispatch(&self, recipients: &[String], event: NotificationEvent<'_>) -> Delivery {
        self.notify(recipients, event.template(), event.token()).await
    }
}
