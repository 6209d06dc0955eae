//! Canned message catalogue.
//!
//! Every message has a fixed subject and a body with a single `{TOKEN}`
//! placeholder, filled with a username, project name or display name
//! depending on the message.

use serde::{Deserialize, Serialize};

use crate::mailer::Mail;

const TOKEN: &str = "{TOKEN}";

const SIGNATURE: &str = "Best Regards,\n\nFORGE Service Lab Support\nsupport@forgeservicelab.fi";

/// Fixed notification templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CannedMessage {
    /// Account created for a developer-like project. Token: username.
    NewDeveloperAccount,
    /// Account created for a partner-like project. Token: username.
    NewPartnerAccount,
    /// Administrative contact told the technical contact is ready. Token: admin display name.
    NotifyAdminContact,
    /// Token: project name.
    AddedToProject,
    /// Token: tenant name.
    AddedToTenant,
    /// Token: project name.
    DeletedFromProject,
    /// Token: tenant name.
    DeletedFromTenant,
    /// Token: username.
    DeveloperAccountDisabled,
    /// Token: username.
    PartnerAccountDisabled,
}

impl CannedMessage {
    pub const ALL: [CannedMessage; 9] = [
        CannedMessage::NewDeveloperAccount,
        CannedMessage::NewPartnerAccount,
        CannedMessage::NotifyAdminContact,
        CannedMessage::AddedToProject,
        CannedMessage::AddedToTenant,
        CannedMessage::DeletedFromProject,
        CannedMessage::DeletedFromTenant,
        CannedMessage::DeveloperAccountDisabled,
        CannedMessage::PartnerAccountDisabled,
    ];

    /// Stable template key.
    pub fn key(&self) -> &'static str {
        match self {
            CannedMessage::NewDeveloperAccount => "new_devel_account",
            CannedMessage::NewPartnerAccount => "new_partner_account",
            CannedMessage::NotifyAdminContact => "notify_admin_contact",
            CannedMessage::AddedToProject => "added_to_project",
            CannedMessage::AddedToTenant => "added_to_tenant",
            CannedMessage::DeletedFromProject => "deleted_from_project",
            CannedMessage::DeletedFromTenant => "deleted_from_tenant",
            CannedMessage::DeveloperAccountDisabled => "devel_account_disabled",
            CannedMessage::PartnerAccountDisabled => "partner_account_disabled",
        }
    }

    /// Look a template up by key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn subject(&self) -> &'static str {
        match self {
            CannedMessage::NewDeveloperAccount | CannedMessage::NewPartnerAccount => {
                "Welcome to FORGE Service Lab!"
            }
            CannedMessage::NotifyAdminContact => "Technical Contact account created",
            CannedMessage::AddedToProject | CannedMessage::AddedToTenant => {
                "You have new access rights"
            }
            CannedMessage::DeletedFromProject | CannedMessage::DeletedFromTenant => {
                "Your access rights have changed"
            }
            CannedMessage::DeveloperAccountDisabled | CannedMessage::PartnerAccountDisabled => {
                "Your FORGE Service Lab account has been disabled"
            }
        }
    }

    fn template(&self) -> &'static str {
        match self {
            CannedMessage::NewDeveloperAccount => {
                "Welcome to FORGE Service Lab!\n\
                 Your username is {TOKEN}\n\n\
                 An account has been created for you with access to all FORGE services.\n\
                 Please set your password at https://support.forgeservicelab.fi/password/?action=sendtoken \
                 before signing in.\n\n\
                 OpenStack cloud access becomes available about 10 minutes after the password is set; \
                 other services are available immediately.\n\n\
                 Documentation is available at https://support.forgeservicelab.fi/"
            }
            CannedMessage::NewPartnerAccount => {
                "Welcome to FORGE Service Lab!\n\
                 Your username is {TOKEN}\n\n\
                 An account has been created for you to access FORGE Service Lab.\n\
                 Please set your password at https://support.forgeservicelab.fi/password/?action=sendtoken \
                 before signing in.\n\n\
                 After signing in at https://forgeservicelab.fi you can fill in your organization and \
                 offering descriptions."
            }
            CannedMessage::NotifyAdminContact => {
                "Hello {TOKEN},\n\n\
                 The FORGE Service Lab account for your Technical contact has been created, \
                 so they can now start using FORGE Service Lab services.\n\n\
                 This notification does not require any action from you."
            }
            CannedMessage::AddedToProject => {
                "Welcome to FORGE Service Lab!\n\
                 You have been added as a member of the {TOKEN} project.\n\n\
                 This notification does not require any action from you. \
                 You may notice new items on your FORGE services."
            }
            CannedMessage::AddedToTenant => {
                "Welcome to FORGE Service Lab!\n\
                 You have been added as a member of the {TOKEN} tenant.\n\n\
                 This notification does not require any action from you. \
                 You may notice new projects on your OpenStack dashboard."
            }
            CannedMessage::DeletedFromProject => {
                "Hello,\n\
                 You are no longer a member of the {TOKEN} project.\n\n\
                 If you believe this is a mistake, please contact support@forgeservicelab.fi."
            }
            CannedMessage::DeletedFromTenant => {
                "Hello,\n\
                 You are no longer a member of the {TOKEN} tenant.\n\n\
                 Its projects will no longer appear on your OpenStack dashboard."
            }
            CannedMessage::DeveloperAccountDisabled => {
                "Hello,\n\
                 Your developer account {TOKEN} has been disabled because it is no longer \
                 a member of any FORGE Service Lab project.\n\n\
                 It will be enabled again automatically if you are added to a project."
            }
            CannedMessage::PartnerAccountDisabled => {
                "Hello,\n\
                 Your partner account {TOKEN} has been disabled because it is no longer \
                 associated with any FORGE Service Lab project.\n\n\
                 It will be enabled again automatically if you are added to a project."
            }
        }
    }

    /// Body with the token substituted.
    pub fn render(&self, token: &str) -> String {
        format!("{}\n\n{}", self.template().replace(TOKEN, token), SIGNATURE)
    }

    /// Assemble a mail to one recipient.
    pub fn to_mail(&self, to: impl Into<String>, token: &str) -> Mail {
        Mail {
            to: to.into(),
            subject: self.subject().to_string(),
            body: self.render(token),
            template: Some(*self),
        }
    }
}

impl std::fmt::Display for CannedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_has_one_token() {
        for message in CannedMessage::ALL {
            assert_eq!(
                message.template().matches(TOKEN).count(),
                1,
                "{} must carry exactly one token",
                message.key()
            );
        }
    }

    #[test]
    fn test_render_substitutes_token() {
        let body = CannedMessage::AddedToTenant.render("acme.cloud");
        assert!(body.contains("member of the acme.cloud tenant"));
        assert!(!body.contains(TOKEN));
        assert!(body.ends_with("support@forgeservicelab.fi"));
    }

    #[test]
    fn test_key_round_trip() {
        for message in CannedMessage::ALL {
            assert_eq!(CannedMessage::from_key(message.key()), Some(message));
        }
        assert_eq!(CannedMessage::from_key("nope"), None);
    }

    #[test]
    fn test_to_mail() {
        let mail = CannedMessage::NewDeveloperAccount.to_mail("jean@example.org", "jean.dupont");
        assert_eq!(mail.to, "jean@example.org");
        assert_eq!(mail.subject, "Welcome to FORGE Service Lab!");
        assert!(mail.body.contains("Your username is jean.dupont"));
        assert_eq!(mail.template, Some(CannedMessage::NewDeveloperAccount));
    }
}
