//! Orphan account pruning.
//!
//! A full scan, run once per pass after every bucket: accounts no group
//! references are disabled, disabled accounts that are referenced again are
//! restored to the enablement their contact asks for. Protected system
//! accounts are never disabled.

use std::collections::HashSet;

use dirsync_directory::{
    normalize_dn, rdn_value, Directory, DirectoryResult, Filter, Modification, SearchScope,
};
use tracing::{debug, info};

use super::groups::{PROJECT_CLASS, TENANT_CLASS};
use super::Reconciler;
use crate::dispatcher::NotificationEvent;
use crate::model::{AccountRole, Enablement};
use crate::statistics::SyncAction;

/// Attributes through which a group references an account.
const REFERENCE_ATTRS: [&str; 4] = ["member", "uniqueMember", "owner", "seeAlso"];

impl Reconciler {
    async fn referenced_accounts(&self) -> DirectoryResult<HashSet<String>> {
        let groups = self
            .directory
            .search(
                &self.config.layout.projects_dn(),
                SearchScope::Subtree,
                &Filter::or(vec![
                    Filter::eq("objectClass", PROJECT_CLASS),
                    Filter::eq("objectClass", TENANT_CLASS),
                ]),
                &REFERENCE_ATTRS,
            )
            .await?;

        Ok(groups
            .iter()
            .flat_map(|g| REFERENCE_ATTRS.iter().flat_map(move |a| g.values(a)))
            .map(|dn| normalize_dn(dn))
            .collect())
    }

    /// Disable orphans and restore referenced disabled accounts.
    ///
    /// `hidden` holds the CRM ids of hidden contacts; their accounts come
    /// back as hidden rather than visible.
    pub async fn prune(&self, hidden: &HashSet<i64>) -> DirectoryResult<()> {
        let referenced = self.referenced_accounts().await?;
        let accounts = self
            .directory
            .search(
                &self.config.layout.accounts_dn(),
                SearchScope::OneLevel,
                &Filter::eq("objectClass", "inetOrgPerson"),
                &["cn", "mail", "employeeType", "employeeNumber", "businessCategory"],
            )
            .await?;

        for account in accounts {
            let cn = account
                .first("cn")
                .map(str::to_string)
                .or_else(|| rdn_value(&account.dn))
                .unwrap_or_default();
            let in_use = referenced.contains(&normalize_dn(&account.dn));
            let state = Enablement::from_employee_type(account.first("employeeType"));

            if !in_use && state != Enablement::Disabled {
                if self.config.is_protected(&cn) {
                    debug!(dn = %account.dn, "Protected account left enabled");
                    continue;
                }
                let mods = [Modification::replace(
                    "employeeType",
                    vec![Enablement::DISABLED.to_string()],
                )];
                if self.writer.modify(&account.dn, &mods).await.is_committed() {
                    info!(dn = %account.dn, "Orphan account disabled");
                    self.stats.record(SyncAction::AccountDisabled);
                    let role = account
                        .first("businessCategory")
                        .and_then(AccountRole::parse)
                        .unwrap_or(AccountRole::Developer);
                    self.notify(
                        account.values("mail"),
                        NotificationEvent::AccountDisabled {
                            username: &cn,
                            role,
                        },
                    )
                    .await;
                }
            } else if in_use && state == Enablement::Disabled {
                let is_hidden = account
                    .first("employeeNumber")
                    .and_then(|n| n.parse::<i64>().ok())
                    .is_some_and(|id| hidden.contains(&id));
                let mods = [if is_hidden {
                    Modification::replace("employeeType", vec![Enablement::HIDDEN.to_string()])
                } else {
                    Modification::delete("employeeType")
                }];
                if self.writer.modify(&account.dn, &mods).await.is_committed() {
                    info!(dn = %account.dn, "Account restored");
                    self.stats.record(SyncAction::AccountRestored);
                }
            }
        }
        Ok(())
    }
}
