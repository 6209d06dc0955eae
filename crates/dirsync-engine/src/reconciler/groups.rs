//! Project and tenant group entries.
//!
//! Projects are `groupOfNames` with `member`; tenants are
//! `groupOfUniqueNames` with `uniqueMember`. Both carry `o` (CRM id),
//! `owner`, `seeAlso` (administrative contacts) and `type:` description tags.

use std::slice;

use dirsync_directory::{values_match, Directory, DirectoryResult, Entry, Modification};
use tracing::{debug, warn};

use super::Reconciler;
use crate::dispatcher::NotificationEvent;
use crate::model::{Enablement, ProjectDescriptor};

pub(crate) const PROJECT_CLASS: &str = "groupOfNames";
pub(crate) const TENANT_CLASS: &str = "groupOfUniqueNames";

/// Attributes read back for comparison.
pub(crate) const GROUP_ATTRS: [&str; 8] = [
    "objectClass",
    "cn",
    "o",
    "owner",
    "seeAlso",
    "member",
    "uniqueMember",
    "description",
];

/// Attribute holding a group's members.
pub fn membership_attribute(tenant: bool) -> &'static str {
    if tenant {
        "uniqueMember"
    } else {
        "member"
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| values_match(x, y)))
        && b.iter().all(|y| a.iter().any(|x| values_match(x, y)))
}

/// Values of `a` not present in `b`.
fn difference<'a>(a: &'a [String], b: &[String]) -> Vec<&'a String> {
    a.iter()
        .filter(|x| !b.iter().any(|y| values_match(x, y)))
        .collect()
}

/// Replacements bringing `live` to `desired`. `objectClass` and `cn` are
/// identity and never touched.
pub(crate) fn group_modifications(live: &Entry, desired: &Entry, membership: &str) -> Vec<Modification> {
    ["o", "owner", "seeAlso", membership, "description"]
        .into_iter()
        .filter(|attr| !same_set(live.values(attr), desired.values(attr)))
        .map(|attr| Modification::replace(attr, desired.values(attr).to_vec()))
        .collect()
}

impl Reconciler {
    /// Desired group entry at `dn`, with contacts resolved to account DNs.
    pub async fn group_entry(&self, dn: &str, project: &ProjectDescriptor) -> DirectoryResult<Entry> {
        let tenant = project.is_tenant();
        let owner = match &project.owner {
            Some(owner) => self.account_dns(slice::from_ref(owner)).await?,
            None => Vec::new(),
        };
        let admins = self.account_dns(&project.admins).await?;
        let members = self.account_dns(&project.members).await?;

        let mut entry = Entry::new(dn)
            .with(
                "objectClass",
                [if tenant { TENANT_CLASS } else { PROJECT_CLASS }],
            )
            .with("cn", [project.cn.as_str()])
            .with("o", [project.external_id.to_string()]);
        entry.set("owner", owner);
        entry.set("seeAlso", admins);
        entry.set(membership_attribute(tenant), members);
        entry.set(
            "description",
            project.description_tags(&self.config.categories),
        );
        Ok(entry)
    }

    /// Whether an entry's description tags mark it a tenant.
    fn tagged_tenant(&self, entry: &Entry) -> bool {
        let tag = format!("type:{}", self.config.categories.tenant);
        entry.has_value("description", &tag)
    }

    /// Bring an existing group in line with `desired` and notify membership
    /// changes. Returns whether the entry was modified.
    pub async fn update_group(
        &self,
        desired: &Entry,
        project: &ProjectDescriptor,
    ) -> DirectoryResult<bool> {
        let membership = membership_attribute(project.is_tenant());
        let Some(live) = self.directory.read(&desired.dn, &GROUP_ATTRS).await? else {
            return Ok(false);
        };

        let mods = group_modifications(&live, desired, membership);
        if mods.is_empty() {
            debug!(dn = %desired.dn, "Group up to date");
            return Ok(false);
        }
        if !self.writer.modify(&desired.dn, &mods).await.is_committed() {
            return Ok(false);
        }

        let tenant = self.tagged_tenant(desired);
        let hidden: Vec<String> = project
            .members
            .iter()
            .filter(|m| m.hidden)
            .map(|m| m.external_id_text())
            .collect();
        let added = difference(desired.values(membership), live.values(membership));
        let removed = difference(live.values(membership), desired.values(membership));
        for dn in added {
            let mails = self.notification_mails(dn, &hidden).await;
            self.notify(
                &mails,
                NotificationEvent::MemberAdded {
                    target: &project.cn,
                    tenant,
                },
            )
            .await;
        }
        for dn in removed {
            let mails = self.notification_mails(dn, &hidden).await;
            self.notify(
                &mails,
                NotificationEvent::MemberRemoved {
                    target: &project.cn,
                    tenant,
                },
            )
            .await;
        }
        Ok(true)
    }

    /// Mail addresses of the account at `dn`; none for accounts hidden in
    /// the directory or whose contact id is in `hidden`.
    async fn notification_mails(&self, dn: &str, hidden: &[String]) -> Vec<String> {
        match self
            .directory
            .read(dn, &["mail", "employeeType", "employeeNumber"])
            .await
        {
            Ok(Some(entry)) => {
                let hidden_contact = entry
                    .first("employeeNumber")
                    .is_some_and(|n| hidden.iter().any(|h| h == n));
                if hidden_contact
                    || Enablement::from_employee_type(entry.first("employeeType"))
                        == Enablement::Hidden
                {
                    Vec::new()
                } else {
                    entry.values("mail").to_vec()
                }
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(dn = %dn, error = %e, "Could not read member addresses");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "cn=alice,ou=accounts,dc=example,dc=org";
    const BOB: &str = "cn=bob,ou=accounts,dc=example,dc=org";

    fn group(members: &[&str]) -> Entry {
        Entry::new("cn=acme,ou=projects,dc=example,dc=org")
            .with("objectClass", ["groupOfNames"])
            .with("cn", ["acme"])
            .with("o", ["10"])
            .with("member", members.iter().copied())
            .with("description", ["type:SDA"])
    }

    #[test]
    fn test_equal_groups_need_no_changes() {
        assert!(group_modifications(&group(&[ALICE, BOB]), &group(&[BOB, ALICE]), "member").is_empty());
    }

    #[test]
    fn test_dn_values_compare_normalized() {
        let live = group(&["CN=Alice, OU=accounts, DC=example, DC=org"]);
        assert!(group_modifications(&live, &group(&[ALICE]), "member").is_empty());
    }

    #[test]
    fn test_membership_change_replaces_attribute() {
        let mods = group_modifications(&group(&[ALICE]), &group(&[ALICE, BOB]), "member");
        assert_eq!(
            mods,
            vec![Modification::replace(
                "member",
                vec![ALICE.to_string(), BOB.to_string()]
            )]
        );
    }

    #[test]
    fn test_dropped_owner_cleared() {
        let live = group(&[ALICE]).with("owner", [ALICE]);
        let mods = group_modifications(&live, &group(&[ALICE]), "member");
        assert_eq!(mods, vec![Modification::replace("owner", vec![])]);
    }

    #[test]
    fn test_difference() {
        let a = vec![ALICE.to_string(), BOB.to_string()];
        let b = vec![ALICE.to_uppercase()];
        assert_eq!(difference(&a, &b), vec![&BOB.to_string()]);
    }

    #[test]
    fn test_membership_attribute() {
        assert_eq!(membership_attribute(false), "member");
        assert_eq!(membership_attribute(true), "uniqueMember");
    }
}
