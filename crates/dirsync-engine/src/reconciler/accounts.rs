//! Account upsert.
//!
//! Accounts are keyed by `employeeNumber` (the CRM contact id). The `cn`
//! is allocated once, on creation, and never regenerated.

use std::collections::HashSet;

use dirsync_directory::{
    dn_eq, Directory, DirectoryResult, Entry, Filter, Modification, SearchScope,
};
use tracing::debug;

use super::Reconciler;
use crate::dispatcher::NotificationEvent;
use crate::model::{AccountDescriptor, AccountRole, Enablement};
use crate::statistics::SyncAction;

const ACCOUNT_CLASS: &str = "inetOrgPerson";

/// Attributes read back for comparison.
pub(crate) const ACCOUNT_ATTRS: [&str; 9] = [
    "cn",
    "sn",
    "givenName",
    "displayName",
    "mail",
    "mobile",
    "employeeType",
    "employeeNumber",
    "businessCategory",
];

/// Desired values of the attributes kept in sync with the CRM.
fn managed_attributes(account: &AccountDescriptor) -> Vec<(&'static str, Vec<String>)> {
    let non_empty = |v: &str| {
        if v.is_empty() {
            Vec::new()
        } else {
            vec![v.to_string()]
        }
    };
    vec![
        ("sn", vec![account.surname.clone()]),
        ("givenName", vec![account.given_name.clone()]),
        ("displayName", non_empty(&account.display_name)),
        ("mail", account.mails.clone()),
        ("mobile", account.mobiles.clone()),
    ]
}

/// Order-insensitive, exact comparison.
fn same_values(live: &[String], desired: &[String]) -> bool {
    let mut live = live.to_vec();
    let mut desired = desired.to_vec();
    live.sort();
    desired.sort();
    live == desired
}

/// Modifications bringing `live` to `account`. An account disabled by
/// pruning keeps its `employeeType`; restoring it is pruning's job.
pub(crate) fn account_modifications(live: &Entry, account: &AccountDescriptor) -> Vec<Modification> {
    let mut mods: Vec<Modification> = managed_attributes(account)
        .into_iter()
        .filter(|(name, desired)| !same_values(live.values(name), desired))
        .map(|(name, desired)| Modification::replace(name, desired))
        .collect();

    let current = Enablement::from_employee_type(live.first("employeeType"));
    if current != Enablement::Disabled && current != account.enablement() {
        let values = account
            .enablement()
            .employee_type()
            .map(|v| vec![v.to_string()])
            .unwrap_or_default();
        mods.push(Modification::replace("employeeType", values));
    }
    mods
}

/// Next candidate after `base` is taken: the last two characters give way
/// to a numeric suffix.
pub(crate) fn suffixed_identifier(base: &str, suffix: u32) -> String {
    let keep = base.chars().count().saturating_sub(2);
    let stem: String = base.chars().take(keep).collect();
    if stem.is_empty() {
        format!("{base}.{suffix}")
    } else {
        format!("{stem}.{suffix}")
    }
}

impl Reconciler {
    /// The account entry for a CRM contact id.
    pub async fn find_account(&self, external_id: i64) -> DirectoryResult<Option<Entry>> {
        let filter = Filter::and(vec![
            Filter::eq("objectClass", ACCOUNT_CLASS),
            Filter::eq("employeeNumber", external_id.to_string()),
        ]);
        Ok(self
            .directory
            .search(
                &self.config.layout.accounts_dn(),
                SearchScope::OneLevel,
                &filter,
                &ACCOUNT_ATTRS,
            )
            .await?
            .into_iter()
            .next())
    }

    /// A free `cn` for a new account.
    pub async fn allocate_identifier(&self, account: &AccountDescriptor) -> DirectoryResult<String> {
        let base = account.base_identifier();
        let mut candidate = base.clone();
        let mut suffix = 0;
        while self
            .directory
            .exists(&self.config.layout.account_dn(&candidate))
            .await?
        {
            candidate = suffixed_identifier(&base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }

    fn new_account_entry(&self, cn: &str, account: &AccountDescriptor, role: AccountRole) -> Entry {
        let mut entry = Entry::new(self.config.layout.account_dn(cn))
            .with("objectClass", [ACCOUNT_CLASS])
            .with("cn", [cn])
            .with("employeeNumber", [account.external_id_text()])
            .with("businessCategory", [role.as_str()]);
        for (name, values) in managed_attributes(account) {
            entry.set(name, values);
        }
        if let Some(employee_type) = account.enablement().employee_type() {
            entry.set("employeeType", vec![employee_type.to_string()]);
        }
        entry
    }

    /// Create or refresh one account. Returns the `cn` of a newly created account.
    async fn upsert_account(
        &self,
        account: &AccountDescriptor,
        role: AccountRole,
    ) -> DirectoryResult<Option<String>> {
        match self.find_account(account.external_id).await? {
            Some(live) => {
                let mods = account_modifications(&live, account);
                if mods.is_empty() {
                    debug!(dn = %live.dn, "Account up to date");
                } else if self.writer.modify(&live.dn, &mods).await.is_committed() {
                    self.stats.record(SyncAction::AccountUpdated);
                }
                Ok(None)
            }
            None => {
                let cn = self.allocate_identifier(account).await?;
                let entry = self.new_account_entry(&cn, account, role);
                if self.writer.add(&entry).await.is_committed() {
                    self.stats.record(SyncAction::AccountCreated);
                    Ok(Some(cn))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Ensure every account exists and is current, then welcome the new ones.
    pub async fn upsert_accounts(&self, accounts: &[AccountDescriptor], role: AccountRole) {
        let mut seen = HashSet::new();
        for account in accounts.iter().filter(|a| seen.insert(a.external_id)) {
            match self.upsert_account(account, role).await {
                Ok(Some(cn)) => {
                    self.notify(
                        &account.mails,
                        NotificationEvent::AccountCreated {
                            username: &cn,
                            role,
                        },
                    )
                    .await;
                }
                Ok(None) => {}
                Err(e) => {
                    let subject = format!(
                        "employeeNumber={},{}",
                        account.external_id,
                        self.config.layout.accounts_dn()
                    );
                    self.writer
                        .directory_failure(&subject, "upsert_account", "", &e)
                        .await;
                }
            }
        }
    }

    /// DNs of the accounts for `accounts`, skipping any that do not exist.
    pub async fn account_dns(&self, accounts: &[AccountDescriptor]) -> DirectoryResult<Vec<String>> {
        let mut dns: Vec<String> = Vec::new();
        for account in accounts {
            match self.find_account(account.external_id).await? {
                Some(entry) => {
                    if !dns.iter().any(|d| dn_eq(d, &entry.dn)) {
                        dns.push(entry.dn);
                    }
                }
                None => debug!(
                    contact_id = account.external_id,
                    "No account for contact, leaving out of group"
                ),
            }
        }
        Ok(dns)
    }
}
