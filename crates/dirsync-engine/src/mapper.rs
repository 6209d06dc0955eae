//! CRM records to desired-state descriptors.

use std::collections::{HashMap, HashSet};

use dirsync_crm::models::{Contact, Project};
use tracing::debug;

use crate::config::RoleMatching;
use crate::model::{
    AccountDescriptor, Category, ProjectDescriptor, PLACEHOLDER_GIVEN_NAME, PLACEHOLDER_SURNAME,
};
use crate::sanitize::sanitize;
use crate::similarity::weighted_ratio;

/// Builds account and project descriptors from a CRM snapshot.
pub struct DesiredStateMapper<'a> {
    contacts: HashMap<i64, &'a Contact>,
    roles: &'a RoleMatching,
}

impl<'a> DesiredStateMapper<'a> {
    pub fn new(contacts: &'a [Contact], roles: &'a RoleMatching) -> Self {
        Self {
            contacts: contacts.iter().map(|c| (c.contact_id, c)).collect(),
            roles,
        }
    }

    /// Descriptor for one contact, with placeholders for missing names.
    pub fn map_contact(contact: &Contact) -> AccountDescriptor {
        let given = contact.first_name.as_deref().map(str::trim).unwrap_or("");
        let surname = contact.last_name.as_deref().map(str::trim).unwrap_or("");

        AccountDescriptor {
            external_id: contact.contact_id,
            given_name: if given.is_empty() {
                PLACEHOLDER_GIVEN_NAME.to_string()
            } else {
                given.to_string()
            },
            surname: if surname.is_empty() {
                PLACEHOLDER_SURNAME.to_string()
            } else {
                surname.to_string()
            },
            display_name: format!("{given} {surname}").trim().to_string(),
            mails: contact.emails(),
            mobiles: contact.phones(),
            hidden: contact.is_hidden(),
        }
    }

    pub fn map_contacts(&self, raw: &[Contact]) -> Vec<AccountDescriptor> {
        raw.iter().map(Self::map_contact).collect()
    }

    fn role_matches(&self, role: Option<&str>, needle: &str) -> bool {
        role.map(|r| weighted_ratio(needle, r) >= self.roles.threshold)
            .unwrap_or(false)
    }

    /// Map projects of the given categories.
    ///
    /// With a `tenant_pool`, projects from the pool referenced by a project's
    /// cross-links become its tenants, tagged with [`Category::Tenant`].
    pub fn map_projects(
        &self,
        raw: &[&Project],
        categories: &[Category],
        tenant_pool: Option<&[&Project]>,
    ) -> Vec<ProjectDescriptor> {
        raw.iter()
            .map(|project| self.map_project(project, categories, tenant_pool))
            .collect()
    }

    fn map_project(
        &self,
        project: &Project,
        categories: &[Category],
        tenant_pool: Option<&[&Project]>,
    ) -> ProjectDescriptor {
        let mut owner = None;
        let mut admins = Vec::new();
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let mut seen_admins = HashSet::new();

        for link in &project.links {
            let Some(contact_id) = link.contact_id else {
                continue;
            };
            let Some(contact) = self.contacts.get(&contact_id) else {
                debug!(
                    project_id = project.project_id,
                    contact_id, "Linked contact not found, skipping"
                );
                continue;
            };
            let account = Self::map_contact(contact);
            let role = link.role.as_deref();

            if owner.is_none() && self.role_matches(role, &self.roles.owner_role) {
                owner = Some(account.clone());
            }
            if self.role_matches(role, &self.roles.admin_role) && seen_admins.insert(contact_id) {
                admins.push(account.clone());
            }
            if seen.insert(contact_id) {
                members.push(account);
            }
        }

        let tenants = match tenant_pool {
            Some(pool) => {
                let linked: HashSet<i64> = project.linked_project_ids().collect();
                let mut tenant_categories = categories.to_vec();
                tenant_categories.push(Category::Tenant);
                let tenants: Vec<&Project> = pool
                    .iter()
                    .copied()
                    .filter(|t| linked.contains(&t.project_id))
                    .collect();
                self.map_projects(&tenants, &tenant_categories, None)
            }
            None => Vec::new(),
        };

        ProjectDescriptor {
            cn: sanitize(&project.project_name),
            external_id: project.project_id,
            categories: categories.to_vec(),
            owner,
            admins,
            members,
            tenants,
        }
    }
}
