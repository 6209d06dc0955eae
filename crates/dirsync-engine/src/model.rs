//! Desired-state descriptors.
//!
//! The mapper is the only place that reads raw CRM records; everything
//! downstream works on these types.

use serde::{Deserialize, Serialize};

use crate::config::CategoryLabels;
use crate::sanitize::name_token;

/// Stand-in for a missing given name. Never used in identifiers.
pub const PLACEHOLDER_GIVEN_NAME: &str = "FirstName";

/// Stand-in for a missing family name. Never used in identifiers.
pub const PLACEHOLDER_SURNAME: &str = "LastName";

/// Project kinds the engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Sda,
    Fpa,
    FpaCra,
    Tenant,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Sda,
        Category::Fpa,
        Category::FpaCra,
        Category::Tenant,
    ];

    /// Top-level categories in processing order.
    pub const PROJECTS: [Category; 3] = [Category::Sda, Category::FpaCra, Category::Fpa];

    /// Whether projects of this kind carry tenant children.
    pub fn has_tenants(&self) -> bool {
        matches!(self, Category::Sda | Category::FpaCra)
    }

    /// Role given to accounts first created for this kind of project.
    pub fn account_role(&self) -> AccountRole {
        match self {
            Category::Sda | Category::Tenant => AccountRole::Developer,
            Category::Fpa | Category::FpaCra => AccountRole::Partner,
        }
    }
}

/// Developer or partner; picks the account-created and account-disabled messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Developer,
    Partner,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Developer => "developer",
            AccountRole::Partner => "partner",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "developer" => Some(AccountRole::Developer),
            "partner" => Some(AccountRole::Partner),
            _ => None,
        }
    }
}

/// Enablement of an account, stored in `employeeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enablement {
    Active,
    Disabled,
    Hidden,
}

impl Enablement {
    pub const DISABLED: &'static str = "disabled";
    pub const HIDDEN: &'static str = "hidden";

    pub fn from_employee_type(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case(Self::DISABLED) => Enablement::Disabled,
            Some(v) if v.eq_ignore_ascii_case(Self::HIDDEN) => Enablement::Hidden,
            _ => Enablement::Active,
        }
    }

    pub fn employee_type(&self) -> Option<&'static str> {
        match self {
            Enablement::Active => None,
            Enablement::Disabled => Some(Self::DISABLED),
            Enablement::Hidden => Some(Self::HIDDEN),
        }
    }
}

/// A contact as it should appear in the accounts subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescriptor {
    /// CRM contact id, stored as `employeeNumber`.
    pub external_id: i64,
    pub given_name: String,
    pub surname: String,
    pub display_name: String,
    pub mails: Vec<String>,
    pub mobiles: Vec<String>,
    pub hidden: bool,
}

impl AccountDescriptor {
    pub fn external_id_text(&self) -> String {
        self.external_id.to_string()
    }

    /// `first.last` from the first usable token of each name, skipping placeholders.
    pub fn base_identifier(&self) -> String {
        let given = (self.given_name != PLACEHOLDER_GIVEN_NAME)
            .then(|| name_token(&self.given_name))
            .flatten();
        let surname = (self.surname != PLACEHOLDER_SURNAME)
            .then(|| name_token(&self.surname))
            .flatten();

        let parts: Vec<String> = given.into_iter().chain(surname).collect();
        if parts.is_empty() {
            format!("contact.{}", self.external_id)
        } else {
            parts.join(".")
        }
    }

    pub fn enablement(&self) -> Enablement {
        if self.hidden {
            Enablement::Hidden
        } else {
            Enablement::Active
        }
    }
}

/// A project or tenant group as it should appear in the projects subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Sanitized name; the entry's `cn`.
    pub cn: String,
    /// CRM project id, stored as `o`.
    pub external_id: i64,
    pub categories: Vec<Category>,
    pub owner: Option<AccountDescriptor>,
    pub admins: Vec<AccountDescriptor>,
    /// Every linked contact, owner and admins included.
    pub members: Vec<AccountDescriptor>,
    pub tenants: Vec<ProjectDescriptor>,
}

impl ProjectDescriptor {
    pub fn primary_category(&self) -> Option<Category> {
        self.categories.first().copied()
    }

    pub fn is_tenant(&self) -> bool {
        self.categories.contains(&Category::Tenant)
    }

    /// Whether the project must have at least one tenant child.
    pub fn requires_tenants(&self) -> bool {
        !self.is_tenant() && self.categories.iter().any(Category::has_tenants)
    }

    /// Role for accounts first created through this project.
    pub fn account_role(&self) -> AccountRole {
        if self.is_tenant() {
            return AccountRole::Developer;
        }
        self.primary_category()
            .map(|c| c.account_role())
            .unwrap_or(AccountRole::Partner)
    }

    /// `type:<label>` description tags.
    pub fn description_tags(&self, labels: &CategoryLabels) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("type:{}", labels.label(*c)))
            .collect()
    }

    /// Tenant descriptor standing in for an undeclared tenant: the parent's
    /// name and membership under the placeholder's CRM id.
    pub fn default_tenant(&self, placeholder_id: i64) -> ProjectDescriptor {
        let mut categories = self.categories.clone();
        categories.push(Category::Tenant);
        ProjectDescriptor {
            cn: self.cn.clone(),
            external_id: placeholder_id,
            categories,
            owner: self.owner.clone(),
            admins: self.admins.clone(),
            members: self.members.clone(),
            tenants: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, given: &str, surname: &str) -> AccountDescriptor {
        AccountDescriptor {
            external_id: id,
            given_name: given.to_string(),
            surname: surname.to_string(),
            display_name: format!("{given} {surname}"),
            mails: vec![],
            mobiles: vec![],
            hidden: false,
        }
    }

    #[test]
    fn test_base_identifier() {
        assert_eq!(account(1, "Jean", "Dupont").base_identifier(), "jean.dupont");
        assert_eq!(
            account(2, "Ana-María", "de la Fuente").base_identifier(),
            "ana.la"
        );
        assert_eq!(
            account(3, PLACEHOLDER_GIVEN_NAME, "Smith").base_identifier(),
            "smith"
        );
        assert_eq!(
            account(4, PLACEHOLDER_GIVEN_NAME, PLACEHOLDER_SURNAME).base_identifier(),
            "contact.4"
        );
    }

    #[test]
    fn test_enablement_mapping() {
        assert_eq!(
            Enablement::from_employee_type(Some("Disabled")),
            Enablement::Disabled
        );
        assert_eq!(Enablement::from_employee_type(None), Enablement::Active);
        assert_eq!(Enablement::Hidden.employee_type(), Some("hidden"));
    }

    #[test]
    fn test_project_kinds() {
        let project = ProjectDescriptor {
            cn: "acme".into(),
            external_id: 10,
            categories: vec![Category::FpaCra],
            owner: None,
            admins: vec![],
            members: vec![],
            tenants: vec![],
        };
        assert!(project.requires_tenants());
        assert_eq!(project.account_role(), AccountRole::Partner);

        let tenant = project.default_tenant(11);
        assert!(tenant.is_tenant());
        assert!(!tenant.requires_tenants());
        assert_eq!(tenant.external_id, 11);
        assert_eq!(tenant.account_role(), AccountRole::Developer);
        assert_eq!(
            tenant.description_tags(&CategoryLabels::default()),
            vec!["type:FPA (CRA)", "type:OpenStack Tenant"]
        );
    }
}
