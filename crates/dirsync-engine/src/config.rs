//! Engine configuration.

use dirsync_directory::child_dn;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::Category;

/// Where accounts and projects live in the directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLayout {
    pub base_dn: String,
    #[serde(default = "default_accounts_ou")]
    pub accounts_ou: String,
    #[serde(default = "default_projects_ou")]
    pub projects_ou: String,
}

fn default_accounts_ou() -> String {
    "accounts".to_string()
}

fn default_projects_ou() -> String {
    "projects".to_string()
}

impl DirectoryLayout {
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            accounts_ou: default_accounts_ou(),
            projects_ou: default_projects_ou(),
        }
    }

    /// `ou=accounts,<base>`
    pub fn accounts_dn(&self) -> String {
        child_dn("ou", &self.accounts_ou, &self.base_dn)
    }

    /// `ou=projects,<base>`
    pub fn projects_dn(&self) -> String {
        child_dn("ou", &self.projects_ou, &self.base_dn)
    }

    pub fn account_dn(&self, cn: &str) -> String {
        child_dn("cn", cn, &self.accounts_dn())
    }

    pub fn project_dn(&self, cn: &str) -> String {
        child_dn("cn", cn, &self.projects_dn())
    }

    pub fn tenant_dn(&self, project_cn: &str, tenant_cn: &str) -> String {
        child_dn("cn", tenant_cn, &self.project_dn(project_cn))
    }
}

/// Stage orders of the creation, update and deletion bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBands {
    #[serde(default = "default_create_band")]
    pub create: Vec<i64>,
    #[serde(default = "default_update_band")]
    pub update: Vec<i64>,
    #[serde(default = "default_delete_band")]
    pub delete: Vec<i64>,
}

fn default_create_band() -> Vec<i64> {
    vec![4]
}

fn default_update_band() -> Vec<i64> {
    vec![5, 6]
}

fn default_delete_band() -> Vec<i64> {
    vec![7]
}

impl Default for StageBands {
    fn default() -> Self {
        Self {
            create: default_create_band(),
            update: default_update_band(),
            delete: default_delete_band(),
        }
    }
}

/// CRM category names for each project kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLabels {
    pub sda: String,
    pub fpa: String,
    pub fpa_cra: String,
    pub tenant: String,
}

impl Default for CategoryLabels {
    fn default() -> Self {
        Self {
            sda: "SDA".to_string(),
            fpa: "FPA".to_string(),
            fpa_cra: "FPA (CRA)".to_string(),
            tenant: "OpenStack Tenant".to_string(),
        }
    }
}

impl CategoryLabels {
    pub fn label(&self, category: Category) -> &str {
        match category {
            Category::Sda => &self.sda,
            Category::Fpa => &self.fpa,
            Category::FpaCra => &self.fpa_cra,
            Category::Tenant => &self.tenant,
        }
    }

    /// Category carrying `label`, if any.
    pub fn category_of(&self, label: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| self.label(*c) == label)
    }
}

/// Fuzzy role matching for owners and administrative contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMatching {
    #[serde(default = "default_owner_role")]
    pub owner_role: String,
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    /// Minimum similarity score (0-100).
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

fn default_owner_role() -> String {
    "tech".to_string()
}

fn default_admin_role() -> String {
    "admin".to_string()
}

fn default_threshold() -> u8 {
    80
}

impl Default for RoleMatching {
    fn default() -> Self {
        Self {
            owner_role: default_owner_role(),
            admin_role: default_admin_role(),
            threshold: default_threshold(),
        }
    }
}

fn default_protected_accounts() -> Vec<String> {
    ["admin", "binder", "pwdchanger", "syncer"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_pipeline_name() -> String {
    "Project execution".to_string()
}

/// Configuration for a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub layout: DirectoryLayout,
    /// Account names never disabled by pruning.
    #[serde(default = "default_protected_accounts")]
    pub protected_accounts: Vec<String>,
    /// Pipeline whose stages drive classification.
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,
    #[serde(default)]
    pub bands: StageBands,
    #[serde(default)]
    pub categories: CategoryLabels,
    #[serde(default)]
    pub roles: RoleMatching,
}

impl EngineConfig {
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            layout: DirectoryLayout::new(base_dn),
            protected_accounts: default_protected_accounts(),
            pipeline_name: default_pipeline_name(),
            bands: StageBands::default(),
            categories: CategoryLabels::default(),
            roles: RoleMatching::default(),
        }
    }

    pub fn with_protected_accounts(mut self, accounts: Vec<String>) -> Self {
        self.protected_accounts = accounts;
        self
    }

    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = name.into();
        self
    }

    pub fn is_protected(&self, cn: &str) -> bool {
        self.protected_accounts
            .iter()
            .any(|p| p.eq_ignore_ascii_case(cn))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.layout.base_dn.trim().is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "base DN is required".to_string(),
            ));
        }
        if self.roles.threshold > 100 {
            return Err(EngineError::InvalidConfiguration(format!(
                "role threshold {} exceeds 100",
                self.roles.threshold
            )));
        }
        if self.pipeline_name.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "pipeline name is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_dns() {
        let layout = DirectoryLayout::new("dc=forgeservicelab,dc=fi");
        assert_eq!(layout.accounts_dn(), "ou=accounts,dc=forgeservicelab,dc=fi");
        assert_eq!(
            layout.tenant_dn("Acme.Cloud", "acme"),
            "cn=acme,cn=Acme.Cloud,ou=projects,dc=forgeservicelab,dc=fi"
        );
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new("dc=example,dc=org");
        assert_eq!(config.bands.create, vec![4]);
        assert_eq!(config.bands.update, vec![5, 6]);
        assert_eq!(config.bands.delete, vec![7]);
        assert_eq!(config.pipeline_name, "Project execution");
        assert_eq!(config.roles.threshold, 80);
        assert!(config.is_protected("Binder"));
        assert!(!config.is_protected("jean.dupont"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_category_labels() {
        let labels = CategoryLabels::default();
        assert_eq!(labels.category_of("FPA (CRA)"), Some(Category::FpaCra));
        assert_eq!(labels.category_of("OpenStack Tenant"), Some(Category::Tenant));
        assert_eq!(labels.category_of("Other"), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"layout": {"base_dn": "dc=example,dc=org"}}"#).unwrap();
        assert_eq!(config, EngineConfig::new("dc=example,dc=org"));
    }

    #[test]
    fn test_validate_rejects_empty_base() {
        assert!(EngineConfig::new("  ").validate().is_err());
    }
}
