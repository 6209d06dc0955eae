//! Tenant children of projects.

use dirsync_directory::{rdn_value, Directory, DirectoryResult, Entry, Filter, SearchScope};
use tracing::{info, warn};

use super::groups::TENANT_CLASS;
use super::Reconciler;
use crate::dispatcher::NotificationEvent;
use crate::model::{AccountRole, ProjectDescriptor};
use crate::statistics::SyncAction;

fn entry_cn(entry: &Entry) -> Option<String> {
    entry
        .first("cn")
        .map(str::to_string)
        .or_else(|| rdn_value(&entry.dn))
}

impl Reconciler {
    async fn live_tenants(&self, project_dn: &str) -> DirectoryResult<Vec<Entry>> {
        self.directory
            .search(
                project_dn,
                SearchScope::OneLevel,
                &Filter::eq("objectClass", TENANT_CLASS),
                &["cn", "o"],
            )
            .await
    }

    /// Create the declared tenants of a new project, or a default one.
    pub(crate) async fn create_tenants(&self, project: &ProjectDescriptor) -> DirectoryResult<()> {
        if project.tenants.is_empty() {
            return self.synthesize_default_tenant(project).await;
        }
        for tenant in &project.tenants {
            self.create_tenant(project, tenant).await?;
        }
        Ok(())
    }

    async fn create_tenant(
        &self,
        parent: &ProjectDescriptor,
        tenant: &ProjectDescriptor,
    ) -> DirectoryResult<()> {
        if self.reject_unnamed("create_tenant", tenant).await {
            return Ok(());
        }
        self.upsert_accounts(&tenant.members, AccountRole::Developer)
            .await;

        let dn = self.config.layout.tenant_dn(&parent.cn, &tenant.cn);
        let entry = self.group_entry(&dn, tenant).await?;
        if self.writer.add(&entry).await.is_committed() {
            self.stats.record(SyncAction::TenantCreated);
            self.notify_accounts(
                &tenant.members,
                NotificationEvent::MemberAdded {
                    target: &tenant.cn,
                    tenant: true,
                },
            )
            .await;
        }
        Ok(())
    }

    /// Create a placeholder tenant in the CRM, then its directory entry.
    async fn synthesize_default_tenant(&self, parent: &ProjectDescriptor) -> DirectoryResult<()> {
        let placeholder = match self.crm.create_default_tenant(parent).await {
            Ok(placeholder) => placeholder,
            Err(e) => {
                self.writer
                    .crm_failure(parent.external_id, "create_default_tenant", &e)
                    .await;
                return Ok(());
            }
        };
        self.stats.record(SyncAction::DefaultTenantSynthesized);
        info!(
            project = %parent.cn,
            tenant_id = placeholder.project_id,
            "Default tenant synthesized"
        );
        self.create_tenant(parent, &parent.default_tenant(placeholder.project_id))
            .await
    }

    /// Create missing tenants, update shared ones and delete the rest.
    pub(crate) async fn reconcile_tenants(&self, project: &ProjectDescriptor) -> DirectoryResult<()> {
        let project_dn = self.config.layout.project_dn(&project.cn);
        let live = self.live_tenants(&project_dn).await?;

        if project.tenants.is_empty() {
            if live.is_empty() {
                return self.synthesize_default_tenant(project).await;
            }
            return Ok(());
        }

        let live_cns: Vec<String> = live.iter().filter_map(entry_cn).collect();
        for tenant in &project.tenants {
            if tenant.cn.is_empty() {
                self.reject_unnamed("update_tenant", tenant).await;
            } else if live_cns.iter().any(|cn| cn.eq_ignore_ascii_case(&tenant.cn)) {
                self.upsert_accounts(&tenant.members, AccountRole::Developer)
                    .await;
                let dn = self.config.layout.tenant_dn(&project.cn, &tenant.cn);
                let desired = self.group_entry(&dn, tenant).await?;
                if self.update_group(&desired, tenant).await? {
                    self.stats.record(SyncAction::TenantUpdated);
                }
            } else {
                self.create_tenant(project, tenant).await?;
            }
        }

        for entry in &live {
            let declared = entry_cn(entry).is_some_and(|cn| {
                project
                    .tenants
                    .iter()
                    .any(|t| t.cn.eq_ignore_ascii_case(&cn))
            });
            if !declared && self.writer.delete(&entry.dn).await.is_committed() {
                self.stats.record(SyncAction::TenantDeleted);
            }
        }
        Ok(())
    }

    /// Delete every child of a project. Returns the CRM ids found on them.
    pub(crate) async fn delete_tenants(&self, project_dn: &str) -> DirectoryResult<Vec<i64>> {
        let children = self
            .directory
            .search(project_dn, SearchScope::OneLevel, &Filter::any(), &["cn", "o"])
            .await?;

        let mut ids = Vec::new();
        for child in children {
            match child.first("o").map(str::parse::<i64>) {
                Some(Ok(id)) => ids.push(id),
                Some(Err(_)) => warn!(dn = %child.dn, "Tenant has a non-numeric CRM id"),
                None => {}
            }
            if self.writer.delete(&child.dn).await.is_committed() {
                self.stats.record(SyncAction::TenantDeleted);
            }
        }
        Ok(ids)
    }
}
