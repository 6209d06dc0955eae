//! LDAP directory session.
//!
//! Implements the `Directory` trait over an `ldap3` async connection. A single
//! bound connection is created lazily and shared by every operation of the
//! pass; result codes are classified through `DirectoryError::from_result_code`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry, SearchResult};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use dirsync_directory::entry::{Entry, Modification, SearchScope};
use dirsync_directory::error::{
    DirectoryError, DirectoryResult, RC_INVALID_CREDENTIALS, RC_NO_SUCH_OBJECT,
};
use dirsync_directory::filter::Filter;
use dirsync_directory::traits::Directory;

use crate::config::LdapConfig;

/// Directory session backed by an LDAP server.
pub struct LdapDirectory {
    config: LdapConfig,

    /// Cached LDAP connection (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    /// Create a new session handle. No network traffic happens until first use.
    pub fn new(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Bind eagerly so credential problems surface before any work is done.
    pub async fn connect(&self) -> DirectoryResult<()> {
        self.get_connection().await.map(|_| ())
    }

    /// Unbind and drop the cached connection.
    pub async fn close(&self) {
        let mut guard = self.connection.write().await;
        if let Some(mut ldap) = guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
        }
    }

    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        {
            let guard = self.connection.read().await;
            if let Some(ref conn) = *guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.create_connection().await?;
        *self.connection.write().await = Some(conn.clone());
        Ok(conn)
    }

    async fn create_connection(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(std::time::Duration::from_secs(
                self.config.connection_timeout_secs,
            ))
            .set_starttls(self.config.use_starttls)
            .set_no_tls_verify(self.config.no_tls_verify);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");
        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(DirectoryError::AuthenticationFailed);
        }
        if result.rc != 0 {
            return Err(DirectoryError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "LDAP connection established");
        Ok(ldap)
    }

    fn scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    fn to_ldap_mod(m: &Modification) -> Mod<String> {
        match m {
            Modification::Add { attribute, values } => {
                Mod::Add(attribute.clone(), values.iter().cloned().collect())
            }
            Modification::Replace { attribute, values } => {
                Mod::Replace(attribute.clone(), values.iter().cloned().collect())
            }
            Modification::Delete { attribute, values } => {
                Mod::Delete(attribute.clone(), values.iter().cloned().collect())
            }
        }
    }

    fn to_entry(entry: SearchEntry) -> Entry {
        let mut out = Entry::new(entry.dn);
        for (name, values) in entry.attrs {
            out.set(name, values);
        }
        out
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    #[instrument(skip(self, filter, attrs), fields(filter = %filter.to_ldap_string()))]
    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        let mut ldap = self.get_connection().await?;
        let ldap_filter = filter.to_ldap_string();
        let projection: Vec<&str> = if attrs.is_empty() {
            vec!["*"]
        } else {
            attrs.to_vec()
        };

        let SearchResult(entries, result) = ldap
            .search(base, Self::scope(scope), &ldap_filter, projection)
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP search failed", e))?;

        if result.rc == RC_NO_SUCH_OBJECT {
            debug!(base = %base, "Search base does not exist");
            return Ok(Vec::new());
        }
        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(result.rc, base, &result.text));
        }

        let found: Vec<Entry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(Self::to_entry)
            .collect();
        debug!(base = %base, found = found.len(), "LDAP search completed");
        Ok(found)
    }

    #[instrument(skip(self, entry), fields(dn = %entry.dn))]
    async fn add(&self, entry: &Entry) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;

        let attrs: Vec<(String, HashSet<String>)> = entry
            .attributes
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
            .collect();

        let result = ldap.add(&entry.dn, attrs).await.map_err(|e| {
            DirectoryError::operation_failed_with_source(
                format!("Failed to add entry: {}", entry.dn),
                e,
            )
        })?;
        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(
                result.rc,
                &entry.dn,
                &result.text,
            ));
        }

        info!(dn = %entry.dn, "LDAP entry added");
        Ok(())
    }

    #[instrument(skip(self, mods))]
    async fn modify(&self, dn: &str, mods: &[Modification]) -> DirectoryResult<()> {
        if mods.is_empty() {
            return Ok(());
        }
        let mut ldap = self.get_connection().await?;

        let ldap_mods: Vec<Mod<String>> = mods.iter().map(Self::to_ldap_mod).collect();
        let result = ldap.modify(dn, ldap_mods).await.map_err(|e| {
            DirectoryError::operation_failed_with_source(format!("Failed to modify entry: {dn}"), e)
        })?;
        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(result.rc, dn, &result.text));
        }

        info!(dn = %dn, changes = mods.len(), "LDAP entry modified");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;

        let result = ldap.delete(dn).await.map_err(|e| {
            DirectoryError::operation_failed_with_source(format!("Failed to delete entry: {dn}"), e)
        })?;
        if result.rc != 0 {
            return Err(DirectoryError::from_result_code(result.rc, dn, &result.text));
        }

        info!(dn = %dn, "LDAP entry deleted");
        Ok(())
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config)
            .finish()
    }
}
