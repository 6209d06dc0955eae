//! LDAP connection configuration.

use serde::{Deserialize, Serialize};

use dirsync_directory::error::{DirectoryError, DirectoryResult};

/// Configuration for the LDAP session.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server hostname or IP address.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldaps_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default = "default_true")]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Accept server certificates that fail verification.
    #[serde(default)]
    pub no_tls_verify: bool,

    /// Naming context, e.g. `dc=forgeservicelab,dc=fi`.
    pub base_dn: String,

    /// Bind DN for authentication.
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("no_tls_verify", &self.no_tls_verify)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .finish()
    }
}

fn default_ldaps_port() -> u16 {
    636
}

fn default_true() -> bool {
    true
}

fn default_connection_timeout() -> u64 {
    30
}

impl LdapConfig {
    /// Create an LDAPS config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldaps_port(),
            use_ssl: true,
            use_starttls: false,
            no_tls_verify: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection_timeout_secs: default_connection_timeout(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Use plain LDAP on port 389.
    #[must_use]
    pub fn with_plain(mut self) -> Self {
        self.use_ssl = false;
        self.port = 389;
        self
    }

    /// Enable STARTTLS on a plain connection.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_ssl = false;
        self.use_starttls = true;
        self.port = 389;
        self
    }

    /// Skip server certificate verification.
    #[must_use]
    pub fn with_no_tls_verify(mut self) -> Self {
        self.no_tls_verify = true;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Validate required fields.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.is_empty() {
            return Err(DirectoryError::invalid_configuration("host is required"));
        }
        if self.base_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("base_dn is required"));
        }
        if self.bind_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("bind_dn is required"));
        }
        if self.use_ssl && self.use_starttls {
            return Err(DirectoryError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }
        Ok(())
    }
}
