//! Run settings from command-line options and an optional resources file.
//!
//! The resources file holds `long_option=value` lines using the same names
//! as the command-line options. Values from the file take precedence over
//! the command line. Blank lines and lines starting with `#` are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dirsync_connector_ldap::LdapConfig;
use dirsync_crm::InsightlyConfig;
use dirsync_engine::config::EngineConfig;
use dirsync_notify::{RedmineConfig, SmtpConfig};
use thiserror::Error;

pub const DEFAULT_LDAP_HOST: &str = "localhost";
pub const DEFAULT_OS_BASE_URL: &str = "https://cloud.forgeservicelab.fi";
pub const DEFAULT_VERBOSITY: &str = "WARNING";
pub const DEFAULT_BASE_DN: &str = "dc=forgeservicelab,dc=fi";

/// Option names accepted on the command line and in a resources file.
pub const KNOWN_OPTIONS: [&str; 16] = [
    "ldap",
    "bind",
    "password",
    "api_key",
    "os_user",
    "os_pass",
    "os_tenant",
    "os_base_url",
    "redmine_api",
    "verbose",
    "base_dn",
    "smtp_host",
    "mail_from",
    "redmine_url",
    "redmine_project",
    "log_file",
];

/// Configuration errors, reported before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read resources file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed line {line} in resources file: {content}")]
    MalformedLine { line: usize, content: String },

    #[error("Unknown option in resources file: {0}")]
    UnknownOption(String),

    #[error("Missing required option: --{0}")]
    Missing(&'static str),

    #[error("Invalid value for --{option}: {message}")]
    InvalidValue { option: &'static str, message: String },
}

/// Option name in its canonical form: no leading dashes, `_` separators.
fn canonical(name: &str) -> String {
    name.trim().trim_start_matches('-').replace('-', "_")
}

/// Parse resources file content into option values.
pub fn parse_resources(content: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut options = BTreeMap::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            return Err(ConfigError::MalformedLine {
                line: index + 1,
                content: line.to_string(),
            });
        };
        let name = canonical(name);
        if !KNOWN_OPTIONS.contains(&name.as_str()) {
            return Err(ConfigError::UnknownOption(name));
        }
        options.insert(name, value.trim().to_string());
    }
    Ok(options)
}

pub fn read_resources(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_resources(&content)
}

/// Credentials for the cloud whose quotas follow the tenant identifiers.
#[derive(Clone)]
pub struct OpenStackSettings {
    pub user: String,
    pub password: String,
    pub tenant: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenStackSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenStackSettings")
            .field("user", &self.user)
            .field("password", &"***REDACTED***")
            .field("tenant", &self.tenant)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ldap: LdapConfig,
    pub insightly: InsightlyConfig,
    pub smtp: SmtpConfig,
    pub redmine: Option<RedmineConfig>,
    pub openstack: Option<OpenStackSettings>,
    pub engine: EngineConfig,
    pub verbosity: String,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from merged option values.
    pub fn resolve(options: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            options
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let base_dn = get("base_dn").unwrap_or(DEFAULT_BASE_DN);
        let engine = EngineConfig::new(base_dn);

        let bind_dn = engine.layout.account_dn(require("bind")?);
        let ldap = LdapConfig::new(
            get("ldap").unwrap_or(DEFAULT_LDAP_HOST),
            base_dn,
            bind_dn,
        )
        .with_password(require("password")?)
        .with_no_tls_verify();

        let insightly = InsightlyConfig::new(require("api_key")?);

        let mut smtp = SmtpConfig::default();
        if let Some(host) = get("smtp_host") {
            smtp.host = host.to_string();
        }
        if let Some(from) = get("mail_from") {
            smtp.from = from.to_string();
        }

        let redmine = get("redmine_api").map(|key| {
            let mut config = RedmineConfig::new(key);
            if let Some(url) = get("redmine_url") {
                config.base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(project) = get("redmine_project") {
                config.project = project.to_string();
            }
            config
        });

        let openstack = match (get("os_user"), get("os_pass"), get("os_tenant")) {
            (Some(user), Some(password), Some(tenant)) => Some(OpenStackSettings {
                user: user.to_string(),
                password: password.to_string(),
                tenant: tenant.to_string(),
                base_url: get("os_base_url").unwrap_or(DEFAULT_OS_BASE_URL).to_string(),
            }),
            _ => None,
        };

        let verbosity = get("verbose").unwrap_or(DEFAULT_VERBOSITY).to_uppercase();
        if crate::logging::level_directive(&verbosity).is_none() {
            return Err(ConfigError::InvalidValue {
                option: "verbose",
                message: format!(
                    "{verbosity} is not one of DEBUG, INFO, WARNING, ERROR, CRITICAL"
                ),
            });
        }

        Ok(Self {
            ldap,
            insightly,
            smtp,
            redmine,
            openstack,
            engine,
            verbosity,
            log_file: get("log_file").map(PathBuf::from),
        })
    }
}
