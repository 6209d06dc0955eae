//! dirsync - synchronize CRM projects and contacts into the LDAP directory.
//!
//! One invocation runs one reconciliation pass:
//! - Reads projects, contacts and pipeline stages from Insightly
//! - Creates, updates and deletes project groups, tenants and accounts
//! - Reports project progress back to Insightly
//! - Mails contacts about their accounts and memberships
//!
//! A failure that stops the pass is logged and, when a Redmine key is
//! configured, filed as a critical incident.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dirsync_connector_ldap::LdapDirectory;
use dirsync_crm::InsightlyClient;
use dirsync_engine::report::PassReport;
use dirsync_engine::SyncEngine;
use dirsync_notify::{Incident, IncidentSink, RedmineIncidentSink, Severity, SmtpMailer};
use tracing::{error, info, warn};

mod config;
mod error;
mod logging;

use config::{read_resources, Settings, DEFAULT_LDAP_HOST, DEFAULT_OS_BASE_URL, DEFAULT_VERBOSITY};
use error::{CliError, CliResult};

/// Fetch identity data from Insightly and synchronize it with LDAP
#[derive(Parser, Debug)]
#[command(name = "dirsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// LDAP host to connect to
    #[arg(short = 'l', long = "ldap", default_value = DEFAULT_LDAP_HOST)]
    ldap: String,

    /// Username of the LDAP account for binding (needs admin rights)
    #[arg(short = 'b', long = "bind")]
    bind: Option<String>,

    /// LDAP binding account password
    #[arg(short = 'p', long = "password", env = "DIRSYNC_BIND_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Insightly API key
    #[arg(short = 'i', long = "api_key", env = "DIRSYNC_INSIGHTLY_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenStack administrator username
    #[arg(short = 'U', long = "os_user")]
    os_user: Option<String>,

    /// OpenStack administrator password
    #[arg(short = 'P', long = "os_pass")]
    os_pass: Option<String>,

    /// OpenStack tenant for the administrator account
    #[arg(short = 'T', long = "os_tenant")]
    os_tenant: Option<String>,

    /// URI of the OpenStack environment
    #[arg(short = 'O', long = "os_base_url", default_value = DEFAULT_OS_BASE_URL)]
    os_base_url: String,

    /// Redmine REST API key; enables incident filing
    #[arg(short = 'R', long = "redmine_api")]
    redmine_api: Option<String>,

    /// A file with option values in the format <long_option_name>=<value>
    #[arg(short = 'r', long = "resources")]
    resources: Option<PathBuf>,

    /// Verbosity: DEBUG, INFO, WARNING, ERROR or CRITICAL
    #[arg(short = 'v', long = "verbose", default_value = DEFAULT_VERBOSITY)]
    verbose: String,

    /// Directory base DN
    #[arg(long = "base-dn")]
    base_dn: Option<String>,

    /// SMTP relay for notifications
    #[arg(long = "smtp-host")]
    smtp_host: Option<String>,

    /// Sender address for notifications
    #[arg(long = "mail-from")]
    mail_from: Option<String>,

    /// Redmine base URL
    #[arg(long = "redmine-url")]
    redmine_url: Option<String>,

    /// Redmine project incidents are filed under
    #[arg(long = "redmine-project")]
    redmine_project: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Command-line values keyed by canonical option name.
    fn options(&self) -> BTreeMap<String, String> {
        let mut options = BTreeMap::new();
        let mut put = |name: &str, value: Option<&str>| {
            if let Some(value) = value {
                options.insert(name.to_string(), value.to_string());
            }
        };
        put("ldap", Some(self.ldap.as_str()));
        put("bind", self.bind.as_deref());
        put("password", self.password.as_deref());
        put("api_key", self.api_key.as_deref());
        put("os_user", self.os_user.as_deref());
        put("os_pass", self.os_pass.as_deref());
        put("os_tenant", self.os_tenant.as_deref());
        put("os_base_url", Some(self.os_base_url.as_str()));
        put("redmine_api", self.redmine_api.as_deref());
        put("verbose", Some(self.verbose.as_str()));
        put("base_dn", self.base_dn.as_deref());
        put("smtp_host", self.smtp_host.as_deref());
        put("mail_from", self.mail_from.as_deref());
        put("redmine_url", self.redmine_url.as_deref());
        put("redmine_project", self.redmine_project.as_deref());
        let log_file = self.log_file.as_ref().map(|p| p.display().to_string());
        put("log_file", log_file.as_deref());
        options
    }

    /// Merge the resources file over the command line and resolve.
    fn settings(&self) -> CliResult<Settings> {
        let mut options = self.options();
        if let Some(path) = &self.resources {
            options.extend(read_resources(path)?);
        }
        Ok(Settings::resolve(&options)?)
    }
}

fn incident_sink(settings: &Settings) -> Option<Arc<dyn IncidentSink>> {
    let config = settings.redmine.clone()?;
    match RedmineIncidentSink::new(config) {
        Ok(sink) => {
            let sink: Arc<dyn IncidentSink> = Arc::new(sink);
            Some(sink)
        }
        Err(e) => {
            warn!(error = %e, "Incident filing disabled");
            None
        }
    }
}

async fn run(settings: &Settings, incidents: Option<Arc<dyn IncidentSink>>) -> CliResult<PassReport> {
    let directory = Arc::new(LdapDirectory::new(settings.ldap.clone())?);
    let crm = Arc::new(InsightlyClient::new(&settings.insightly)?);
    let mailer = Arc::new(SmtpMailer::new(&settings.smtp)?);

    let mut engine = SyncEngine::new(directory, crm, mailer, settings.engine.clone());
    if let Some(sink) = incidents {
        engine = engine.with_incident_sink(sink);
    }

    let report = engine.run_pass().await?;

    if let Some(openstack) = &settings.openstack {
        info!(
            cloud = %openstack.base_url,
            tenants = ?report.tenant_identifiers,
            "Tenant identifiers ready for quota checks"
        );
    }
    Ok(report)
}

async fn escalate(sink: &dyn IncidentSink, err: &CliError) {
    let incident = Incident::new(
        format!("dirsync pass aborted: {}", err.error_code()),
        err.to_string(),
        Severity::Critical,
    );
    if let Err(e) = sink.file(&incident).await {
        error!(error = %e, "Failed to file incident");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = logging::init_logging(&settings.verbosity, settings.log_file.as_deref()) {
        e.print();
        std::process::exit(e.exit_code());
    }

    let incidents = incident_sink(&settings);
    match run(&settings, incidents.clone()).await {
        Ok(report) => {
            match serde_json::to_string(&report.statistics) {
                Ok(summary) => info!(statistics = %summary, "Pass complete"),
                Err(e) => warn!(error = %e, "Could not serialize pass statistics"),
            }
            if !report.is_clean() {
                warn!(
                    failures = report.diagnostics.len(),
                    "Pass completed with failures"
                );
            }
            std::process::exit(0);
        }
        Err(e) => {
            error!(error = %e, error_code = e.error_code(), "Synchronization aborted");
            if let Some(sink) = &incidents {
                escalate(sink.as_ref(), &e).await;
            }
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parses_short_flags() {
        let cli = Cli::try_parse_from([
            "dirsync", "-l", "ldap.example.org", "-b", "syncer", "-p", "pw", "-i", "key", "-v",
            "INFO",
        ])
        .unwrap();

        let settings = cli.settings().unwrap();
        assert_eq!(settings.ldap.host, "ldap.example.org");
        assert_eq!(settings.verbosity, "INFO");
    }

    #[test]
    fn test_resources_file_overrides_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ldap=from-file.example.org").unwrap();
        writeln!(file, "api_key=file-key").unwrap();
        writeln!(file, "bind=syncer").unwrap();
        writeln!(file, "password=pw").unwrap();

        let path = file.path().display().to_string();
        let cli = Cli::try_parse_from(["dirsync", "-l", "cli.example.org", "-r", &path]).unwrap();

        let settings = cli.settings().unwrap();
        assert_eq!(settings.ldap.host, "from-file.example.org");
        assert_eq!(settings.insightly.api_key, "file-key");
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let cli = Cli::try_parse_from(["dirsync", "-b", "syncer"]).unwrap();
        let err = cli.settings().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
