//! # LDAP Directory
//!
//! [`LdapDirectory`] implements the `Directory` capability over an LDAP server
//! using `ldap3`. Connections default to LDAPS with a simple bind.

pub mod config;
pub mod connector;

pub use config::LdapConfig;
pub use connector::LdapDirectory;
