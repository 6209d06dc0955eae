//! # Directory
//!
//! The directory capability used by the reconciliation engine: a session
//! handle with search/add/modify/delete, plus the value types that flow
//! through it.
//!
//! Nothing here knows about accounts or projects. The LDAP-backed
//! implementation lives in `dirsync-connector-ldap`; [`memory::MemoryDirectory`]
//! implements the same trait for tests and dry runs.
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with result-code classification
//! - [`entry`] - `Entry`, `Modification`, `SearchScope` and DN helpers
//! - [`filter`] - Filter algebra (LDAP rendering and in-memory matching)
//! - [`traits`] - The `Directory` trait
//! - [`memory`] - In-memory tree recording every mutation

pub mod entry;
pub mod error;
pub mod filter;
pub mod memory;
pub mod traits;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::entry::{
        child_dn, dn_eq, escape_dn_value, normalize_dn, parent_dn, rdn_value, values_match,
        Entry, Modification, SearchScope,
    };
    pub use crate::error::{DirectoryError, DirectoryResult};
    pub use crate::filter::Filter;
    pub use crate::memory::{MemoryDirectory, Mutation};
    pub use crate::traits::Directory;
}

pub use entry::{
    child_dn, dn_eq, escape_dn_value, normalize_dn, parent_dn, rdn_value, values_match, Entry,
    Modification, SearchScope,
};
pub use error::{DirectoryError, DirectoryResult};
pub use filter::Filter;
pub use memory::{MemoryDirectory, Mutation};
pub use traits::Directory;

// Re-export async_trait for directory implementors
pub use async_trait::async_trait;
