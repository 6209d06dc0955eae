//! Directory capability trait.

use async_trait::async_trait;

use crate::entry::{Entry, Modification, SearchScope};
use crate::error::DirectoryResult;
use crate::filter::Filter;

/// An authenticated directory session.
///
/// Every reconciliation call receives one of these explicitly; there is no
/// ambient connection. Implementations must report a missing search base as
/// an empty result and a duplicate add as [`DirectoryError::AlreadyExists`].
///
/// [`DirectoryError::AlreadyExists`]: crate::error::DirectoryError::AlreadyExists
#[async_trait]
pub trait Directory: Send + Sync {
    /// Search below `base`. An empty `attrs` projection returns all attributes.
    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Entry>>;

    /// Add a new entry.
    async fn add(&self, entry: &Entry) -> DirectoryResult<()>;

    /// Apply modifications to an existing entry.
    async fn modify(&self, dn: &str, mods: &[Modification]) -> DirectoryResult<()>;

    /// Delete a leaf entry.
    async fn delete(&self, dn: &str) -> DirectoryResult<()>;

    /// Read a single entry by DN.
    async fn read(&self, dn: &str, attrs: &[&str]) -> DirectoryResult<Option<Entry>> {
        Ok(self
            .search(dn, SearchScope::Base, &Filter::any(), attrs)
            .await?
            .into_iter()
            .next())
    }

    /// Whether an entry exists at `dn`.
    async fn exists(&self, dn: &str) -> DirectoryResult<bool> {
        Ok(self.read(dn, &["1.1"]).await?.is_some())
    }
}
