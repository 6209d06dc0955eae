//! In-memory directory.
//!
//! Enforces the same structural rules a real server does (parent must exist,
//! no duplicate DNs, no deleting non-leaf entries) and records every mutation
//! that reached the tree, so callers can assert on exactly what was written.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::{normalize_dn, parent_dn, values_match, Entry, Modification, SearchScope};
use crate::error::{DirectoryError, DirectoryResult, RC_NO_SUCH_ATTRIBUTE};
use crate::filter::Filter;
use crate::traits::Directory;

/// A mutation that was applied to the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    Add { dn: String },
    Modify { dn: String, mods: Vec<Modification> },
    Delete { dn: String },
}

impl Mutation {
    pub fn dn(&self) -> &str {
        match self {
            Mutation::Add { dn } | Mutation::Modify { dn, .. } | Mutation::Delete { dn } => dn,
        }
    }
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    mutations: Vec<Mutation>,
    failing: HashSet<String>,
}

/// Directory tree held in memory.
#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree with the given entries as structural roots (for example
    /// `ou=accounts,dc=example,dc=org`). Roots bypass the parent check.
    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dir = Self::new();
        for root in roots {
            dir.insert(Entry::new(root).with("objectClass", ["organizationalUnit"]));
        }
        dir
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an entry without structural checks and without recording a mutation.
    pub fn insert(&self, entry: Entry) {
        let key = normalize_dn(&entry.dn);
        self.lock().entries.insert(key, entry);
    }

    /// Current copy of an entry.
    pub fn get(&self, dn: &str) -> Option<Entry> {
        self.lock().entries.get(&normalize_dn(dn)).cloned()
    }

    /// Whether an entry is present.
    pub fn contains(&self, dn: &str) -> bool {
        self.lock().entries.contains_key(&normalize_dn(dn))
    }

    /// All entries, in canonical DN order.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries.values().cloned().collect()
    }

    /// Number of entries in the tree.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutations applied since creation or the last [`Self::clear_mutations`].
    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().mutations.len()
    }

    pub fn clear_mutations(&self) {
        self.lock().mutations.clear();
    }

    /// Make every mutation against `dn` fail with insufficient access rights.
    pub fn fail_writes_to(&self, dn: &str) {
        self.lock().failing.insert(normalize_dn(dn));
    }

    fn check_writable(state: &State, dn: &str) -> DirectoryResult<()> {
        if state.failing.contains(&normalize_dn(dn)) {
            return Err(DirectoryError::InsufficientAccess { dn: dn.to_string() });
        }
        Ok(())
    }

    fn in_scope(base: &str, scope: SearchScope, candidate: &str) -> bool {
        match scope {
            SearchScope::Base => candidate == base,
            SearchScope::OneLevel => parent_dn(candidate).as_deref() == Some(base),
            SearchScope::Subtree => candidate == base || candidate.ends_with(&format!(",{base}")),
        }
    }
}

fn apply_modification(entry: &mut Entry, m: &Modification) -> DirectoryResult<()> {
    match m {
        Modification::Add { attribute, values } => {
            let mut current = entry.values(attribute).to_vec();
            for v in values {
                if !current.iter().any(|c| values_match(c, v)) {
                    current.push(v.clone());
                }
            }
            entry.set(attribute.clone(), current);
        }
        Modification::Replace { attribute, values } => {
            entry.set(attribute.clone(), values.clone());
        }
        Modification::Delete { attribute, values } => {
            if !entry.has(attribute) {
                return Err(DirectoryError::from_result_code(
                    RC_NO_SUCH_ATTRIBUTE,
                    &entry.dn,
                    &format!("no such attribute {attribute}"),
                ));
            }
            if values.is_empty() {
                entry.remove(attribute);
            } else {
                let remaining: Vec<String> = entry
                    .values(attribute)
                    .iter()
                    .filter(|c| !values.iter().any(|v| values_match(c, v)))
                    .cloned()
                    .collect();
                entry.set(attribute.clone(), remaining);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        let state = self.lock();
        let base = normalize_dn(base);
        if !state.entries.contains_key(&base) {
            debug!(base = %base, "Search base does not exist");
            return Ok(Vec::new());
        }

        Ok(state
            .entries
            .iter()
            .filter(|(key, _)| Self::in_scope(&base, scope, key))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| entry.clone().project(attrs))
            .collect())
    }

    async fn add(&self, entry: &Entry) -> DirectoryResult<()> {
        let mut state = self.lock();
        Self::check_writable(&state, &entry.dn)?;

        let key = normalize_dn(&entry.dn);
        if state.entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists {
                dn: entry.dn.clone(),
            });
        }
        let parent_present = parent_dn(&key)
            .map(|p| state.entries.contains_key(&p))
            .unwrap_or(false);
        if !parent_present {
            return Err(DirectoryError::NoSuchObject {
                dn: entry.dn.clone(),
            });
        }

        state.entries.insert(key, entry.clone());
        state.mutations.push(Mutation::Add {
            dn: entry.dn.clone(),
        });
        Ok(())
    }

    async fn modify(&self, dn: &str, mods: &[Modification]) -> DirectoryResult<()> {
        let mut state = self.lock();
        Self::check_writable(&state, dn)?;

        let key = normalize_dn(dn);
        let mut updated = state
            .entries
            .get(&key)
            .cloned()
            .ok_or_else(|| DirectoryError::NoSuchObject { dn: dn.to_string() })?;
        for m in mods {
            apply_modification(&mut updated, m)?;
        }

        state.entries.insert(key, updated);
        state.mutations.push(Mutation::Modify {
            dn: dn.to_string(),
            mods: mods.to_vec(),
        });
        Ok(())
    }

    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        Self::check_writable(&state, dn)?;

        let key = normalize_dn(dn);
        if !state.entries.contains_key(&key) {
            return Err(DirectoryError::NoSuchObject { dn: dn.to_string() });
        }
        let has_children = state
            .entries
            .keys()
            .any(|k| parent_dn(k).as_deref() == Some(key.as_str()));
        if has_children {
            return Err(DirectoryError::NotAllowedOnNonLeaf { dn: dn.to_string() });
        }

        state.entries.remove(&key);
        state.mutations.push(Mutation::Delete { dn: dn.to_string() });
        Ok(())
    }
}
