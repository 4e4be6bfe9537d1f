// 👤 Name Entity + Name Registry
//
// A Name is a trimmed, non-empty, case-sensitive value. The registry is the
// append-only roster of known names: lookup, existence check, append if
// absent. There is no rename and no removal.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CheckInError;
use crate::store::CheckInStore;

/// Cold-start roster used when `names_list` is empty.
pub const DEFAULT_SEED_NAMES: [&str; 8] = [
    "John Doe",
    "Jane Smith",
    "Bob Johnson",
    "Alice Williams",
    "Charlie Brown",
    "Diana Prince",
    "Edward Norton",
    "Fiona Apple",
];

// ============================================================================
// NAME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Trim and validate. Empty or whitespace-only input is `InvalidInput`.
    pub fn parse(raw: &str) -> Result<Self, CheckInError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CheckInError::InvalidInput(
                "name is empty or whitespace".to_string(),
            ));
        }
        Ok(Name(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Case-insensitive substring match, as used by the name search box.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty() || self.0.to_lowercase().contains(&term.to_lowercase())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = CheckInError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::parse(&value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

/// The default seed roster as validated names.
pub fn default_seed() -> Vec<Name> {
    DEFAULT_SEED_NAMES
        .iter()
        .filter_map(|n| Name::parse(n).ok())
        .collect()
}

/// Sorted subset of `names` matching `term` (case-insensitive substring).
pub fn filter_names(names: &[Name], term: &str) -> Vec<Name> {
    let mut filtered: Vec<Name> = names
        .iter()
        .filter(|n| n.matches_search(term))
        .cloned()
        .collect();
    filtered.sort();
    filtered
}

// ============================================================================
// NAME REGISTRY
// ============================================================================

/// Result of `NameRegistry::ensure_exists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureOutcome {
    pub name: Name,
    pub already_present: bool,
}

/// Canonical list of known participant names, backed by `names_list`.
#[derive(Clone)]
pub struct NameRegistry {
    store: Arc<dyn CheckInStore>,
}

impl NameRegistry {
    pub fn new(store: Arc<dyn CheckInStore>) -> Self {
        NameRegistry { store }
    }

    /// All known names, sorted, one entry per distinct name.
    ///
    /// Rows that fail validation (written by some other client) are skipped.
    pub async fn list_names(&self) -> Result<Vec<Name>, CheckInError> {
        let rows = self.store.select_names().await?;
        let total = rows.len();

        let mut names: Vec<Name> = rows
            .into_iter()
            .filter_map(|row| Name::parse(&row).ok())
            .collect();
        names.sort();
        names.dedup();

        if names.len() != total {
            debug!(rows = total, distinct = names.len(), "names_list holds blank or repeated rows");
        }
        Ok(names)
    }

    /// Exact, case-sensitive existence check.
    pub async fn contains(&self, name: &Name) -> Result<bool, CheckInError> {
        let rows = self.store.select_names().await?;
        Ok(rows.iter().any(|row| row == name.as_str()))
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Name>, CheckInError> {
        Ok(filter_names(&self.list_names().await?, term))
    }

    /// Append `candidate` unless an identical name is already present.
    ///
    /// Validation happens before any store access. The check and the insert
    /// are two store calls; without a unique constraint in the store, two
    /// clients adding the same new name at once can both append it.
    pub async fn ensure_exists(&self, candidate: &str) -> Result<EnsureOutcome, CheckInError> {
        let name = Name::parse(candidate)?;

        if self.contains(&name).await? {
            return Ok(EnsureOutcome {
                name,
                already_present: true,
            });
        }

        let inserted = self
            .store
            .insert_names(&[name.as_str().to_string()])
            .await?;

        if inserted == 0 {
            // Store-side constraint: someone else added it between our check and insert
            debug!(name = %name, "name appeared concurrently");
            return Ok(EnsureOutcome {
                name,
                already_present: true,
            });
        }

        info!(name = %name, "added name to registry");
        Ok(EnsureOutcome {
            name,
            already_present: false,
        })
    }

    /// Populate an empty registry with `seed`. Returns rows written; a
    /// registry that already holds any name is left untouched.
    pub async fn bootstrap_if_empty(&self, seed: &[Name]) -> Result<usize, CheckInError> {
        if seed.is_empty() || !self.store.select_names().await?.is_empty() {
            return Ok(0);
        }

        let rows: Vec<String> = seed.iter().map(|n| n.as_str().to_string()).collect();
        let inserted = self.store.insert_names(&rows).await?;

        info!(inserted, "bootstrapped empty registry");
        Ok(inserted)
    }
}

// ============================================================================
// TESTS
// ============================================================================
