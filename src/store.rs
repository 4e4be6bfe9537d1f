// Backing store contract
//
// Two logical tables, three primitives: ordered read, filtered range read,
// insert of one or many rows. Any networked tabular store exposing them can
// sit behind the registration core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::deduplication::day_key;
use crate::entities::{AttendanceRecord, Name};
use crate::error::StoreError;

// ============================================================================
// QUERY TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filtered read over `attendance`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceQuery {
    /// Exact, case-sensitive name match
    pub name: Option<String>,
    /// Inclusive `[from, to]` range on `checked_in_at`
    pub between: Option<(NaiveDateTime, NaiveDateTime)>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl AttendanceQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_name(mut self, name: &Name) -> Self {
        self.name = Some(name.as_str().to_string());
        self
    }

    pub fn between(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.between = Some((from, to));
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Row predicate, shared by in-memory implementations.
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if let Some(name) = &self.name {
            if record.name.as_str() != name {
                return false;
            }
        }
        if let Some((from, to)) = self.between {
            if record.checked_in_at < from || record.checked_in_at > to {
                return false;
            }
        }
        true
    }
}

/// Row to insert into `attendance`; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub name: Name,
    pub checked_in_at: NaiveDateTime,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

#[async_trait]
pub trait CheckInStore: Send + Sync {
    /// All rows of `names_list`, ordered by name.
    async fn select_names(&self) -> Result<Vec<String>, StoreError>;

    /// Insert rows into `names_list`. Returns how many rows were written;
    /// stores with a uniqueness constraint skip names already present.
    async fn insert_names(&self, names: &[String]) -> Result<usize, StoreError>;

    async fn select_attendance(
        &self,
        query: AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Insert rows into `attendance`, all or nothing.
    async fn insert_attendance(
        &self,
        rows: &[NewAttendance],
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
struct Tables {
    names_list: Vec<String>,
    attendance: Vec<AttendanceRecord>,
}

/// Process-local store. Mirrors the SQLite store's semantics, including the
/// optional unique constraints, and can simulate outages.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    enforce_unique: bool,
    unavailable: AtomicBool,
    stalled: AtomicBool,
}

impl MemoryStore {
    /// No store-level constraints; duplicates are possible under races.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique names and at most one check-in per (name, local date).
    pub fn with_unique_constraints() -> Self {
        MemoryStore {
            enforce_unique: true,
            ..Self::default()
        }
    }

    /// Make every call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every call hang forever.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Raw `names_list` rows in insertion order.
    pub fn name_rows(&self) -> Vec<String> {
        self.lock().map(|t| t.names_list.clone()).unwrap_or_default()
    }

    /// Raw `attendance` rows in insertion order.
    pub fn attendance_rows(&self) -> Vec<AttendanceRecord> {
        self.lock().map(|t| t.attendance.clone()).unwrap_or_default()
    }

    async fn gate(&self) -> Result<(), StoreError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CheckInStore for MemoryStore {
    async fn select_names(&self) -> Result<Vec<String>, StoreError> {
        self.gate().await?;
        let mut names = self.lock()?.names_list.clone();
        names.sort();
        Ok(names)
    }

    async fn insert_names(&self, names: &[String]) -> Result<usize, StoreError> {
        self.gate().await?;
        let mut tables = self.lock()?;
        let mut inserted = 0;

        for name in names {
            if self.enforce_unique && tables.names_list.contains(name) {
                continue;
            }
            tables.names_list.push(name.clone());
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn select_attendance(
        &self,
        query: AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.gate().await?;
        let tables = self.lock()?;

        let mut rows: Vec<AttendanceRecord> = tables
            .attendance
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        match query.order {
            SortOrder::NewestFirst => rows.sort_by(|a, b| b.checked_in_at.cmp(&a.checked_in_at)),
            SortOrder::OldestFirst => rows.sort_by(|a, b| a.checked_in_at.cmp(&b.checked_in_at)),
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert_attendance(
        &self,
        rows: &[NewAttendance],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.gate().await?;
        let mut tables = self.lock()?;

        if self.enforce_unique {
            let mut keys: Vec<String> = tables
                .attendance
                .iter()
                .map(|r| day_key(&r.name, r.checked_in_at.date()))
                .collect();

            for row in rows {
                let key = day_key(&row.name, row.checked_in_at.date());
                if keys.contains(&key) {
                    return Err(StoreError::Conflict(format!(
                        "{} already checked in on {}",
                        row.name,
                        row.checked_in_at.date()
                    )));
                }
                keys.push(key);
            }
        }

        let records: Vec<AttendanceRecord> = rows
            .iter()
            .map(|row| AttendanceRecord::new(row.name.clone(), row.checked_in_at))
            .collect();
        tables.attendance.extend(records.iter().cloned());

        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================
