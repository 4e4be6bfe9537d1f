// 📋 Attendance Entity + Attendance Ledger
//
// An AttendanceRecord is one check-in event: store-assigned id, the name as
// written, and the local instant of registration. Records are never updated
// or deleted.
//
// The ledger answers "has this name checked in today" and appends new
// records. It does not re-check the daily rule on write; that sequencing
// belongs to the orchestrator.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::Name;
use crate::error::{CheckInError, StoreError};
use crate::store::{AttendanceQuery, CheckInStore, NewAttendance, SortOrder};
use crate::temporal::{display_timestamp, DayWindow};

// ============================================================================
// ATTENDANCE RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Store-assigned identifier (UUID)
    pub id: String,
    /// Not required to exist in the registry at write time
    pub name: Name,
    /// Local wall-clock instant of registration
    pub checked_in_at: NaiveDateTime,
}

impl AttendanceRecord {
    /// New record with a fresh identifier. Used by store implementations.
    pub fn new(name: Name, checked_in_at: NaiveDateTime) -> Self {
        AttendanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            checked_in_at,
        }
    }

    /// Local calendar day this check-in counts towards.
    pub fn day(&self) -> NaiveDate {
        self.checked_in_at.date()
    }

    /// "Dec 24, 2024 10:00:00"
    pub fn display_time(&self) -> String {
        display_timestamp(self.checked_in_at)
    }
}

// ============================================================================
// ATTENDANCE LEDGER
// ============================================================================

/// Day-scoped check-in log, backed by the `attendance` table.
#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn CheckInStore>,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn CheckInStore>) -> Self {
        AttendanceLedger { store }
    }

    /// True iff `name` has a record inside the local day containing `as_of`.
    pub async fn has_checked_in_today(
        &self,
        name: &Name,
        as_of: NaiveDateTime,
    ) -> Result<bool, CheckInError> {
        let window = DayWindow::containing(as_of);
        let query = AttendanceQuery::all()
            .for_name(name)
            .between(window.start, window.end)
            .limit(1);

        let existing = self.store.select_attendance(query).await?;
        debug!(name = %name, day = %window.day, found = !existing.is_empty(), "dedup check");
        Ok(!existing.is_empty())
    }

    /// Append a record unconditionally.
    ///
    /// If the store enforces one row per (name, day), its conflict comes back
    /// as `AlreadyRegisteredToday`; the ledger itself never refuses.
    pub async fn record_check_in(
        &self,
        name: &Name,
        at: NaiveDateTime,
    ) -> Result<AttendanceRecord, CheckInError> {
        let row = NewAttendance {
            name: name.clone(),
            checked_in_at: at,
        };

        let mut written = match self.store.insert_attendance(&[row]).await {
            Ok(written) => written,
            Err(StoreError::Conflict(reason)) => {
                debug!(name = %name, %reason, "store rejected same-day check-in");
                return Err(CheckInError::AlreadyRegisteredToday { name: name.clone() });
            }
            Err(e) => return Err(e.into()),
        };

        let record = written.pop().ok_or_else(|| {
            CheckInError::StoreUnavailable(StoreError::Unavailable(
                "insert returned no row".to_string(),
            ))
        })?;

        info!(name = %name, id = %record.id, "recorded check-in");
        Ok(record)
    }

    /// Most recent `limit` records, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<AttendanceRecord>, CheckInError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = AttendanceQuery::all()
            .order(SortOrder::NewestFirst)
            .limit(limit);
        Ok(self.store.select_attendance(query).await?)
    }

    /// Every record on local date `day`, oldest first.
    pub async fn checked_in_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, CheckInError> {
        let window = DayWindow::for_day(day);
        let query = AttendanceQuery::all()
            .between(window.start, window.end)
            .order(SortOrder::OldestFirst);
        Ok(self.store.select_attendance(query).await?)
    }

    /// Every record on file, oldest first.
    pub async fn history(&self) -> Result<Vec<AttendanceRecord>, CheckInError> {
        let query = AttendanceQuery::all().order(SortOrder::OldestFirst);
        Ok(self.store.select_attendance(query).await?)
    }

    /// Distinct names present on local date `day`.
    pub async fn names_checked_in_on(&self, day: NaiveDate) -> Result<BTreeSet<Name>, CheckInError> {
        Ok(self
            .checked_in_on(day)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
