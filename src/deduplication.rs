// 🔍 Deduplication - one check-in per name per local day
//
// The orchestrator's check-then-write sequence is not atomic, so two kiosks
// can both record the same person on the same day. This module provides the
// (name, day) key stores use for conditional inserts, and an audit that finds
// the duplicates a race left behind.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entities::{AttendanceRecord, Name};

/// Stable key for the daily uniqueness rule.
///
/// Same shape as an idempotency hash: SHA-256 over the local date and the
/// exact (case-sensitive) name.
pub fn day_key(name: &Name, day: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}", day.format("%Y-%m-%d"), name.as_str()));
    format!("{:x}", hasher.finalize())
}

/// More than one record for the same name on the same local day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckIn {
    pub name: Name,
    pub day: NaiveDate,
    /// Record identifiers, earliest check-in first
    pub record_ids: Vec<String>,
}

impl DuplicateCheckIn {
    /// Records beyond the first one.
    pub fn extra_records(&self) -> usize {
        self.record_ids.len().saturating_sub(1)
    }
}

/// Group records by (name, local date) and report every group of two or more.
///
/// Output is ordered by day, then name.
pub fn find_same_day_duplicates(records: &[AttendanceRecord]) -> Vec<DuplicateCheckIn> {
    let mut groups: BTreeMap<(NaiveDate, Name), Vec<&AttendanceRecord>> = BTreeMap::new();

    for record in records {
        groups
            .entry((record.checked_in_at.date(), record.name.clone()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|((day, name), mut group)| {
            group.sort_by_key(|r| r.checked_in_at);
            DuplicateCheckIn {
                name,
                day,
                record_ids: group.into_iter().map(|r| r.id.clone()).collect(),
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
