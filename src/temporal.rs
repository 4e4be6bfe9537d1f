// ⏰ Temporal Model - local calendar days
//
// Check-ins are stamped with local wall-clock time and grouped by local date.
// Day boundaries follow the ambient time zone of whoever reads the clock;
// nothing is normalized to UTC, so two kiosks in different zones disagree
// about where "today" ends.

use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// Persisted text form. Fixed width, so lexical order is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Human-facing form used by the attendance views.
pub const DISPLAY_FORMAT: &str = "%b %d, %Y %H:%M:%S";

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now" for the orchestrator.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, truncated to the precision the store keeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(6)
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        FixedClock { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ============================================================================
// DAY WINDOW
// ============================================================================

/// Inclusive `[start, end]` range covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    /// Window for the day containing `at`.
    pub fn containing(at: NaiveDateTime) -> Self {
        Self::for_day(at.date())
    }

    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::default());
        DayWindow {
            day,
            start,
            end: start + Duration::days(1) - Duration::microseconds(1),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// 00:00:00.000000 of the local date of `at`.
pub fn start_of_day(at: NaiveDateTime) -> NaiveDateTime {
    DayWindow::containing(at).start
}

/// 23:59:59.999999 of the local date of `at`.
pub fn end_of_day(at: NaiveDateTime) -> NaiveDateTime {
    DayWindow::containing(at).end
}

// ============================================================================
// TEXT FORMS
// ============================================================================

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp. Accepts the canonical form plus second
/// precision and ISO `T` separators written by other clients.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];

    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

pub fn display_timestamp(at: NaiveDateTime) -> String {
    at.format(DISPLAY_FORMAT).to_string()
}

// ============================================================================
// TESTS
// ============================================================================
