// Entity Models
//
// Name       - a participant's identity, exact-string, never mutated
// Attendance - one check-in event, append-only
//
// Each entity file also holds the component that owns it against the store:
// the NameRegistry and the AttendanceLedger.

pub mod name;
pub mod attendance;

pub use name::{default_seed, filter_names, EnsureOutcome, Name, NameRegistry, DEFAULT_SEED_NAMES};
pub use attendance::{AttendanceLedger, AttendanceRecord};
