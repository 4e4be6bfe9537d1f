// Party Check-in - Core Library
// Exposes all modules for use in the CLI, kiosk, API server, and tests

pub mod config;         // Environment-driven settings
pub mod db;             // SQLite store + CSV import/export
pub mod deduplication;  // Same-day duplicate audit
pub mod entities;       // Name registry + attendance ledger
pub mod error;          // StoreError / CheckInError
pub mod orchestrator;   // Registration state machine
pub mod scan;           // Scan Bridge
pub mod store;          // Store contract + in-memory store
pub mod temporal;       // Clock + local-day windows

#[cfg(feature = "server")]
pub mod api;            // REST API (axum)

#[cfg(feature = "tui")]
pub mod ui;             // Kiosk TUI (ratatui)

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use db::{load_names_csv, setup_database, write_attendance_csv, SqliteStore};
pub use deduplication::{day_key, find_same_day_duplicates, DuplicateCheckIn};
pub use entities::{
    default_seed, AttendanceLedger, AttendanceRecord, EnsureOutcome, Name, NameRegistry,
    DEFAULT_SEED_NAMES,
};
pub use error::{CheckInError, StoreError};
pub use orchestrator::{CheckIn, Orchestrator, RegistrationSession, RegistrationState};
pub use scan::{forward_lines, scan_channel, ScanReceiver, ScanSender, ScanSignal};
pub use store::{AttendanceQuery, CheckInStore, MemoryStore, NewAttendance, SortOrder};
pub use temporal::{Clock, DayWindow, FixedClock, SystemClock};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the `tracing` subscriber used by every binary.
///
/// `RUST_LOG` overrides `default_filter`. Output goes to stderr so it never
/// mixes with CLI output.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
