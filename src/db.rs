use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::deduplication::day_key;
use crate::entities::{AttendanceRecord, Name};
use crate::error::StoreError;
use crate::store::{AttendanceQuery, CheckInStore, NewAttendance, SortOrder};
use crate::temporal::{format_timestamp, parse_timestamp};

pub fn setup_database(conn: &Connection, enforce_unique: bool) -> Result<()> {
    // Enable WAL mode so several kiosks / the server can share one file
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    // ==========================================================================
    // Names List (the registry roster)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS names_list (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Attendance (append-only check-in log)
    // day_key = sha256(local date | name), see deduplication::day_key
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            checked_in_at TEXT NOT NULL,
            day_key TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_name_time ON attendance(name, checked_in_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_time ON attendance(checked_in_at)",
        [],
    )?;

    if enforce_unique {
        // Fails if the file already holds duplicates from earlier races;
        // run `checkin audit` to find them.
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_names_list_name ON names_list(name)",
            [],
        )
        .context("names_list already contains duplicate names")?;

        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_attendance_day_key ON attendance(day_key)",
            [],
        )
        .context("attendance already contains same-day duplicates")?;
    }

    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let raw_name: String = row.get(1)?;
    let raw_time: String = row.get(2)?;

    let name = Name::parse(&raw_name)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e)))?;
    let checked_in_at = parse_timestamp(&raw_time).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(2, "checked_in_at".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(AttendanceRecord {
        id: row.get(0)?,
        name,
        checked_in_at,
    })
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// `CheckInStore` over a single SQLite connection.
///
/// Calls run on the blocking pool; the mutex serializes them within this
/// process, and SQLite's own locking handles other processes.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    enforce_unique: bool,
}

impl SqliteStore {
    pub fn open(path: &Path, enforce_unique: bool) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        info!(path = %path.display(), enforce_unique, "opened database");
        Self::from_connection(conn, enforce_unique)
    }

    pub fn open_in_memory(enforce_unique: bool) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, enforce_unique)
    }

    pub fn from_connection(conn: Connection, enforce_unique: bool) -> Result<Self> {
        setup_database(&conn, enforce_unique)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
            enforce_unique,
        })
    }

    /// Row counts of `names_list` and `attendance`.
    pub async fn counts(&self) -> Result<(i64, i64), StoreError> {
        self.with_conn(|conn| {
            let names: i64 = conn.query_row("SELECT COUNT(*) FROM names_list", [], |row| row.get(0))?;
            let attendance: i64 = conn.query_row("SELECT COUNT(*) FROM attendance", [], |row| row.get(0))?;
            Ok((names, attendance))
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await?
    }
}

#[async_trait]
impl CheckInStore for SqliteStore {
    async fn select_names(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM names_list ORDER BY name, id")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(names)
        })
        .await
    }

    async fn insert_names(&self, names: &[String]) -> Result<usize, StoreError> {
        let names = names.to_vec();
        let sql = if self.enforce_unique {
            "INSERT OR IGNORE INTO names_list (name) VALUES (?1)"
        } else {
            "INSERT INTO names_list (name) VALUES (?1)"
        };

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(sql)?;
                for name in &names {
                    inserted += stmt.execute(params![name])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn select_attendance(
        &self,
        query: AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.with_conn(move |conn| {
            let mut sql = String::from("SELECT id, name, checked_in_at FROM attendance WHERE 1 = 1");
            let mut args: Vec<String> = Vec::new();

            if let Some(name) = &query.name {
                sql.push_str(" AND name = ?");
                args.push(name.clone());
            }
            if let Some((from, to)) = query.between {
                sql.push_str(" AND checked_in_at BETWEEN ? AND ?");
                args.push(format_timestamp(from));
                args.push(format_timestamp(to));
            }
            sql.push_str(match query.order {
                SortOrder::NewestFirst => " ORDER BY checked_in_at DESC, row_id DESC",
                SortOrder::OldestFirst => " ORDER BY checked_in_at ASC, row_id ASC",
            });
            if let Some(limit) = query.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            debug!(%sql, "select attendance");
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params_from_iter(args.iter()), record_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn insert_attendance(
        &self,
        rows: &[NewAttendance],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = rows.to_vec();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut records = Vec::with_capacity(rows.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO attendance (id, name, checked_in_at, day_key)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for row in rows {
                    let record = AttendanceRecord::new(row.name, row.checked_in_at);
                    stmt.execute(params![
                        record.id,
                        record.name.as_str(),
                        format_timestamp(record.checked_in_at),
                        day_key(&record.name, record.day()),
                    ])?;
                    records.push(record);
                }
            }
            // Dropping tx on error rolls the whole batch back
            tx.commit()?;
            Ok(records)
        })
        .await
    }
}

// ============================================================================
// CSV IMPORT / EXPORT
// ============================================================================

#[derive(Debug, Deserialize)]
struct NameRow {
    name: String,
}

#[derive(Debug, Serialize)]
struct AttendanceCsvRow<'a> {
    id: &'a str,
    name: &'a str,
    checked_in_at: String,
}

/// Load a roster CSV with a `name` column. Blank rows are skipped.
pub fn load_names_csv(csv_path: &Path) -> Result<Vec<Name>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut names = Vec::new();
    for result in rdr.deserialize() {
        let row: NameRow = result.context("Failed to deserialize name row")?;
        if let Ok(name) = Name::parse(&row.name) {
            names.push(name);
        }
    }

    Ok(names)
}

/// Write `records` as `id,name,checked_in_at`. Returns rows written.
pub fn write_attendance_csv(csv_path: &Path, records: &[AttendanceRecord]) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    for record in records {
        wtr.serialize(AttendanceCsvRow {
            id: &record.id,
            name: record.name.as_str(),
            checked_in_at: format_timestamp(record.checked_in_at),
        })?;
    }
    wtr.flush()?;

    Ok(records.len())
}
