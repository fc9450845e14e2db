use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result as SqliteResult, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        let conn = if database_url == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Create parent directory if it doesn't exist
            if let Some(parent) = Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).ok();
                }
            }
            Connection::open(database_url)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Lock the connection. A panic in another holder does not leave the
    /// connection in a torn state (every write is a single statement), so a
    /// poisoned lock is simply taken over.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn();

        // Like requests awaiting verification / fulfillment
        conn.execute(
            "CREATE TABLE IF NOT EXISTS like_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                requester_id INTEGER NOT NULL,
                conversation_id INTEGER NOT NULL,
                anchor_message_id INTEGER NOT NULL,
                target_account_id TEXT NOT NULL,
                verification_code TEXT NOT NULL UNIQUE,
                verified INTEGER NOT NULL DEFAULT 0,
                processed INTEGER NOT NULL DEFAULT 0,
                outcome TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                verified_at TEXT,
                processed_at TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_like_requests_queue
             ON like_requests(verified, processed, verified_at)",
            [],
        )?;

        // Per-user VIP flag and cooldown anchor
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_profiles (
                user_id INTEGER PRIMARY KEY,
                is_vip INTEGER NOT NULL DEFAULT 0,
                last_fulfilled_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Single-active-worker leases
        conn.execute(
            "CREATE TABLE IF NOT EXISTS worker_leases (
                name TEXT PRIMARY KEY,
                holder TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }
}

/// Fixed-width UTC timestamp at full precision, so that string comparison in
/// SQL is chronological and matches `DateTime` comparison exactly.
pub(crate) fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn time_column(row: &Row, idx: usize) -> SqliteResult<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_time(idx, &raw)
}

pub(crate) fn opt_time_column(row: &Row, idx: usize) -> SqliteResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_time(idx, &s)).transpose()
}

fn parse_time(idx: usize, raw: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
