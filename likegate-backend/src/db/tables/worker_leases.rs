//! Time-bounded leases that keep a single reconciler active.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult};

use super::super::{to_db_time, Database};

impl Database {
    /// Take or renew `name` for `holder` until `now + ttl`.
    ///
    /// Succeeds when the lease is free, expired, or already held by `holder`.
    pub fn acquire_lease(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "INSERT INTO worker_leases (name, holder, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                expires_at = excluded.expires_at
             WHERE worker_leases.holder = excluded.holder OR worker_leases.expires_at <= ?4",
            rusqlite::params![name, holder, to_db_time(&(now + ttl)), to_db_time(&now)],
        )?;
        Ok(rows > 0)
    }

    /// Drop the lease if `holder` still owns it.
    pub fn release_lease(&self, name: &str, holder: &str) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "DELETE FROM worker_leases WHERE name = ?1 AND holder = ?2",
            [name, holder],
        )?;
        Ok(rows > 0)
    }

    /// Current unexpired holder of `name`, if any.
    pub fn lease_holder(&self, name: &str, now: DateTime<Utc>) -> SqliteResult<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT holder FROM worker_leases WHERE name = ?1 AND expires_at > ?2",
            rusqlite::params![name, to_db_time(&now)],
            |row| row.get(0),
        )
        .optional()
    }
}
