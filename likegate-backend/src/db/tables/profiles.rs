//! User profile operations. Every write is an upsert; a missing row reads as
//! the default profile.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult};

use super::super::{opt_time_column, to_db_time, Database};
use crate::models::Profile;

impl Database {
    pub fn get_profile(&self, user_id: i64) -> SqliteResult<Profile> {
        let conn = self.conn();
        let profile = conn
            .query_row(
                "SELECT user_id, is_vip, last_fulfilled_at FROM user_profiles WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(Profile {
                        user_id: row.get(0)?,
                        is_vip: row.get(1)?,
                        last_fulfilled_at: opt_time_column(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile.unwrap_or_else(|| Profile::new(user_id)))
    }

    pub fn set_vip(&self, user_id: i64, is_vip: bool) -> SqliteResult<()> {
        let conn = self.conn();
        let now = to_db_time(&Utc::now());
        conn.execute(
            "INSERT INTO user_profiles (user_id, is_vip, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                is_vip = excluded.is_vip,
                updated_at = excluded.updated_at",
            rusqlite::params![user_id, is_vip, now],
        )?;
        Ok(())
    }

    /// Record a successful fulfillment. The stored timestamp only ever moves forward.
    pub fn record_fulfillment(&self, user_id: i64, at: DateTime<Utc>) -> SqliteResult<()> {
        let conn = self.conn();
        let now = to_db_time(&Utc::now());
        conn.execute(
            "INSERT INTO user_profiles (user_id, is_vip, last_fulfilled_at, created_at, updated_at)
             VALUES (?1, 0, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                last_fulfilled_at = CASE
                    WHEN user_profiles.last_fulfilled_at IS NULL
                      OR user_profiles.last_fulfilled_at < excluded.last_fulfilled_at
                    THEN excluded.last_fulfilled_at
                    ELSE user_profiles.last_fulfilled_at
                END,
                updated_at = excluded.updated_at",
            rusqlite::params![user_id, to_db_time(&at), now],
        )?;
        Ok(())
    }
}
