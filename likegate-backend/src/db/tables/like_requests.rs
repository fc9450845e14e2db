//! Like request lifecycle: create, verify, list verified, mark processed.
//!
//! Both state-advancing writes (`verify_by_code`, `mark_processed`) are a
//! single conditional UPDATE; the affected-row count is the check-and-set result.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{ErrorCode, OptionalExtension, Result as SqliteResult};

use super::super::{opt_time_column, time_column, to_db_time, Database};
use crate::error::VerifyError;
use crate::models::{LikeRequest, NewLikeRequest, ProcessOutcome, RequestStats};

/// Length of the verification code embedded in the link
pub const CODE_LENGTH: usize = 12;

/// Fresh codes tried before a uniqueness conflict is reported
const MAX_CODE_ATTEMPTS: usize = 5;

const SELECT_COLUMNS: &str = "SELECT id, requester_id, conversation_id, anchor_message_id, target_account_id,
        verification_code, verified, processed, outcome, created_at, expires_at, verified_at, processed_at
 FROM like_requests";

/// Random alphanumeric code drawn from the thread-local CSPRNG.
pub fn generate_verification_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

impl Database {
    /// Store a new pending request with a fresh verification code.
    pub fn create_like_request(
        &self,
        new: &NewLikeRequest,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> SqliteResult<LikeRequest> {
        self.create_like_request_with_codes(new, now, ttl, generate_verification_code)
    }

    pub(crate) fn create_like_request_with_codes(
        &self,
        new: &NewLikeRequest,
        now: DateTime<Utc>,
        ttl: Duration,
        mut next_code: impl FnMut() -> String,
    ) -> SqliteResult<LikeRequest> {
        let conn = self.conn();
        let expires_at = now + ttl;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let code = next_code();
            let inserted = conn.execute(
                "INSERT INTO like_requests (requester_id, conversation_id, anchor_message_id,
                    target_account_id, verification_code, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    new.requester_id,
                    new.conversation_id,
                    new.anchor_message_id,
                    new.target_account_id,
                    code,
                    to_db_time(&now),
                    to_db_time(&expires_at),
                ],
            );

            match inserted {
                Ok(_) => {
                    return Ok(LikeRequest {
                        id: conn.last_insert_rowid(),
                        requester_id: new.requester_id,
                        conversation_id: new.conversation_id,
                        anchor_message_id: new.anchor_message_id,
                        target_account_id: new.target_account_id.clone(),
                        verification_code: code,
                        verified: false,
                        processed: false,
                        outcome: None,
                        created_at: now,
                        expires_at,
                        verified_at: None,
                        processed_at: None,
                    });
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation && attempt < MAX_CODE_ATTEMPTS =>
                {
                    log::warn!("Verification code collision (attempt {}), regenerating", attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Flip a pending, unexpired request to verified. Exactly one caller wins;
    /// everyone else (and any expired or unknown code) gets `AlreadyUsedOrExpired`.
    pub fn verify_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<LikeRequest, VerifyError> {
        let conn = self.conn();
        let now_str = to_db_time(&now);

        let rows = conn.execute(
            "UPDATE like_requests SET verified = 1, verified_at = ?2
             WHERE verification_code = ?1 AND verified = 0 AND expires_at >= ?2",
            rusqlite::params![code, now_str],
        )?;
        if rows == 0 {
            return Err(VerifyError::AlreadyUsedOrExpired);
        }

        let request = conn.query_row(
            &format!("{} WHERE verification_code = ?1", SELECT_COLUMNS),
            [code],
            row_to_like_request,
        )?;
        Ok(request)
    }

    /// Snapshot of verified requests the reconciler has not handled yet, oldest first.
    pub fn list_verified_unprocessed(&self) -> SqliteResult<Vec<LikeRequest>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE verified = 1 AND processed = 0 ORDER BY verified_at ASC, id ASC",
            SELECT_COLUMNS
        ))?;
        let requests = stmt
            .query_map([], row_to_like_request)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(requests)
    }

    /// Mark a verified request as handled. Returns false when it was already
    /// processed (or never verified): somebody else owns the outcome.
    pub fn mark_processed(
        &self,
        id: i64,
        outcome: ProcessOutcome,
        now: DateTime<Utc>,
    ) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE like_requests SET processed = 1, outcome = ?2, processed_at = ?3
             WHERE id = ?1 AND verified = 1 AND processed = 0",
            rusqlite::params![id, outcome.as_str(), to_db_time(&now)],
        )?;
        Ok(rows > 0)
    }

    pub fn get_like_request(&self, id: i64) -> SqliteResult<Option<LikeRequest>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            [id],
            row_to_like_request,
        )
        .optional()
    }

    pub fn like_request_stats(&self, now: DateTime<Utc>) -> SqliteResult<RequestStats> {
        let conn = self.conn();
        conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN verified = 0 AND expires_at >= ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN verified = 0 AND expires_at < ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN verified = 1 AND processed = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN processed = 1 THEN 1 ELSE 0 END), 0)
             FROM like_requests",
            [to_db_time(&now)],
            |row| {
                Ok(RequestStats {
                    pending: row.get(0)?,
                    expired: row.get(1)?,
                    awaiting_fulfillment: row.get(2)?,
                    processed: row.get(3)?,
                })
            },
        )
    }
}

fn row_to_like_request(row: &rusqlite::Row) -> SqliteResult<LikeRequest> {
    let outcome: Option<String> = row.get(8)?;
    Ok(LikeRequest {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        conversation_id: row.get(2)?,
        anchor_message_id: row.get(3)?,
        target_account_id: row.get(4)?,
        verification_code: row.get(5)?,
        verified: row.get(6)?,
        processed: row.get(7)?,
        outcome: outcome.as_deref().and_then(ProcessOutcome::from_str),
        created_at: time_column(row, 9)?,
        expires_at: time_column(row, 10)?,
        verified_at: opt_time_column(row, 11)?,
        processed_at: opt_time_column(row, 12)?,
    })
}
