//! Typed errors returned across module seams.

use thiserror::Error;

/// Failure of the verification trigger. Nothing is mutated when this is returned.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification link expired or already used")]
    AlreadyUsedOrExpired,
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Rejection of a like request before anything is stored.
#[derive(Debug, Error)]
pub enum CreateRequestError {
    #[error("requester is not a member of the required group")]
    NotEligible,
    #[error("invalid account id: {0}")]
    InvalidTarget(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("operator {0} is not authorized")]
    NotAuthorized(i64),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
