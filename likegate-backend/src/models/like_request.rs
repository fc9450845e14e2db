use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a verified request was finally handled by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// The like API reported at least one like added
    Fulfilled,
    /// The like API answered but added nothing
    NoEffect,
    /// Transport, HTTP or parse failure
    Failed,
    /// Requester was still inside the cooldown window
    RateLimited,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessOutcome::Fulfilled => "fulfilled",
            ProcessOutcome::NoEffect => "no_effect",
            ProcessOutcome::Failed => "failed",
            ProcessOutcome::RateLimited => "rate_limited",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fulfilled" => Some(ProcessOutcome::Fulfilled),
            "no_effect" => Some(ProcessOutcome::NoEffect),
            "failed" => Some(ProcessOutcome::Failed),
            "rate_limited" => Some(ProcessOutcome::RateLimited),
            _ => None,
        }
    }
}

/// Fields supplied by the front-end when a like is requested
#[derive(Debug, Clone)]
pub struct NewLikeRequest {
    pub requester_id: i64,
    pub conversation_id: i64,
    pub anchor_message_id: i64,
    pub target_account_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeRequest {
    pub id: i64,
    pub requester_id: i64,
    pub conversation_id: i64,
    pub anchor_message_id: i64,
    pub target_account_id: String,
    #[serde(skip_serializing)]
    pub verification_code: String,
    pub verified: bool,
    pub processed: bool,
    pub outcome: Option<ProcessOutcome>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Request counts by lifecycle state, for the status endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub pending: i64,
    pub expired: i64,
    pub awaiting_fulfillment: i64,
    pub processed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels_round_trip() {
        for outcome in [
            ProcessOutcome::Fulfilled,
            ProcessOutcome::NoEffect,
            ProcessOutcome::Failed,
            ProcessOutcome::RateLimited,
        ] {
            assert_eq!(ProcessOutcome::from_str(outcome.as_str()), Some(outcome));
        }
        assert_eq!(ProcessOutcome::from_str("deferred"), None);
    }
}
