use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user entitlement and cooldown bookkeeping.
///
/// A user without a stored row has the default profile: not VIP, never fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub is_vip: bool,
    pub last_fulfilled_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            is_vip: false,
            last_fulfilled_at: None,
        }
    }
}
