//! Group-membership gate in front of request creation.
//!
//! Fail-closed: an oracle error counts as "not a member".

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    pub fn is_eligible(&self) -> bool {
        matches!(self, MemberStatus::Owner | MemberStatus::Administrator | MemberStatus::Member)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Owner => "owner",
            MemberStatus::Administrator => "administrator",
            MemberStatus::Member => "member",
            MemberStatus::Restricted => "restricted",
            MemberStatus::Left => "left",
            MemberStatus::Banned => "banned",
        }
    }
}

/// Source of truth for group membership (the Telegram API in production).
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn member_status(&self, user_id: i64) -> Result<MemberStatus, String>;
}

#[derive(Clone)]
pub struct MembershipGate {
    oracle: Option<Arc<dyn MembershipOracle>>,
}

impl MembershipGate {
    /// Gate with no required group: everyone is eligible.
    pub fn open() -> Self {
        Self { oracle: None }
    }

    pub fn new(oracle: Arc<dyn MembershipOracle>) -> Self {
        Self { oracle: Some(oracle) }
    }

    pub async fn is_eligible(&self, user_id: i64) -> bool {
        let Some(oracle) = &self.oracle else {
            return true;
        };
        match oracle.member_status(user_id).await {
            Ok(status) => {
                log::debug!("[MEMBERSHIP] user {} is {}", user_id, status.as_str());
                status.is_eligible()
            }
            Err(e) => {
                log::warn!("[MEMBERSHIP] lookup failed for user {}: {}", user_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOracle(Result<MemberStatus, String>);

    #[async_trait]
    impl MembershipOracle for FixedOracle {
        async fn member_status(&self, _user_id: i64) -> Result<MemberStatus, String> {
            self.0.clone()
        }
    }

    fn gate(result: Result<MemberStatus, String>) -> MembershipGate {
        MembershipGate::new(Arc::new(FixedOracle(result)))
    }

    #[tokio::test]
    async fn test_open_gate_admits_everyone() {
        let gate = MembershipGate::open();
        assert!(gate.is_eligible(42).await);
    }

    #[tokio::test]
    async fn test_member_statuses() {
        for status in [MemberStatus::Owner, MemberStatus::Administrator, MemberStatus::Member] {
            assert!(gate(Ok(status)).is_eligible(42).await, "{:?}", status);
        }
        for status in [MemberStatus::Restricted, MemberStatus::Left, MemberStatus::Banned] {
            assert!(!gate(Ok(status)).is_eligible(42).await, "{:?}", status);
        }
    }

    #[tokio::test]
    async fn test_oracle_error_is_not_eligible() {
        let gate = gate(Err("Bad Request: chat not found".to_string()));
        assert!(!gate.is_eligible(42).await);
    }
}
