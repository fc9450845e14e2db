//! Request creation and VIP administration.
//!
//! Front-end agnostic: the Telegram handlers call into this, and so do tests.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Database;
use crate::error::{AdminError, CreateRequestError};
use crate::integrations::{LinkShortener, PlayerInfoClient};
use crate::membership::MembershipGate;
use crate::models::{LikeRequest, NewLikeRequest};

const MAX_ACCOUNT_ID_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct CreatedRequest {
    pub request: LikeRequest,
    /// Verification link, shortened when the shortener answered
    pub verification_link: String,
    pub display_name: String,
}

pub struct LikeService {
    db: Arc<Database>,
    gate: MembershipGate,
    player_info: PlayerInfoClient,
    shortener: LinkShortener,
    public_base_url: String,
    request_ttl: Duration,
    admin_ids: HashSet<i64>,
}

impl LikeService {
    pub fn new(
        db: Arc<Database>,
        gate: MembershipGate,
        player_info: PlayerInfoClient,
        shortener: LinkShortener,
        public_base_url: String,
        request_ttl: Duration,
        admin_ids: HashSet<i64>,
    ) -> Self {
        Self {
            db,
            gate,
            player_info,
            shortener,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            request_ttl,
            admin_ids,
        }
    }

    pub fn request_ttl(&self) -> Duration {
        self.request_ttl
    }

    /// Gate, validate, enrich and store a new request. Returns the link the
    /// requester must open.
    pub async fn create_request(
        &self,
        requester_id: i64,
        conversation_id: i64,
        anchor_message_id: i64,
        target_account_id: &str,
    ) -> Result<CreatedRequest, CreateRequestError> {
        if !self.gate.is_eligible(requester_id).await {
            return Err(CreateRequestError::NotEligible);
        }

        let target = validate_account_id(target_account_id)?;
        let display_name = self.player_info.display_name(target).await;

        let request = self.db.create_like_request(
            &NewLikeRequest {
                requester_id,
                conversation_id,
                anchor_message_id,
                target_account_id: target.to_string(),
            },
            Utc::now(),
            self.request_ttl,
        )?;

        log::info!(
            "[LIKE] Request {} created by user {} for account {}",
            request.id,
            requester_id,
            target
        );

        let raw_link = verification_url(&self.public_base_url, &request.verification_code);
        let verification_link = self.shortener.shorten(&raw_link).await;

        Ok(CreatedRequest {
            request,
            verification_link,
            display_name,
        })
    }

    pub async fn is_eligible(&self, user_id: i64) -> bool {
        self.gate.is_eligible(user_id).await
    }

    pub fn is_operator(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub fn grant_vip(&self, operator_id: i64, user_id: i64) -> Result<(), AdminError> {
        if !self.is_operator(operator_id) {
            log::warn!("[ADMIN] User {} tried to grant VIP to {}", operator_id, user_id);
            return Err(AdminError::NotAuthorized(operator_id));
        }
        self.db.set_vip(user_id, true)?;
        log::info!("[ADMIN] VIP granted to {} by {}", user_id, operator_id);
        Ok(())
    }
}

pub fn verification_url(public_base_url: &str, code: &str) -> String {
    format!("{}/verify/{}", public_base_url.trim_end_matches('/'), code)
}

fn validate_account_id(raw: &str) -> Result<&str, CreateRequestError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(CreateRequestError::InvalidTarget("missing account id".to_string()));
    }
    if id.len() > MAX_ACCOUNT_ID_LEN {
        return Err(CreateRequestError::InvalidTarget(format!(
            "account id longer than {} characters",
            MAX_ACCOUNT_ID_LEN
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CreateRequestError::InvalidTarget(
            "account id must be letters and digits only".to_string(),
        ));
    }
    Ok(id)
}
