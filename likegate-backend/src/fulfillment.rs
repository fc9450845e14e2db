//! External like fulfillment.
//!
//! The executor never errors: transport problems, bad statuses, timeouts and
//! unparseable bodies all come back as `FulfillmentOutcome::Failure`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::integrations::{expand_template, fallback_display_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Success {
        before: i64,
        after: i64,
        added: i64,
        display_name: String,
    },
    /// Well-formed answer that added nothing (daily limit on the API side)
    NoEffect,
    Failure { reason: String },
}

#[async_trait]
pub trait FulfillmentExecutor: Send + Sync {
    async fn execute(&self, target_account_id: &str) -> FulfillmentOutcome;
}

#[derive(Debug, Deserialize)]
struct LikeApiResponse {
    #[serde(rename = "LikesbeforeCommand", default)]
    likes_before: i64,
    #[serde(rename = "LikesafterCommand", default)]
    likes_after: i64,
    #[serde(rename = "LikesGivenByAPI", default)]
    likes_given: i64,
    #[serde(rename = "PlayerNickname")]
    player_nickname: Option<String>,
}

/// Calls `LIKE_API_URL` with `{uid}` substituted.
pub struct HttpFulfillmentExecutor {
    http: reqwest::Client,
    url_template: String,
    timeout: Duration,
}

impl HttpFulfillmentExecutor {
    pub fn new(http: reqwest::Client, url_template: String, timeout: Duration) -> Self {
        Self {
            http,
            url_template,
            timeout,
        }
    }

    async fn call(&self, target_account_id: &str) -> Result<String, String> {
        let url = expand_template(&self.url_template, target_account_id);

        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("timeout after {}s", self.timeout.as_secs())
                } else {
                    format!("request failed: {}", e)
                }
            })?;

        if !resp.status().is_success() {
            return Err(format!("like API returned HTTP {}", resp.status()));
        }

        resp.text().await.map_err(|e| {
            if e.is_timeout() {
                format!("timeout after {}s", self.timeout.as_secs())
            } else {
                format!("failed to read response: {}", e)
            }
        })
    }
}

#[async_trait]
impl FulfillmentExecutor for HttpFulfillmentExecutor {
    async fn execute(&self, target_account_id: &str) -> FulfillmentOutcome {
        match self.call(target_account_id).await {
            Ok(body) => classify_response(&body, target_account_id),
            Err(reason) => FulfillmentOutcome::Failure { reason },
        }
    }
}

/// Map a like API body to an outcome.
pub fn classify_response(body: &str, target_account_id: &str) -> FulfillmentOutcome {
    let parsed: LikeApiResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            return FulfillmentOutcome::Failure {
                reason: format!("malformed response: {}", e),
            };
        }
    };

    if parsed.likes_given <= 0 {
        return FulfillmentOutcome::NoEffect;
    }

    let display_name = parsed
        .player_nickname
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_display_name(target_account_id));

    FulfillmentOutcome::Success {
        before: parsed.likes_before,
        after: parsed.likes_after,
        added: parsed.likes_given,
        display_name,
    }
}
