//! Display-name lookup for a game account.
//!
//! Best effort only: every failure degrades to `Player-<last4>`.

use serde::Deserialize;
use std::time::Duration;

use super::{expand_template, fallback_display_name};

#[derive(Debug, Deserialize)]
struct PlayerInfoResponse {
    name: Option<String>,
}

pub struct PlayerInfoClient {
    http: reqwest::Client,
    url_template: Option<String>,
    timeout: Duration,
}

impl PlayerInfoClient {
    pub fn new(http: reqwest::Client, url_template: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            url_template: url_template.filter(|t| !t.trim().is_empty()),
            timeout,
        }
    }

    /// Look up the player name. `Err` carries the reason the lookup was skipped.
    pub async fn lookup_name(&self, account_id: &str) -> Result<String, String> {
        let template = self
            .url_template
            .as_deref()
            .ok_or_else(|| "player lookup not configured".to_string())?;
        let url = expand_template(template, account_id);

        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("Failed to reach player info API: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("Player info API returned HTTP {}", resp.status()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| format!("Failed to read player info response: {}", e))?;
        parse_player_name(&body).ok_or_else(|| "player info response has no name".to_string())
    }

    /// Player name, or the fallback when the lookup fails for any reason.
    pub async fn display_name(&self, account_id: &str) -> String {
        match self.lookup_name(account_id).await {
            Ok(name) => name,
            Err(e) => {
                log::debug!("[PLAYER_INFO] {} for {}, using fallback name", e, account_id);
                fallback_display_name(account_id)
            }
        }
    }
}

#[cfg(test)]
impl PlayerInfoClient {
    /// Client that never calls out and always returns the fallback name.
    pub fn disabled() -> Self {
        Self::new(reqwest::Client::new(), None, Duration::from_secs(5))
    }
}

fn parse_player_name(body: &str) -> Option<String> {
    let parsed: PlayerInfoResponse = serde_json::from_str(body).ok()?;
    parsed
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
