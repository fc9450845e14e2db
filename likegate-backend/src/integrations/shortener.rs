//! Link shortener used to wrap verification links.
//!
//! `GET {api_url}?api=<key>&url=<link>` answering `{"shortenedUrl": "..."}`.
//! Any failure hands back the original link.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(rename = "shortenedUrl")]
    shortened_url: Option<String>,
}

pub struct LinkShortener {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl LinkShortener {
    pub fn new(http: reqwest::Client, api_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            api_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    pub async fn try_shorten(&self, long_url: &str) -> Result<String, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "shortener API key not configured".to_string())?;

        let resp = self
            .http
            .get(&self.api_url)
            .query(&[("api", api_key), ("url", long_url)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("Failed to reach shortener: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("Shortener returned HTTP {}", resp.status()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| format!("Failed to read shortener response: {}", e))?;
        parse_shortened(&body).ok_or_else(|| "shortener response has no shortenedUrl".to_string())
    }

    pub async fn shorten(&self, long_url: &str) -> String {
        match self.try_shorten(long_url).await {
            Ok(short) => short,
            Err(e) => {
                log::debug!("[SHORTENER] {}, using raw link", e);
                long_url.to_string()
            }
        }
    }
}

#[cfg(test)]
impl LinkShortener {
    /// Shortener without an API key; `shorten` returns links unchanged.
    pub fn disabled() -> Self {
        Self::new(
            reqwest::Client::new(),
            crate::config::defaults::SHORTENER_API_URL.to_string(),
            None,
            Duration::from_secs(5),
        )
    }
}

fn parse_shortened(body: &str) -> Option<String> {
    let parsed: ShortenResponse = serde_json::from_str(body).ok()?;
    let short = parsed.shortened_url?;
    url::Url::parse(&short).ok()?;
    Some(short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortened() {
        assert_eq!(
            parse_shortened(r#"{"status":"success","shortenedUrl":"https://shortner.in/abc"}"#),
            Some("https://shortner.in/abc".to_string())
        );
        assert_eq!(parse_shortened(r#"{"status":"error","message":"bad key"}"#), None);
        assert_eq!(parse_shortened(r#"{"shortenedUrl":"not a url"}"#), None);
        assert_eq!(parse_shortened("Too Many Requests"), None);
    }

    #[tokio::test]
    async fn test_missing_key_returns_raw_link() {
        let shortener = LinkShortener::disabled();
        let link = "http://127.0.0.1:5000/verify/AbCdEf123456";
        assert_eq!(shortener.shorten(link).await, link);
    }

    #[tokio::test]
    async fn test_unreachable_shortener_returns_raw_link() {
        let shortener = LinkShortener::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api".to_string(),
            Some("key".to_string()),
            Duration::from_secs(2),
        );
        let link = "http://127.0.0.1:5000/verify/AbCdEf123456";
        assert_eq!(shortener.shorten(link).await, link);
    }
}
