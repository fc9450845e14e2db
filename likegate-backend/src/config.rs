use std::collections::HashSet;
use std::env;
use std::str::FromStr;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const BOT_TOKEN: &str = "BOT_TOKEN";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const PORT: &str = "PORT";
    pub const PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";
    pub const LIKE_API_URL: &str = "LIKE_API_URL";
    pub const PLAYER_INFO_API: &str = "PLAYER_INFO_API";
    pub const SHORTENER_API_URL: &str = "SHORTENER_API_URL";
    pub const SHORTENER_API_KEY: &str = "SHORTENER_API_KEY";
    pub const HOW_TO_VERIFY_URL: &str = "HOW_TO_VERIFY_URL";
    pub const VIP_ACCESS_URL: &str = "VIP_ACCESS_URL";
    pub const REQUIRED_CHANNEL: &str = "REQUIRED_CHANNEL";
    pub const ADMIN_IDS: &str = "ADMIN_IDS";
    // Reconciler tuning
    pub const POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
    pub const MAX_CONCURRENT_FULFILLMENTS: &str = "MAX_CONCURRENT_FULFILLMENTS";
    pub const FULFILLMENT_TIMEOUT_SECS: &str = "FULFILLMENT_TIMEOUT_SECS";
    pub const LOOKUP_TIMEOUT_SECS: &str = "LOOKUP_TIMEOUT_SECS";
    pub const WORKER_LEASE_SECS: &str = "WORKER_LEASE_SECS";
    pub const REQUEST_TTL_MINUTES: &str = "REQUEST_TTL_MINUTES";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 5000;
    pub const DATABASE_URL: &str = "./.db/likegate.db";
    pub const PUBLIC_BASE_URL: &str = "http://127.0.0.1:5000";
    pub const SHORTENER_API_URL: &str = "https://shortner.in/api";
    pub const POLL_INTERVAL_SECS: u64 = 5;
    pub const MAX_CONCURRENT_FULFILLMENTS: usize = 4;
    pub const FULFILLMENT_TIMEOUT_SECS: u64 = 10;
    pub const LOOKUP_TIMEOUT_SECS: u64 = 5;
    pub const WORKER_LEASE_SECS: i64 = 60;
    pub const REQUEST_TTL_MINUTES: i64 = 10;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: Option<String>,
    pub database_url: String,
    pub port: u16,
    pub public_base_url: String,
    /// Fulfillment endpoint template; the reconciler only runs when set
    pub like_api_url: Option<String>,
    pub player_info_api: Option<String>,
    pub shortener_api_url: String,
    pub shortener_api_key: Option<String>,
    pub how_to_verify_url: Option<String>,
    pub vip_access_url: Option<String>,
    pub required_channel: Option<String>,
    pub admin_ids: HashSet<i64>,
    pub poll_interval_secs: u64,
    pub max_concurrent_fulfillments: usize,
    pub fulfillment_timeout_secs: u64,
    pub lookup_timeout_secs: u64,
    pub worker_lease_secs: i64,
    pub request_ttl_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            database_url: defaults::DATABASE_URL.to_string(),
            port: defaults::PORT,
            public_base_url: defaults::PUBLIC_BASE_URL.to_string(),
            like_api_url: None,
            player_info_api: None,
            shortener_api_url: defaults::SHORTENER_API_URL.to_string(),
            shortener_api_key: None,
            how_to_verify_url: None,
            vip_access_url: None,
            required_channel: None,
            admin_ids: HashSet::new(),
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
            max_concurrent_fulfillments: defaults::MAX_CONCURRENT_FULFILLMENTS,
            fulfillment_timeout_secs: defaults::FULFILLMENT_TIMEOUT_SECS,
            lookup_timeout_secs: defaults::LOOKUP_TIMEOUT_SECS,
            worker_lease_secs: defaults::WORKER_LEASE_SECS,
            request_ttl_minutes: defaults::REQUEST_TTL_MINUTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self {
            bot_token: get(env_vars::BOT_TOKEN),
            database_url: get(env_vars::DATABASE_URL)
                .unwrap_or_else(|| defaults::DATABASE_URL.to_string()),
            port: parse_or(env_vars::PORT, get(env_vars::PORT), defaults::PORT),
            public_base_url: get(env_vars::PUBLIC_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| defaults::PUBLIC_BASE_URL.to_string()),
            like_api_url: get(env_vars::LIKE_API_URL),
            player_info_api: get(env_vars::PLAYER_INFO_API),
            shortener_api_url: get(env_vars::SHORTENER_API_URL)
                .unwrap_or_else(|| defaults::SHORTENER_API_URL.to_string()),
            shortener_api_key: get(env_vars::SHORTENER_API_KEY),
            how_to_verify_url: get(env_vars::HOW_TO_VERIFY_URL),
            vip_access_url: get(env_vars::VIP_ACCESS_URL),
            required_channel: get(env_vars::REQUIRED_CHANNEL),
            admin_ids: get(env_vars::ADMIN_IDS)
                .map(|v| parse_admin_ids(&v))
                .unwrap_or_default(),
            poll_interval_secs: positive_or(
                env_vars::POLL_INTERVAL_SECS,
                get(env_vars::POLL_INTERVAL_SECS),
                defaults::POLL_INTERVAL_SECS,
            ),
            max_concurrent_fulfillments: positive_or(
                env_vars::MAX_CONCURRENT_FULFILLMENTS,
                get(env_vars::MAX_CONCURRENT_FULFILLMENTS),
                defaults::MAX_CONCURRENT_FULFILLMENTS,
            ),
            fulfillment_timeout_secs: positive_or(
                env_vars::FULFILLMENT_TIMEOUT_SECS,
                get(env_vars::FULFILLMENT_TIMEOUT_SECS),
                defaults::FULFILLMENT_TIMEOUT_SECS,
            ),
            lookup_timeout_secs: positive_or(
                env_vars::LOOKUP_TIMEOUT_SECS,
                get(env_vars::LOOKUP_TIMEOUT_SECS),
                defaults::LOOKUP_TIMEOUT_SECS,
            ),
            worker_lease_secs: positive_or(
                env_vars::WORKER_LEASE_SECS,
                get(env_vars::WORKER_LEASE_SECS),
                defaults::WORKER_LEASE_SECS,
            ),
            request_ttl_minutes: positive_or(
                env_vars::REQUEST_TTL_MINUTES,
                get(env_vars::REQUEST_TTL_MINUTES),
                defaults::REQUEST_TTL_MINUTES,
            ),
        };

        // A lease shorter than one fulfillment call could expire mid-call
        let timeout = i64::try_from(config.fulfillment_timeout_secs).unwrap_or(i64::MAX / 2);
        if config.worker_lease_secs <= timeout {
            let clamped = timeout.saturating_mul(2);
            log::warn!(
                "{}={} does not exceed {}={}, using {}",
                env_vars::WORKER_LEASE_SECS,
                config.worker_lease_secs,
                env_vars::FULFILLMENT_TIMEOUT_SECS,
                config.fulfillment_timeout_secs,
                clamped
            );
            config.worker_lease_secs = clamped;
        }

        config
    }

    pub fn telegram_enabled(&self) -> bool {
        self.bot_token.is_some()
    }
}

/// Comma-separated user ids; anything non-numeric is dropped.
pub fn parse_admin_ids(raw: &str) -> HashSet<i64> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    log::warn!("Ignoring non-numeric {} entry '{}'", env_vars::ADMIN_IDS, part);
                    None
                }
            }
        })
        .collect()
}

fn parse_or<T: FromStr + std::fmt::Display + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.parse().unwrap_or_else(|_| {
            log::warn!("Invalid {}='{}', using default {}", name, v, default);
            default
        }),
    }
}

fn positive_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy + PartialOrd + Default,
{
    let value = parse_or(name, raw, default);
    if value > T::default() {
        value
    } else {
        log::warn!("{} must be positive, using default {}", name, default);
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_url, "./.db/likegate.db");
        assert_eq!(config.shortener_api_url, "https://shortner.in/api");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.request_ttl_minutes, 10);
        assert!(config.like_api_url.is_none());
        assert!(!config.telegram_enabled());
        assert!(config.admin_ids.is_empty());
    }

    #[test]
    fn test_values_are_read() {
        let config = config_from(&[
            (env_vars::BOT_TOKEN, "123:abc"),
            (env_vars::PORT, "8081"),
            (env_vars::PUBLIC_BASE_URL, "https://likes.example/"),
            (env_vars::LIKE_API_URL, "https://api.example/like?uid={uid}"),
            (env_vars::MAX_CONCURRENT_FULFILLMENTS, "8"),
            (env_vars::REQUIRED_CHANNEL, "@likes"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.public_base_url, "https://likes.example");
        assert_eq!(config.max_concurrent_fulfillments, 8);
        assert_eq!(config.required_channel.as_deref(), Some("@likes"));
        assert!(config.like_api_url.is_some());
        assert!(config.telegram_enabled());
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            (env_vars::PORT, "eighty"),
            (env_vars::POLL_INTERVAL_SECS, "0"),
            (env_vars::WORKER_LEASE_SECS, "-5"),
        ]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.worker_lease_secs, 60);
    }

    #[test]
    fn test_lease_is_clamped_above_fulfillment_timeout() {
        let config = config_from(&[
            (env_vars::FULFILLMENT_TIMEOUT_SECS, "30"),
            (env_vars::WORKER_LEASE_SECS, "30"),
        ]);
        assert_eq!(config.worker_lease_secs, 60);

        let config = config_from(&[
            (env_vars::FULFILLMENT_TIMEOUT_SECS, "30"),
            (env_vars::WORKER_LEASE_SECS, "31"),
        ]);
        assert_eq!(config.worker_lease_secs, 31);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_from(&[(env_vars::BOT_TOKEN, "  "), (env_vars::LIKE_API_URL, "")]);
        assert!(config.bot_token.is_none());
        assert!(config.like_api_url.is_none());
    }

    #[test]
    fn test_parse_admin_ids() {
        let ids = parse_admin_ids("123, 456,abc,,789");
        assert_eq!(ids, HashSet::from([123, 456, 789]));
    }
}
