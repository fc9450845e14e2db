//! Cooldown policy gating fulfillment.
//!
//! VIP profiles are never limited. Everyone else gets one fulfillment per
//! rolling 24 hour window, measured from the last successful one.

use chrono::{DateTime, Duration, Utc};

use crate::models::Profile;

pub const COOLDOWN_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny { remaining: Duration },
}

pub fn cooldown() -> Duration {
    Duration::hours(COOLDOWN_HOURS)
}

pub fn evaluate(profile: &Profile, now: DateTime<Utc>) -> RateDecision {
    if profile.is_vip {
        return RateDecision::Allow;
    }
    let Some(last) = profile.last_fulfilled_at else {
        return RateDecision::Allow;
    };

    // A timestamp ahead of our clock counts as "just now"
    let elapsed = (now - last).max(Duration::zero());
    if elapsed >= cooldown() {
        RateDecision::Allow
    } else {
        RateDecision::Deny {
            remaining: cooldown() - elapsed,
        }
    }
}

/// Remaining cooldown as `"{h}h {m}m"`, rounded down to whole minutes.
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn profile(is_vip: bool, last: Option<DateTime<Utc>>) -> Profile {
        Profile {
            user_id: 1,
            is_vip,
            last_fulfilled_at: last,
        }
    }

    #[test]
    fn test_first_fulfillment_is_allowed() {
        assert_eq!(evaluate(&profile(false, None), now()), RateDecision::Allow);
    }

    #[test]
    fn test_vip_ignores_recent_fulfillment() {
        for ago in [Duration::zero(), Duration::minutes(1), Duration::hours(23)] {
            let p = profile(true, Some(now() - ago));
            assert_eq!(evaluate(&p, now()), RateDecision::Allow);
        }
    }

    #[test]
    fn test_one_hour_ago_leaves_23_hours() {
        let p = profile(false, Some(now() - Duration::hours(1)));
        let decision = evaluate(&p, now());
        assert_eq!(decision, RateDecision::Deny { remaining: Duration::hours(23) });
        if let RateDecision::Deny { remaining } = decision {
            assert_eq!(format_remaining(remaining), "23h 0m");
        }
    }

    #[test]
    fn test_boundary_at_exactly_24_hours_is_allowed() {
        let p = profile(false, Some(now() - Duration::hours(24)));
        assert_eq!(evaluate(&p, now()), RateDecision::Allow);

        let p = profile(false, Some(now() - Duration::hours(24) + Duration::seconds(1)));
        assert_eq!(
            evaluate(&p, now()),
            RateDecision::Deny { remaining: Duration::seconds(1) }
        );
    }

    #[test]
    fn test_future_timestamp_denies_full_window() {
        let p = profile(false, Some(now() + Duration::minutes(5)));
        assert_eq!(evaluate(&p, now()), RateDecision::Deny { remaining: cooldown() });
    }

    #[test]
    fn test_format_rounds_down_to_minutes() {
        assert_eq!(format_remaining(Duration::seconds(59)), "0h 0m");
        assert_eq!(format_remaining(Duration::minutes(125) + Duration::seconds(59)), "2h 5m");
        assert_eq!(format_remaining(Duration::hours(24)), "24h 0m");
    }
}
