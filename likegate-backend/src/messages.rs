//! User-facing texts. Plain text, no parse mode.

use chrono::{DateTime, Utc};

use crate::rate_limiter::format_remaining;

pub const USAGE: &str = "❌ Format: /like ind <uid>";
pub const GIVEVIP_USAGE: &str = "❌ Use: /givevip <user_id>";
pub const NOT_AUTHORIZED: &str = "🚫 Not authorized.";
pub const NO_EFFECT: &str = "❌ Like failed or daily limit reached.";
pub const VERIFY_SUCCESS: &str = "✅ Verification successful. You may return to the bot.";
pub const VERIFY_FAILURE: &str = "❌ Link expired or already used.";
pub const TRY_AGAIN_LATER: &str = "⚠️ Something went wrong. Please try again later.";

pub fn help() -> String {
    [
        "👍 Like bot",
        "",
        "/like <region> <uid> - request a like for a game account",
        "/help - show this message",
        "",
        "After /like, open the verification link within the time limit.",
        "The like is sent automatically once the link is verified.",
        "Free users get one like every 24 hours; VIP users are not limited.",
    ]
    .join("\n")
}

pub fn join_required(required_group: &str) -> String {
    format!("🚫 Please join our channel {} first.", required_group)
}

pub fn invalid_target(reason: &str) -> String {
    format!("❌ {}\n\n{}", reason, USAGE)
}

pub fn request_created(display_name: &str, account_id: &str, region: &str, ttl_minutes: i64) -> String {
    format!(
        "🎯 Like Request Initiated\n\n🧑 Player: {}\n🆔 UID: {}\n🌍 Region: {}\n\n⏱️ Verify within {} minutes.",
        display_name,
        account_id,
        region.to_uppercase(),
        ttl_minutes
    )
}

pub fn vip_granted(user_id: i64) -> String {
    format!("✅ VIP granted to {}", user_id)
}

pub fn rate_limited(remaining: chrono::Duration) -> String {
    format!(
        "❌ Daily Limit Reached\n\n⏳ Try again after: {}",
        format_remaining(remaining)
    )
}

pub fn fulfilled(
    display_name: &str,
    account_id: &str,
    before: i64,
    added: i64,
    after: i64,
    at: DateTime<Utc>,
) -> String {
    format!(
        "✅ Like Sent Successfully\n\n🧑 Player: {}\n🆔 UID: {}\n👍 Likes Before: {}\n✨ Likes Added: {}\n📈 Total Now: {}\n🕒 At: {}",
        display_name,
        account_id,
        before,
        added,
        after,
        at.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn failed(account_id: &str, reason: &str) -> String {
    format!("❌ Error processing like.\n\nUID: {}\nError: {}", account_id, reason)
}
