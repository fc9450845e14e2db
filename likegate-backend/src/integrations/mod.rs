//! HTTP collaborators keyed by a game account id.

pub mod player_info;
pub mod shortener;

pub use player_info::PlayerInfoClient;
pub use shortener::LinkShortener;

/// Substitute `{uid}` in an endpoint template.
pub fn expand_template(template: &str, account_id: &str) -> String {
    template.replace("{uid}", &urlencoding::encode(account_id))
}

/// Display name used whenever the real one cannot be looked up.
pub fn fallback_display_name(account_id: &str) -> String {
    let tail: String = account_id
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("Player-{}", tail)
}
