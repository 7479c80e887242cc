//! Text shaping for the chat platform

/// Longest channel name the chat platform accepts, in characters
pub const MAX_CHANNEL_NAME_LEN: usize = 100;

/// Tidy a `"<player> <message>"` chat line from the game.
///
/// The game wraps some message components as `literal{...}`; the wrapper is
/// removed. Lines without a space pass through trimmed.
pub fn clean_chat_line(raw: &str) -> String {
    let raw = raw.trim();
    let Some((player, content)) = raw.split_once(' ') else {
        return raw.to_string();
    };

    let content = content.trim();
    let content = content.strip_prefix("literal{").unwrap_or(content);
    let content = content.strip_suffix('}').unwrap_or(content);
    format!("{player} {}", content.trim())
}

/// Name for the status channel: an online marker and the status, capped at
/// [`MAX_CHANNEL_NAME_LEN`] characters.
pub fn status_channel_name(status: &str) -> String {
    format!("🟢 {}", status.trim())
        .chars()
        .take(MAX_CHANNEL_NAME_LEN)
        .collect()
}
