//! Helpers shared by the notification channels.

/// Longest response body kept in error messages and logs.
pub const MAX_BODY_LENGTH: usize = 4000;

/// Truncates `s` to at most `max_len` bytes, backing off to a char boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
