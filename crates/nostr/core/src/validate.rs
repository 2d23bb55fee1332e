//! Validators for untrusted strings.
//!
//! Pure predicates shared by every codec that touches third-party data. None
//! of them panic or return errors; a malformed input is simply `false`.

use url::Url;

/// Maximum length of a role tag value, in characters.
pub const MAX_ROLE_TAG_LEN: usize = 100;

/// Maximum length of a sanitized free-text field, in characters.
pub const MAX_DISPLAY_TEXT_LEN: usize = 1000;

/// True iff `s` is exactly 64 hex digits.
pub fn is_valid_pubkey(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// True iff `s` parses as a `ws://` or `wss://` URL with a non-empty host.
pub fn is_valid_relay_url(s: &str) -> bool {
    has_scheme_and_host(s, &["ws", "wss"])
}

/// True iff `s` parses as an `http://` or `https://` URL with a non-empty host.
pub fn is_valid_http_url(s: &str) -> bool {
    has_scheme_and_host(s, &["http", "https"])
}

fn has_scheme_and_host(s: &str, schemes: &[&str]) -> bool {
    match Url::parse(s) {
        Ok(url) => {
            schemes.contains(&url.scheme())
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// True iff the trimmed value is 1..=100 characters of `[A-Za-z0-9\s\-_]`.
pub fn is_valid_role_tag(s: &str) -> bool {
    let trimmed = s.trim();
    let len = trimmed.chars().count();
    (1..=MAX_ROLE_TAG_LEN).contains(&len)
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' || c == '_')
}

/// Make a free-text field safe to render.
///
/// Drops control characters (newlines and tabs survive), removes angle
/// brackets, trims surrounding whitespace and truncates to
/// [`MAX_DISPLAY_TEXT_LEN`] characters.
pub fn sanitize_display(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .filter(|c| *c != '<' && *c != '>')
        .collect();

    cleaned.trim().chars().take(MAX_DISPLAY_TEXT_LEN).collect()
}
