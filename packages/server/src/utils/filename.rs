use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

/// Longest sanitized filename kept in a storage key.
const MAX_NAME_CHARS: usize = 80;

/// Reduce an uploaded filename to a key-safe form.
///
/// Keeps ASCII letters, digits, `.`, `_` and `-`; every other run of
/// characters becomes a single `_`. Leading dots are stripped so the name can
/// never be hidden or a traversal segment. Falls back to `"upload"`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let mut out = String::with_capacity(base.len());
    let mut last_underscore = false;
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            out.push(c);
            last_underscore = c == '_';
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }

    let trimmed = out.trim_start_matches('.');
    let trimmed: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_' || c == '.') {
        "upload".to_string()
    } else {
        trimmed
    }
}

/// Build a fresh object key scoped by owner.
///
/// Format: `{owner_id}/{unix_millis}-{random}-{sanitized filename}`. The
/// random part keeps two uploads of the same name in the same millisecond apart.
pub fn storage_key(owner_id: &str, filename: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!(
        "{}/{}-{}-{}",
        owner_id,
        now.timestamp_millis(),
        suffix,
        sanitize_filename(filename)
    )
}
