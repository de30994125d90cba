/// Prefix the identity provider puts in front of every subject id.
pub const SUBJECT_PREFIX: &str = "user_";

/// Normalize an identity-provider subject into the id used in every table.
///
/// Strips [`SUBJECT_PREFIX`] once if present and trims surrounding whitespace.
/// Returns `None` when nothing usable is left. Every boundary that receives a
/// subject must go through this function, otherwise lookups silently miss.
pub fn normalize_subject(subject: &str) -> Option<String> {
    let trimmed = subject.trim();
    let stripped = trimmed.strip_prefix(SUBJECT_PREFIX).unwrap_or(trimmed);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}
