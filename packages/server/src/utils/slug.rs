/// Derive a URL slug from a category label.
///
/// Lowercases, turns whitespace into hyphens, drops anything that is not
/// `[a-z0-9_-]`, collapses repeated hyphens and trims them from both ends.
/// The result may be empty, in which case the label is unusable.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.trim().to_lowercase().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug.trim_matches('-').to_string()
}

/// Case-insensitive identity of a category name.
pub fn normalize_name(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
