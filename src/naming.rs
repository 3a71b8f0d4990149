//! Filesystem-safe names derived from prompt text.

const MAX_SLUG_CHARS: usize = 50;

/// Lowercased, underscore-separated slug of `text`, capped at 50 chars.
///
/// Alphanumerics, `-` and `_` are kept; everything else becomes `_`.
/// Returns `"untitled"` when nothing usable remains.
pub fn slugify(text: &str) -> String {
    let slug: String = text
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(MAX_SLUG_CHARS)
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Short hex digest of `content`, used to keep persisted names unique.
pub fn short_digest(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hex::encode(&hash.as_bytes()[..4])
}
