//! Client filename sanitization.

use unicode_normalization::UnicodeNormalization;

/// Used when a filename sanitizes down to nothing.
pub const FALLBACK_NAME: &str = "upload";

/// Reduce a client-supplied filename to a safe single path component.
///
/// The name is NFKD-decomposed and folded to ASCII (`é` keeps its `e`).
/// Path separators become word breaks, whitespace runs collapse to `_`,
/// anything outside `[A-Za-z0-9_.-]` is dropped and leading/trailing
/// `.`/`_` are stripped. May return an empty string.
pub fn sanitize_filename(raw: &str) -> String {
    let spaced: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Sanitized display name, never empty.
pub fn display_name_for(raw: &str) -> String {
    let name = sanitize_filename(raw);
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}
