//! Filename sanitization for titles coming from remote catalogues.

/// Longest file name most filesystems accept, in bytes (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Sanitizes a remote title or id for use as a single path component.
///
/// - Replaces NUL, path separators, control characters and the characters
///   Windows rejects (`: * ? " < > |`) with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing spaces, dots and underscores
/// - Limits length to `max_len` bytes on a char boundary
pub fn sanitize_component(name: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = match c {
            '\0' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '\t' || c == '.' || c == '_');

    if trimmed.len() > max_len {
        let mut take = max_len;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

/// `sanitize_component` with the default NAME_MAX limit.
pub fn sanitize_filename(name: &str) -> String {
    sanitize_component(name, NAME_MAX)
}
